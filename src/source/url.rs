//! URL source: blocking HTTP GET on every poll. Only `200 OK` is accepted.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::core::errors::{DashpadError, Result};
use crate::protocol::{DashboardState, decode_payload};
use crate::source::Source;

pub struct UrlSource {
    url: String,
    client: Client,
}

impl UrlSource {
    /// Build the client once; it is reused for every poll.
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dashpad/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashpadError::Http {
                url: url.clone(),
                details: format!("failed to build client: {e}"),
            })?;
        Ok(Self { url, client })
    }
}

impl Source for UrlSource {
    fn poll(&mut self) -> Result<DashboardState> {
        let http_err = |e: reqwest::Error| DashpadError::Http {
            url: self.url.clone(),
            details: e.to_string(),
        };

        let response = self.client.get(&self.url).send().map_err(http_err)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(DashpadError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(http_err)?;
        decode_payload(&body, &self.url)
    }

    fn describe(&self) -> String {
        format!("url:{}", self.url)
    }
}
