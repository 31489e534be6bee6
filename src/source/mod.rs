//! State sources: where each poll's `DashboardState` comes from.
//!
//! The source argument picks the variant by prefix: `!cmd` runs a shell
//! command, `http://` / `https://` issues a GET, anything else is a file path.

pub mod file;
pub mod shell;
#[cfg(feature = "http")]
pub mod url;

use std::fmt;
use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::errors::{DashpadError, Result};
use crate::protocol::DashboardState;

pub use file::FileSource;
pub use shell::ShellSource;
#[cfg(feature = "http")]
pub use url::UrlSource;

/// A poll-able producer of dashboard state.
///
/// Every failure (I/O, command, network, bad JSON, schema mismatch) comes back
/// as an error from `poll`; the poll loop decides what to do with it.
pub trait Source: Send {
    /// Fetch and decode one state.
    fn poll(&mut self) -> Result<DashboardState>;
    /// Short label for logs, e.g. `file:/tmp/state.json`.
    fn describe(&self) -> String;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn poll(&mut self) -> Result<DashboardState> {
        (**self).poll()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Parsed source argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    File(PathBuf),
    Shell(String),
    Url(String),
}

impl SourceSpec {
    /// Classify a source argument by prefix.
    pub fn parse(arg: &str) -> Result<Self> {
        if arg.trim().is_empty() {
            return Err(invalid(arg, "source must not be empty"));
        }
        if let Some(command) = arg.strip_prefix('!') {
            if command.trim().is_empty() {
                return Err(invalid(arg, "shell source needs a command after '!'"));
            }
            return Ok(Self::Shell(command.to_string()));
        }
        if arg.starts_with("http://") || arg.starts_with("https://") {
            return Ok(Self::Url(arg.to_string()));
        }
        Ok(Self::File(PathBuf::from(arg)))
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Shell(_) => "shell",
            Self::Url(_) => "url",
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Shell(command) => write!(f, "shell:{command}"),
            Self::Url(url) => write!(f, "url:{url}"),
        }
    }
}

/// Build the source for `spec` using the `[http]` settings from `config`.
pub fn build_source(spec: &SourceSpec, config: &Config) -> Result<Box<dyn Source>> {
    match spec {
        SourceSpec::File(path) => Ok(Box::new(FileSource::new(path.clone()))),
        SourceSpec::Shell(command) => Ok(Box::new(ShellSource::new(command.clone()))),
        SourceSpec::Url(url) => build_url_source(url, config),
    }
}

#[cfg(feature = "http")]
fn build_url_source(url: &str, config: &Config) -> Result<Box<dyn Source>> {
    let timeout = std::time::Duration::from_secs(config.http.timeout_secs);
    Ok(Box::new(UrlSource::new(url.to_string(), timeout)?))
}

#[cfg(not(feature = "http"))]
fn build_url_source(url: &str, _config: &Config) -> Result<Box<dyn Source>> {
    Err(invalid(url, "this build has no HTTP support (feature `http`)"))
}

fn invalid(arg: &str, details: &str) -> DashpadError {
    DashpadError::InvalidSource {
        source_arg: arg.to_string(),
        details: details.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_by_prefix() {
        assert_eq!(
            SourceSpec::parse("!echo hi").unwrap(),
            SourceSpec::Shell("echo hi".to_string())
        );
        assert_eq!(
            SourceSpec::parse("https://example.com/state").unwrap(),
            SourceSpec::Url("https://example.com/state".to_string())
        );
        assert_eq!(
            SourceSpec::parse("http://localhost:8080").unwrap(),
            SourceSpec::Url("http://localhost:8080".to_string())
        );
        assert_eq!(
            SourceSpec::parse("state.json").unwrap(),
            SourceSpec::File(PathBuf::from("state.json"))
        );
        // Only the exact scheme prefix selects the URL source.
        assert_eq!(
            SourceSpec::parse("httpdocs/state.json").unwrap().kind(),
            "file"
        );
    }

    #[test]
    fn parse_rejects_empty_inputs() {
        for arg in ["", "   ", "!", "!   "] {
            let err = SourceSpec::parse(arg).unwrap_err();
            assert_eq!(err.code(), "DP-1101", "arg {arg:?}");
        }
    }

    #[test]
    fn display_includes_kind() {
        assert_eq!(
            SourceSpec::parse("!date").unwrap().to_string(),
            "shell:date"
        );
        assert_eq!(
            SourceSpec::parse("/tmp/s.json").unwrap().to_string(),
            "file:/tmp/s.json"
        );
    }

    #[test]
    fn build_source_describes_itself() {
        let config = Config::default();
        let spec = SourceSpec::parse("!true").unwrap();
        let source = build_source(&spec, &config).unwrap();
        assert_eq!(source.describe(), "shell:true");
    }
}
