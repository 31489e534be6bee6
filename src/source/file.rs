//! File source: re-reads a JSON file on every poll.

use std::fs;
use std::path::PathBuf;

use crate::core::errors::{DashpadError, Result};
use crate::protocol::{DashboardState, decode_payload};
use crate::source::Source;

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Source for FileSource {
    fn poll(&mut self) -> Result<DashboardState> {
        let text = fs::read_to_string(&self.path)
            .map_err(|source| DashpadError::io(&self.path, source))?;
        decode_payload(&text, &self.path.display().to_string())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
