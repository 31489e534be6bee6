//! DP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DashpadError>;

/// Top-level error type for dashpad.
#[derive(Debug, Error)]
pub enum DashpadError {
    #[error("[DP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DP-1101] invalid dashboard source {source_arg:?}: {details}")]
    InvalidSource { source_arg: String, details: String },

    #[error("[DP-2001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DP-2002] command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("[DP-2003] HTTP request to {url} failed: {details}")]
    Http { url: String, details: String },

    #[error("[DP-2004] HTTP call failed: {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("[DP-2101] payload from {origin} is not valid JSON: {details}")]
    Payload { origin: String, details: String },

    #[error("[DP-2201] output does not match protocol at {path}: {details}")]
    Validation { path: String, details: String },

    #[error("[DP-3001] no Launchpad found: {details}")]
    DeviceNotFound { details: String },

    #[error("[DP-3002] MIDI failure: {details}")]
    Midi { details: String },

    #[error("[DP-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DP-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DashpadError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DP-1001",
            Self::MissingConfig { .. } => "DP-1002",
            Self::ConfigParse { .. } => "DP-1003",
            Self::InvalidSource { .. } => "DP-1101",
            Self::Io { .. } => "DP-2001",
            Self::CommandFailed { .. } => "DP-2002",
            Self::Http { .. } => "DP-2003",
            Self::HttpStatus { .. } => "DP-2004",
            Self::Payload { .. } => "DP-2101",
            Self::Validation { .. } => "DP-2201",
            Self::DeviceNotFound { .. } => "DP-3001",
            Self::Midi { .. } => "DP-3002",
            Self::ChannelClosed { .. } => "DP-3003",
            Self::Runtime { .. } => "DP-3900",
        }
    }

    /// Whether retrying (on the next poll or render) might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::CommandFailed { .. }
                | Self::Http { .. }
                | Self::HttpStatus { .. }
                | Self::Payload { .. }
                | Self::Validation { .. }
                | Self::Midi { .. }
        )
    }

    /// Errors a single poll cycle may produce. The poll loop logs and skips these.
    #[must_use]
    pub const fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::CommandFailed { .. }
                | Self::Http { .. }
                | Self::HttpStatus { .. }
                | Self::Payload { .. }
                | Self::Validation { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Shorthand for a validation failure at a JSON path.
    #[must_use]
    pub fn validation(path: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            details: details.into(),
        }
    }
}

impl From<toml::de::Error> for DashpadError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
