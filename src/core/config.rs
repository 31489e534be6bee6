//! Configuration system: TOML file + env var overrides + CLI flags + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashpadError, Result};

/// Longest accepted poll interval (one day).
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// Longest accepted HTTP timeout.
pub const MAX_HTTP_TIMEOUT_SECS: u64 = 60 * 60;

/// Full dashpad configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub poll: PollConfig,
    pub device: DeviceConfig,
    pub http: HttpConfig,
    pub opener: OpenerConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Where dashboard state comes from and how often it is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    /// Source argument: file path, `!command`, or `http(s)://` URL.
    pub source: Option<String>,
    /// Delay between the end of one poll and the start of the next.
    pub interval_secs: u64,
}

/// MIDI device selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DeviceConfig {
    /// Case-insensitive substring of the MIDI port name. `None` picks the first Launchpad.
    pub port_hint: Option<String>,
}

/// HTTP source tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

/// Link launcher override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OpenerConfig {
    /// Program invoked with the link as its only argument. `None` uses the platform default.
    pub command: Option<String>,
}

/// Activity log (JSONL) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            source: None,
            interval_secs: 60,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_path: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 30,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[DASHPAD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("dashpad").join("config.toml"),
            jsonl_log: home_dir
                .join(".local")
                .join("share")
                .join("dashpad")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DashpadError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(DashpadError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config for the activity log.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).map_err(|e| DashpadError::Runtime {
            details: format!("config serialization failed: {e}"),
        })?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Re-check invariants after CLI flags have been layered on top.
    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 || self.poll.interval_secs > MAX_INTERVAL_SECS {
            return Err(DashpadError::InvalidConfig {
                details: format!(
                    "poll.interval_secs must be in 1..={MAX_INTERVAL_SECS}, got {}",
                    self.poll.interval_secs
                ),
            });
        }
        if self.http.timeout_secs == 0 || self.http.timeout_secs > MAX_HTTP_TIMEOUT_SECS {
            return Err(DashpadError::InvalidConfig {
                details: format!(
                    "http.timeout_secs must be in 1..={MAX_HTTP_TIMEOUT_SECS}, got {}",
                    self.http.timeout_secs
                ),
            });
        }
        if self.logging.enabled {
            if self.logging.max_size_bytes < 1024 {
                return Err(DashpadError::InvalidConfig {
                    details: format!(
                        "logging.max_size_bytes must be >= 1024, got {}",
                        self.logging.max_size_bytes
                    ),
                });
            }
            if self.logging.max_rotated_files == 0 {
                return Err(DashpadError::InvalidConfig {
                    details: "logging.max_rotated_files must be > 0".to_string(),
                });
            }
        }
        if let Some(source) = &self.poll.source
            && source.trim().is_empty()
        {
            return Err(DashpadError::InvalidConfig {
                details: "poll.source must not be empty".to_string(),
            });
        }
        if let Some(command) = &self.opener.command
            && command.trim().is_empty()
        {
            return Err(DashpadError::InvalidConfig {
                details: "opener.command must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DASHPAD_SOURCE") {
            self.poll.source = Some(raw);
        }
        if let Some(raw) = lookup("DASHPAD_INTERVAL") {
            self.poll.interval_secs = parse_env_u64("DASHPAD_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("DASHPAD_MIDI_PORT") {
            self.device.port_hint = Some(raw);
        }
        if let Some(raw) = lookup("DASHPAD_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_env_u64("DASHPAD_HTTP_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DASHPAD_OPENER") {
            self.opener.command = Some(raw);
        }
        if let Some(raw) = lookup("DASHPAD_LOG_ENABLED") {
            self.logging.enabled = parse_env_bool("DASHPAD_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("DASHPAD_LOG_PATH") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| DashpadError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| DashpadError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
