//! Activity logging: a background JSONL writer with graceful degradation.

pub mod activity;
pub mod jsonl;

pub use activity::{ActivityEvent, ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger};
