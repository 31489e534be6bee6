//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dashpad::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DashpadError, Result};

// Protocol
pub use crate::protocol::{Button, Color, DashboardState, Tab, TabBody, decode_payload};

// Surface
pub use crate::surface::recording::RecordingSurface;
pub use crate::surface::{ButtonEvent, GridPos, GridSurface, Layer, PixelStyle};

// Engine
pub use crate::engine::{Action, ActionTable, Dashboard, Frame, compose};

// Sources
pub use crate::source::{Source, SourceSpec, build_source};

// Daemon
pub use crate::daemon::opener::{LinkOpener, RecordingOpener, SystemOpener};
pub use crate::daemon::schedule::PollSchedule;
