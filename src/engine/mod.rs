//! Dashboard engine: layout, action binding, and button dispatch.

pub mod action;
pub mod dashboard;
pub mod layout;

pub use action::{Action, ActionTable};
pub use dashboard::{Dashboard, PRESSED_STYLE};
pub use layout::{Frame, compose, pixel_style};
