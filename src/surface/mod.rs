//! Grid surface: the two-layer LED matrix the engine draws on, plus drivers.

pub mod canvas;
pub mod grid;
#[cfg(feature = "launchpad")]
pub mod launchpad;
pub mod recording;

pub use grid::{ButtonEvent, GRID_COLUMNS, GRID_ROWS, GridPos, GridSurface, Layer, PixelStyle};
