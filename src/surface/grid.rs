//! Grid coordinates, pixel styles, and the two-layer surface contract.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Columns on the controller (x runs 0..8 left to right).
pub const GRID_COLUMNS: u8 = 8;
/// Rows on the controller (y runs 0..9 top to bottom; row 0 is the tab strip).
pub const GRID_ROWS: u8 = 9;
/// Total addressable cells.
pub const GRID_CELLS: usize = GRID_COLUMNS as usize * GRID_ROWS as usize;

/// A cell on the grid, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u8,
    pub y: u8,
}

impl GridPos {
    /// Build a position, rejecting coordinates outside the 8×9 grid.
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Option<Self> {
        if x < GRID_COLUMNS && y < GRID_ROWS {
            Some(Self { x, y })
        } else {
            None
        }
    }

    /// Row-major index into a `GRID_CELLS` array.
    #[must_use]
    pub const fn index(self) -> usize {
        self.y as usize * GRID_COLUMNS as usize + self.x as usize
    }

    /// Inverse of [`GridPos::index`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_index(index: usize) -> Self {
        Self {
            x: (index % GRID_COLUMNS as usize) as u8,
            y: (index / GRID_COLUMNS as usize) as u8,
        }
    }

    /// Every cell in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GRID_CELLS).map(Self::from_index)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Surface layers. The pressed layer is drawn over the content layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Layer 0: the rendered dashboard.
    Content,
    /// Layer 1: transient highlight under a held button.
    Pressed,
}

impl Layer {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Content => 0,
            Self::Pressed => 1,
        }
    }
}

/// Lighting primitive understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum PixelStyle {
    #[default]
    Off,
    Palette {
        color: u8,
    },
    Flash {
        color: u8,
    },
    Pulse {
        color: u8,
    },
    Rgb {
        r: u8,
        g: u8,
        b: u8,
    },
}

impl PixelStyle {
    #[must_use]
    pub const fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }
}

/// Input produced by the controller driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Down(GridPos),
    Up(GridPos),
}

/// Two-layer addressable LED matrix.
///
/// Writes are buffered until [`GridSurface::flush`] so a full redraw reaches
/// the device as one batch.
pub trait GridSurface {
    /// Stage `style` for `pos` on `layer`.
    fn set_pixel(&mut self, layer: Layer, pos: GridPos, style: PixelStyle);
    /// Stage every cell of `layer` as off.
    fn clear_layer(&mut self, layer: Layer);
    /// Push staged changes of `layer` to the device.
    fn flush(&mut self, layer: Layer) -> Result<()>;
}

impl<S: GridSurface + ?Sized> GridSurface for Box<S> {
    fn set_pixel(&mut self, layer: Layer, pos: GridPos, style: PixelStyle) {
        (**self).set_pixel(layer, pos, style);
    }

    fn clear_layer(&mut self, layer: Layer) {
        (**self).clear_layer(layer);
    }

    fn flush(&mut self, layer: Layer) -> Result<()> {
        (**self).flush(layer)
    }
}
