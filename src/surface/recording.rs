//! In-memory surface that records every call. Used by tests and `dashpad check`.

#![allow(missing_docs)]

use crate::core::errors::{DashpadError, Result};
use crate::surface::grid::{GRID_CELLS, GridPos, GridSurface, Layer, PixelStyle};

/// One call made against the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    SetPixel {
        layer: Layer,
        pos: GridPos,
        style: PixelStyle,
    },
    ClearLayer(Layer),
    Flush(Layer),
}

/// Surface with no device behind it.
///
/// Staged writes become visible in [`RecordingSurface::shown`] on flush, the
/// same way a real controller only changes on flush.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    staged: [[PixelStyle; GRID_CELLS]; 2],
    shown: [[PixelStyle; GRID_CELLS]; 2],
    calls: Vec<SurfaceCall>,
    fail_flushes: bool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self {
            staged: [[PixelStyle::Off; GRID_CELLS]; 2],
            shown: [[PixelStyle::Off; GRID_CELLS]; 2],
            calls: Vec::new(),
            fail_flushes: false,
        }
    }

    /// Make every subsequent flush fail, as a disconnected device would.
    pub fn set_fail_flushes(&mut self, fail: bool) {
        self.fail_flushes = fail;
    }

    /// Last flushed style of `pos` on `layer`.
    #[must_use]
    pub fn shown(&self, layer: Layer, pos: GridPos) -> PixelStyle {
        self.shown[layer.index()][pos.index()]
    }

    /// Every lit cell of `layer` as last flushed, row-major.
    #[must_use]
    pub fn lit(&self, layer: Layer) -> Vec<(GridPos, PixelStyle)> {
        GridPos::all()
            .map(|pos| (pos, self.shown(layer, pos)))
            .filter(|(_, style)| !style.is_off())
            .collect()
    }

    #[must_use]
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Drain recorded calls, e.g. between two renders that are compared.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of flushes recorded for `layer`.
    #[must_use]
    pub fn flush_count(&self, layer: Layer) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == SurfaceCall::Flush(layer))
            .count()
    }
}

impl GridSurface for RecordingSurface {
    fn set_pixel(&mut self, layer: Layer, pos: GridPos, style: PixelStyle) {
        self.staged[layer.index()][pos.index()] = style;
        self.calls.push(SurfaceCall::SetPixel { layer, pos, style });
    }

    fn clear_layer(&mut self, layer: Layer) {
        self.staged[layer.index()] = [PixelStyle::Off; GRID_CELLS];
        self.calls.push(SurfaceCall::ClearLayer(layer));
    }

    fn flush(&mut self, layer: Layer) -> Result<()> {
        self.calls.push(SurfaceCall::Flush(layer));
        if self.fail_flushes {
            return Err(DashpadError::Midi {
                details: "recording surface configured to fail".to_string(),
            });
        }
        self.shown[layer.index()] = self.staged[layer.index()];
        Ok(())
    }
}
