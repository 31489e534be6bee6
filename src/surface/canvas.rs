//! Two-layer pixel store with compositing and dirty tracking.
//!
//! The visible style of a cell is its pressed-layer style when that is not
//! off, otherwise its content-layer style. A flush of one layer only emits
//! cells touched on that layer since its last flush, and only when the
//! composited style differs from what the device was last sent.

#![allow(missing_docs)]

use crate::surface::grid::{GRID_CELLS, GridPos, Layer, PixelStyle};

#[derive(Debug, Clone)]
pub struct Canvas {
    layers: [[PixelStyle; GRID_CELLS]; 2],
    touched: [[bool; GRID_CELLS]; 2],
    sent: [Option<PixelStyle>; GRID_CELLS],
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Fresh canvas. Nothing is known about the device, so the first flush of
    /// each touched cell is always emitted.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layers: [[PixelStyle::Off; GRID_CELLS]; 2],
            touched: [[false; GRID_CELLS]; 2],
            sent: [None; GRID_CELLS],
        }
    }

    pub fn set(&mut self, layer: Layer, pos: GridPos, style: PixelStyle) {
        let i = pos.index();
        self.layers[layer.index()][i] = style;
        self.touched[layer.index()][i] = true;
    }

    pub fn clear(&mut self, layer: Layer) {
        self.layers[layer.index()] = [PixelStyle::Off; GRID_CELLS];
        self.touched[layer.index()] = [true; GRID_CELLS];
    }

    #[must_use]
    pub fn get(&self, layer: Layer, pos: GridPos) -> PixelStyle {
        self.layers[layer.index()][pos.index()]
    }

    /// What the device shows (or will show after the next flush) at `pos`.
    #[must_use]
    pub fn composite(&self, pos: GridPos) -> PixelStyle {
        let i = pos.index();
        let pressed = self.layers[Layer::Pressed.index()][i];
        if pressed.is_off() {
            self.layers[Layer::Content.index()][i]
        } else {
            pressed
        }
    }

    /// Collect the cells that must be sent to flush `layer`, in row-major order,
    /// and record them as sent.
    pub fn take_dirty(&mut self, layer: Layer) -> Vec<(GridPos, PixelStyle)> {
        let mut dirty = Vec::new();
        for i in 0..GRID_CELLS {
            if !std::mem::take(&mut self.touched[layer.index()][i]) {
                continue;
            }
            let pos = GridPos::from_index(i);
            let style = self.composite(pos);
            if self.sent[i] != Some(style) {
                self.sent[i] = Some(style);
                dirty.push((pos, style));
            }
        }
        dirty
    }

    /// Forget what was sent so the next flush re-emits every touched cell.
    pub fn invalidate(&mut self) {
        self.sent = [None; GRID_CELLS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: u8, y: u8) -> GridPos {
        GridPos::new(x, y).unwrap()
    }

    const RED: PixelStyle = PixelStyle::Palette { color: 5 };
    const HIGHLIGHT: PixelStyle = PixelStyle::Palette { color: 53 };

    #[test]
    fn first_flush_after_clear_emits_every_cell() {
        let mut canvas = Canvas::new();
        canvas.clear(Layer::Content);
        canvas.set(Layer::Content, pos(0, 0), RED);
        let dirty = canvas.take_dirty(Layer::Content);
        assert_eq!(dirty.len(), GRID_CELLS);
        assert_eq!(dirty[0], (pos(0, 0), RED));
    }

    #[test]
    fn unchanged_redraw_emits_nothing() {
        let mut canvas = Canvas::new();
        canvas.clear(Layer::Content);
        canvas.set(Layer::Content, pos(2, 3), RED);
        canvas.take_dirty(Layer::Content);

        canvas.clear(Layer::Content);
        canvas.set(Layer::Content, pos(2, 3), RED);
        assert!(canvas.take_dirty(Layer::Content).is_empty());
    }

    #[test]
    fn pressed_layer_overrides_then_reveals_content() {
        let mut canvas = Canvas::new();
        canvas.clear(Layer::Content);
        canvas.set(Layer::Content, pos(1, 1), RED);
        canvas.take_dirty(Layer::Content);

        canvas.set(Layer::Pressed, pos(1, 1), HIGHLIGHT);
        assert_eq!(
            canvas.take_dirty(Layer::Pressed),
            vec![(pos(1, 1), HIGHLIGHT)]
        );

        canvas.set(Layer::Pressed, pos(1, 1), PixelStyle::Off);
        assert_eq!(canvas.take_dirty(Layer::Pressed), vec![(pos(1, 1), RED)]);
    }

    #[test]
    fn content_change_under_held_button_stays_hidden() {
        let mut canvas = Canvas::new();
        canvas.set(Layer::Pressed, pos(0, 1), HIGHLIGHT);
        canvas.take_dirty(Layer::Pressed);

        canvas.set(Layer::Content, pos(0, 1), RED);
        assert!(canvas.take_dirty(Layer::Content).is_empty());
        assert_eq!(canvas.get(Layer::Content, pos(0, 1)), RED);
    }

    #[test]
    fn invalidate_forces_resend() {
        let mut canvas = Canvas::new();
        canvas.set(Layer::Content, pos(0, 0), RED);
        canvas.take_dirty(Layer::Content);
        canvas.invalidate();
        canvas.set(Layer::Content, pos(0, 0), RED);
        assert_eq!(canvas.take_dirty(Layer::Content).len(), 1);
    }
}
