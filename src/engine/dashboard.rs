//! The dashboard engine: tab selection, rendering, and button dispatch.
//!
//! The engine is the only writer of the grid surface. Every state or
//! selection change recomputes the whole frame with [`compose`], replaces the
//! action table, clears layer 0, and flushes the new frame in one batch.

#![allow(missing_docs)]

use crate::core::errors::Result;
use crate::daemon::opener::LinkOpener;
use crate::engine::action::{Action, ActionTable};
use crate::engine::layout::{clamp_selection, compose};
use crate::protocol::{DashboardState, HIGHLIGHT_PALETTE};
use crate::surface::{ButtonEvent, GridPos, GridSurface, Layer, PixelStyle};

/// Style drawn on layer 1 under a held, bound button.
pub const PRESSED_STYLE: PixelStyle = PixelStyle::Palette {
    color: HIGHLIGHT_PALETTE,
};

/// Session state plus the surface and opener it drives.
pub struct Dashboard<S, O> {
    surface: S,
    opener: O,
    state: Option<DashboardState>,
    selected: Option<usize>,
    actions: ActionTable,
}

impl<S: GridSurface, O: LinkOpener> Dashboard<S, O> {
    /// Engine with no state yet. Nothing is drawn until the first
    /// [`Dashboard::set_state`].
    pub fn new(surface: S, opener: O) -> Self {
        Self {
            surface,
            opener,
            state: None,
            selected: None,
            actions: ActionTable::new(),
        }
    }

    /// Replace the dashboard wholesale and redraw, keeping the current tab
    /// index when it is still in range.
    pub fn set_state(&mut self, state: DashboardState) -> Result<()> {
        self.state = Some(state);
        self.select_tab(self.selected.unwrap_or(0))
    }

    /// Select tab `requested`, clamped to the last tab, and redraw.
    ///
    /// On an empty dashboard this clears the selection; the redraw still
    /// happens and leaves the grid blank.
    pub fn select_tab(&mut self, requested: usize) -> Result<()> {
        let tab_count = self.state.as_ref().map_or(0, |s| s.tabs.len());
        self.selected = clamp_selection(requested, tab_count);
        self.render()
    }

    /// Show press feedback if `pos` is bound. Never runs the action.
    pub fn handle_button_down(&mut self, pos: GridPos) -> Result<()> {
        if !self.actions.contains(pos) {
            return Ok(());
        }
        self.surface.set_pixel(Layer::Pressed, pos, PRESSED_STYLE);
        self.surface.flush(Layer::Pressed)
    }

    /// Drop press feedback at `pos` and run the action bound there in the
    /// current frame. Returns the action that ran, if any.
    pub fn handle_button_up(&mut self, pos: GridPos) -> Result<Option<Action>> {
        self.surface.set_pixel(Layer::Pressed, pos, PixelStyle::Off);
        // A failed highlight flush must not swallow the release.
        let cleared = self.surface.flush(Layer::Pressed);

        let Some(action) = self.actions.get(pos).cloned() else {
            return cleared.map(|()| None);
        };
        match &action {
            Action::SelectTab { index } => self.select_tab(*index)?,
            Action::OpenLink { link } => self.opener.open(link),
        }
        cleared.map(|()| Some(action))
    }

    /// Route a driver event to the matching handler.
    pub fn handle_event(&mut self, event: ButtonEvent) -> Result<Option<Action>> {
        match event {
            ButtonEvent::Down(pos) => self.handle_button_down(pos).map(|()| None),
            ButtonEvent::Up(pos) => self.handle_button_up(pos),
        }
    }

    /// Turn off both layers, e.g. before the process exits.
    pub fn blank(&mut self) -> Result<()> {
        self.actions.clear();
        self.surface.clear_layer(Layer::Pressed);
        self.surface.flush(Layer::Pressed)?;
        self.surface.clear_layer(Layer::Content);
        self.surface.flush(Layer::Content)
    }

    fn render(&mut self) -> Result<()> {
        let frame = compose(self.state.as_ref(), self.selected);
        self.actions = frame.actions;

        self.surface.clear_layer(Layer::Content);
        for (pos, style) in frame.pixels {
            self.surface.set_pixel(Layer::Content, pos, style);
        }
        self.surface.flush(Layer::Content)
    }

    // ──────────────────── accessors ────────────────────

    #[must_use]
    pub fn state(&self) -> Option<&DashboardState> {
        self.state.as_ref()
    }

    /// Selected tab index, or `None` when there are no tabs.
    #[must_use]
    pub fn selected_tab(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn opener(&self) -> &O {
        &self.opener
    }
}

// ──────────────────── tests ────────────────────
