//! Dashboard protocol types as emitted by state sources.

use serde::{Deserialize, Serialize};

/// Palette index used for the selected tab when a tab has no `selectedColor`,
/// and for the pressed-button highlight.
pub const HIGHLIGHT_PALETTE: u8 = 53;

/// Root value describing what the grid shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardState {
    /// Ordered tabs; position `i` is drawn at column `i` of the top row.
    pub tabs: Vec<Tab>,
}

/// One selectable view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// Top-row color while the tab is not selected.
    pub color: Color,
    /// Top-row color while the tab is selected.
    #[serde(
        rename = "selectedColor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_color: Option<Color>,
    /// Tab content, discriminated by `tabType`.
    #[serde(flatten)]
    pub body: TabBody,
}

impl Tab {
    /// Color of the header cell for the given selection state.
    #[must_use]
    pub fn header_color(&self, selected: bool) -> Color {
        if selected {
            self.selected_color.unwrap_or(Color::Solid {
                palette_color: HIGHLIGHT_PALETTE,
            })
        } else {
            self.color
        }
    }
}

/// Tab content variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tabType", rename_all = "lowercase")]
pub enum TabBody {
    /// Buttons laid out row-major under the tab strip.
    List {
        /// Buttons in display order.
        buttons: Vec<Button>,
    },
    /// A `tabType` this build does not know how to draw. Renders an empty body.
    #[serde(other)]
    Unsupported,
}

/// A single cell of a list tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Cell color.
    pub color: Color,
    /// URL opened when the cell is released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Button {
    /// The link this button activates. Empty strings count as no link.
    #[must_use]
    pub fn action_link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.is_empty())
    }
}

/// Lighting instruction for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Color {
    /// Steady palette color.
    Solid {
        #[serde(rename = "paletteColor")]
        palette_color: u8,
    },
    /// Palette color blinking against off.
    Flash {
        #[serde(rename = "paletteColor")]
        palette_color: u8,
    },
    /// Palette color breathing.
    Pulse {
        #[serde(rename = "paletteColor")]
        palette_color: u8,
    },
    /// Direct RGB, each channel 0..=127.
    Rgb { r: u8, g: u8, b: u8 },
}
