//! Pure layout: (state, selected tab) → pixel writes + action table.

use crate::engine::action::{Action, ActionTable};
use crate::protocol::{Button, Color, DashboardState, TabBody};
use crate::surface::{GRID_COLUMNS, GRID_ROWS, GridPos, PixelStyle};

/// Tabs beyond this many are neither drawn nor reachable.
pub const MAX_VISIBLE_TABS: usize = GRID_COLUMNS as usize;
/// First row of the tab body; row 0 is the tab strip.
pub const FIRST_BODY_ROW: u8 = 1;
/// Cells available to a list tab.
pub const MAX_LIST_BUTTONS: usize = GRID_COLUMNS as usize * (GRID_ROWS - FIRST_BODY_ROW) as usize;

/// One computed frame for the content layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Lit cells in drawing order. Cells not listed are off.
    pub pixels: Vec<(GridPos, PixelStyle)>,
    pub actions: ActionTable,
}

/// Map a protocol color to the surface's lighting primitive.
#[must_use]
pub const fn pixel_style(color: Color) -> PixelStyle {
    match color {
        Color::Solid { palette_color } => PixelStyle::Palette {
            color: palette_color,
        },
        Color::Flash { palette_color } => PixelStyle::Flash {
            color: palette_color,
        },
        Color::Pulse { palette_color } => PixelStyle::Pulse {
            color: palette_color,
        },
        Color::Rgb { r, g, b } => PixelStyle::Rgb { r, g, b },
    }
}

/// Clamp a requested tab index against the tab count.
///
/// Past the end snaps to the last tab; an empty dashboard has no selection.
#[must_use]
pub fn clamp_selection(requested: usize, tab_count: usize) -> Option<usize> {
    tab_count.checked_sub(1).map(|last| requested.min(last))
}

/// Compute the content frame for `state` with tab `selected` open.
#[must_use]
pub fn compose(state: Option<&DashboardState>, selected: Option<usize>) -> Frame {
    let mut frame = Frame::default();
    let Some(state) = state else {
        return frame;
    };

    for (i, tab) in state.tabs.iter().take(MAX_VISIBLE_TABS).enumerate() {
        let Some(pos) = tab_header_pos(i) else {
            break;
        };
        let color = tab.header_color(selected == Some(i));
        frame.pixels.push((pos, pixel_style(color)));
        frame.actions.bind(pos, Action::SelectTab { index: i });
    }

    let Some(tab) = selected.and_then(|i| state.tabs.get(i)) else {
        return frame;
    };

    match &tab.body {
        TabBody::List { buttons } => compose_list(buttons, &mut frame),
        TabBody::Unsupported => {}
    }
    frame
}

fn compose_list(buttons: &[Button], frame: &mut Frame) {
    for (button, pos) in buttons.iter().zip(body_cells()) {
        frame.pixels.push((pos, pixel_style(button.color)));
        if let Some(link) = button.action_link() {
            frame.actions.bind(
                pos,
                Action::OpenLink {
                    link: link.to_string(),
                },
            );
        }
    }
}

fn tab_header_pos(index: usize) -> Option<GridPos> {
    u8::try_from(index).ok().and_then(|x| GridPos::new(x, 0))
}

/// Body cells in row-major order starting at (0,1).
fn body_cells() -> impl Iterator<Item = GridPos> {
    (FIRST_BODY_ROW..GRID_ROWS)
        .flat_map(|y| (0..GRID_COLUMNS).filter_map(move |x| GridPos::new(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HIGHLIGHT_PALETTE, Tab};

    fn pos(x: u8, y: u8) -> GridPos {
        GridPos::new(x, y).unwrap()
    }

    fn solid(palette_color: u8) -> Color {
        Color::Solid { palette_color }
    }

    fn list_tab(color: u8, buttons: Vec<Button>) -> Tab {
        Tab {
            color: solid(color),
            selected_color: None,
            body: TabBody::List { buttons },
        }
    }

    fn button(color: u8, link: Option<&str>) -> Button {
        Button {
            color: solid(color),
            link: link.map(str::to_string),
        }
    }

    #[test]
    fn color_mapping_is_one_to_one() {
        assert_eq!(
            pixel_style(Color::Solid { palette_color: 1 }),
            PixelStyle::Palette { color: 1 }
        );
        assert_eq!(
            pixel_style(Color::Flash { palette_color: 2 }),
            PixelStyle::Flash { color: 2 }
        );
        assert_eq!(
            pixel_style(Color::Pulse { palette_color: 3 }),
            PixelStyle::Pulse { color: 3 }
        );
        assert_eq!(
            pixel_style(Color::Rgb { r: 4, g: 5, b: 6 }),
            PixelStyle::Rgb { r: 4, g: 5, b: 6 }
        );
    }

    #[test]
    fn clamp_selection_snaps_and_handles_empty() {
        assert_eq!(clamp_selection(0, 0), None);
        assert_eq!(clamp_selection(5, 0), None);
        assert_eq!(clamp_selection(0, 3), Some(0));
        assert_eq!(clamp_selection(3, 2), Some(1));
        assert_eq!(clamp_selection(usize::MAX, 8), Some(7));
    }

    #[test]
    fn no_state_is_blank() {
        let frame = compose(None, None);
        assert!(frame.pixels.is_empty());
        assert!(frame.actions.is_empty());
    }

    #[test]
    fn single_tab_scenario() {
        let state = DashboardState {
            tabs: vec![list_tab(5, vec![button(10, Some("http://x"))])],
        };
        let frame = compose(Some(&state), Some(0));
        assert_eq!(
            frame.pixels,
            vec![
                (
                    pos(0, 0),
                    PixelStyle::Palette {
                        color: HIGHLIGHT_PALETTE
                    }
                ),
                (pos(0, 1), PixelStyle::Palette { color: 10 }),
            ]
        );
        assert_eq!(frame.actions.len(), 2);
        assert_eq!(
            frame.actions.get(pos(0, 0)),
            Some(&Action::SelectTab { index: 0 })
        );
        assert_eq!(
            frame.actions.get(pos(0, 1)),
            Some(&Action::OpenLink {
                link: "http://x".to_string()
            })
        );
    }

    #[test]
    fn unselected_tabs_use_base_color() {
        let state = DashboardState {
            tabs: vec![list_tab(5, vec![]), list_tab(6, vec![])],
        };
        let frame = compose(Some(&state), Some(1));
        assert_eq!(frame.pixels[0], (pos(0, 0), PixelStyle::Palette { color: 5 }));
        assert_eq!(
            frame.pixels[1],
            (
                pos(1, 0),
                PixelStyle::Palette {
                    color: HIGHLIGHT_PALETTE
                }
            )
        );
    }

    #[test]
    fn list_wraps_after_eight_columns() {
        let buttons = (0..10).map(|i| button(i, None)).collect();
        let state = DashboardState {
            tabs: vec![list_tab(1, buttons)],
        };
        let frame = compose(Some(&state), Some(0));
        assert_eq!(frame.pixels[8], (pos(7, 1), PixelStyle::Palette { color: 7 }));
        assert_eq!(frame.pixels[9], (pos(0, 2), PixelStyle::Palette { color: 8 }));
        assert_eq!(frame.pixels[10], (pos(1, 2), PixelStyle::Palette { color: 9 }));
        // Only the tab header is bound; none of the buttons carry links.
        assert_eq!(frame.actions.len(), 1);
    }

    #[test]
    fn list_drops_buttons_past_sixty_four() {
        let buttons = (0..70).map(|i| button(i, Some("l"))).collect();
        let state = DashboardState {
            tabs: vec![list_tab(1, buttons)],
        };
        let frame = compose(Some(&state), Some(0));
        assert_eq!(frame.pixels.len(), 1 + MAX_LIST_BUTTONS);
        assert_eq!(
            frame.pixels.last(),
            Some(&(pos(7, 8), PixelStyle::Palette { color: 63 }))
        );
        assert_eq!(frame.actions.len(), 1 + MAX_LIST_BUTTONS);
    }

    #[test]
    fn tabs_past_eight_are_hidden() {
        let tabs = (0..10).map(|i| list_tab(i, vec![])).collect();
        let state = DashboardState { tabs };
        let frame = compose(Some(&state), Some(0));
        assert_eq!(frame.pixels.len(), MAX_VISIBLE_TABS);
        assert!(frame.pixels.iter().all(|(p, _)| p.y == 0));
        assert_eq!(frame.actions.len(), MAX_VISIBLE_TABS);
    }

    #[test]
    fn unsupported_tab_draws_only_strip() {
        let state = DashboardState {
            tabs: vec![Tab {
                color: solid(1),
                selected_color: None,
                body: TabBody::Unsupported,
            }],
        };
        let frame = compose(Some(&state), Some(0));
        assert_eq!(frame.pixels.len(), 1);
        assert_eq!(frame.actions.len(), 1);
    }

    #[test]
    fn empty_link_does_not_bind() {
        let state = DashboardState {
            tabs: vec![list_tab(1, vec![button(2, Some(""))])],
        };
        let frame = compose(Some(&state), Some(0));
        assert!(!frame.actions.contains(pos(0, 1)));
    }
}
