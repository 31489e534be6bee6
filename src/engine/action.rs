//! Actions bound to grid cells.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::surface::GridPos;

/// What releasing a bound cell does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Switch the body to tab `index`.
    SelectTab { index: usize },
    /// Hand the link to the link opener.
    OpenLink { link: String },
}

/// Mapping from cell to action for the frame currently on the device.
///
/// Rebuilt wholesale on every render; never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionTable {
    bindings: BTreeMap<GridPos, Action>,
}

impl ActionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, pos: GridPos, action: Action) {
        self.bindings.insert(pos, action);
    }

    #[must_use]
    pub fn get(&self, pos: GridPos) -> Option<&Action> {
        self.bindings.get(&pos)
    }

    #[must_use]
    pub fn contains(&self, pos: GridPos) -> bool {
        self.bindings.contains_key(&pos)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, &Action)> {
        // BTreeMap orders GridPos by (x, y); callers expect rows first.
        let mut entries: Vec<(GridPos, &Action)> =
            self.bindings.iter().map(|(pos, a)| (*pos, a)).collect();
        entries.sort_by_key(|(pos, _)| pos.index());
        entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_replaces_and_iterates_row_major() {
        let mut table = ActionTable::new();
        let a = GridPos::new(1, 0).unwrap();
        let b = GridPos::new(0, 1).unwrap();
        table.bind(b, Action::OpenLink { link: "x".into() });
        table.bind(a, Action::SelectTab { index: 1 });
        table.bind(a, Action::SelectTab { index: 2 });

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), Some(&Action::SelectTab { index: 2 }));
        let order: Vec<GridPos> = table.iter().map(|(pos, _)| pos).collect();
        assert_eq!(order, vec![a, b]);

        table.clear();
        assert!(table.is_empty());
        assert!(!table.contains(a));
    }
}
