use crate::row::RowId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Row selection behavior of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Selection and activation disabled; all transitions are no-ops.
    None,
    #[default]
    Single,
    Multiple,
    /// Single activation plus multiple selection, simultaneously.
    Mixed,
}

/// What a selection/activation transition did. The orchestrator turns
/// these into lifecycle notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub selected: Vec<RowId>,
    pub deselected: Vec<RowId>,
    pub activated: Option<RowId>,
    pub deactivated: Option<RowId>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
            && self.deselected.is_empty()
            && self.activated.is_none()
            && self.deactivated.is_none()
    }
}

/// Identity-keyed selection + activation. Keys are stable [`RowId`]s, so
/// the marks survive re-sort, re-filter, and re-group untouched.
#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    mode: SelectionMode,
    selected: BTreeSet<RowId>,
    activated: Option<RowId>,
    /// Re-clicking a selected row keeps it selected instead of toggling.
    pub suppress_deselection: bool,
    /// Re-clicking the activated row keeps it activated.
    pub suppress_deactivation: bool,
}

impl SelectionState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Changing mode clears marks that the new mode cannot represent.
    pub fn set_mode(&mut self, mode: SelectionMode) -> SelectionChange {
        self.mode = mode;
        let mut change = SelectionChange::default();
        match mode {
            SelectionMode::None => {
                change.deselected = self.selected.iter().copied().collect();
                self.selected.clear();
                change.deactivated = self.activated.take();
            }
            SelectionMode::Single => {
                while self.selected.len() > 1 {
                    if let Some(first) = self.selected.iter().next().copied() {
                        self.selected.remove(&first);
                        change.deselected.push(first);
                    }
                }
                change.deactivated = self.activated.take();
            }
            SelectionMode::Multiple => {
                change.deactivated = self.activated.take();
            }
            SelectionMode::Mixed => {}
        }
        change
    }

    pub fn selected(&self) -> &BTreeSet<RowId> {
        &self.selected
    }

    pub fn is_selected(&self, id: RowId) -> bool {
        self.selected.contains(&id)
    }

    pub fn activated(&self) -> Option<RowId> {
        self.activated
    }

    /// Selects a row. In `Single` mode any previous selection is dropped
    /// first; re-selecting toggles unless suppression is on.
    pub fn select(&mut self, id: RowId) -> SelectionChange {
        let mut change = SelectionChange::default();
        if self.mode == SelectionMode::None {
            return change;
        }
        if self.selected.contains(&id) {
            if !self.suppress_deselection {
                self.selected.remove(&id);
                change.deselected.push(id);
            }
            return change;
        }
        if self.mode == SelectionMode::Single {
            for prev in std::mem::take(&mut self.selected) {
                change.deselected.push(prev);
            }
        }
        self.selected.insert(id);
        change.selected.push(id);
        change
    }

    pub fn deselect(&mut self, id: RowId) -> SelectionChange {
        let mut change = SelectionChange::default();
        if self.selected.remove(&id) {
            change.deselected.push(id);
        }
        change
    }

    /// Activates a row. Activation is an independent axis: it is only
    /// meaningful in `Mixed` mode (or when the host drives it alongside
    /// `Single`), and with selection disabled it is a stateless no-op.
    pub fn activate(&mut self, id: RowId) -> SelectionChange {
        let mut change = SelectionChange::default();
        if self.mode == SelectionMode::None {
            return change;
        }
        if self.activated == Some(id) {
            if !self.suppress_deactivation {
                self.activated = None;
                change.deactivated = Some(id);
            }
            return change;
        }
        change.deactivated = self.activated.replace(id);
        change.activated = Some(id);
        change
    }

    pub fn deactivate(&mut self, id: RowId) -> SelectionChange {
        let mut change = SelectionChange::default();
        if self.activated == Some(id) {
            self.activated = None;
            change.deactivated = Some(id);
        }
        change
    }

    /// Drops marks whose row no longer exists (after remove/reassign).
    pub fn retain(&mut self, mut alive: impl FnMut(RowId) -> bool) -> SelectionChange {
        let mut change = SelectionChange::default();
        let dead: Vec<RowId> = self
            .selected
            .iter()
            .copied()
            .filter(|&id| !alive(id))
            .collect();
        for id in dead {
            self.selected.remove(&id);
            change.deselected.push(id);
        }
        if let Some(id) = self.activated {
            if !alive(id) {
                self.activated = None;
                change.deactivated = Some(id);
            }
        }
        change
    }

    pub fn clear(&mut self) -> SelectionChange {
        let mut change = SelectionChange::default();
        change.deselected = std::mem::take(&mut self.selected).into_iter().collect();
        change.deactivated = self.activated.take();
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_swaps_selection() {
        let mut s = SelectionState::new(SelectionMode::Single);
        assert_eq!(s.select(RowId(1)).selected, vec![RowId(1)]);
        let change = s.select(RowId(2));
        assert_eq!(change.deselected, vec![RowId(1)]);
        assert_eq!(change.selected, vec![RowId(2)]);
        assert_eq!(s.selected().len(), 1);
    }

    #[test]
    fn multiple_mode_accumulates() {
        let mut s = SelectionState::new(SelectionMode::Multiple);
        s.select(RowId(1));
        s.select(RowId(2));
        s.select(RowId(3));
        assert_eq!(s.selected().len(), 3);
        s.deselect(RowId(2));
        assert!(!s.is_selected(RowId(2)));
    }

    #[test]
    fn reselect_toggles_unless_suppressed() {
        let mut s = SelectionState::new(SelectionMode::Single);
        s.select(RowId(1));
        let change = s.select(RowId(1));
        assert_eq!(change.deselected, vec![RowId(1)]);
        assert!(s.selected().is_empty());

        s.suppress_deselection = true;
        s.select(RowId(1));
        let change = s.select(RowId(1));
        assert!(change.is_empty());
        assert!(s.is_selected(RowId(1)));
    }

    #[test]
    fn activation_is_independent_of_selection_in_mixed() {
        let mut s = SelectionState::new(SelectionMode::Mixed);
        s.select(RowId(1));
        s.select(RowId(2));
        let change = s.activate(RowId(3));
        assert_eq!(change.activated, Some(RowId(3)));
        assert_eq!(s.selected().len(), 2);
        assert_eq!(s.activated(), Some(RowId(3)));

        let change = s.activate(RowId(4));
        assert_eq!(change.deactivated, Some(RowId(3)));
        assert_eq!(change.activated, Some(RowId(4)));
    }

    #[test]
    fn none_mode_is_a_stateless_noop() {
        let mut s = SelectionState::new(SelectionMode::None);
        assert!(s.select(RowId(1)).is_empty());
        assert!(s.activate(RowId(1)).is_empty());
        assert!(s.selected().is_empty());
        assert_eq!(s.activated(), None);
    }

    #[test]
    fn reactivate_toggles_unless_suppressed() {
        let mut s = SelectionState::new(SelectionMode::Mixed);
        s.activate(RowId(1));
        let change = s.activate(RowId(1));
        assert_eq!(change.deactivated, Some(RowId(1)));
        assert_eq!(s.activated(), None);

        s.suppress_deactivation = true;
        s.activate(RowId(1));
        assert!(s.activate(RowId(1)).is_empty());
        assert_eq!(s.activated(), Some(RowId(1)));
    }

    #[test]
    fn retain_drops_dead_rows() {
        let mut s = SelectionState::new(SelectionMode::Mixed);
        s.select(RowId(1));
        s.select(RowId(2));
        s.activate(RowId(2));
        let change = s.retain(|id| id != RowId(2));
        assert_eq!(change.deselected, vec![RowId(2)]);
        assert_eq!(change.deactivated, Some(RowId(2)));
        assert!(s.is_selected(RowId(1)));
    }

    #[test]
    fn narrowing_mode_trims_marks() {
        let mut s = SelectionState::new(SelectionMode::Multiple);
        s.select(RowId(1));
        s.select(RowId(2));
        let change = s.set_mode(SelectionMode::Single);
        assert_eq!(change.deselected.len(), 1);
        assert_eq!(s.selected().len(), 1);
    }
}
