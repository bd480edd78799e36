//! Multi-select over the current page

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Tri-state of a "select all" checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    None,
    Partial,
    All,
}

/// Ids chosen for a bulk operation
///
/// Always a subset of the ids on the current page. Ids keep the order in
/// which they were selected, which is the order bulk operations use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    page_ids: Vec<String>,
    selected: IndexSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ids of the current page
    ///
    /// Selected ids missing from the new page are dropped; the rest stay
    /// selected in their original order. Returns whether any were dropped.
    pub fn replace_page<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let ids: Vec<String> = ids.into_iter().collect();
        if ids == self.page_ids {
            return false;
        }
        let before = self.selected.len();
        self.selected.retain(|id| ids.contains(id));
        self.page_ids = ids;
        self.selected.len() != before
    }

    pub fn page_ids(&self) -> &[String] {
        &self.page_ids
    }

    /// Flip membership of `id`; ids absent from the page are ignored
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.page_ids.iter().any(|page_id| page_id == id) {
            return false;
        }
        if !self.selected.shift_remove(id) {
            self.selected.insert(id.to_string());
        }
        true
    }

    /// Select the whole page unless it already is, in which case clear
    pub fn toggle_all(&mut self) {
        if self.is_all_selected() {
            self.selected.clear();
        } else {
            self.selected = self.page_ids.iter().cloned().collect();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Keep only the selected ids also listed in `ids`
    pub fn retain(&mut self, ids: &[String]) {
        self.selected.retain(|id| ids.contains(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids, in selection order
    pub fn ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_all_selected(&self) -> bool {
        !self.selected.is_empty() && self.selected.len() == self.page_ids.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.selected.is_empty() && self.selected.len() < self.page_ids.len()
    }

    pub fn state(&self) -> SelectionState {
        if self.is_all_selected() {
            SelectionState::All
        } else if self.is_partial() {
            SelectionState::Partial
        } else {
            SelectionState::None
        }
    }
}
