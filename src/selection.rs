//! List Selection
//!
//! Multi-select state for one list of rows: plain clicks toggle a row,
//! shift-clicks add the range between the last clicked row and the new
//! one. Ranges only ever span the rows currently loaded (one page).

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: HashSet<String>,
    last_selected: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Row most recently clicked; may point outside the loaded page
    pub fn last_selected(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    // =========================================================================
    // Clicks
    // =========================================================================

    /// Apply a click on row `id`. `order` is the loaded page's id order.
    pub fn click<S: AsRef<str>>(&mut self, order: &[S], id: &str, shift: bool) {
        if shift && self.extend_range(order, id) {
            return;
        }
        self.toggle(id);
    }

    /// Plain click: flip `id` and remember it, even when deselecting
    pub fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        self.last_selected = Some(id.to_string());
    }

    /// Add every row between the last clicked row and `id`, inclusive.
    /// Returns false, leaving the selection untouched, when either row is
    /// not on the page.
    fn extend_range<S: AsRef<str>>(&mut self, order: &[S], id: &str) -> bool {
        let Some(last) = self.last_selected.as_deref() else {
            return false;
        };

        let mut start = None;
        let mut end = None;
        for (i, row) in order.iter().enumerate() {
            let row = row.as_ref();
            if row == id {
                start = Some(i);
            }
            if row == last {
                end = Some(i);
            }
        }

        let (Some(mut start), Some(mut end)) = (start, end) else {
            return false;
        };
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        for row in &order[start..=end] {
            self.selected.insert(row.as_ref().to_string());
        }
        self.last_selected = Some(id.to_string());
        true
    }

    // =========================================================================
    // Bulk
    // =========================================================================

    pub fn select_all<S: AsRef<str>>(&mut self, order: &[S]) {
        self.selected = order.iter().map(|id| id.as_ref().to_string()).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.last_selected = None;
    }

    /// Forget the range anchor (page navigation). Selected rows stay.
    pub fn clear_last_selected(&mut self) {
        self.last_selected = None;
    }

    /// Drop selected ids that are no longer loaded. The range anchor is
    /// kept even if its row is gone.
    pub fn reconcile<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let loaded: HashSet<&str> = ids.into_iter().collect();
        self.selected.retain(|id| loaded.contains(id.as_str()));
    }

    /// Selected ids in `order`, for bulk actions
    pub fn selected_in_order<S: AsRef<str>>(&self, order: &[S]) -> Vec<String> {
        order
            .iter()
            .map(|id| id.as_ref())
            .filter(|id| self.selected.contains(*id))
            .map(str::to_string)
            .collect()
    }
}
