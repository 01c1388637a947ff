//! List View State
//!
//! Per-screen state layered over a [`ResourceStore`]: checked rows and
//! expanded rows. The view subscribes to its store while mounted and drops
//! rows that disappear from the loaded page whenever the store changes.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::emitter::ListenerId;
use crate::selection::Selection;
use crate::store::ResourceStore;

#[derive(Debug, Default)]
struct ViewState {
    selection: Selection,
    opened: HashSet<String>,
}

impl ViewState {
    fn reconcile(&mut self, ids: &[String]) {
        self.selection.reconcile(ids.iter().map(String::as_str));
        let loaded: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.opened.retain(|id| loaded.contains(id.as_str()));
    }
}

#[derive(Debug)]
pub struct ListView {
    store: Arc<ResourceStore>,
    state: Arc<Mutex<ViewState>>,
    listener: ListenerId,
}

impl ListView {
    /// Subscribe to `store`. The subscription ends when the view is dropped.
    pub fn mount(store: Arc<ResourceStore>) -> Self {
        let state = Arc::new(Mutex::new(ViewState::default()));

        let weak = Arc::downgrade(&store);
        let view_state = state.clone();
        let listener = store.add_change_listener(move || {
            if let Some(store) = weak.upgrade() {
                view_state.lock().reconcile(&store.ids());
            }
        });

        Self {
            store,
            state,
            listener,
        }
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    /// Row click; `shift` extends from the last clicked row
    pub fn click(&self, id: &str, shift: bool) {
        let ids = self.store.ids();
        self.state.lock().selection.click(&ids, id, shift);
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.lock().selection.is_selected(id)
    }

    pub fn toggle_open(&self, id: &str) {
        let mut state = self.state.lock();
        if !state.opened.remove(id) {
            state.opened.insert(id.to_string());
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.state.lock().opened.contains(id)
    }

    /// Page navigation: ranges do not continue across pages
    pub fn on_page(&self) {
        self.state.lock().selection.clear_last_selected();
    }

    pub fn select_all(&self) {
        let ids = self.store.ids();
        self.state.lock().selection.select_all(&ids);
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection.clear();
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    /// Checked ids in page order (for bulk actions)
    pub fn selected_ids(&self) -> Vec<String> {
        let ids = self.store.ids();
        self.state.lock().selection.selected_in_order(&ids)
    }

    pub fn selection_count(&self) -> usize {
        self.state.lock().selection.len()
    }
}

impl Drop for ListView {
    fn drop(&mut self) {
        self.store.remove_change_listener(self.listener);
    }
}
