//! Resource Store
//!
//! One normalized, paginated, filterable page of a single resource kind.
//! State is replaced wholesale on every sync; records are shared as
//! immutable [`Item`]s so callers can never edit cached state in place.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::action::Action;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::emitter::{ChangeEmitter, ChangeQueue, ListenerId};
use crate::resource::ResourceKind;

use super::item::{Filter, Item, ResourceItem};

/// Page size used when none is configured
pub const DEFAULT_PAGE_COUNT: u64 = 20;

/// Filter field whose change sends the list back to the first page
pub const FILTER_RESET_FIELD: &str = "name";

#[derive(Debug)]
struct ResourceState {
    items: Arc<[Item]>,
    index: HashMap<String, usize>,
    page: Option<u64>,
    count: Option<u64>,
    filter: Option<Filter>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            index: HashMap::new(),
            page: None,
            count: None,
            filter: None,
        }
    }
}

#[derive(Debug)]
pub struct ResourceStore {
    kind: ResourceKind,
    page_count: u64,
    state: RwLock<ResourceState>,
    emitter: Arc<ChangeEmitter>,
    changes: Arc<ChangeQueue>,
}

impl ResourceStore {
    /// Create a store for `kind` and register it with the dispatcher
    pub fn register(
        kind: ResourceKind,
        dispatcher: &Dispatcher,
        page_count: u64,
    ) -> Result<Arc<Self>, DispatchError> {
        let store = Arc::new(Self {
            kind,
            page_count: page_count.max(1),
            state: RwLock::new(ResourceState::default()),
            emitter: Arc::new(ChangeEmitter::new()),
            changes: dispatcher.changes(),
        });

        let handler = store.clone();
        dispatcher.register(move |action| handler.handle(action))?;

        Ok(store)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Current page, read-only
    pub fn items(&self) -> Arc<[Item]> {
        self.state.read().items.clone()
    }

    /// Owned copies of the current page for local editing before a commit
    pub fn items_mutable(&self) -> Vec<ResourceItem> {
        self.state
            .read()
            .items
            .iter()
            .map(|item| (**item).clone())
            .collect()
    }

    pub fn by_id(&self, id: &str) -> Option<Item> {
        let state = self.state.read();
        state
            .index
            .get(id)
            .and_then(|&i| state.items.get(i))
            .cloned()
    }

    /// Ids of the current page, in page order
    pub fn ids(&self) -> Vec<String> {
        self.state
            .read()
            .items
            .iter()
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page(&self) -> u64 {
        self.state.read().page.unwrap_or(0)
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn count(&self) -> u64 {
        self.state.read().count.unwrap_or(0)
    }

    pub fn pages(&self) -> u64 {
        self.pages_of(&self.state.read())
    }

    pub fn filter(&self) -> Option<Filter> {
        self.state.read().filter.clone()
    }

    pub fn add_change_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        self.emitter.add_listener(listener)
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.emitter.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
    }

    fn pages_of(&self, state: &ResourceState) -> u64 {
        state.count.unwrap_or(0).div_ceil(self.page_count)
    }

    fn emit_change(&self) {
        self.changes.defer(&self.emitter);
    }

    fn handle(&self, action: &Action) {
        match action {
            Action::Reset { .. } => self.reset(),
            Action::Traverse { kind, page } if *kind == self.kind => self.traverse(*page),
            Action::Filter { kind, filter } if *kind == self.kind => {
                self.apply_filter(filter.clone())
            }
            Action::Sync { kind, items, count } if *kind == self.kind => {
                self.sync(items.clone(), *count)
            }
            _ => {}
        }
    }

    fn reset(&self) {
        *self.state.write() = ResourceState::default();
        self.emit_change();
    }

    fn traverse(&self, page: u64) {
        {
            let mut state = self.state.write();
            let pages = self.pages_of(&state);
            state.page = Some(page.min(pages));
        }
        self.emit_change();
    }

    fn apply_filter(&self, filter: Option<Filter>) {
        {
            let mut state = self.state.write();
            let reset = match (&state.filter, &filter) {
                (Some(_), None) | (None, Some(_)) => true,
                (Some(prev), Some(next)) => {
                    prev.get(FILTER_RESET_FIELD) != next.get(FILTER_RESET_FIELD)
                }
                (None, None) => false,
            };

            if reset {
                state.page = Some(0);
            }
            state.filter = filter;
        }
        self.emit_change();
    }

    fn sync(&self, items: Vec<ResourceItem>, count: u64) {
        let items: Arc<[Item]> = items.into_iter().map(Arc::new).collect();
        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();

        {
            let mut state = self.state.write();
            state.items = items;
            state.index = index;
            state.count = Some(count);
            let pages = self.pages_of(&state);
            state.page = Some(state.page.unwrap_or(0).min(pages));

            tracing::debug!(
                "{} sync: {} items, count {}, page {}/{}",
                self.kind,
                state.items.len(),
                count,
                state.page.unwrap_or(0),
                pages
            );
        }
        self.emit_change();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> (Dispatcher, Arc<ResourceStore>) {
        let dispatcher = Dispatcher::new();
        let store =
            ResourceStore::register(ResourceKind::Instance, &dispatcher, DEFAULT_PAGE_COUNT)
                .unwrap();
        (dispatcher, store)
    }

    fn records(ids: &[&str]) -> Vec<ResourceItem> {
        ids.iter().map(|id| ResourceItem::new(*id)).collect()
    }

    fn sync(dispatcher: &Dispatcher, ids: &[&str], count: u64) {
        dispatcher
            .dispatch(Action::Sync {
                kind: ResourceKind::Instance,
                items: records(ids),
                count,
            })
            .unwrap();
    }

    fn traverse(dispatcher: &Dispatcher, page: u64) {
        dispatcher
            .dispatch(Action::Traverse {
                kind: ResourceKind::Instance,
                page,
            })
            .unwrap();
    }

    fn filter(dispatcher: &Dispatcher, filter: Option<serde_json::Value>) {
        let filter = filter.map(|f| f.as_object().cloned().unwrap());
        dispatcher
            .dispatch(Action::Filter {
                kind: ResourceKind::Instance,
                filter,
            })
            .unwrap();
    }

    #[test]
    fn test_defaults() {
        let (_dispatcher, store) = store();
        assert!(store.is_empty());
        assert_eq!(store.page(), 0);
        assert_eq!(store.page_count(), 20);
        assert_eq!(store.count(), 0);
        assert_eq!(store.pages(), 0);
        assert_eq!(store.filter(), None);
        assert!(store.by_id("missing").is_none());
    }

    #[test]
    fn test_sync_replaces_items_and_index() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a", "b", "c"], 3);
        sync(&dispatcher, &["c", "d"], 2);

        assert_eq!(store.ids(), vec!["c", "d"]);
        assert!(store.by_id("a").is_none());
        assert_eq!(store.by_id("d").unwrap().id, "d");
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_by_id_returns_the_cached_record() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["x", "y", "z"], 3);

        let items = store.items();
        for item in items.iter() {
            assert!(Arc::ptr_eq(&store.by_id(&item.id).unwrap(), item));
        }
    }

    #[test]
    fn test_items_mutable_is_a_copy() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a"], 1);

        let mut copy = store.items_mutable();
        copy[0].fields.insert("name".to_string(), json!("edited"));

        assert_eq!(store.by_id("a").unwrap().name(), None);
    }

    #[test]
    fn test_pages_round_up() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a"], 45);
        assert_eq!(store.pages(), 3);
        sync(&dispatcher, &["a"], 40);
        assert_eq!(store.pages(), 2);
    }

    #[test]
    fn test_traverse_is_clamped_to_pages() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a"], 45);

        traverse(&dispatcher, 9);
        assert_eq!(store.page(), 3);

        traverse(&dispatcher, 1);
        assert_eq!(store.page(), 1);
    }

    #[test]
    fn test_sync_clamps_page_when_count_shrinks() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a"], 100);
        traverse(&dispatcher, 4);
        assert_eq!(store.page(), 4);

        sync(&dispatcher, &["a"], 30);
        assert_eq!(store.page(), 2);
        assert!(store.page() <= store.pages());
    }

    #[test]
    fn test_filter_reset_rules() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a"], 100);

        // null -> {} resets
        traverse(&dispatcher, 3);
        filter(&dispatcher, Some(json!({})));
        assert_eq!(store.page(), 0);
        assert_eq!(store.filter(), Some(Filter::new()));

        // same name keeps the page
        filter(&dispatcher, Some(json!({"name": "x"})));
        traverse(&dispatcher, 3);
        filter(&dispatcher, Some(json!({"name": "x"})));
        assert_eq!(store.page(), 3);

        // other fields do not reset
        filter(&dispatcher, Some(json!({"name": "x", "zone": "z1"})));
        assert_eq!(store.page(), 3);

        // changed name resets
        filter(&dispatcher, Some(json!({"name": "y"})));
        assert_eq!(store.page(), 0);

        // clearing resets
        traverse(&dispatcher, 2);
        filter(&dispatcher, None);
        assert_eq!(store.page(), 0);
        assert_eq!(store.filter(), None);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (dispatcher, store) = store();
        sync(&dispatcher, &["a", "b"], 45);
        traverse(&dispatcher, 2);
        filter(&dispatcher, Some(json!({"name": "a"})));

        dispatcher.dispatch(Action::Reset { organization: None }).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.page(), 0);
        assert_eq!(store.count(), 0);
        assert_eq!(store.filter(), None);
        assert!(store.by_id("a").is_none());
    }

    #[test]
    fn test_ignores_other_kinds() {
        let (dispatcher, store) = store();
        dispatcher
            .dispatch(Action::Sync {
                kind: ResourceKind::Node,
                items: records(&["n1"]),
                count: 1,
            })
            .unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_one_change_per_dispatch() {
        let (dispatcher, store) = store();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = store.add_change_listener(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        sync(&dispatcher, &["a"], 1);
        traverse(&dispatcher, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(store.remove_change_listener(id));
        sync(&dispatcher, &["b"], 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_configured_page_count() {
        let dispatcher = Dispatcher::new();
        let store = ResourceStore::register(ResourceKind::Disk, &dispatcher, 50).unwrap();
        dispatcher
            .dispatch(Action::Sync {
                kind: ResourceKind::Disk,
                items: records(&["d"]),
                count: 120,
            })
            .unwrap();

        assert_eq!(store.page_count(), 50);
        assert_eq!(store.pages(), 3);
    }
}
