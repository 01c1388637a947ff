//! End-to-end tests through the public store container
//!
//! Actions go in through the dispatcher; assertions only use the getters
//! and change listeners a screen would use.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cloudcache::{
    Action, DispatchError, Dispatcher, Filter, ListView, ResourceItem, ResourceKind, SessionMode,
    StoreOptions, Stores,
};

fn stores() -> Stores {
    Stores::new(Arc::new(Dispatcher::new()), StoreOptions::default()).unwrap()
}

fn records(range: std::ops::RangeInclusive<u32>) -> Vec<ResourceItem> {
    range.map(|i| ResourceItem::new(i.to_string())).collect()
}

#[test]
fn test_paging_scenario() {
    let stores = stores();
    let dispatcher = stores.dispatcher();
    let store = stores.resource(ResourceKind::Instance);

    assert!(store.is_empty());
    assert_eq!(store.count(), 0);
    assert_eq!(store.filter(), None);

    dispatcher
        .dispatch(Action::Filter {
            kind: ResourceKind::Instance,
            filter: Some(Filter::new()),
        })
        .unwrap();
    assert_eq!(store.filter(), Some(Filter::new()));
    assert_eq!(store.page(), 0);

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Instance,
            items: records(1..=20),
            count: 45,
        })
        .unwrap();
    assert_eq!(store.len(), 20);
    assert_eq!(store.pages(), 3);

    dispatcher
        .dispatch(Action::Traverse {
            kind: ResourceKind::Instance,
            page: 2,
        })
        .unwrap();
    assert_eq!(store.page(), 2);

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Instance,
            items: records(41..=45),
            count: 45,
        })
        .unwrap();
    assert_eq!(store.len(), 5);
    assert_eq!(store.page(), 2);
    assert_eq!(store.ids().first().map(String::as_str), Some("41"));
}

#[test]
fn test_filter_reset_rules() {
    let stores = stores();
    let dispatcher = stores.dispatcher();
    let store = stores.resource(ResourceKind::Vpc);
    let name = |value: &str| -> Filter { serde_json::from_value(json!({ "name": value })).unwrap() };
    let set_filter = |filter: Option<Filter>| {
        dispatcher
            .dispatch(Action::Filter {
                kind: ResourceKind::Vpc,
                filter,
            })
            .unwrap()
    };
    let go_to = |page: u64| {
        dispatcher
            .dispatch(Action::Traverse {
                kind: ResourceKind::Vpc,
                page,
            })
            .unwrap()
    };

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Vpc,
            items: vec![],
            count: 100,
        })
        .unwrap();

    set_filter(Some(name("x")));
    go_to(3);
    set_filter(Some(name("x")));
    assert_eq!(store.page(), 3);

    set_filter(Some(name("y")));
    assert_eq!(store.page(), 0);

    go_to(2);
    set_filter(None);
    assert_eq!(store.page(), 0);
}

#[test]
fn test_reset_clears_everything() {
    let stores = Stores::new(
        Arc::new(Dispatcher::new()),
        StoreOptions {
            page_count: 10,
            session: SessionMode::User,
        },
    )
    .unwrap();
    let dispatcher = stores.dispatcher();

    for kind in [ResourceKind::Node, ResourceKind::Pod] {
        dispatcher
            .dispatch(Action::Sync {
                kind,
                items: records(1..=3),
                count: 3,
            })
            .unwrap();
    }
    dispatcher
        .dispatch(Action::Reset {
            organization: Some("org9".to_string()),
        })
        .unwrap();

    for store in stores.resources() {
        assert!(store.is_empty());
        assert_eq!(store.count(), 0);
        assert_eq!(store.page_count(), 10);
    }
    assert_eq!(
        stores.completion().user_organization().as_deref(),
        Some("org9")
    );
}

#[test]
fn test_one_notification_per_dispatch() {
    let stores = stores();
    let dispatcher = stores.dispatcher().clone();
    let calls = Arc::new(AtomicUsize::new(0));

    for store in stores.resources().take(3) {
        let calls = calls.clone();
        store.add_change_listener(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }
    let completion_calls = Arc::new(AtomicUsize::new(0));
    let counter = completion_calls.clone();
    stores.completion().add_change_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher
        .dispatch(Action::Reset { organization: None })
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(completion_calls.load(Ordering::SeqCst), 1);

    dispatcher.dispatch(Action::Reload).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(completion_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_listener_sees_settled_state() {
    let stores = stores();
    let node = stores.resource(ResourceKind::Node).clone();
    let completion = stores.completion().clone();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let observed = seen.clone();
    let watched = completion.clone();
    node.add_change_listener(move || {
        observed.lock().push(watched.user_organization());
    });

    stores
        .dispatcher()
        .dispatch(Action::Reset {
            organization: Some("org1".to_string()),
        })
        .unwrap();

    assert_eq!(*seen.lock(), vec![Some("org1".to_string())]);
}

#[test]
fn test_listener_may_dispatch() {
    let stores = stores();
    let dispatcher = stores.dispatcher().clone();
    let zone = stores.resource(ResourceKind::Zone).clone();

    let inner = dispatcher.clone();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    zone.add_change_listener(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            inner
                .dispatch(Action::Traverse {
                    kind: ResourceKind::Zone,
                    page: 1,
                })
                .unwrap();
        }
    });

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Zone,
            items: records(1..=20),
            count: 40,
        })
        .unwrap();

    assert_eq!(zone.page(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dispatch_from_handler_is_rejected() {
    let dispatcher = Arc::new(Dispatcher::new());
    let inner = dispatcher.clone();
    let result = Arc::new(parking_lot::Mutex::new(None));
    let slot = result.clone();

    dispatcher
        .register(move |action| {
            if matches!(action, Action::Reload) {
                *slot.lock() = Some(inner.dispatch(Action::Reset { organization: None }));
            }
        })
        .unwrap();
    let stores = Stores::new(dispatcher.clone(), StoreOptions::default()).unwrap();

    dispatcher.dispatch(Action::Reload).unwrap();

    assert_eq!(
        result.lock().take(),
        Some(Err(DispatchError::Reentrant {
            action: "global.reset".to_string()
        }))
    );
    assert!(stores.resource(ResourceKind::Node).is_empty());
}

#[test]
fn test_list_view_follows_store() {
    let stores = stores();
    let dispatcher = stores.dispatcher();
    let view = ListView::mount(stores.resource(ResourceKind::Domain).clone());

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Domain,
            items: records(1..=5),
            count: 5,
        })
        .unwrap();

    view.click("2", false);
    view.click("4", true);
    view.toggle_open("3");
    assert_eq!(view.selected_ids(), vec!["2", "3", "4"]);

    dispatcher
        .dispatch(Action::Sync {
            kind: ResourceKind::Domain,
            items: records(3..=7),
            count: 5,
        })
        .unwrap();

    assert_eq!(view.selected_ids(), vec!["3", "4"]);
    assert!(view.is_open("3"));
}
