//! cloudcache
//!
//! Client-side resource caches for a cloud control plane console. Actions
//! flow through a synchronous [`Dispatcher`] into per-kind
//! [`ResourceStore`]s and a [`CompletionStore`]; listeners are notified
//! once the dispatch has settled. The [`api`] module turns HTTP responses
//! into actions.

pub mod action;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod list_view;
pub mod resource;
pub mod selection;
pub mod store;

pub use action::Action;
pub use dispatcher::{DispatchError, DispatchToken, Dispatcher};
pub use list_view::ListView;
pub use resource::ResourceKind;
pub use selection::Selection;
pub use store::{
    CompletionStore, Filter, Item, ResourceItem, ResourceStore, SessionMode, StoreOptions, Stores,
};

/// Version injected at compile time via CLOUDCACHE_VERSION env var,
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDCACHE_VERSION") {
    Some(v) => v,
    None => "dev",
};
