//! Normalized stores
//!
//! # Architecture
//!
//! - [`item`] - Records and filters shared by every store
//! - [`resource`] - [`ResourceStore`]: one paginated page of a single kind
//! - [`completion`] - [`CompletionStore`]: unpaginated snapshot of many kinds
//!
//! [`Stores`] builds one store per [`ResourceKind`] plus the completion
//! store, all registered on the same [`Dispatcher`]. Consumers get the
//! container (or individual `Arc`s out of it) passed in; nothing here is a
//! process-wide singleton.

mod completion;
mod item;
mod resource;

use std::sync::Arc;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::resource::ResourceKind;

pub use completion::{CompletionData, CompletionStore, SessionMode, SUBNETS};
pub use item::{Filter, Item, ResourceItem};
pub use resource::{ResourceStore, DEFAULT_PAGE_COUNT, FILTER_RESET_FIELD};

/// Construction options for [`Stores`]
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub page_count: u64,
    pub session: SessionMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            page_count: DEFAULT_PAGE_COUNT,
            session: SessionMode::Admin,
        }
    }
}

/// Application container holding every store
#[derive(Debug)]
pub struct Stores {
    dispatcher: Arc<Dispatcher>,
    resources: Vec<Arc<ResourceStore>>,
    completion: Arc<CompletionStore>,
}

impl Stores {
    /// Build and register every store. Fails when called from inside a
    /// dispatch handler.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        options: StoreOptions,
    ) -> Result<Self, DispatchError> {
        let resources = ResourceKind::ALL
            .iter()
            .map(|&kind| ResourceStore::register(kind, &dispatcher, options.page_count))
            .collect::<Result<Vec<_>, _>>()?;
        let completion = CompletionStore::register(&dispatcher, options.session)?;

        Ok(Self {
            dispatcher,
            resources,
            completion,
        })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn resource(&self, kind: ResourceKind) -> &Arc<ResourceStore> {
        &self.resources[kind.index()]
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<ResourceStore>> {
        self.resources.iter()
    }

    pub fn completion(&self) -> &Arc<CompletionStore> {
        &self.completion
    }
}
