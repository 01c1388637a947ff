//! Resource and completion action sets
//!
//! Each set wraps one store: it builds the request from the store's
//! current page and filter, and turns a successful response into a
//! dispatched action. Mutations (`commit`, `create`, `remove`) do not
//! touch the stores; callers refresh with `sync` afterwards.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;

use super::guard::SyncGuard;
use super::http::{is_unauthorized, ApiClient};
use crate::action::{Action, COMPLETION_SYNC};
use crate::dispatcher::Dispatcher;
use crate::resource::ResourceKind;
use crate::store::{CompletionStore, Filter, ResourceItem, ResourceStore, Stores};

const COMPLETION_PATH: &str = "/completion";

/// Outcome of a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Response dispatched to the stores
    Applied,
    /// A newer request was issued before this one returned
    Discarded,
}

/// Flatten a filter into query parameters. Null fields are left out.
fn filter_query(filter: Option<&Filter>) -> Vec<(String, String)> {
    let Some(filter) = filter else {
        return Vec::new();
    };

    filter
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Check a response against the guard. Unauthorized errors always surface;
/// anything else from a superseded request is dropped.
fn guard_response(
    guard: &SyncGuard,
    id: &uuid::Uuid,
    label: &str,
    response: Result<Value>,
) -> Result<Option<Value>> {
    match response {
        Err(e) if is_unauthorized(&e) => Err(e),
        _ if !guard.is_current(id) => {
            tracing::warn!("Discarding stale {} response", label);
            Ok(None)
        }
        response => response.map(Some),
    }
}

// =============================================================================
// Resource actions
// =============================================================================

#[derive(Debug, Clone)]
pub struct ResourceActions {
    client: Arc<ApiClient>,
    store: Arc<ResourceStore>,
    dispatcher: Arc<Dispatcher>,
    guard: Arc<SyncGuard>,
}

impl ResourceActions {
    pub fn new(
        client: Arc<ApiClient>,
        store: Arc<ResourceStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            client,
            store,
            dispatcher,
            guard: Arc::new(SyncGuard::new()),
        }
    }

    /// One action set per store in the container, in `ResourceKind::ALL` order
    pub fn for_stores(client: &Arc<ApiClient>, stores: &Stores) -> Vec<Self> {
        stores
            .resources()
            .map(|store| Self::new(client.clone(), store.clone(), stores.dispatcher().clone()))
            .collect()
    }

    pub fn kind(&self) -> ResourceKind {
        self.store.kind()
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    fn sync_query(&self) -> Vec<(String, String)> {
        let mut query = filter_query(self.store.filter().as_ref());
        query.push(("page".to_string(), self.store.page().to_string()));
        query.push(("page_count".to_string(), self.store.page_count().to_string()));
        query
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.kind().path(), urlencoding::encode(id))
    }

    /// Fetch the store's current page and dispatch it
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let kind = self.kind();
        let id = self.guard.begin();

        let response = self.client.get(&kind.path(), &self.sync_query()).await;
        let Some(body) = guard_response(&self.guard, &id, kind.name(), response)
            .with_context(|| format!("Failed to load {}", kind.collection()))?
        else {
            return Ok(SyncOutcome::Discarded);
        };

        let action = Action::from_wire(&json!({
            "type": format!("{}.sync", kind.name()),
            "data": body,
        }))?;
        self.dispatcher.dispatch(action)?;

        Ok(SyncOutcome::Applied)
    }

    /// Move to `page`, then refetch
    pub async fn traverse(&self, page: u64) -> Result<SyncOutcome> {
        self.dispatcher.dispatch(Action::Traverse {
            kind: self.kind(),
            page,
        })?;
        self.sync().await
    }

    /// Replace the filter, then refetch
    pub async fn filter(&self, filter: Option<Filter>) -> Result<SyncOutcome> {
        self.dispatcher.dispatch(Action::Filter {
            kind: self.kind(),
            filter,
        })?;
        self.sync().await
    }

    /// Save an edited record
    pub async fn commit(&self, item: &ResourceItem) -> Result<()> {
        self.client
            .put(&self.item_path(&item.id), &json!(item))
            .await
            .with_context(|| format!("Failed to save {}", self.kind()))?;
        Ok(())
    }

    pub async fn create(&self, item: &ResourceItem) -> Result<()> {
        self.client
            .post(&self.kind().path(), &json!(item))
            .await
            .with_context(|| format!("Failed to create {}", self.kind()))?;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.client
            .delete(&self.item_path(id), None)
            .await
            .with_context(|| format!("Failed to delete {}", self.kind()))?;
        Ok(())
    }

    /// Bulk delete, e.g. the list view's checked rows
    pub async fn remove_multi(&self, ids: &[String]) -> Result<()> {
        self.client
            .delete(&self.kind().path(), Some(&json!(ids)))
            .await
            .with_context(|| format!("Failed to delete {}", self.kind().collection()))?;
        Ok(())
    }
}

/// Refresh several kinds at once. Every request runs to completion; the
/// first error (in argument order) is returned.
pub async fn sync_all(actions: &[ResourceActions]) -> Result<()> {
    let results = join_all(actions.iter().map(|actions| actions.sync())).await;
    for result in results {
        result?;
    }
    Ok(())
}

// =============================================================================
// Completion actions
// =============================================================================

#[derive(Debug, Clone)]
pub struct CompletionActions {
    client: Arc<ApiClient>,
    store: Arc<CompletionStore>,
    dispatcher: Arc<Dispatcher>,
    guard: Arc<SyncGuard>,
}

impl CompletionActions {
    pub fn new(
        client: Arc<ApiClient>,
        store: Arc<CompletionStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            client,
            store,
            dispatcher,
            guard: Arc::new(SyncGuard::new()),
        }
    }

    pub fn store(&self) -> &Arc<CompletionStore> {
        &self.store
    }

    /// Fetch the completion snapshot and dispatch it
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let id = self.guard.begin();
        let query = filter_query(self.store.filter().as_ref());

        let response = self.client.get(COMPLETION_PATH, &query).await;
        let Some(body) = guard_response(&self.guard, &id, "completion", response)
            .context("Failed to load completion")?
        else {
            return Ok(SyncOutcome::Discarded);
        };

        let action = Action::from_wire(&json!({
            "type": COMPLETION_SYNC,
            "data": { "completion": body },
        }))?;
        self.dispatcher.dispatch(action)?;

        Ok(SyncOutcome::Applied)
    }

    pub async fn filter(&self, filter: Option<Filter>) -> Result<SyncOutcome> {
        self.dispatcher.dispatch(Action::CompletionFilter { filter })?;
        self.sync().await
    }
}
