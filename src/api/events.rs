//! Server change events
//!
//! The console pushes `{"type": "<kind>.change"}` events when a
//! collection is modified elsewhere. [`EventRouter`] maps each one to a
//! resync of the matching kind.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

use super::actions::{ResourceActions, SyncOutcome};
use super::http::ApiClient;
use crate::resource::ResourceKind;
use crate::store::{SessionMode, Stores};

const CHANGE_SUFFIX: &str = ".change";

/// Kind named by a `<kind>.change` event, if that is what `event` is
pub fn change_kind(event: &Value) -> Option<ResourceKind> {
    let event_type = event.get("type")?.as_str()?;
    let name = event_type.strip_suffix(CHANGE_SUFFIX)?;
    ResourceKind::parse(name).filter(|kind| kind.name() == name)
}

/// Routes change events to the action set of the kind they name
#[derive(Debug, Clone)]
pub struct EventRouter {
    actions: Vec<ResourceActions>,
    session: SessionMode,
}

impl EventRouter {
    pub fn new(actions: Vec<ResourceActions>, session: SessionMode) -> Self {
        Self { actions, session }
    }

    /// Router over every store in the container, using its session mode
    pub fn for_stores(client: &Arc<ApiClient>, stores: &Stores) -> Self {
        Self::new(
            ResourceActions::for_stores(client, stores),
            stores.completion().session(),
        )
    }

    pub fn actions(&self, kind: ResourceKind) -> Option<&ResourceActions> {
        self.actions.iter().find(|actions| actions.kind() == kind)
    }

    /// Resync the kind a change event names.
    ///
    /// Returns `Ok(None)` for other events, for kinds without an action
    /// set, and for admin-only kinds in a user session.
    pub async fn handle(&self, event: &Value) -> Result<Option<SyncOutcome>> {
        let Some(kind) = change_kind(event) else {
            tracing::trace!("Ignoring event {}", event);
            return Ok(None);
        };
        if self.session == SessionMode::User && kind.admin_only() {
            tracing::debug!("Ignoring {}.change in a user session", kind);
            return Ok(None);
        }
        let Some(actions) = self.actions(kind) else {
            tracing::debug!("No action set for {}", kind);
            return Ok(None);
        };

        tracing::debug!("{}.change, resyncing", kind);
        actions.sync().await.map(Some)
    }
}
