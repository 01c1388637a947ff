//! Action Emitters
//!
//! Network side of the data flow: requests go out through [`ApiClient`],
//! responses come back as actions on the [`Dispatcher`](crate::Dispatcher).
//! A failed request never dispatches anything, so stores keep their last
//! good state.
//!
//! # Module Structure
//!
//! - [`http`] - HTTP client with console headers and error mapping
//! - [`guard`] - last-request-wins token for sync requests
//! - [`actions`] - per-kind and completion action sets
//! - [`events`] - resync on `<kind>.change` server events
//!
//! # Example
//!
//! ```ignore
//! use cloudcache::api::{ApiClient, ResourceActions};
//!
//! async fn example(stores: &cloudcache::Stores) -> anyhow::Result<()> {
//!     let client = std::sync::Arc::new(ApiClient::new("http://localhost:8443")?);
//!     let instances = ResourceActions::new(
//!         client,
//!         stores.resource(cloudcache::ResourceKind::Instance).clone(),
//!         stores.dispatcher().clone(),
//!     );
//!     instances.traverse(1).await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod events;
pub mod guard;
pub mod http;

pub use actions::{sync_all, CompletionActions, ResourceActions, SyncOutcome};
pub use events::{change_kind, EventRouter};
pub use guard::SyncGuard;
pub use http::{format_api_error, is_unauthorized, ApiClient, ApiError};
