//! Collaborator traits for the remote platform.
//!
//! The core treats the platform as two opaque capabilities:
//!
//! - [`UpdateSource`] - where updates come from (long-poll fetch) and where
//!   push delivery is registered (webhook setup).
//! - [`Api`] - the client handle injected into handlers for follow-up
//!   calls. The core never inspects its internals and never calls it
//!   itself.
//!
//! Concrete implementations live in `courier-transport`; tests substitute
//! scripted mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BoxError, SourceResult};
use crate::update::{Update, UpdateKind};

/// Opaque capability for issuing calls against the platform API.
///
/// Handlers receive this through the dispatch context and use it for
/// follow-up actions (sending replies, answering queries). Method names and
/// parameter shapes are platform-defined and pass through unmodified.
#[async_trait]
pub trait Api: Send + Sync {
    /// Invokes a platform method with JSON parameters.
    async fn call(&self, method: &str, params: Value) -> Result<Value, BoxError>;
}

/// A cheaply clonable, type-erased client handle.
pub type BoxedApi = Arc<dyn Api>;

/// Parameters for one long-poll fetch.
#[derive(Debug, Clone, Default)]
pub struct GetUpdates {
    /// Sequence id of the first update to return. `-1` asks for only the
    /// most recent pending update (used to discard a backlog).
    pub offset: i64,

    /// Maximum batch size.
    pub limit: u32,

    /// How long the platform may hold the request open waiting for data.
    /// Zero means return immediately.
    pub timeout: Duration,

    /// Update kinds the operator cares about. An empty list leaves the
    /// choice to the platform's default.
    pub allowed: Vec<UpdateKind>,
}

/// Push-delivery registration details.
#[derive(Debug, Clone)]
pub struct WebhookSpec {
    /// Public HTTPS URL the platform should deliver updates to.
    pub url: String,

    /// Shared secret echoed back by the platform in a request header.
    pub secret_token: Option<String>,

    /// Ask the platform to discard updates queued before registration.
    pub drop_pending: bool,

    /// Update kinds to deliver; empty leaves the platform default.
    pub allowed: Vec<UpdateKind>,
}

/// The remote update source.
///
/// `get_updates` must return updates in ascending sequence order; the
/// poller relies on this when advancing its cursor.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetches a batch of pending updates, blocking server-side up to the
    /// request timeout when none are queued.
    async fn get_updates(&self, req: GetUpdates) -> SourceResult<Vec<Update>>;

    /// Registers a push-delivery endpoint with the platform.
    async fn set_webhook(&self, spec: WebhookSpec) -> SourceResult<()>;

    /// Removes a previously registered push-delivery endpoint.
    async fn delete_webhook(&self, drop_pending: bool) -> SourceResult<()>;
}

/// A cheaply clonable, type-erased update source.
pub type BoxedSource = Arc<dyn UpdateSource>;
