//! Per-dispatch context handed to filters and handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::source::BoxedApi;
use crate::update::Update;

/// The context for one update dispatch.
///
/// One `Cx` is created per incoming update, wrapped in an `Arc`, and shared
/// by the filters and the winning handler of that dispatch. Nothing retains
/// it past the dispatch call. It carries:
///
/// - the [`Update`] itself (immutable once constructed),
/// - the opaque client handle for follow-up platform calls,
/// - the cancellation token filters and handlers must observe at blocking
///   points so shutdown can drain promptly.
pub struct Cx {
    update: Arc<Update>,
    api: BoxedApi,
    cancel: CancellationToken,
}

impl Cx {
    /// Creates a new dispatch context.
    pub fn new(update: Update, api: BoxedApi, cancel: CancellationToken) -> Self {
        Self {
            update: Arc::new(update),
            api,
            cancel,
        }
    }

    /// Returns the update being dispatched.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns the client handle for issuing follow-up platform calls.
    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    /// Returns the cancellation token for this dispatch.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for Cx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cx")
            .field("update_id", &self.update.id)
            .field("kind", &self.update.kind())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
