//! Unified error types for the Courier core.
//!
//! Dispatch errors surface unchanged to the acquisition loop that owns the
//! dispatch call; source errors are classified as transient (retried with
//! backoff) or fatal (loop terminates).

use thiserror::Error;

/// Type-erased error payload produced by filters and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors surfaced by [`Router::dispatch`](crate::router::Router::dispatch).
///
/// Neither variant is retried by the core. The poller logs and advances past
/// the failed update; the webhook server converts it to a 5xx response so
/// the platform may redeliver.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A filter failed while evaluating its predicate. No handler ran and
    /// no further routes were tried for this update.
    #[error("filter evaluation failed: {source}")]
    Filter {
        #[source]
        source: BoxError,
    },

    /// The matched handler (or the fallback) returned an error.
    #[error("handler failed: {source}")]
    Handler {
        #[source]
        source: BoxError,
    },
}

impl DispatchError {
    pub(crate) fn filter(source: BoxError) -> Self {
        Self::Filter { source }
    }

    pub(crate) fn handler(source: BoxError) -> Self {
        Self::Handler { source }
    }
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors from the remote update source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A payload from the source could not be decoded.
    #[error("failed to decode source payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transient network or platform failure. Fetches are retried with
    /// backoff.
    #[error("transient source failure: {0}")]
    Transport(String),

    /// The platform rejected our credentials. Not retried.
    #[error("authorization rejected: {0}")]
    Unauthorized(String),
}

impl SourceError {
    /// Creates a transient transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a fatal authorization error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Returns `true` when the error should terminate the acquisition loop
    /// instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type returned by handlers.
pub type HandlerResult = Result<(), BoxError>;

/// Result type returned by filters: `Ok(false)` skips the route, an error
/// aborts dispatch for the update.
pub type FilterResult = Result<bool, BoxError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for update source operations.
pub type SourceResult<T> = Result<T, SourceError>;
