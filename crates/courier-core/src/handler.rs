//! Handler types for the Courier router.
//!
//! A [`Handler`] is the terminal processing step bound to a route. Most
//! handlers are async closures adapted via [`handler_fn`]; anything with
//! state implements the trait directly.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Cx;
use crate::error::HandlerResult;

/// An update handler.
///
/// Handlers receive the shared dispatch context and report success or an
/// error that propagates unchanged to the acquisition loop. They may issue
/// follow-up platform calls through `cx.api()` and should observe
/// `cx.cancellation()` at blocking points.
pub trait Handler: Send + Sync {
    /// Processes one dispatched update.
    fn handle<'a>(&'a self, cx: Arc<Cx>) -> BoxFuture<'a, HandlerResult>;
}

/// A cheaply clonable, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Adapter implementing [`Handler`] for an async closure.
///
/// Created via [`handler_fn`].
pub struct HandlerFn<F>(F);

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<Cx>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle<'a>(&'a self, cx: Arc<Cx>) -> BoxFuture<'a, HandlerResult> {
        Box::pin((self.0)(cx))
    }
}

/// Creates a handler from an async closure.
///
/// # Example
///
/// ```rust,ignore
/// let echo = handler_fn(|cx: Arc<Cx>| async move {
///     if let Some(text) = cx.update().text() {
///         cx.api()
///             .call("sendMessage", serde_json::json!({"text": text}))
///             .await?;
///     }
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Arc<Cx>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn(f)
}

/// The built-in fallback handler: succeeds without side effects.
///
/// Installed when no custom fallback is registered, so an update matching
/// no route is acknowledged rather than treated as a failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl Handler for Noop {
    fn handle<'a>(&'a self, _cx: Arc<Cx>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(std::future::ready(Ok(())))
    }
}
