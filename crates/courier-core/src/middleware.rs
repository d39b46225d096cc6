//! Middleware chain applied around route handlers.
//!
//! A [`Middleware`] wraps a handler with logic that runs before and/or
//! after it, without influencing which route is selected. The router owns
//! one [`Chain`] and wraps every route handler (and the fallback) with it
//! exactly once at build time.
//!
//! # Ordering
//!
//! Composition is governed by a [`MiddlewarePolicy`] chosen at router
//! construction:
//!
//! - [`MiddlewarePolicy::Strict`] (default): plain registration order. The
//!   first-registered middleware is the outermost wrapper, so its
//!   pre-logic runs first and its post-logic runs last.
//! - [`MiddlewarePolicy::GateFirst`]: a compatibility shim for setups that
//!   relied on gating middleware running before everything else no matter
//!   where it was registered. Middleware reporting [`Middleware::is_gate`]
//!   are hoisted to the outermost positions, keeping their relative order;
//!   the rest keep registration order. Nothing is hoisted by type alone;
//!   middleware opt in explicitly (see [`Gate`]).
//!
//! New code should register middleware in the order it wants them to run
//! and stay on `Strict`.

use std::sync::Arc;

use crate::handler::BoxedHandler;

/// A wrapper that runs logic around a handler.
pub trait Middleware: Send + Sync {
    /// Wraps `next`, returning the composed handler.
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;

    /// Whether this middleware is hoisted outermost under
    /// [`MiddlewarePolicy::GateFirst`]. Defaults to `false`.
    fn is_gate(&self) -> bool {
        false
    }
}

/// A cheaply clonable, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Adapter implementing [`Middleware`] for a closure over handlers.
pub struct MiddlewareFn<F>(F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (self.0)(next)
    }
}

/// Creates a middleware from a closure over handlers.
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync,
{
    MiddlewareFn(f)
}

/// Marks a middleware as a gate for [`MiddlewarePolicy::GateFirst`].
///
/// Under the `Strict` policy the marker has no effect.
pub struct Gate<M>(pub M);

impl<M: Middleware> Middleware for Gate<M> {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self.0.wrap(next)
    }

    fn is_gate(&self) -> bool {
        true
    }
}

/// Composition policy for a middleware [`Chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiddlewarePolicy {
    /// Registration order: first registered runs first on entry, last on
    /// exit.
    #[default]
    Strict,

    /// Compatibility shim: gate-marked middleware run first regardless of
    /// registration position. Never selected implicitly.
    GateFirst,
}

/// An ordered middleware stack.
#[derive(Default, Clone)]
pub struct Chain {
    stack: Vec<BoxedMiddleware>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware as the last one in the registration order.
    pub fn append<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.stack.push(Arc::new(middleware));
    }

    /// Appends a middleware (builder form).
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.append(middleware);
        self
    }

    /// Returns the number of registered middleware.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` when no middleware are registered.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Composes the chain around `handler` under the given policy.
    ///
    /// Wrapping folds from the innermost position outward, so the first
    /// middleware in the effective order ends up outermost.
    pub fn then(&self, handler: BoxedHandler, policy: MiddlewarePolicy) -> BoxedHandler {
        let ordered: Vec<&BoxedMiddleware> = match policy {
            MiddlewarePolicy::Strict => self.stack.iter().collect(),
            MiddlewarePolicy::GateFirst => {
                let (gates, rest): (Vec<_>, Vec<_>) =
                    self.stack.iter().partition(|m| m.is_gate());
                gates.into_iter().chain(rest).collect()
            }
        };

        let mut handler = handler;
        for middleware in ordered.into_iter().rev() {
            handler = middleware.wrap(handler);
        }
        handler
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("len", &self.stack.len()).finish()
    }
}
