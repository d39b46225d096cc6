//! Filter-guarded update router.
//!
//! The [`Router`] owns one ordered route list per update kind plus a
//! fallback handler. Dispatch walks the incoming update's kind bucket in
//! registration order and hands the update to the first route whose
//! filters all allow it; exactly one handler runs per update.
//!
//! ```rust,ignore
//! use courier_core::prelude::*;
//!
//! let router = Router::builder()
//!     .route(
//!         Route::on(UpdateKind::Message)
//!             .filter(chat_type([ChatType::Private]))
//!             .handler(private_handler),
//!     )
//!     .route(Route::on(UpdateKind::Message).handler(group_handler))
//!     .fallback(log_unmatched)
//!     .build();
//! ```
//!
//! Registration and dispatch do not interleave: [`RouterBuilder::build`]
//! freezes the route lists and pre-wraps every handler with the middleware
//! chain, so the built router is read-only and concurrent dispatch calls
//! share it without locking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Level, debug, span, trace};

use crate::context::Cx;
use crate::error::{DispatchError, DispatchResult};
use crate::filter::{BoxedFilter, Filter};
use crate::handler::{BoxedHandler, Handler, Noop, handler_fn};
use crate::middleware::{Chain, Middleware, MiddlewarePolicy};
use crate::update::UpdateKind;

// ============================================================================
// Route
// ============================================================================

/// A registered (kind, filters, handler) triple.
///
/// Filters combine with implicit AND. Routes are created through the
/// [`Route::on`] builder and mounted on a [`RouterBuilder`].
pub struct Route {
    kind: UpdateKind,
    filters: Vec<BoxedFilter>,
    handler: BoxedHandler,
    name: Option<String>,
}

impl Route {
    /// Starts building a route for the given update kind.
    pub fn on(kind: UpdateKind) -> RouteBuilder {
        RouteBuilder {
            kind,
            filters: Vec::new(),
            name: None,
        }
    }

    /// Returns the update kind this route is bound to.
    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Returns the name of this route, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Builder for a [`Route`]. Finished by [`RouteBuilder::handler`].
pub struct RouteBuilder {
    kind: UpdateKind,
    filters: Vec<BoxedFilter>,
    name: Option<String>,
}

impl RouteBuilder {
    /// Sets a name for this route (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a guarding filter. Multiple filters combine with AND.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Filter + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Adds a pre-built boxed filter.
    pub fn filter_boxed(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Finishes the route with its handler.
    pub fn handler<H>(self, handler: H) -> Route
    where
        H: Handler + 'static,
    {
        Route {
            kind: self.kind,
            filters: self.filters,
            handler: Arc::new(handler),
            name: self.name,
        }
    }

    /// Finishes the route with an async closure handler.
    pub fn handler_fn<F, Fut>(self, f: F) -> Route
    where
        F: Fn(Arc<Cx>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::error::HandlerResult> + Send + 'static,
    {
        self.handler(handler_fn(f))
    }
}

// ============================================================================
// Router
// ============================================================================

/// Builder for a [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    fallback: Option<BoxedHandler>,
    chain: Chain,
    policy: MiddlewarePolicy,
}

impl RouterBuilder {
    /// Selects the middleware composition policy.
    pub fn policy(mut self, policy: MiddlewarePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Appends a middleware as the last one in the registration order.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.chain.append(middleware);
        self
    }

    /// Mounts a route. Routes for the same kind are tried in the order
    /// they were mounted.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Sets the fallback handler invoked when no route matches.
    ///
    /// Without one, unmatched updates succeed with no side effect.
    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Freezes registration and builds the router.
    ///
    /// Every route handler and the fallback are wrapped with the middleware
    /// chain here, once, so dispatch never re-composes.
    pub fn build(self) -> Router {
        let mut routes: HashMap<UpdateKind, Vec<Route>> = HashMap::new();
        for mut route in self.routes {
            route.handler = self.chain.then(route.handler, self.policy);
            routes.entry(route.kind).or_default().push(route);
        }

        let fallback = self
            .chain
            .then(self.fallback.unwrap_or_else(|| Arc::new(Noop)), self.policy);

        Router { routes, fallback }
    }
}

/// The central update router.
///
/// Read-only after [`RouterBuilder::build`]; safe to share across
/// concurrent dispatch calls without locking. The router performs no I/O
/// itself; side effects belong to handlers.
pub struct Router {
    routes: HashMap<UpdateKind, Vec<Route>>,
    fallback: BoxedHandler,
}

impl Router {
    /// Creates a new router builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Returns the total number of mounted routes.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Dispatches one update to the first matching route.
    ///
    /// Walks the kind's routes in registration order. For each route the
    /// filters are evaluated left to right:
    ///
    /// - all allow: the route's handler runs and its result is returned;
    ///   no later route is tried
    /// - one returns `Ok(false)`: the route is skipped silently
    /// - one errors: dispatch aborts with [`DispatchError::Filter`] and no
    ///   handler runs
    ///
    /// When no route matches, the fallback handler runs.
    pub async fn dispatch(&self, cx: Arc<Cx>) -> DispatchResult<()> {
        let kind = cx.update().kind();
        let span = span!(Level::DEBUG, "dispatch", %kind, update_id = cx.update().id);
        let _enter = span.enter();

        if let Some(routes) = self.routes.get(&kind) {
            'routes: for route in routes {
                for filter in &route.filters {
                    match filter.allow(&cx).await {
                        Ok(true) => {}
                        Ok(false) => continue 'routes,
                        Err(source) => return Err(DispatchError::filter(source)),
                    }
                }

                trace!(
                    route = route.name.as_deref().unwrap_or("unnamed"),
                    "route matched"
                );
                return route
                    .handler
                    .handle(cx)
                    .await
                    .map_err(DispatchError::handler);
            }
        }

        debug!("no route matched, invoking fallback");
        self.fallback
            .handle(cx)
            .await
            .map_err(DispatchError::handler)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.route_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{chat_type, filter_fn};
    use crate::source::Api;
    use crate::update::{CallbackQuery, Chat, ChatType, Message, Update, UpdatePayload, User};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct NullApi;

    #[async_trait]
    impl Api for NullApi {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, crate::BoxError> {
            Ok(Value::Null)
        }
    }

    fn message_cx(chat_kind: ChatType, text: &str) -> Arc<Cx> {
        let update = Update {
            id: 1,
            payload: UpdatePayload::Message(Message {
                id: 1,
                chat: Chat {
                    id: 10,
                    kind: chat_kind,
                    title: None,
                    username: None,
                },
                from: None,
                text: Some(text.to_string()),
            }),
        };
        Arc::new(Cx::new(update, Arc::new(NullApi), CancellationToken::new()))
    }

    fn callback_cx() -> Arc<Cx> {
        let update = Update {
            id: 2,
            payload: UpdatePayload::CallbackQuery(CallbackQuery {
                id: "q".into(),
                from: User {
                    id: 1,
                    first_name: "Ada".into(),
                    username: None,
                },
                message: None,
                data: None,
            }),
        };
        Arc::new(Cx::new(update, Arc::new(NullApi), CancellationToken::new()))
    }

    fn counting_handler(counter: &Arc<AtomicUsize>) -> impl Handler + use<> {
        let counter = Arc::clone(counter);
        handler_fn(move |_cx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(filter_fn(|_| Ok(true)))
                    .handler(counting_handler(&first)),
            )
            .route(
                Route::on(UpdateKind::Message)
                    .filter(filter_fn(|_| Ok(true)))
                    .handler(counting_handler(&second)),
            )
            .build();

        router.dispatch(message_cx(ChatType::Private, "x")).await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chat_type_routes_select_by_category() {
        let private = Arc::new(AtomicUsize::new(0));
        let rest = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(chat_type([ChatType::Private]))
                    .handler(counting_handler(&private)),
            )
            .route(Route::on(UpdateKind::Message).handler(counting_handler(&rest)))
            .build();

        router.dispatch(message_cx(ChatType::Private, "x")).await.unwrap();
        assert_eq!(private.load(Ordering::SeqCst), 1);
        assert_eq!(rest.load(Ordering::SeqCst), 0);

        router.dispatch(message_cx(ChatType::Group, "x")).await.unwrap();
        assert_eq!(private.load(Ordering::SeqCst), 1);
        assert_eq!(rest.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filter_error_aborts_without_invoking_any_handler() {
        let invoked = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(filter_fn(|_| Err("predicate exploded".into())))
                    .handler(counting_handler(&invoked)),
            )
            .route(Route::on(UpdateKind::Message).handler(counting_handler(&invoked)))
            .build();

        let err = router
            .dispatch(message_cx(ChatType::Private, "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Filter { .. }));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_error_surfaces_unchanged() {
        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .handler_fn(|_cx| async { Err("handler exploded".into()) }),
            )
            .build();

        let err = router
            .dispatch(message_cx(ChatType::Private, "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Handler { .. }));
    }

    #[tokio::test]
    async fn unmatched_kind_falls_back_to_noop() {
        let router = Router::builder()
            .route(Route::on(UpdateKind::Message).handler_fn(|_cx| async { Ok(()) }))
            .build();

        // No callback_query route registered; the default fallback succeeds.
        router.dispatch(callback_cx()).await.unwrap();
    }

    #[tokio::test]
    async fn custom_fallback_receives_unmatched_updates() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(filter_fn(|_| Ok(false)))
                    .handler_fn(|_cx| async { Ok(()) }),
            )
            .fallback(counting_handler(&fallback_calls))
            .build();

        router.dispatch(message_cx(ChatType::Private, "x")).await.unwrap();
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejecting_filter_skips_to_next_route_silently() {
        let second = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(filter_fn(|_| Ok(false)))
                    .handler_fn(|_cx| async { Err("must not run".into()) }),
            )
            .route(Route::on(UpdateKind::Message).handler(counting_handler(&second)))
            .build();

        router.dispatch(message_cx(ChatType::Private, "x")).await.unwrap();
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn route_filters_combine_with_and() {
        let hits = Arc::new(AtomicUsize::new(0));

        let router = Router::builder()
            .route(
                Route::on(UpdateKind::Message)
                    .filter(chat_type([ChatType::Private]))
                    .filter(filter_fn(|cx| Ok(cx.update().text() == Some("yes"))))
                    .handler(counting_handler(&hits)),
            )
            .build();

        router.dispatch(message_cx(ChatType::Private, "no")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        router.dispatch(message_cx(ChatType::Private, "yes")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
