//! Push-delivery (webhook) acquisition endpoint.
//!
//! The [`Webhook`] serves one HTTP POST route. Each request carries exactly
//! one JSON-encoded update, which is decoded at the boundary and dispatched
//! synchronously within the request's lifetime. The response status is the
//! delivery acknowledgement:
//!
//! | status | meaning                                        |
//! |--------|------------------------------------------------|
//! | 200    | delivered, platform may drop the update        |
//! | 400    | malformed body, router never invoked           |
//! | 401    | secret token mismatch, router never invoked    |
//! | 500    | filter or handler error, platform may redeliver |
//!
//! Requests are served concurrently over the shared read-only router; no
//! ordering is guaranteed across requests, because the platform itself may
//! deliver concurrently or out of order. Handlers therefore see
//! at-most-once delivery per attempt and at-least-once overall.

use std::sync::Arc;

use axum::Router as ServiceRouter;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use courier_core::source::{BoxedApi, UpdateSource, WebhookSpec};
use courier_core::{Cx, Router, SourceResult, Update, UpdateKind};

/// Request header carrying the shared secret echoed by the platform.
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Webhook configuration.
///
/// Constructed once before the server starts and immutable thereafter.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public HTTPS URL registered with the platform.
    pub url: String,

    /// Local path the server answers on. Defaults to `/`.
    pub path: String,

    /// Shared secret required in [`SECRET_TOKEN_HEADER`]. `None` disables
    /// the check.
    pub secret_token: Option<String>,

    /// Ask the platform to discard its queued backlog at registration.
    /// This is forwarded with [`Webhook::register`] and has no local
    /// effect on the endpoint itself.
    pub drop_pending: bool,

    /// Update kinds to deliver; empty leaves the platform default.
    pub allowed: Vec<UpdateKind>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            path: "/".to_string(),
            secret_token: None,
            drop_pending: false,
            allowed: Vec::new(),
        }
    }
}

/// Shared state for the webhook endpoint.
struct ServerState {
    router: Arc<Router>,
    api: BoxedApi,
    secret_token: Option<String>,
    cancel: CancellationToken,
}

/// The push-delivery acquisition endpoint.
pub struct Webhook {
    router: Arc<Router>,
    api: BoxedApi,
    config: WebhookConfig,
}

impl Webhook {
    /// Creates a webhook endpoint over the given router.
    pub fn new(router: Arc<Router>, api: BoxedApi, config: WebhookConfig) -> Self {
        Self {
            router,
            api,
            config,
        }
    }

    /// Registers the endpoint with the platform.
    ///
    /// Called once at startup, before serving.
    pub async fn register(&self, source: &dyn UpdateSource) -> SourceResult<()> {
        source
            .set_webhook(WebhookSpec {
                url: self.config.url.clone(),
                secret_token: self.config.secret_token.clone(),
                drop_pending: self.config.drop_pending,
                allowed: self.config.allowed.clone(),
            })
            .await
    }

    /// Builds the axum service answering the endpoint.
    ///
    /// Exposed separately so hosts can mount the route into a larger
    /// application; [`run`](Self::run) binds and serves it standalone.
    /// Per-request dispatch contexts carry child tokens of `cancel`.
    pub fn into_service(self, cancel: CancellationToken) -> ServiceRouter {
        let path = normalize_path(&self.config.path);
        let state = Arc::new(ServerState {
            router: self.router,
            api: self.api,
            secret_token: self.config.secret_token,
            cancel,
        });

        ServiceRouter::new()
            .route(&path, post(receive_update))
            .with_state(state)
    }

    /// Binds `addr` and serves until the token is cancelled.
    ///
    /// Shutdown is graceful: in-flight dispatches finish before the server
    /// exits.
    pub async fn run(self, addr: &str, cancel: CancellationToken) -> std::io::Result<()> {
        let path = normalize_path(&self.config.path);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;
        info!(addr = %actual_addr, path = %path, "webhook server listening");

        let service = self.into_service(cancel.clone());
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                info!("webhook server shutting down");
            })
            .await
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// HTTP POST handler: one request, one update, one dispatch.
async fn receive_update(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(expected) = &state.secret_token {
        let presented = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            warn!("webhook request rejected, secret token mismatch");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(err) => {
            warn!(error = %err, len = body.len(), "malformed update payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let update_id = update.id;
    trace!(update_id, kind = %update.kind(), "received pushed update");

    let cx = Arc::new(Cx::new(
        update,
        Arc::clone(&state.api),
        state.cancel.child_token(),
    ));

    match state.router.dispatch(cx).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            // An error status makes the platform redeliver the update later.
            error!(update_id, error = %err, "webhook dispatch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use courier_core::source::Api;
    use courier_core::{BoxError, Route};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct NullApi;

    #[async_trait]
    impl Api for NullApi {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, BoxError> {
            Ok(Value::Null)
        }
    }

    const VALID_UPDATE: &str = r#"{
        "update_id": 7,
        "message": {
            "message_id": 1,
            "chat": {"id": 5, "type": "private"},
            "text": "hello"
        }
    }"#;

    fn counting_router(dispatched: &Arc<AtomicUsize>) -> Arc<Router> {
        let dispatched = Arc::clone(dispatched);
        Arc::new(
            Router::builder()
                .route(Route::on(UpdateKind::Message).handler_fn(move |_cx| {
                    let dispatched = Arc::clone(&dispatched);
                    async move {
                        dispatched.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))
                .build(),
        )
    }

    fn service(router: Arc<Router>, secret: Option<&str>) -> ServiceRouter {
        Webhook::new(
            router,
            Arc::new(NullApi),
            WebhookConfig {
                path: "/updates".to_string(),
                secret_token: secret.map(String::from),
                ..WebhookConfig::default()
            },
        )
        .into_service(CancellationToken::new())
    }

    async fn post(
        service: ServiceRouter,
        body: &str,
        secret: Option<&str>,
    ) -> StatusCode {
        let mut request = Request::builder()
            .method("POST")
            .uri("/updates")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            request = request.header(SECRET_TOKEN_HEADER, secret);
        }
        let response = service
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn delivers_update_and_answers_200() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let status = post(service(counting_router(&dispatched), None), VALID_UPDATE, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_body_answers_400_without_dispatch() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let status = post(
            service(counting_router(&dispatched), None),
            r#"{"update_id": "not a number"}"#,
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_secret_answers_401_without_dispatch() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let status = post(
            service(counting_router(&dispatched), Some("hunter2")),
            VALID_UPDATE,
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_secret_answers_401() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let status = post(
            service(counting_router(&dispatched), Some("hunter2")),
            VALID_UPDATE,
            Some("hunter3"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matching_secret_is_accepted() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let status = post(
            service(counting_router(&dispatched), Some("hunter2")),
            VALID_UPDATE,
            Some("hunter2"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_error_answers_500() {
        let router = Arc::new(
            Router::builder()
                .route(
                    Route::on(UpdateKind::Message)
                        .handler_fn(|_cx| async { Err("storage offline".into()) }),
                )
                .build(),
        );

        let status = post(service(router, None), VALID_UPDATE, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
