//! Long-poll update acquisition loop.
//!
//! The [`Poller`] pulls batches of updates from an [`UpdateSource`] using a
//! cursor, hands each update to the router in ascending sequence order, and
//! advances the cursor only once the whole batch has been handed over. One
//! cycle moves through:
//!
//! ```text
//! Idle ──▶ Fetching ──▶ Dispatching ──▶ Acknowledging ──▶ Idle
//!   │          │
//!   └──────────┴────── cancellation ──▶ Stopped
//! ```
//!
//! Delivery contract: every fetched update is handed to the router exactly
//! once per fetch (at-least-once overall, since the source replays anything
//! past the cursor after a restart). A handler error does not hold the
//! cursor back; liveness wins over redelivery of a poisoned update.
//!
//! Transient fetch failures back off exponentially and never terminate the
//! loop. A fatal authorization failure or cancellation does.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use courier_core::source::{BoxedApi, BoxedSource};
use courier_core::{Cx, GetUpdates, Router, SourceResult, Update, UpdateKind};

// ============================================================================
// Configuration
// ============================================================================

/// Exponential backoff settings for transient fetch failures.
///
/// Unlike a bounded retry budget, the poller retries indefinitely; the
/// delay just stops growing at `max_delay`. It resets after any
/// successful fetch.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the delay.
    pub max_delay: Duration,
    /// Factor applied after each consecutive failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Returns the delay following `current`.
    fn next(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_delay)
    }
}

/// Poller configuration.
///
/// Constructed once before the loop starts and immutable thereafter.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum updates per fetch. Defaults to 100.
    pub limit: u32,

    /// How long the platform may hold a fetch open waiting for updates.
    /// Defaults to 25 seconds.
    pub poll_timeout: Duration,

    /// Allow-list of update kinds to fetch. An empty list leaves the
    /// choice to the platform's default and fetches everything it sends.
    pub allowed: Vec<UpdateKind>,

    /// Discard updates queued before the loop starts, instead of
    /// dispatching the backlog. Defaults to off.
    pub drop_pending: bool,

    /// Backoff applied to transient fetch failures.
    pub backoff: BackoffConfig,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            poll_timeout: Duration::from_secs(25),
            allowed: Vec::new(),
            drop_pending: false,
            backoff: BackoffConfig::default(),
        }
    }
}

// ============================================================================
// Poller
// ============================================================================

/// The long-poll acquisition loop.
///
/// One poller runs per process. Dispatch within and across batches is
/// strictly sequential, which keeps updates ordered and the cursor
/// bookkeeping single-owner.
pub struct Poller {
    source: BoxedSource,
    api: BoxedApi,
    router: Arc<Router>,
    config: PollerConfig,
}

impl Poller {
    /// Creates a poller with the default configuration.
    pub fn new(source: BoxedSource, api: BoxedApi, router: Arc<Router>) -> Self {
        Self {
            source,
            api,
            router,
            config: PollerConfig::default(),
        }
    }

    /// Replaces the configuration (builder form).
    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the loop until cancellation or a fatal source failure.
    ///
    /// Cancellation is observed before every fetch and before every backoff
    /// sleep; an in-flight batch finishes dispatching before the loop
    /// exits, so handlers are drained rather than aborted.
    pub async fn run(&self, cancel: CancellationToken) -> SourceResult<()> {
        let mut cursor: i64 = 0;

        if self.config.drop_pending {
            cursor = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                probed = self.discard_pending() => probed?,
            };
            info!(cursor, "discarded pending updates");
        }

        info!(
            limit = self.config.limit,
            poll_timeout = ?self.config.poll_timeout,
            allowed = self.config.allowed.len(),
            "poller started"
        );

        let mut delay = self.config.backoff.initial_delay;

        loop {
            let request = GetUpdates {
                offset: cursor,
                limit: self.config.limit,
                timeout: self.config.poll_timeout,
                allowed: self.config.allowed.clone(),
            };

            trace!(offset = cursor, "fetching updates");
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("poller stopping");
                    return Ok(());
                }
                fetched = self.source.get_updates(request) => fetched,
            };

            match fetched {
                Ok(batch) => {
                    delay = self.config.backoff.initial_delay;
                    if batch.is_empty() {
                        continue;
                    }
                    debug!(count = batch.len(), "fetched update batch");
                    cursor = self.dispatch_batch(batch, cursor, &cancel).await;
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "fatal source failure, poller stopping");
                    return Err(err);
                }
                Err(err) => {
                    warn!(error = %err, retry_in = ?delay, "update fetch failed, backing off");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!("poller stopping");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = self.config.backoff.next(delay);
                }
            }
        }
    }

    /// Hands one batch to the router in ascending sequence order and
    /// returns the advanced cursor.
    ///
    /// The cursor moves past the whole batch even when individual updates
    /// fail to dispatch; failures are logged, never replayed by this loop.
    /// Anything below the current cursor was already delivered in a
    /// previous cycle and is skipped.
    async fn dispatch_batch(
        &self,
        mut batch: Vec<Update>,
        cursor: i64,
        cancel: &CancellationToken,
    ) -> i64 {
        batch.sort_by_key(|update| update.id);

        let mut next = cursor;
        for update in batch {
            if update.id < cursor {
                trace!(update_id = update.id, "skipping already delivered update");
                continue;
            }
            next = next.max(update.id + 1);

            let update_id = update.id;
            let cx = Arc::new(Cx::new(update, Arc::clone(&self.api), cancel.child_token()));
            debug!(update_id, "dispatching update");
            if let Err(err) = self.router.dispatch(cx).await {
                error!(update_id, error = %err, "update dispatch failed");
            }
        }
        next
    }

    /// Fetches only the newest pending update and returns the cursor just
    /// past it, discarding the backlog without dispatching anything.
    async fn discard_pending(&self) -> SourceResult<i64> {
        let batch = self
            .source
            .get_updates(GetUpdates {
                offset: -1,
                limit: 1,
                timeout: Duration::ZERO,
                allowed: Vec::new(),
            })
            .await?;

        Ok(batch.iter().map(|update| update.id + 1).max().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::source::{Api, UpdateSource, WebhookSpec};
    use courier_core::{
        BoxError, Route, SourceError, UpdatePayload,
        update::{Chat, ChatType, Message},
    };
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct NullApi;

    #[async_trait]
    impl Api for NullApi {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, BoxError> {
            Ok(Value::Null)
        }
    }

    /// Source that replays a scripted sequence of fetch results, then
    /// cancels the loop once the script runs dry.
    struct ScriptedSource {
        script: Mutex<VecDeque<SourceResult<Vec<Update>>>>,
        requests: Mutex<Vec<GetUpdates>>,
        cancel: CancellationToken,
    }

    impl ScriptedSource {
        fn new(
            script: Vec<SourceResult<Vec<Update>>>,
            cancel: CancellationToken,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
                cancel,
            })
        }

        fn offsets(&self) -> Vec<i64> {
            self.requests.lock().unwrap().iter().map(|r| r.offset).collect()
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn get_updates(&self, req: GetUpdates) -> SourceResult<Vec<Update>> {
            self.requests.lock().unwrap().push(req);
            match self.script.lock().unwrap().pop_front() {
                Some(step) => step,
                None => {
                    self.cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }

        async fn set_webhook(&self, _spec: WebhookSpec) -> SourceResult<()> {
            Ok(())
        }

        async fn delete_webhook(&self, _drop_pending: bool) -> SourceResult<()> {
            Ok(())
        }
    }

    fn message(id: i64) -> Update {
        Update {
            id,
            payload: UpdatePayload::Message(Message {
                id,
                chat: Chat {
                    id: 1,
                    kind: ChatType::Private,
                    title: None,
                    username: None,
                },
                from: None,
                text: Some("hi".into()),
            }),
        }
    }

    /// Router that records every dispatched update id and fails on one.
    fn recording_router(
        handled: &Arc<Mutex<Vec<i64>>>,
        fail_on: Option<i64>,
    ) -> Arc<Router> {
        let handled = Arc::clone(handled);
        Arc::new(
            Router::builder()
                .route(Route::on(UpdateKind::Message).handler_fn(move |cx| {
                    let handled = Arc::clone(&handled);
                    async move {
                        let id = cx.update().id;
                        handled.lock().unwrap().push(id);
                        if fail_on == Some(id) {
                            return Err("boom".into());
                        }
                        Ok(())
                    }
                }))
                .build(),
        )
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn cursor_advances_past_handler_errors() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![message(10), message(11), message(12)])],
            cancel.clone(),
        );
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, Some(11));

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router);
        poller.run(cancel).await.unwrap();

        // Every update was handed over despite the failure on 11, and the
        // follow-up fetch acknowledged the whole batch.
        assert_eq!(*handled.lock().unwrap(), vec![10, 11, 12]);
        assert_eq!(source.offsets(), vec![0, 13]);
    }

    #[tokio::test]
    async fn replayed_updates_below_cursor_are_skipped() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![message(10)]),
                // The source replays 10 alongside the new 11.
                Ok(vec![message(10), message(11)]),
            ],
            cancel.clone(),
        );
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, None);

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router);
        poller.run(cancel).await.unwrap();

        assert_eq!(*handled.lock().unwrap(), vec![10, 11]);
        assert_eq!(source.offsets(), vec![0, 11, 12]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_and_recover() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Err(SourceError::transport("connection reset")),
                Err(SourceError::transport("connection reset")),
                Ok(vec![message(1)]),
            ],
            cancel.clone(),
        );
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, None);

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router)
            .with_config(PollerConfig {
                backoff: fast_backoff(),
                ..PollerConfig::default()
            });
        poller.run(cancel).await.unwrap();

        assert_eq!(*handled.lock().unwrap(), vec![1]);
        // Two failed fetches, the successful one, and the final empty fetch
        // that ends the script.
        assert_eq!(source.offsets(), vec![0, 0, 0, 2]);
    }

    #[tokio::test]
    async fn fatal_auth_failure_terminates_the_loop() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![Err(SourceError::unauthorized("bad token"))],
            cancel.clone(),
        );
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, None);

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router);
        let err = poller.run(cancel).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(handled.lock().unwrap().is_empty());
        assert_eq!(source.offsets(), vec![0]);
    }

    #[tokio::test]
    async fn drop_pending_skips_the_backlog() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![Ok(vec![message(42)])], cancel.clone());
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, None);

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router)
            .with_config(PollerConfig {
                drop_pending: true,
                ..PollerConfig::default()
            });
        poller.run(cancel).await.unwrap();

        // The probe consumed the backlog marker; nothing was dispatched and
        // polling resumed just past it.
        assert!(handled.lock().unwrap().is_empty());
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].offset, -1);
        assert_eq!(requests[0].limit, 1);
        assert_eq!(requests[1].offset, 43);
    }

    #[tokio::test]
    async fn batches_are_dispatched_in_ascending_order() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![message(7), message(5), message(6)])],
            cancel.clone(),
        );
        let handled = Arc::new(Mutex::new(Vec::new()));
        let router = recording_router(&handled, None);

        let poller = Poller::new(source.clone(), Arc::new(NullApi), router);
        poller.run(cancel).await.unwrap();

        assert_eq!(*handled.lock().unwrap(), vec![5, 6, 7]);
        assert_eq!(source.offsets(), vec![0, 8]);
    }
}
