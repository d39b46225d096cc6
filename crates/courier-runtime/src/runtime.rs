//! Runtime orchestration: configuration, mode selection, shutdown.
//!
//! The [`CourierRuntime`] ties the pieces together: it loads configuration,
//! initializes logging, builds the update source, and runs the router
//! behind either acquisition mode. Webhook mode is selected by a non-empty
//! `webhook.url`; otherwise the runtime long-polls.
//!
//! Shutdown is externalized as a cancellation token created at process
//! start: [`run`](CourierRuntime::run) installs Ctrl-C / SIGTERM handlers
//! that cancel it, and every blocking point in the acquisition loops
//! observes it, so in-flight handlers drain before the process exits.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder()
//!     .router(router)
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use courier_core::Router;
use courier_core::source::{BoxedApi, BoxedSource};
use courier_transport::Poller;
#[cfg(feature = "webhook")]
use courier_transport::Webhook;

use crate::config::{ConfigLoader, CourierConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The main Courier runtime.
///
/// Owns the configuration, the router, and the platform collaborators for
/// the lifetime of the process.
pub struct CourierRuntime {
    config: CourierConfig,
    router: Arc<Router>,
    source: BoxedSource,
    api: BoxedApi,
}

impl CourierRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration, building the HTTP update
    /// source from `api.token` and `api.base_url`.
    #[cfg(feature = "http-source")]
    pub fn from_config(config: CourierConfig, router: Router) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        if config.api.token.is_empty() {
            return Err(RuntimeError::MissingToken);
        }

        let client = Arc::new(
            courier_transport::HttpUpdateSource::new(config.api.token.clone())
                .with_base_url(config.api.base_url.clone()),
        );

        Ok(Self {
            config,
            router: Arc::new(router),
            source: client.clone(),
            api: client,
        })
    }

    /// Creates a runtime with externally built collaborators.
    ///
    /// Useful for tests and for hosts that implement their own source.
    pub fn with_collaborators(
        config: CourierConfig,
        router: Router,
        source: BoxedSource,
        api: BoxedApi,
    ) -> Self {
        logging::init_from_config(&config.logging);
        Self {
            config,
            router: Arc::new(router),
            source,
            api,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Runs until a shutdown signal is received.
    pub async fn run(&self) -> RuntimeResult<()> {
        let cancel = CancellationToken::new();

        let watcher = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            watcher.cancel();
        });

        self.run_until_cancelled(cancel).await
    }

    /// Runs with an externally owned cancellation token.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) -> RuntimeResult<()> {
        if self.config.webhook.enabled() {
            self.run_webhook(cancel).await
        } else {
            self.run_poller(cancel).await
        }
    }

    async fn run_poller(&self, cancel: CancellationToken) -> RuntimeResult<()> {
        info!("starting in long-poll mode");
        let poller = Poller::new(
            Arc::clone(&self.source),
            Arc::clone(&self.api),
            Arc::clone(&self.router),
        )
        .with_config(self.config.poller.to_transport());

        poller.run(cancel).await?;
        Ok(())
    }

    #[cfg(feature = "webhook")]
    async fn run_webhook(&self, cancel: CancellationToken) -> RuntimeResult<()> {
        info!(listen = %self.config.webhook.listen, "starting in webhook mode");
        let webhook = Webhook::new(
            Arc::clone(&self.router),
            Arc::clone(&self.api),
            self.config.webhook.to_transport(),
        );

        webhook.register(self.source.as_ref()).await?;
        webhook.run(&self.config.webhook.listen, cancel).await?;
        Ok(())
    }

    #[cfg(not(feature = "webhook"))]
    async fn run_webhook(&self, _cancel: CancellationToken) -> RuntimeResult<()> {
        Err(RuntimeError::WebhookUnavailable)
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`CourierRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = CourierRuntime::builder()
///     .config_file("config/production.toml")
///     .router(router)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    router: Option<Router>,
    collaborators: Option<(BoxedSource, BoxedApi)>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            router: None,
            collaborators: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Disables layering environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Sets the router to dispatch through.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Injects externally built platform collaborators instead of the
    /// config-derived HTTP client.
    pub fn collaborators(mut self, source: BoxedSource, api: BoxedApi) -> Self {
        self.collaborators = Some((source, api));
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<CourierRuntime> {
        let config = self.loader.load()?;
        let router = self.router.unwrap_or_else(|| Router::builder().build());

        match self.collaborators {
            Some((source, api)) => Ok(CourierRuntime::with_collaborators(
                config, router, source, api,
            )),
            None => {
                #[cfg(feature = "http-source")]
                {
                    CourierRuntime::from_config(config, router)
                }
                #[cfg(not(feature = "http-source"))]
                {
                    let _ = (config, router);
                    Err(RuntimeError::SourceUnavailable)
                }
            }
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
