//! Runtime error types.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The layered configuration could not be loaded or extracted.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No API token was configured.
    #[error("api token is not configured (set COURIER_API__TOKEN or api.token)")]
    MissingToken,

    /// The update source failed fatally.
    #[error("update source error: {0}")]
    Source(#[from] courier_core::SourceError),

    /// The webhook server failed to bind or serve.
    #[error("webhook server error: {0}")]
    Serve(#[from] std::io::Error),

    /// Webhook mode was configured without the `webhook` feature.
    #[error("webhook mode requires the `webhook` feature")]
    WebhookUnavailable,

    /// No update source was configured or compiled in.
    #[error("no update source available; enable `http-source` or inject collaborators")]
    SourceUnavailable,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
