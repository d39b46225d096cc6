//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use courier_core::UpdateKind;
use courier_transport::{BackoffConfig, PollerConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credentials and endpoint of the remote platform.
    #[serde(default)]
    pub api: ApiConfig,

    /// Long-poll loop settings (used when no webhook URL is configured).
    #[serde(default)]
    pub poller: PollerSettings,

    /// Push-delivery settings (used when a webhook URL is configured).
    #[serde(default)]
    pub webhook: WebhookSettings,
}

// =============================================================================
// Platform API
// =============================================================================

/// Credentials and endpoint of the remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bot token. Usually supplied via `COURIER_API__TOKEN`.
    #[serde(default)]
    pub token: String,

    /// API server base URL. Points at a self-hosted server when changed.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.telegram.org".to_string()
}

// =============================================================================
// Poller
// =============================================================================

/// Long-poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Maximum updates per fetch.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Long-poll hold time in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Allow-list of update kinds; empty fetches the platform default.
    #[serde(default)]
    pub allowed: Vec<UpdateKind>,

    /// Discard the pending backlog before the first fetch.
    #[serde(default)]
    pub drop_pending: bool,

    /// Backoff for transient fetch failures.
    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            poll_timeout_secs: default_poll_timeout_secs(),
            allowed: Vec::new(),
            drop_pending: false,
            backoff: BackoffSettings::default(),
        }
    }
}

impl PollerSettings {
    /// Converts to the transport-level poller configuration.
    pub fn to_transport(&self) -> PollerConfig {
        PollerConfig {
            limit: self.limit,
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            allowed: self.allowed.clone(),
            drop_pending: self.drop_pending,
            backoff: self.backoff.to_transport(),
        }
    }
}

fn default_limit() -> u32 {
    100
}

fn default_poll_timeout_secs() -> u64 {
    25
}

/// Backoff settings for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

impl BackoffSettings {
    /// Converts to the transport-level backoff configuration.
    pub fn to_transport(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// =============================================================================
// Webhook
// =============================================================================

/// Push-delivery settings.
///
/// Webhook mode is selected by a non-empty [`WebhookSettings::url`];
/// otherwise the runtime polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// Public HTTPS URL registered with the platform. Empty disables
    /// webhook mode.
    #[serde(default)]
    pub url: String,

    /// Local listen address.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Local path the server answers on.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// Shared secret required in the platform's secret-token header.
    #[serde(default)]
    pub secret_token: Option<String>,

    /// Ask the platform to discard its queued backlog at registration.
    #[serde(default)]
    pub drop_pending: bool,

    /// Update kinds to deliver; empty leaves the platform default.
    #[serde(default)]
    pub allowed: Vec<UpdateKind>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            listen: default_listen(),
            path: default_webhook_path(),
            secret_token: None,
            drop_pending: false,
            allowed: Vec::new(),
        }
    }
}

impl WebhookSettings {
    /// Returns `true` when webhook mode is selected.
    pub fn enabled(&self) -> bool {
        !self.url.is_empty()
    }

    /// Converts to the transport-level webhook configuration.
    #[cfg(feature = "webhook")]
    pub fn to_transport(&self) -> courier_transport::WebhookConfig {
        courier_transport::WebhookConfig {
            url: self.url.clone(),
            path: self.path.clone(),
            secret_token: self.secret_token.clone(),
            drop_pending: self.drop_pending,
            allowed: self.allowed.clone(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `courier_transport = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with full metadata.
    Full,
    /// Multi-line, human oriented.
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature; falls back
    /// to compact otherwise).
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config = CourierConfig::default();
        assert_eq!(config.poller.limit, 100);
        assert_eq!(config.poller.poll_timeout_secs, 25);
        assert!(!config.poller.drop_pending);
        assert_eq!(config.webhook.listen, "0.0.0.0:8080");
        assert!(!config.webhook.enabled());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn poller_settings_convert_to_transport_config() {
        let settings = PollerSettings {
            limit: 50,
            poll_timeout_secs: 10,
            allowed: vec![UpdateKind::Message, UpdateKind::CallbackQuery],
            drop_pending: true,
            backoff: BackoffSettings {
                initial_delay_ms: 500,
                max_delay_ms: 4000,
                multiplier: 3.0,
            },
        };

        let config = settings.to_transport();
        assert_eq!(config.limit, 50);
        assert_eq!(config.poll_timeout, Duration::from_secs(10));
        assert_eq!(config.allowed.len(), 2);
        assert!(config.drop_pending);
        assert_eq!(config.backoff.initial_delay, Duration::from_millis(500));
        assert_eq!(config.backoff.max_delay, Duration::from_millis(4000));
    }

    #[test]
    fn webhook_mode_is_selected_by_url() {
        let mut settings = WebhookSettings::default();
        assert!(!settings.enabled());
        settings.url = "https://bot.example.test/hook".to_string();
        assert!(settings.enabled());
    }
}
