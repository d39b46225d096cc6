//! HTTP update source speaking the Bot API convention.
//!
//! Methods are invoked as `POST {base}/bot{token}/{method}` with a JSON
//! body; answers arrive in an `{"ok": ..., "result": ..., "description":
//! ...}` envelope. The same client doubles as the [`Api`] handle injected
//! into handlers, so follow-up calls reuse the connection pool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use courier_core::source::{Api, GetUpdates, UpdateSource, WebhookSpec};
use courier_core::{BoxError, SourceError, SourceResult, Update};

/// Default public API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Timeout for ordinary (non-long-poll) calls.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time a long-poll request may stay open beyond the server-side
/// hold, so the platform answers before the client gives up.
const POLL_SLACK: Duration = Duration::from_secs(5);

/// Response envelope used by every method.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client for fetching updates and managing webhook registration.
pub struct HttpUpdateSource {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpUpdateSource {
    /// Creates a client against the public endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Points the client at a self-hosted API server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> SourceResult<T> {
        trace!(method, "invoking api method");

        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&params)
            .send()
            .await
            .map_err(|err| SourceError::transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::unauthorized(format!(
                "{method} answered {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| SourceError::transport(err.to_string()))?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;

        if !envelope.ok {
            return Err(SourceError::transport(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{method} answered {status}")),
            ));
        }

        envelope
            .result
            .ok_or_else(|| SourceError::transport(format!("{method} answered an empty result")))
    }
}

#[async_trait]
impl UpdateSource for HttpUpdateSource {
    async fn get_updates(&self, req: GetUpdates) -> SourceResult<Vec<Update>> {
        let mut params = json!({
            "offset": req.offset,
            "limit": req.limit,
            "timeout": req.timeout.as_secs(),
        });
        if !req.allowed.is_empty() {
            params["allowed_updates"] = json!(req.allowed);
        }

        self.invoke("getUpdates", params, req.timeout + POLL_SLACK)
            .await
    }

    async fn set_webhook(&self, spec: WebhookSpec) -> SourceResult<()> {
        let mut params = json!({
            "url": spec.url,
            "drop_pending_updates": spec.drop_pending,
        });
        if let Some(secret_token) = &spec.secret_token {
            params["secret_token"] = json!(secret_token);
        }
        if !spec.allowed.is_empty() {
            params["allowed_updates"] = json!(spec.allowed);
        }

        let _: bool = self.invoke("setWebhook", params, CALL_TIMEOUT).await?;
        debug!(url = %spec.url, "webhook registered");
        Ok(())
    }

    async fn delete_webhook(&self, drop_pending: bool) -> SourceResult<()> {
        let params = json!({ "drop_pending_updates": drop_pending });
        let _: bool = self.invoke("deleteWebhook", params, CALL_TIMEOUT).await?;
        debug!("webhook removed");
        Ok(())
    }
}

#[async_trait]
impl Api for HttpUpdateSource {
    async fn call(&self, method: &str, params: Value) -> Result<Value, BoxError> {
        self.invoke(method, params, CALL_TIMEOUT)
            .await
            .map_err(Into::into)
    }
}
