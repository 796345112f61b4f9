//! Health probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model looked up in `models[].name`
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth, model looked up in `data[].id`
//! - Gemini: `GET {endpoint}/v1beta/models/{model}` with `x-goog-api-key`
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a `/health` endpoint.
//! [`HealthService::check`] never fails; errors are mapped to `ok=false`.

use std::time::{Duration, Instant};

use reqwest::{StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Ollama", "Gemini").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier relevant to the probe.
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds, default 10).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(default_timeout_secs = timeout.as_secs(), "HealthService initialized");

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks health for a single LLM config. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let start = Instant::now();
        match self.try_probe(cfg).await {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    model = %cfg.model,
                    ok = status.ok,
                    latency_ms = status.latency_ms as u64,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status = HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    model = %cfg.model,
                    latency_ms = status.latency_ms as u64,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Checks several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn try_probe(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let base = cfg.endpoint.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HealthError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        let (url, auth) = match cfg.provider {
            LlmProvider::Ollama => (format!("{base}/api/tags"), None),
            LlmProvider::OpenAI => {
                let key = require_key(cfg)?;
                (
                    format!("{base}/v1/models"),
                    Some(("authorization", format!("Bearer {key}"))),
                )
            }
            LlmProvider::Gemini => {
                let key = require_key(cfg)?;
                (
                    format!("{base}/v1beta/models/{}", cfg.model),
                    Some(("x-goog-api-key", key.to_string())),
                )
            }
        };

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let mut req = self.client.get(&url).timeout(timeout);
        if let Some((name, value)) = auth {
            let mut value = header::HeaderValue::from_str(&value)
                .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
            value.set_sensitive(true);
            req = req.header(name, value);
        }

        debug!(provider = %cfg.provider, model = %cfg.model, "GET {}", url);
        let start = Instant::now();
        let resp = req.send().await?;
        let latency = start.elapsed().as_millis();
        let status = resp.status();

        if cfg.provider == LlmProvider::Gemini && status == StatusCode::NOT_FOUND {
            return Ok(HealthStatus::new(cfg, false, latency, "Gemini is up, but model not found"));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                return Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("{} is reachable; failed to decode probe body: {e}", cfg.provider),
                ));
            }
        };

        let found = model_listed(cfg, &body);
        let message = match found {
            Some(true) | None => format!("{} is healthy; model is available", cfg.provider),
            Some(false) => format!("{} is up, but model `{}` is not listed", cfg.provider, cfg.model),
        };
        Ok(HealthStatus::new(cfg, found.unwrap_or(true), latency, message))
    }
}

fn require_key(cfg: &LlmModelConfig) -> Result<&str, AiLlmError> {
    cfg.api_key
        .as_deref()
        .ok_or_else(|| HealthError::Decode(format!("missing {} API key", cfg.provider)).into())
}

/// Best-effort model lookup in a probe body. `None` when the body has no list.
fn model_listed(cfg: &LlmModelConfig, body: &Value) -> Option<bool> {
    let (list, field) = match cfg.provider {
        LlmProvider::Ollama => (body.get("models")?, "name"),
        LlmProvider::OpenAI => (body.get("data")?, "id"),
        LlmProvider::Gemini => return Some(true),
    };
    let items = list.as_array()?;
    Some(items.iter().any(|m| {
        m.get(field)
            .and_then(Value::as_str)
            .is_some_and(|name| name == cfg.model || name.strip_suffix(":latest") == Some(cfg.model.as_str()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(provider: LlmProvider, model: &str, endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn invalid_endpoint_reports_failure_without_network() {
        let svc = HealthService::new(Some(1)).unwrap();
        let c = cfg(LlmProvider::Gemini, "gemini-2.0-flash", "generativelanguage.googleapis.com");
        let status = svc.check(&c).await;
        assert!(!status.ok);
        assert_eq!(status.provider, "Gemini");
        assert_eq!(status.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn model_lookup_per_provider() {
        let o = cfg(LlmProvider::Ollama, "nomic-embed-text", "http://x");
        let tags = json!({ "models": [{ "name": "nomic-embed-text:latest" }] });
        assert_eq!(model_listed(&o, &tags), Some(true));
        assert_eq!(model_listed(&o, &json!({ "models": [] })), Some(false));
        assert_eq!(model_listed(&o, &json!({})), None);

        let oa = cfg(LlmProvider::OpenAI, "gpt-4o-mini", "http://x");
        assert_eq!(model_listed(&oa, &json!({ "data": [{ "id": "gpt-4o-mini" }] })), Some(true));
    }
}
