//! Shared LLM service with three active profiles: `fast`, `slow`, and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - If `slow` profile is not provided, it falls back to `fast`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{ChatTurn, LlmProfile, LlmServiceProfiles};
//! use ai_llm_service::config::default_config::profiles_from_env;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let p = profiles_from_env()?;
//! let svc = Arc::new(LlmServiceProfiles::new(p.fast, p.slow, p.embedding, Some(10))?);
//!
//! let txt = svc
//!     .chat(LlmProfile::Fast, &[ChatTurn::user("Hello")], "Reply in one word.")
//!     .await?;
//! println!("FAST: {}", txt);
//!
//! let emb = svc.embed_query("What is a Fenwick tree?").await?;
//! println!("Embedding dim = {}", emb.len());
//! # Ok(()) }
//! ```

use std::{collections::HashMap, hash::Hash, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    chat::{ChatTurn, EmbedTask},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{
        gemini_service::GeminiService, ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// Which chat profile to use for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProfile {
    /// Cheap, low-latency model (query rewriting).
    Fast,
    /// Quality model (grounded answers). Same as `Fast` when not configured.
    Slow,
}

/// Shared service that manages three logical LLM profiles: **fast**, **slow**, and **embedding**.
///
/// Internally, it caches provider clients keyed by their configuration to
/// avoid recreating HTTP clients on each call.
pub struct LlmServiceProfiles {
    fast: LlmModelConfig,
    slow: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,
    gemini: RwLock<HashMap<ClientKey, Arc<GeminiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `fast`: required fast profile.
    /// - `slow_opt`: optional slow profile. If `None`, falls back to `fast`.
    /// - `embedding`: required embedding profile.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    ///
    /// No network traffic happens here; clients are built lazily.
    pub fn new(
        fast: LlmModelConfig,
        slow_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let slow = slow_opt.unwrap_or_else(|| fast.clone());

        Ok(Self {
            fast,
            slow,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            gemini: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Multi-turn chat with a system instruction on the selected profile.
    ///
    /// Attempted exactly once; generation is not retried.
    pub async fn chat(
        &self,
        profile: LlmProfile,
        turns: &[ChatTurn],
        system: &str,
    ) -> Result<String, AiLlmError> {
        let cfg = match profile {
            LlmProfile::Fast => &self.fast,
            LlmProfile::Slow => &self.slow,
        };
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = get_or_init(&self.ollama, cfg, OllamaService::new).await?;
                cli.chat(turns, system).await
            }
            LlmProvider::OpenAI => {
                let cli = get_or_init(&self.openai, cfg, OpenAiService::new).await?;
                cli.chat(turns, system).await
            }
            LlmProvider::Gemini => {
                let cli = get_or_init(&self.gemini, cfg, GeminiService::new).await?;
                cli.chat(turns, system).await
            }
        }
    }

    /// Embeds a document chunk with the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.embed_with_task(input, EmbedTask::Document).await
    }

    /// Embeds a search query with the **embedding** profile.
    pub async fn embed_query(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.embed_with_task(input, EmbedTask::Query).await
    }

    /// Returns a health snapshot for all distinct profiles.
    ///
    /// Identical profiles are probed only once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(3);
        list.push(self.fast.clone());
        if self.slow != self.fast {
            list.push(self.slow.clone());
        }
        if self.embedding != self.fast && self.embedding != self.slow {
            list.push(self.embedding.clone());
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(fast, slow, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.fast, &self.slow, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn embed_with_task(&self, input: &str, task: EmbedTask) -> Result<Vec<f32>, AiLlmError> {
        let cfg = &self.embedding;
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = get_or_init(&self.ollama, cfg, OllamaService::new).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAI => {
                let cli = get_or_init(&self.openai, cfg, OpenAiService::new).await?;
                cli.embeddings(input).await
            }
            LlmProvider::Gemini => {
                let cli = get_or_init(&self.gemini, cfg, GeminiService::new).await?;
                cli.embeddings(input, task).await
            }
        }
    }
}

/// Returns the cached client for `cfg`, building it on first use.
async fn get_or_init<C>(
    cache: &RwLock<HashMap<ClientKey, Arc<C>>>,
    cfg: &LlmModelConfig,
    build: fn(LlmModelConfig) -> Result<C, AiLlmError>,
) -> Result<Arc<C>, AiLlmError> {
    let key = ClientKey::from(cfg);
    if let Some(cli) = cache.read().await.get(&key).cloned() {
        return Ok(cli);
    }
    let mut w = cache.write().await;
    if let Some(cli) = w.get(&key).cloned() {
        return Ok(cli);
    }
    let cli = Arc::new(build(cfg.clone())?);
    w.insert(key, cli.clone());
    Ok(cli)
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[test]
    fn slow_falls_back_to_fast() {
        let svc = LlmServiceProfiles::new(ollama("fast"), None, ollama("emb"), Some(1)).unwrap();
        let (fast, slow, emb) = svc.profiles();
        assert_eq!(fast, slow);
        assert_eq!(emb.model, "emb");
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc = LlmServiceProfiles::new(ollama("fast"), None, ollama("emb"), Some(1)).unwrap();
        let a = get_or_init(&svc.ollama, &svc.fast, OllamaService::new).await.unwrap();
        let b = get_or_init(&svc.ollama, &svc.slow, OllamaService::new).await.unwrap();
        let c = get_or_init(&svc.ollama, &svc.embedding, OllamaService::new).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(svc.ollama.read().await.len(), 2);
    }

    #[tokio::test]
    async fn bad_config_surfaces_as_error_not_panic() {
        let mut bad = ollama("fast");
        bad.endpoint = "not-a-url".into();
        let svc = LlmServiceProfiles::new(bad, None, ollama("emb"), Some(1)).unwrap();
        let err = svc
            .chat(LlmProfile::Fast, &[ChatTurn::user("hi")], "")
            .await
            .unwrap_err();
        assert!(matches!(err, AiLlmError::Provider(_)));
    }
}
