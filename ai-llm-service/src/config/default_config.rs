//! Default LLM configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`LlmModelConfig`],
//! grouped by provider and role. Three roles exist:
//!
//! - **Fast**      → query rewriting (short, low temperature)
//! - **Slow**      → grounded answer generation; optional, falls back to fast
//! - **Embedding** → embedding generator for chunks and queries
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = provider kind (`ollama`, `openai`/`chatgpt`, `gemini`/`google`); default `ollama`
//! - `LLM_MAX_TOKENS`   = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS` = optional per-request timeout (u64)
//! - `EMBEDDING_MODEL`  = embedding model (required for Ollama)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`      = slow/quality model
//! - `OLLAMA_MODEL_FAST` = fast model
//!
//! OpenAI:
//! - `OPENAI_URL` (default `https://api.openai.com`), `OPENAI_API_KEY` (mandatory)
//! - `OPENAI_MODEL`, `OPENAI_MODEL_FAST`
//!
//! Gemini:
//! - `GEMINI_URL` (default `https://generativelanguage.googleapis.com`), `GEMINI_API_KEY` (mandatory)
//! - `GEMINI_MODEL`, `GEMINI_MODEL_FAST` (both default to `gemini-2.0-flash`)
//!
//! At least one of the slow/fast model variables must be set for Ollama and
//! OpenAI. When only one is set it serves both roles.

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_CHAT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The three profiles resolved from the environment.
#[derive(Debug, Clone)]
pub struct ProfileConfigs {
    pub fast: LlmModelConfig,
    /// `None` when the slow model equals the fast one.
    pub slow: Option<LlmModelConfig>,
    pub embedding: LlmModelConfig,
}

/// Reads `LLM_KIND` (default `ollama`).
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match opt_env("LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Ollama),
    }
}

/// Resolves all profiles for the provider selected by `LLM_KIND`.
///
/// # Errors
/// Any [`ConfigError`] raised by the provider-specific loaders.
pub fn profiles_from_env() -> Result<ProfileConfigs, AiLlmError> {
    let provider = provider_from_env()?;
    let base = ProviderBase::from_env(provider)?;
    let (fast_model, slow_model) = base.chat_models()?;

    let fast = base.chat_config(fast_model.clone(), Some(0.1))?;
    let slow = match slow_model {
        Some(m) if m != fast_model => Some(base.chat_config(m, Some(0.3))?),
        _ => None,
    };
    let embedding = base.embedding_config()?;

    Ok(ProfileConfigs {
        fast,
        slow,
        embedding,
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        let _ = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Values shared by every profile of one provider.
struct ProviderBase {
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

impl ProviderBase {
    fn from_env(provider: LlmProvider) -> Result<Self, AiLlmError> {
        let (endpoint, api_key) = match provider {
            LlmProvider::Ollama => (ollama_endpoint()?, None),
            LlmProvider::OpenAI => {
                let url = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
                validate_http_endpoint("OPENAI_URL", &url)?;
                (url, Some(must_env("OPENAI_API_KEY")?))
            }
            LlmProvider::Gemini => {
                let url = opt_env("GEMINI_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());
                validate_http_endpoint("GEMINI_URL", &url)?;
                (url, Some(must_env("GEMINI_API_KEY")?))
            }
        };

        Ok(Self {
            provider,
            endpoint,
            api_key,
            max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
            timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?,
        })
    }

    /// Returns `(fast, slow)` model names.
    fn chat_models(&self) -> Result<(String, Option<String>), AiLlmError> {
        let (slow_var, fast_var) = match self.provider {
            LlmProvider::Ollama => ("OLLAMA_MODEL", "OLLAMA_MODEL_FAST"),
            LlmProvider::OpenAI => ("OPENAI_MODEL", "OPENAI_MODEL_FAST"),
            LlmProvider::Gemini => ("GEMINI_MODEL", "GEMINI_MODEL_FAST"),
        };
        let slow = opt_env(slow_var);
        let fast = opt_env(fast_var);

        match (fast, slow) {
            (Some(f), s) => Ok((f, s)),
            (None, Some(s)) => Ok((s, None)),
            (None, None) if self.provider == LlmProvider::Gemini => {
                Ok((DEFAULT_GEMINI_CHAT_MODEL.to_string(), None))
            }
            (None, None) => Err(ConfigError::MissingVar(slow_var).into()),
        }
    }

    fn chat_config(
        &self,
        model: String,
        temperature: Option<f32>,
    ) -> Result<LlmModelConfig, AiLlmError> {
        if model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        Ok(LlmModelConfig {
            provider: self.provider,
            model,
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            max_tokens: self.max_tokens,
            temperature,
            top_p: None,
            timeout_secs: Some(self.timeout_secs.unwrap_or(60)),
        })
    }

    fn embedding_config(&self) -> Result<LlmModelConfig, AiLlmError> {
        let model = match (opt_env("EMBEDDING_MODEL"), self.provider) {
            (Some(m), _) => m,
            (None, LlmProvider::Gemini) => DEFAULT_GEMINI_EMBEDDING_MODEL.to_string(),
            (None, LlmProvider::OpenAI) => DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            (None, LlmProvider::Ollama) => must_env("EMBEDDING_MODEL")?,
        };

        Ok(LlmModelConfig {
            provider: self.provider,
            model,
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(self.timeout_secs.unwrap_or(30)),
        })
    }
}
