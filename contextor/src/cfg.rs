//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::prompt::DEFAULT_PERSONA;

/// Config bag for the RAG pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    /// Matches requested from the index per question.
    pub top_k: u64,
    /// Character budget for the assembled context block. `0` disables the cap.
    pub max_ctx_chars: usize,
    /// Upper bound for one whole pipeline run (rewrite → generate).
    pub request_timeout: Duration,
    /// Role line of the answer instruction ("You are a {persona}.").
    pub persona: String,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_ctx_chars: 16_000,
            request_timeout: Duration::from_secs(120),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with sensible defaults.
    ///
    /// # Example
    /// ```
    /// use contextor::ContextorConfig;
    /// let cfg = ContextorConfig::from_env();
    /// assert!(cfg.top_k >= 1);
    /// ```
    pub fn from_env() -> Self {
        let d = Self::default();
        let persona = env("ASSISTANT_PERSONA", &d.persona);
        Self {
            top_k: parse("RAG_TOP_K", d.top_k).max(1),
            max_ctx_chars: parse("MAX_CTX_CHARS", d.max_ctx_chars),
            request_timeout: Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", 120u64).max(1)),
            persona: if persona.trim().is_empty() {
                d.persona
            } else {
                persona.trim().to_string()
            },
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}
