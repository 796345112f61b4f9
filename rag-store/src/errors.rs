//! Unified error types for the crate.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// A record reached the upsert stage without a vector.
    #[error("missing embedding for chunk {0}")]
    MissingEmbedding(usize),

    /// Vector index failures. `transient` marks errors worth retrying.
    #[error("qdrant error: {message}")]
    Qdrant { message: String, transient: bool },

    /// Embedding provider failures.
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    /// The document could not be read or decoded.
    #[error("failed to load {path}: {reason}")]
    Loader { path: String, reason: String },

    /// The document contained no text after extraction.
    #[error("document {0} has no extractable text")]
    EmptyDocument(String),
}

impl RagError {
    /// Whether retrying the same idempotent call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RagError::Llm(e) => e.is_transient(),
            RagError::Qdrant { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Wraps a vector-index failure, classifying it by its message.
    pub fn qdrant(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let transient = ["unavailable", "deadline", "exhausted", "timed out", "timeout", "connection"]
            .iter()
            .any(|needle| lower.contains(needle));
        RagError::Qdrant { message, transient }
    }
}
