//! Typed error for the contextor crate.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Embedding or vector index failures during retrieval.
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Generation failures (rewrite or answer).
    #[error("LLM error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// The rewriter produced nothing usable.
    #[error("query rewriter returned an empty question")]
    EmptyRewrite,

    /// The whole pipeline exceeded its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
