//! Embedding provider backed by the shared [`LlmServiceProfiles`].

use std::sync::Arc;

use ai_llm_service::{
    AiLlmError, LlmServiceProfiles,
    retry::{RetryPolicy, with_retry},
};
use futures::future::BoxFuture;
use tracing::warn;

use crate::{EmbeddingsProvider, RagError};

/// Embeds through the embedding profile, retrying transient failures.
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected embedding size, checked on every vector when set.
    dim: Option<usize>,
    retry: RetryPolicy,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>, retry: RetryPolicy) -> Self {
        Self { svc, dim, retry }
    }

    fn check_dim(&self, v: Vec<f32>) -> Result<Vec<f32>, RagError> {
        match self.dim {
            Some(want) if v.len() != want => {
                warn!(got = v.len(), want, "embedding dimension mismatch");
                Err(RagError::VectorSizeMismatch { got: v.len(), want })
            }
            _ => Ok(v),
        }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
        Box::pin(async move {
            let v = with_retry(&self.retry, AiLlmError::is_transient, || self.svc.embed(text)).await?;
            self.check_dim(v)
        })
    }

    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
        Box::pin(async move {
            let v = with_retry(&self.retry, AiLlmError::is_transient, || {
                self.svc.embed_query(text)
            })
            .await?;
            self.check_dim(v)
        })
    }
}
