//! Embeds the standalone question and fetches the nearest chunks.

use std::sync::Arc;

use rag_store::{EmbeddingsProvider, RagHit, RagQuery, RagStore};
use tracing::{debug, instrument};

use crate::error::ContextorError;

#[derive(Clone)]
pub struct Retriever {
    store: RagStore,
    embedder: Arc<dyn EmbeddingsProvider>,
    top_k: u64,
}

impl Retriever {
    pub fn new(store: RagStore, embedder: Arc<dyn EmbeddingsProvider>, top_k: u64) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    /// Top-K hits for `query`, best first. No threshold and no dedup.
    ///
    /// # Errors
    /// Embedding and index failures; partial results are never returned.
    #[instrument(skip_all, fields(top_k = self.top_k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RagHit>, ContextorError> {
        let hits = self
            .store
            .rag_context(
                RagQuery {
                    text: query,
                    top_k: self.top_k,
                },
                self.embedder.as_ref(),
            )
            .await?;
        debug!(hits = hits.len(), best = ?hits.first().map(|h| h.score), "retrieved");
        Ok(hits)
    }
}
