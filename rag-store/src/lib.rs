//! High-level RAG facade: document ingestion + retrieval over a vector index.
//!
//! This crate provides a clean API to:
//! - Load one document (PDF or text), split it into overlapping chunks, embed and store them
//! - Retrieve top‑K context (RAG) for a textual query
//!
//! The index is abstracted behind [`VectorIndex`]; Qdrant is the production
//! backend and [`MemoryIndex`] serves tests and local experiments.

mod config;
mod embed;
mod embed_pool;
mod errors;
mod index;
mod ingest;
mod loader;
mod memory_index;
mod normalize;
mod qdrant_facade;
mod record;
mod retrieve;
mod splitter;

use std::path::Path;
use std::sync::Arc;

pub use config::{DistanceKind, RagConfig, ReingestPolicy, VectorBackend, VectorSpace};
pub use embed::{EmbeddingsProvider, llm::LlmEmbedder};
pub use embed_pool::embed_missing;
pub use errors::RagError;
pub use index::{IndexPoint, VectorIndex};
pub use ingest::{IngestReport, build_records, stable_uuid};
pub use loader::{RawDocument, load_document};
pub use memory_index::MemoryIndex;
pub use normalize::normalize_document_text;
pub use qdrant_facade::QdrantFacade;
pub use record::{RagHit, RagQuery, RagRecord};
pub use splitter::RecursiveSplitter;

use tracing::{debug, trace};

/// High-level facade that wires configuration and the vector index.
///
/// This is the single entry point recommended for application code.
#[derive(Clone)]
pub struct RagStore {
    cfg: RagConfig,
    index: Arc<dyn VectorIndex>,
}

impl RagStore {
    /// Constructs a new store, picking the backend from `cfg.backend`.
    ///
    /// # Errors
    /// Returns `RagError::Config` / `RagError::Qdrant` if the client initialization fails.
    pub fn new(cfg: RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;
        let index: Arc<dyn VectorIndex> = match cfg.backend {
            VectorBackend::Qdrant => Arc::new(QdrantFacade::new(&cfg)?),
            VectorBackend::Memory => Arc::new(MemoryIndex::new()),
        };
        debug!(collection = %cfg.collection, backend = ?cfg.backend, "RagStore ready");
        Ok(Self { cfg, index })
    }

    /// Uses an already constructed index.
    pub fn with_index(cfg: RagConfig, index: Arc<dyn VectorIndex>) -> Self {
        Self { cfg, index }
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Loads, chunks, embeds and stores one document.
    ///
    /// # Errors
    /// Returns errors on I/O, extraction, embedding, vector size mismatch, or index failures.
    pub async fn ingest_document(
        &self,
        path: impl AsRef<Path>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<IngestReport, RagError> {
        trace!(path = ?path.as_ref(), "RagStore::ingest_document");
        ingest::ingest_document(&self.cfg, self.index.as_ref(), path, provider).await
    }

    /// Builds RAG context for a textual query using the provided embedding provider.
    ///
    /// # Errors
    /// Returns embedding errors or index failures.
    pub async fn rag_context(
        &self,
        query: RagQuery<'_>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<Vec<RagHit>, RagError> {
        trace!(top_k = query.top_k, "RagStore::rag_context");
        retrieve::rag_context(&self.cfg, self.index.as_ref(), query, provider).await
    }
}
