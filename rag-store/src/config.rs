//! Runtime and collection configuration.

use std::str::FromStr;

use ai_llm_service::retry::RetryPolicy;
use tracing::warn;

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

/// Describes the vector space of the collection.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorSpace {
    /// Dimensionality of vectors.
    pub size: usize,
    /// Distance function.
    pub distance: DistanceKind,
}

/// Which [`crate::VectorIndex`] implementation backs the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorBackend {
    Qdrant,
    /// In-process index; contents live as long as the process.
    Memory,
}

impl FromStr for VectorBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(RagError::Config(format!("unknown VECTOR_BACKEND `{other}`"))),
        }
    }
}

/// How re-running ingestion treats chunks already in the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReingestPolicy {
    /// Random point ids; every run adds a fresh copy of each chunk.
    Append,
    /// Deterministic ids from `source#chunk_index`; re-runs overwrite in place.
    #[default]
    Upsert,
    /// Drop the collection before ingesting.
    Recreate,
}

impl FromStr for ReingestPolicy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "upsert" => Ok(Self::Upsert),
            "recreate" => Ok(Self::Recreate),
            other => Err(RagError::Config(format!("unknown REINGEST_POLICY `{other}`"))),
        }
    }
}

/// Configuration for ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    pub backend: VectorBackend,
    /// Points per upsert request.
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Expected embedding size; inferred from the first vector when `None`.
    pub embedding_dim: Option<usize>,
    pub embedding_concurrency: usize,
    pub upsert_concurrency: usize,
    /// Splitter window in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub reingest: ReingestPolicy,
    /// Applied to embedding and index queries only.
    pub retry: RetryPolicy,
}

impl RagConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            backend: VectorBackend::Qdrant,
            upsert_batch: 100,
            exact_search: false,
            embedding_dim: None,
            embedding_concurrency: 5,
            upsert_concurrency: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            reingest: ReingestPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the config from environment variables on top of [`RagConfig::new_default`].
    ///
    /// Unparseable numbers fall back to their defaults with a warning; unknown
    /// enum values are errors.
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_default(
            env("QDRANT_URL", "http://localhost:6334"),
            env("QDRANT_COLLECTION", "docqa"),
        );
        cfg.qdrant_api_key = std::env::var("QDRANT_API_KEY").ok().filter(|s| !s.trim().is_empty());
        if let Ok(v) = std::env::var("VECTOR_BACKEND") {
            cfg.backend = v.parse()?;
        }
        if let Ok(v) = std::env::var("REINGEST_POLICY") {
            cfg.reingest = v.parse()?;
        }
        cfg.upsert_batch = parse("QDRANT_BATCH_SIZE", cfg.upsert_batch);
        cfg.exact_search = env("RAG_EXACT_SEARCH", "false") == "true";
        cfg.embedding_dim = std::env::var("EMBEDDING_DIM").ok().and_then(|s| s.trim().parse().ok());
        cfg.embedding_concurrency = parse("EMBEDDING_CONCURRENCY", cfg.embedding_concurrency);
        cfg.upsert_concurrency = parse("UPSERT_CONCURRENCY", cfg.upsert_concurrency);
        cfg.chunk_size = parse("CHUNK_SIZE", cfg.chunk_size);
        cfg.chunk_overlap = parse("CHUNK_OVERLAP", cfg.chunk_overlap);
        cfg.retry = RetryPolicy::from_env().map_err(|e| RagError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.backend == VectorBackend::Qdrant && self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dim == Some(0) {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        Ok(())
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: FromStr + Copy>(k: &str, dflt: T) -> T {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().unwrap_or_else(|_| {
            warn!(var = k, value = %v, "unparseable value, using default");
            dflt
        }),
        _ => dflt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ingestion_job() {
        let cfg = RagConfig::new_default("http://localhost:6334", "docqa");
        assert_eq!((cfg.chunk_size, cfg.chunk_overlap), (1000, 200));
        assert_eq!(cfg.embedding_concurrency, 5);
        assert_eq!(cfg.reingest, ReingestPolicy::Upsert);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "docqa");
        cfg.chunk_overlap = cfg.chunk_size;
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn policies_parse() {
        assert_eq!("Recreate".parse::<ReingestPolicy>().unwrap(), ReingestPolicy::Recreate);
        assert_eq!("append".parse::<ReingestPolicy>().unwrap(), ReingestPolicy::Append);
        assert!("merge".parse::<ReingestPolicy>().is_err());
        assert_eq!("memory".parse::<VectorBackend>().unwrap(), VectorBackend::Memory);
    }
}
