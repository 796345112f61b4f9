//! End-to-end ingestion: load → split → embed → upsert.
//!
//! Every chunk is stored as a vector plus a compact payload with `text`,
//! `source` and `chunk_index`. Point ids depend on [`ReingestPolicy`].

use std::path::Path;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{RagConfig, ReingestPolicy, VectorSpace};
use crate::embed::EmbeddingsProvider;
use crate::embed_pool::embed_missing;
use crate::errors::RagError;
use crate::index::{IndexPoint, VectorIndex};
use crate::loader::load_document;
use crate::record::RagRecord;
use crate::splitter::RecursiveSplitter;

/// Summary of one ingestion run.
#[derive(Clone, Debug, Serialize)]
pub struct IngestReport {
    pub source: String,
    /// Chunks produced by the splitter.
    pub chunks: usize,
    /// Chunks embedded during this run.
    pub embedded: usize,
    /// Points acknowledged by the index.
    pub upserted: u64,
    /// Vector size of the collection.
    pub dim: usize,
    pub elapsed_ms: u128,
}

/// Deterministic point id for a chunk of a given source.
pub fn stable_uuid(source: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{source}#{chunk_index}").as_bytes())
}

/// Turns split chunks into records with ids assigned per `policy`.
pub fn build_records(source: &str, chunks: Vec<String>, policy: ReingestPolicy) -> Vec<RagRecord> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let id = match policy {
                ReingestPolicy::Append => Uuid::new_v4(),
                ReingestPolicy::Upsert | ReingestPolicy::Recreate => stable_uuid(source, i),
            };
            RagRecord {
                id: id.to_string(),
                text,
                source: source.to_string(),
                chunk_index: i,
                embedding: None,
            }
        })
        .collect()
}

/// Loads `path`, splits it, embeds every chunk and writes the vectors to `index`.
///
/// # Errors
/// Loader, splitter config, embedding and index errors abort the run. Nothing
/// is written to the index before all chunks are embedded.
#[instrument(skip_all, fields(path = %path.as_ref().display(), policy = ?cfg.reingest))]
pub async fn ingest_document(
    cfg: &RagConfig,
    index: &dyn VectorIndex,
    path: impl AsRef<Path>,
    provider: &dyn EmbeddingsProvider,
) -> Result<IngestReport, RagError> {
    let started = Instant::now();
    cfg.validate()?;

    let doc = load_document(path.as_ref()).await?;
    info!(source = %doc.source, chars = doc.text.chars().count(), "loaded document");

    let splitter = RecursiveSplitter::new(cfg.chunk_size, cfg.chunk_overlap)?;
    let chunks = splitter.split(&doc.text);
    info!(
        chunks = chunks.len(),
        chunk_size = cfg.chunk_size,
        chunk_overlap = cfg.chunk_overlap,
        "chunked document"
    );

    let mut records = build_records(&doc.source, chunks, cfg.reingest);
    let chunk_count = records.len();

    let pb = progress_bar(chunk_count as u64);
    info!(concurrency = cfg.embedding_concurrency, "embedder configured");
    let embedded = embed_missing(
        &mut records,
        provider,
        cfg.embedding_dim,
        cfg.embedding_concurrency,
        Some(&pb),
    )
    .await;
    pb.finish_and_clear();
    let embedded = embedded?;

    let dim = match cfg.embedding_dim {
        Some(d) => d,
        None => records
            .iter()
            .find_map(|r| r.embedding.as_ref().map(Vec::len))
            .ok_or_else(|| RagError::EmptyDocument(doc.source.clone()))?,
    };

    if cfg.reingest == ReingestPolicy::Recreate {
        warn!(collection = %cfg.collection, "dropping collection before ingestion");
        index.reset().await?;
    }
    index
        .ensure_collection(&VectorSpace {
            size: dim,
            distance: cfg.distance,
        })
        .await?;
    info!(collection = %cfg.collection, dim, distance = ?cfg.distance, "index configured");

    let upserted = upsert_all(cfg, index, records).await?;

    let report = IngestReport {
        source: doc.source,
        chunks: chunk_count,
        embedded,
        upserted,
        dim,
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        upserted = report.upserted,
        elapsed_ms = report.elapsed_ms as u64,
        "stored chunks"
    );
    Ok(report)
}

/// Writes records in batches of `cfg.upsert_batch`, at most
/// `cfg.upsert_concurrency` batches in flight.
async fn upsert_all(
    cfg: &RagConfig,
    index: &dyn VectorIndex,
    records: Vec<RagRecord>,
) -> Result<u64, RagError> {
    let mut points = Vec::with_capacity(records.len());
    for r in records {
        let payload = r.payload();
        let vector = r.embedding.ok_or(RagError::MissingEmbedding(r.chunk_index))?;
        points.push(IndexPoint {
            id: r.id,
            vector,
            payload,
        });
    }

    let batch = cfg.upsert_batch.max(1);
    let batches: Vec<Vec<IndexPoint>> = points.chunks(batch).map(<[IndexPoint]>::to_vec).collect();
    debug!(batches = batches.len(), batch, "upserting");

    let counts: Vec<u64> = stream::iter(batches)
        .map(|b| index.upsert(b))
        .buffer_unordered(cfg.upsert_concurrency.max(1))
        .try_collect()
        .await?;
    Ok(counts.into_iter().sum())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}
