//! One-shot ingestion: load `DOC_PATH`, chunk, embed and store it.

use std::sync::Arc;

use ai_llm_service::{LlmServiceProfiles, config::default_config::profiles_from_env, telemetry};
use anyhow::Context;
use rag_store::{LlmEmbedder, RagConfig, RagStore};
use tracing::{Level, info, warn};

const DEFAULT_DOC_PATH: &str = "./doc.pdf";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    telemetry::init("info", Level::INFO)?;
    if let Err(e) = dotenv {
        warn!(error = %e, ".env not loaded");
    }

    let path = std::env::var("DOC_PATH").unwrap_or_else(|_| DEFAULT_DOC_PATH.to_string());

    let profiles = profiles_from_env().context("LLM profiles")?;
    let svc = Arc::new(LlmServiceProfiles::new(
        profiles.fast,
        profiles.slow,
        profiles.embedding,
        Some(10),
    )?);

    let cfg = RagConfig::from_env().context("rag config")?;
    let embedder = LlmEmbedder::new(svc, cfg.embedding_dim, cfg.retry.clone());
    let store = RagStore::new(cfg).context("vector index")?;

    let report = store
        .ingest_document(&path, &embedder)
        .await
        .with_context(|| format!("ingesting {path}"))?;

    info!(
        source = %report.source,
        chunks = report.chunks,
        upserted = report.upserted,
        dim = report.dim,
        elapsed_ms = report.elapsed_ms as u64,
        "ingestion finished"
    );
    Ok(())
}
