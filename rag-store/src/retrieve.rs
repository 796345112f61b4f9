//! Retrieval helpers: low-level vector search and high-level RAG context.

use ai_llm_service::retry::with_retry;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::RagConfig;
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::{RagHit, RagQuery};

/// Performs a similarity search given a ready query vector.
///
/// Transient index failures are retried with `cfg.retry`.
///
/// # Errors
/// Returns `RagError::Qdrant` (or a dimension error) when the search fails.
pub async fn search_by_vector(
    cfg: &RagConfig,
    index: &dyn VectorIndex,
    query_vector: Vec<f32>,
    top_k: u64,
    with_payload: bool,
) -> Result<Vec<(f32, Value)>, RagError> {
    trace!(top_k, with_payload, "retrieve::search_by_vector");
    with_retry(&cfg.retry, RagError::is_transient, || {
        index.query(query_vector.clone(), top_k, with_payload)
    })
    .await
}

/// Embeds the query text and returns hits in rank order, best first.
///
/// # Errors
/// Returns embedding/provider errors or index failures.
pub async fn rag_context(
    cfg: &RagConfig,
    index: &dyn VectorIndex,
    query: RagQuery<'_>,
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<RagHit>, RagError> {
    let qv = provider.embed_query(query.text).await?;
    let hits = search_by_vector(cfg, index, qv, query.top_k, true).await?;

    let out: Vec<RagHit> = hits
        .into_iter()
        .map(|(score, payload)| RagHit::from_payload(score, payload))
        .collect();

    debug!(top_k = query.top_k, hits = out.len(), "retrieval done");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistanceKind, VectorSpace};
    use crate::index::IndexPoint;
    use crate::memory_index::MemoryIndex;
    use futures::future::BoxFuture;
    use serde_json::Map;

    /// Maps a handful of keywords onto fixed axes.
    struct KeywordEmbedder;

    impl EmbeddingsProvider for KeywordEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                let t = text.to_lowercase();
                Ok(vec![
                    t.contains("heap") as u8 as f32,
                    t.contains("graph") as u8 as f32,
                    0.1,
                ])
            })
        }
    }

    async fn index_with(texts: &[(&str, [f32; 3])]) -> MemoryIndex {
        let idx = MemoryIndex::new();
        idx.ensure_collection(&VectorSpace {
            size: 3,
            distance: DistanceKind::Cosine,
        })
        .await
        .unwrap();
        let points = texts
            .iter()
            .enumerate()
            .map(|(i, (t, v))| {
                let mut payload = Map::new();
                payload.insert("text".into(), Value::String((*t).into()));
                payload.insert("source".into(), Value::String("doc.pdf".into()));
                payload.insert("chunk_index".into(), Value::from(i as u64));
                IndexPoint {
                    id: format!("p{i}"),
                    vector: v.to_vec(),
                    payload,
                }
            })
            .collect();
        idx.upsert(points).await.unwrap();
        idx
    }

    #[tokio::test]
    async fn hits_come_back_ranked() {
        let idx = index_with(&[
            ("Graphs and BFS", [0.0, 1.0, 0.1]),
            ("Binary heap basics", [1.0, 0.0, 0.1]),
            ("Preface", [0.0, 0.0, 1.0]),
        ])
        .await;
        let cfg = RagConfig::new_default("http://localhost:6334", "t");

        let hits = rag_context(
            &cfg,
            &idx,
            RagQuery {
                text: "what is a heap?",
                top_k: 2,
            },
            &KeywordEmbedder,
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Binary heap basics");
        assert_eq!(hits[0].chunk_index, Some(1));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn empty_index_yields_no_hits() {
        let idx = index_with(&[]).await;
        let cfg = RagConfig::new_default("http://localhost:6334", "t");
        let hits = rag_context(&cfg, &idx, RagQuery { text: "heap", top_k: 10 }, &KeywordEmbedder)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
