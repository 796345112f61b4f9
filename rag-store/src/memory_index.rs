//! In-process brute-force index.
//!
//! Stores points in a map and scores every point on each query. Used by tests
//! and by `VECTOR_BACKEND=memory` for local experiments on small documents.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::config::{DistanceKind, VectorSpace};
use crate::errors::RagError;
use crate::index::{IndexPoint, VectorIndex};

#[derive(Default)]
struct State {
    space: Option<VectorSpace>,
    points: HashMap<String, (Vec<f32>, Map<String, Value>)>,
}

/// Brute-force [`VectorIndex`] kept in memory.
#[derive(Default)]
pub struct MemoryIndex {
    state: RwLock<State>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points.
    pub async fn len(&self) -> usize {
        self.state.read().await.points.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Payloads of all stored points, in no particular order.
    pub async fn payloads(&self) -> Vec<Map<String, Value>> {
        self.state
            .read()
            .await
            .points
            .values()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl VectorIndex for MemoryIndex {
    fn ensure_collection<'a>(&'a self, space: &'a VectorSpace) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            let mut st = self.state.write().await;
            if st.space.is_none() {
                st.space = Some(space.clone());
            }
            Ok(())
        })
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(async move {
            let mut st = self.state.write().await;
            st.space = None;
            st.points.clear();
            Ok(())
        })
    }

    fn upsert(&self, points: Vec<IndexPoint>) -> BoxFuture<'_, Result<u64, RagError>> {
        Box::pin(async move {
            let mut st = self.state.write().await;
            let want = st
                .space
                .as_ref()
                .map(|s| s.size)
                .ok_or_else(|| RagError::qdrant("collection does not exist"))?;
            if let Some(p) = points.iter().find(|p| p.vector.len() != want) {
                return Err(RagError::VectorSizeMismatch {
                    got: p.vector.len(),
                    want,
                });
            }
            let n = points.len() as u64;
            for p in points {
                st.points.insert(p.id, (p.vector, p.payload));
            }
            Ok(n)
        })
    }

    fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        with_payload: bool,
    ) -> BoxFuture<'_, Result<Vec<(f32, Value)>, RagError>> {
        Box::pin(async move {
            let st = self.state.read().await;
            let Some(space) = st.space.as_ref() else {
                return Err(RagError::qdrant("collection does not exist"));
            };
            if vector.len() != space.size {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want: space.size,
                });
            }

            let mut scored: Vec<(f32, &String, &Map<String, Value>)> = st
                .points
                .iter()
                .map(|(id, (v, p))| (score(space.distance, &vector, v), id, p))
                .collect();
            // Ties broken by id so results are stable across runs.
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
            scored.truncate(top_k as usize);

            Ok(scored
                .into_iter()
                .map(|(s, _, p)| {
                    let payload = if with_payload {
                        Value::Object(p.clone())
                    } else {
                        Value::Object(Map::new())
                    };
                    (s, payload)
                })
                .collect())
        })
    }
}

/// Higher is better for every distance kind.
fn score(kind: DistanceKind, a: &[f32], b: &[f32]) -> f32 {
    match kind {
        DistanceKind::Cosine => cosine(a, b),
        DistanceKind::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        DistanceKind::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, v: [f32; 2], text: &str) -> IndexPoint {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::String(text.into()));
        IndexPoint {
            id: id.into(),
            vector: v.to_vec(),
            payload,
        }
    }

    async fn seeded() -> MemoryIndex {
        let idx = MemoryIndex::new();
        idx.ensure_collection(&VectorSpace {
            size: 2,
            distance: DistanceKind::Cosine,
        })
        .await
        .unwrap();
        idx.upsert(vec![
            point("a", [1.0, 0.0], "east"),
            point("b", [0.0, 1.0], "north"),
            point("c", [0.7, 0.7], "north-east"),
        ])
        .await
        .unwrap();
        idx
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_and_truncates() {
        let idx = seeded().await;
        let hits = idx.query(vec![1.0, 0.1], 2, true).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1["text"], "east");
        assert_eq!(hits[1].1["text"], "north-east");
        assert!(hits[0].0 >= hits[1].0);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let idx = seeded().await;
        idx.upsert(vec![point("a", [1.0, 0.0], "east v2")]).await.unwrap();
        assert_eq!(idx.len().await, 3);
        let hits = idx.query(vec![1.0, 0.0], 1, true).await.unwrap();
        assert_eq!(hits[0].1["text"], "east v2");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let idx = seeded().await;
        let err = idx.query(vec![1.0, 0.0, 0.0], 1, true).await.unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 3, want: 2 }));
    }

    #[tokio::test]
    async fn reset_drops_everything() {
        let idx = seeded().await;
        idx.reset().await.unwrap();
        assert!(idx.is_empty().await);
        assert!(idx.query(vec![1.0, 0.0], 1, true).await.is_err());
    }
}
