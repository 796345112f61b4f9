//! Vector index abstraction shared by the Qdrant and in-memory backends.

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::config::VectorSpace;
use crate::errors::RagError;

/// A vector with its id and JSON payload, ready to be stored.
#[derive(Clone, Debug)]
pub struct IndexPoint {
    /// UUID string.
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// Storage for embedded chunks with similarity search.
///
/// Implementations must return query results ranked by score, best first.
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if it does not exist. Existing collections are kept.
    fn ensure_collection<'a>(&'a self, space: &'a VectorSpace) -> BoxFuture<'a, Result<(), RagError>>;

    /// Drops the collection and everything in it. Missing collections are fine.
    fn reset(&self) -> BoxFuture<'_, Result<(), RagError>>;

    /// Inserts or replaces points by id. Returns the number of points written.
    fn upsert(&self, points: Vec<IndexPoint>) -> BoxFuture<'_, Result<u64, RagError>>;

    /// Top-K similarity search returning `(score, payload)` pairs.
    fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        with_payload: bool,
    ) -> BoxFuture<'_, Result<Vec<(f32, Value)>, RagError>>;
}
