//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One chunk of the source document on its way into the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RagRecord {
    /// Point id (UUID string).
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl RagRecord {
    /// Metadata stored next to the vector.
    pub fn payload(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("text".into(), Value::String(self.text.clone()));
        m.insert("source".into(), Value::String(self.source.clone()));
        m.insert("chunk_index".into(), Value::from(self.chunk_index as u64));
        m
    }
}

/// Query parameters for RAG retrieval.
#[derive(Clone, Copy, Debug)]
pub struct RagQuery<'a> {
    pub text: &'a str,
    pub top_k: u64,
}

/// A single retrieval hit with score, text and source.
#[derive(Clone, Debug, Serialize)]
pub struct RagHit {
    pub score: f32,
    /// Chunk text; empty when the payload carried none.
    pub text: String,
    pub source: Option<String>,
    pub chunk_index: Option<u64>,
    pub payload: Value,
}

impl RagHit {
    /// Maps a `(score, payload)` pair returned by an index.
    pub fn from_payload(score: f32, payload: Value) -> Self {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source = payload
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string);
        let chunk_index = payload.get("chunk_index").and_then(Value::as_u64);
        Self {
            score,
            text,
            source,
            chunk_index,
            payload,
        }
    }
}
