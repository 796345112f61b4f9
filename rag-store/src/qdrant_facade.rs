//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! This facade concentrates all Qdrant interactions behind [`VectorIndex`],
//! hiding away the verbose builder pattern and keeping the rest of the
//! application decoupled from `qdrant-client`.

use std::collections::HashMap;

use futures::future::BoxFuture;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, ListValue, PointId, PointStruct, SearchParamsBuilder,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder,
    Vectors, value,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::{DistanceKind, RagConfig, VectorSpace};
use crate::errors::RagError;
use crate::index::{IndexPoint, VectorIndex};

/// A facade over the Qdrant client bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    exact: bool,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// No request is sent; the gRPC channel connects lazily.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(|e| RagError::qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            exact: cfg.exact_search,
        })
    }

    async fn ensure_collection_impl(&self, space: &VectorSpace) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::qdrant(e.to_string()))?;
        if exists {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        let distance = match space.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(space.size as u64, distance)),
            )
            .await
            .map_err(|e| RagError::qdrant(e.to_string()))?;

        info!(
            collection = %self.collection,
            size = space.size,
            distance = ?space.distance,
            "collection created"
        );
        Ok(())
    }

    async fn reset_impl(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::qdrant(e.to_string()))?;
        if exists {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| RagError::qdrant(e.to_string()))?;
            info!(collection = %self.collection, "collection dropped");
        }
        Ok(())
    }

    async fn upsert_impl(&self, points: Vec<IndexPoint>) -> Result<u64, RagError> {
        if points.is_empty() {
            return Ok(0);
        }
        let n = points.len() as u64;
        let points: Vec<PointStruct> = points.into_iter().map(to_point_struct).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| RagError::qdrant(e.to_string()))?;

        debug!(collection = %self.collection, points = n, "upsert acknowledged");
        Ok(n)
    }

    #[instrument(skip_all, fields(collection = %self.collection, top_k = top_k))]
    async fn query_impl(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        with_payload: bool,
    ) -> Result<Vec<(f32, Value)>, RagError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(with_payload);
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::qdrant(e.to_string()))?;

        let out: Vec<(f32, Value)> = res
            .result
            .into_iter()
            .map(|r| (r.score, qpayload_to_json(r.payload)))
            .collect();

        debug!(hits = out.len(), "search completed");
        Ok(out)
    }
}

impl VectorIndex for QdrantFacade {
    fn ensure_collection<'a>(&'a self, space: &'a VectorSpace) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.ensure_collection_impl(space))
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), RagError>> {
        Box::pin(self.reset_impl())
    }

    fn upsert(&self, points: Vec<IndexPoint>) -> BoxFuture<'_, Result<u64, RagError>> {
        Box::pin(self.upsert_impl(points))
    }

    fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        with_payload: bool,
    ) -> BoxFuture<'_, Result<Vec<(f32, Value)>, RagError>> {
        Box::pin(self.query_impl(vector, top_k, with_payload))
    }
}

fn to_point_struct(p: IndexPoint) -> PointStruct {
    let payload: HashMap<String, QValue> = p
        .payload
        .into_iter()
        .map(|(k, v)| (k, json_to_qvalue(v)))
        .collect();
    let id: PointId = p.id.into();
    PointStruct {
        id: Some(id),
        payload,
        vectors: Some(Vectors::from(p.vector)),
        ..Default::default()
    }
}

/// Converts `serde_json::Value` into Qdrant `Value` (handles arrays/objects).
fn json_to_qvalue(v: Value) -> QValue {
    use value::Kind as K;
    let kind = match v {
        Value::String(s) => Some(K::StringValue(s)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(K::IntegerValue(i)),
            None => Some(K::DoubleValue(n.as_f64().unwrap_or_default())),
        },
        Value::Bool(b) => Some(K::BoolValue(b)),
        Value::Array(arr) => Some(K::ListValue(ListValue {
            values: arr.into_iter().map(json_to_qvalue).collect(),
        })),
        Value::Object(map) => Some(K::StructValue(Struct {
            fields: map.into_iter().map(|(k, v)| (k, json_to_qvalue(v))).collect(),
        })),
        Value::Null => None,
    };
    QValue { kind }
}

fn qvalue_to_json(v: QValue) -> Value {
    use value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => Value::String(s),
        Some(K::IntegerValue(i)) => Value::from(i),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => Value::Bool(b),
        Some(K::ListValue(l)) => Value::Array(l.values.into_iter().map(qvalue_to_json).collect()),
        Some(K::StructValue(s)) => qpayload_to_json(s.fields),
        Some(K::NullValue(_)) | None => Value::Null,
    }
}

/// Converts a Qdrant payload (`HashMap<String, qdrant::Value>`) into a JSON object.
fn qpayload_to_json(p: HashMap<String, QValue>) -> Value {
    Value::Object(p.into_iter().map(|(k, v)| (k, qvalue_to_json(v))).collect())
}
