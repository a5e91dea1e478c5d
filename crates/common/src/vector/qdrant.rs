//! Qdrant-backed vector storage

use super::{VectorBackend, VectorPoint};
use crate::errors::{AppError, Result};
use crate::models::SearchHit;
use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CreateCollectionBuilder, DeletePointsBuilder, Distance, ListValue,
    PointId, PointStruct, PointsIdsList, SearchPointsBuilder, Struct, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use uuid::Uuid;

const SOURCE_NAME: &str = "vector index";

pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    pub fn connect(url: &str, api_key: Option<&str>) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| AppError::unavailable(SOURCE_NAME, e))?;
        Ok(Self { client })
    }
}

fn to_qdrant(value: &serde_json::Value) -> QdrantValue {
    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(to_qdrant).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(Struct {
            fields: map.iter().map(|(k, v)| (k.clone(), to_qdrant(v))).collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

fn from_qdrant(value: QdrantValue) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(from_qdrant).collect())
        }
        Some(Kind::StructValue(st)) => serde_json::Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, from_qdrant(v)))
                .collect(),
        ),
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, e))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == collection))
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let result = self
            .client
            .create_collection(CreateCollectionBuilder::new(collection).vectors_config(
                VectorsConfig {
                    config: Some(Config::Params(
                        VectorParamsBuilder::new(dimension as u64, Distance::Cosine).build(),
                    )),
                },
            ))
            .await;

        match result {
            Ok(_) => {
                tracing::info!(collection, "Created Qdrant collection");
                Ok(())
            }
            // Lost a creation race with another writer
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(AppError::unavailable(SOURCE_NAME, e)),
        }
    }

    async fn upsert_point(&self, collection: &str, point: VectorPoint) -> Result<()> {
        let payload: HashMap<String, QdrantValue> = point
            .payload
            .iter()
            .map(|(k, v)| (k.clone(), to_qdrant(v)))
            .collect();

        let point = PointStruct::new(point.id.to_string(), point.vector, Payload::from(payload));

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, e))?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await;

        let response = match response {
            Ok(response) => response,
            // Dropped between the existence check and the search
            Err(e) if e.to_string().contains("Not found") => return Ok(Vec::new()),
            Err(e) => return Err(AppError::unavailable(SOURCE_NAME, e)),
        };

        Ok(response
            .result
            .into_iter()
            .map(|point| SearchHit {
                node_id: point_id_string(point.id),
                score: point.score,
                metadata: point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, from_qdrant(v)))
                    .collect(),
            })
            .collect())
    }

    async fn delete_point(&self, collection: &str, id: Uuid) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList {
                        ids: vec![PointId::from(id.to_string())],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, e))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}
