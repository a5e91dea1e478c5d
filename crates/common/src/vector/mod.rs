//! Tenant-scoped vector index
//!
//! Node identifiers are mapped to UUIDv5 point ids (DNS namespace) and the
//! original identifier travels in the payload under `original_id`. Each
//! tenant owns one collection: `{base}` for the default tenant,
//! `{base}_{tenant}` for everyone else.

mod memory;
mod qdrant;

pub use memory::InMemoryBackend;
pub use qdrant::QdrantBackend;

use crate::errors::{AppError, Result};
use crate::models::{SearchHit, TenantContext};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Payload key holding the caller's node identifier
pub const ORIGINAL_ID_KEY: &str = "original_id";

/// A point as handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// Collection-scoped point storage
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Create a cosine collection; an already existing collection is success
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    async fn upsert_point(&self, collection: &str, point: VectorPoint) -> Result<()>;

    /// Hits carry the backend point id as `node_id`
    async fn search(&self, collection: &str, vector: &[f32], top_k: usize)
        -> Result<Vec<SearchHit>>;

    /// Removing a missing point is success
    async fn delete_point(&self, collection: &str, id: Uuid) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Vector index client enforcing dimension, naming and tenancy rules
pub struct VectorIndexClient {
    backend: Arc<dyn VectorBackend>,
    base_name: String,
    dimension: usize,
}

impl VectorIndexClient {
    pub fn new(backend: Arc<dyn VectorBackend>, base_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            backend,
            base_name: base_name.into(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Collection backing a tenant
    pub fn collection_name(&self, tenant: &TenantContext) -> String {
        if tenant.is_default() {
            self.base_name.clone()
        } else {
            format!("{}_{}", self.base_name, tenant.id())
        }
    }

    /// Deterministic point id for a node identifier
    pub fn point_id(node_id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, node_id.as_bytes())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Create the tenant's collection if needed. Safe under concurrent callers.
    pub async fn ensure_collection(&self, tenant: &TenantContext) -> Result<()> {
        let collection = self.collection_name(tenant);
        if !self.backend.collection_exists(&collection).await? {
            debug!(collection = %collection, "Creating vector collection");
            self.backend
                .create_collection(&collection, self.dimension)
                .await?;
        }
        Ok(())
    }

    /// Insert or replace the vector stored for `node_id`
    #[instrument(skip(self, vector, metadata), fields(tenant = %tenant))]
    pub async fn upsert(
        &self,
        node_id: &str,
        vector: Vec<f32>,
        metadata: HashMap<String, serde_json::Value>,
        tenant: &TenantContext,
    ) -> Result<()> {
        self.check_dimension(&vector)?;
        self.ensure_collection(tenant).await?;

        let mut payload = metadata;
        payload.insert(
            ORIGINAL_ID_KEY.to_string(),
            serde_json::Value::String(node_id.to_string()),
        );

        self.backend
            .upsert_point(
                &self.collection_name(tenant),
                VectorPoint {
                    id: Self::point_id(node_id),
                    vector,
                    payload,
                },
            )
            .await
    }

    /// Nearest neighbors by descending score; empty when the tenant has no collection yet
    #[instrument(skip(self, query), fields(tenant = %tenant))]
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        tenant: &TenantContext,
    ) -> Result<Vec<SearchHit>> {
        self.check_dimension(query)?;

        let collection = self.collection_name(tenant);
        if top_k == 0 || !self.backend.collection_exists(&collection).await? {
            return Ok(Vec::new());
        }

        let hits = self.backend.search(&collection, query, top_k).await?;
        Ok(hits
            .into_iter()
            .map(|mut hit| {
                if let Some(original) = hit
                    .metadata
                    .get(ORIGINAL_ID_KEY)
                    .and_then(|v| v.as_str())
                {
                    hit.node_id = original.to_string();
                }
                hit
            })
            .collect())
    }

    /// Remove the vector for `node_id`; deleting twice is the same as once
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn delete(&self, node_id: &str, tenant: &TenantContext) -> Result<()> {
        let collection = self.collection_name(tenant);
        if !self.backend.collection_exists(&collection).await? {
            return Ok(());
        }
        self.backend
            .delete_point(&collection, Self::point_id(node_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dimension: usize) -> (Arc<InMemoryBackend>, VectorIndexClient) {
        let backend = Arc::new(InMemoryBackend::new());
        let client = VectorIndexClient::new(backend.clone(), "semantic_graph", dimension);
        (backend, client)
    }

    #[test]
    fn test_collection_naming() {
        let (_, client) = client(3);
        assert_eq!(client.collection_name(&TenantContext::default()), "semantic_graph");
        assert_eq!(
            client.collection_name(&TenantContext::new("acme").unwrap()),
            "semantic_graph_acme"
        );
    }

    #[test]
    fn test_point_id_is_stable_uuid5() {
        let a = VectorIndexClient::point_id("Alice");
        assert_eq!(a, VectorIndexClient::point_id("Alice"));
        assert_ne!(a, VectorIndexClient::point_id("Bob"));
        assert_eq!(a.get_version_num(), 5);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_writes_nothing() {
        let (backend, client) = client(3);
        let tenant = TenantContext::default();

        let err = client
            .upsert("Alice", vec![1.0, 0.0], HashMap::new(), &tenant)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(backend.point_count("semantic_graph").await, 0);
        assert!(!backend.collection_exists("semantic_graph").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_missing_collection_is_empty() {
        let (_, client) = client(3);
        let hits = client
            .search(&[1.0, 0.0, 0.0], 5, &TenantContext::new("nobody").unwrap())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_search_returns_original_id() {
        let (_, client) = client(3);
        let tenant = TenantContext::default();
        let mut metadata = HashMap::new();
        metadata.insert("description".to_string(), serde_json::json!("Farm1 has rich soil"));

        client
            .upsert("Farm1", vec![1.0, 0.0, 0.0], metadata, &tenant)
            .await
            .unwrap();
        client
            .upsert("Alice", vec![0.0, 1.0, 0.0], HashMap::new(), &tenant)
            .await
            .unwrap();

        let hits = client.search(&[0.9, 0.1, 0.0], 2, &tenant).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node_id, "Farm1");
        assert_eq!(hits[0].text(), Some("Farm1 has rich soil"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (backend, client) = client(2);
        let tenant = TenantContext::default();
        client
            .upsert("n1", vec![1.0, 0.0], HashMap::new(), &tenant)
            .await
            .unwrap();

        client.delete("n1", &tenant).await.unwrap();
        let after_once = backend.point_count("semantic_graph").await;
        client.delete("n1", &tenant).await.unwrap();
        assert_eq!(backend.point_count("semantic_graph").await, after_once);
        assert_eq!(after_once, 0);

        // Unknown tenant, unknown node
        client
            .delete("ghost", &TenantContext::new("other").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_first_writers() {
        let (backend, client) = client(2);
        let client = Arc::new(client);
        let tenant = TenantContext::new("race").unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let client = client.clone();
                let tenant = tenant.clone();
                tokio::spawn(async move {
                    client
                        .upsert(&format!("n{i}"), vec![1.0, i as f32], HashMap::new(), &tenant)
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(backend.point_count("semantic_graph_race").await, 8);
    }
}
