//! In-process cosine index

use super::{VectorBackend, VectorPoint};
use crate::errors::{AppError, Result};
use crate::models::SearchHit;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Collection {
    dimension: usize,
    /// Insertion order is the tie-breaker for equal scores
    points: Vec<VectorPoint>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection, zero when it does not exist
    pub async fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension,
                points: Vec::new(),
            });
        Ok(())
    }

    async fn upsert_point(&self, collection: &str, point: VectorPoint) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| {
            AppError::unavailable("vector index", format!("collection {collection} not found"))
        })?;

        if point.vector.len() != target.dimension {
            return Err(AppError::DimensionMismatch {
                expected: target.dimension,
                actual: point.vector.len(),
            });
        }

        match target.points.iter_mut().find(|p| p.id == point.id) {
            Some(existing) => *existing = point,
            None => target.points.push(point),
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read().await;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &VectorPoint)> = target
            .points
            .iter()
            .map(|p| (cosine(vector, &p.vector), p))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, point)| SearchHit {
                node_id: point.id.to_string(),
                score,
                metadata: point.payload.clone(),
            })
            .collect())
    }

    async fn delete_point(&self, collection: &str, id: Uuid) -> Result<()> {
        if let Some(target) = self.collections.write().await.get_mut(collection) {
            target.points.retain(|p| p.id != id);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
