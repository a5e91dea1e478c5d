//! In-process graph store, used for local runs and tests

use super::{DeleteOutcome, GraphStore};
use crate::errors::Result;
use crate::models::{GraphSnapshot, IngestStats, Neighbor, TenantContext, Triple};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct TenantGraph {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
    nodes: HashSet<String>,
}

/// Deduplicating triple store keyed by tenant
#[derive(Default)]
pub struct InMemoryGraphStore {
    tenants: RwLock<HashMap<String, TenantGraph>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn ingest(&self, triples: &[Triple], tenant: &TenantContext) -> Result<IngestStats> {
        let mut tenants = self.tenants.write().await;
        let graph = tenants.entry(tenant.id().to_string()).or_default();

        let mut stats = IngestStats::default();
        for triple in triples {
            for node in [triple.subject(), triple.object()] {
                if graph.nodes.insert(node.to_string()) {
                    stats.nodes_added += 1;
                }
            }
            if graph.seen.insert(triple.clone()) {
                graph.triples.push(triple.clone());
                stats.edges_added += 1;
            }
        }
        Ok(stats)
    }

    async fn neighbors(&self, node: &str, tenant: &TenantContext) -> Result<Vec<Neighbor>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant.id())
            .map(|graph| {
                graph
                    .triples
                    .iter()
                    .filter(|t| t.subject() == node)
                    .map(|t| Neighbor {
                        node_id: t.object().to_string(),
                        edge_type: t.predicate().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn snapshot(&self, tenant: &TenantContext) -> Result<GraphSnapshot> {
        let tenants = self.tenants.read().await;
        Ok(GraphSnapshot {
            triples: tenants
                .get(tenant.id())
                .map(|graph| graph.triples.clone())
                .unwrap_or_default(),
        })
    }

    async fn delete_tenant(&self, tenant: &TenantContext) -> Result<DeleteOutcome> {
        let removed = self.tenants.write().await.remove(tenant.id());
        let count = removed.map(|g| g.triples.len()).unwrap_or(0);
        Ok(DeleteOutcome {
            success: true,
            message: format!("removed {count} triples"),
        })
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dedup_and_neighbors() {
        let store = InMemoryGraphStore::new();
        let tenant = TenantContext::default();
        let triples = vec![
            Triple::new("Alice", "knows", "Bob"),
            Triple::new("Alice", "knows", "Bob"),
            Triple::new("Alice", "locatedIn", "Farm1"),
        ];

        let stats = store.ingest(&triples, &tenant).await.unwrap();
        assert_eq!(stats.nodes_added, 3);
        assert_eq!(stats.edges_added, 2);

        let neighbors = store.neighbors("Alice", &tenant).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].node_id, "Bob");
        assert_eq!(neighbors[1].edge_type, "locatedIn");
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryGraphStore::new();
        let a = TenantContext::new("a").unwrap();
        let b = TenantContext::new("b").unwrap();
        store
            .ingest(&[Triple::new("x", "p", "y")], &a)
            .await
            .unwrap();

        assert!(store.snapshot(&b).await.unwrap().triples.is_empty());
        assert!(store.neighbors("x", &b).await.unwrap().is_empty());

        store.delete_tenant(&a).await.unwrap();
        assert!(store.snapshot(&a).await.unwrap().triples.is_empty());
    }
}
