//! gRPC client for the remote graph engine

use super::{DeleteOutcome, GraphStore};
use crate::config::GraphConfig;
use crate::errors::{AppError, Result};
use crate::models::{GraphSnapshot, IngestStats, Neighbor, TenantContext, Triple};
use crate::proto::{
    self, EmptyRequest, IngestRequest, NodeRequest, ResolveRequest, SemanticEngineClient,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument, warn};

const SOURCE_NAME: &str = "graph engine";

/// Client for `semantic_engine.SemanticEngine`.
///
/// The channel is established on first use and shared by every call
/// afterwards. A failed first connect leaves the client degraded for its
/// lifetime.
pub struct GraphStoreClient {
    endpoint: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
    channel: OnceCell<Option<Channel>>,
}

impl GraphStoreClient {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            endpoint: config
                .endpoint
                .clone()
                .filter(|e| !e.trim().is_empty()),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            channel: OnceCell::new(),
        }
    }

    /// A client with no engine behind it
    pub fn disconnected() -> Self {
        Self::new(&GraphConfig::default())
    }

    async fn client(&self) -> Option<SemanticEngineClient<Channel>> {
        let channel = self
            .channel
            .get_or_init(|| async {
                let endpoint = self.endpoint.as_deref()?;
                match self.connect(endpoint).await {
                    Ok(channel) => {
                        debug!(endpoint, "Connected to graph engine");
                        Some(channel)
                    }
                    Err(e) => {
                        warn!(endpoint, error = %e, "Graph engine unreachable, running degraded");
                        None
                    }
                }
            })
            .await;

        channel.clone().map(SemanticEngineClient::new)
    }

    async fn connect(&self, endpoint: &str) -> Result<Channel> {
        let endpoint = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| AppError::Configuration {
                message: format!("invalid graph endpoint: {e}"),
            })?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);

        endpoint
            .connect()
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, e))
    }
}

#[async_trait]
impl GraphStore for GraphStoreClient {
    #[instrument(skip_all, fields(tenant = %tenant, count = triples.len()))]
    async fn ingest(&self, triples: &[Triple], tenant: &TenantContext) -> Result<IngestStats> {
        let Some(mut client) = self.client().await else {
            // Best-effort local count
            let n = triples.len() as u32;
            return Ok(IngestStats {
                nodes_added: n,
                edges_added: n,
            });
        };

        let response = client
            .ingest_triples(IngestRequest {
                triples: triples.iter().map(proto::Triple::from).collect(),
                tenant_id: tenant.id().to_string(),
            })
            .await?
            .into_inner();

        Ok(IngestStats {
            nodes_added: response.nodes_added,
            edges_added: response.edges_added,
        })
    }

    #[instrument(skip_all, fields(tenant = %tenant, node = %node))]
    async fn neighbors(&self, node: &str, tenant: &TenantContext) -> Result<Vec<Neighbor>> {
        let Some(mut client) = self.client().await else {
            return Ok(Vec::new());
        };

        let resolved = client
            .resolve_id(ResolveRequest {
                content: node.to_string(),
                tenant_id: tenant.id().to_string(),
            })
            .await?
            .into_inner();
        if !resolved.found {
            return Ok(Vec::new());
        }

        let response = client
            .get_neighbors(NodeRequest {
                node_id: resolved.node_id,
                tenant_id: tenant.id().to_string(),
            })
            .await?
            .into_inner();

        Ok(response
            .neighbors
            .into_iter()
            .map(|n| Neighbor {
                node_id: n.node_id.to_string(),
                edge_type: n.edge_type,
            })
            .collect())
    }

    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn snapshot(&self, tenant: &TenantContext) -> Result<GraphSnapshot> {
        let Some(mut client) = self.client().await else {
            return Ok(GraphSnapshot::default());
        };

        let response = client
            .get_all_triples(EmptyRequest {
                tenant_id: tenant.id().to_string(),
            })
            .await?
            .into_inner();

        Ok(GraphSnapshot {
            triples: response.triples.into_iter().map(Triple::from).collect(),
        })
    }

    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn delete_tenant(&self, tenant: &TenantContext) -> Result<DeleteOutcome> {
        let Some(mut client) = self.client().await else {
            return Ok(DeleteOutcome {
                success: false,
                message: "graph engine not connected".to_string(),
            });
        };

        let response = client
            .delete_tenant_data(EmptyRequest {
                tenant_id: tenant.id().to_string(),
            })
            .await?
            .into_inner();

        Ok(DeleteOutcome {
            success: response.success,
            message: response.message,
        })
    }

    async fn is_connected(&self) -> bool {
        self.client().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples() -> Vec<Triple> {
        vec![
            Triple::new("Alice", "knows", "Bob"),
            Triple::new("Bob", "locatedIn", "Farm1"),
        ]
    }

    #[tokio::test]
    async fn test_degraded_ingest_echoes_input_size() {
        let client = GraphStoreClient::disconnected();
        let stats = client
            .ingest(&triples(), &TenantContext::default())
            .await
            .unwrap();
        assert_eq!(
            stats,
            IngestStats {
                nodes_added: 2,
                edges_added: 2
            }
        );
    }

    #[tokio::test]
    async fn test_degraded_reads_are_empty() {
        let client = GraphStoreClient::disconnected();
        let tenant = TenantContext::default();
        assert!(client.neighbors("Alice", &tenant).await.unwrap().is_empty());
        assert!(client.snapshot(&tenant).await.unwrap().triples.is_empty());
        assert!(!client.delete_tenant(&tenant).await.unwrap().success);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades() {
        let config = GraphConfig {
            endpoint: Some("http://127.0.0.1:1".to_string()),
            connect_timeout_ms: 200,
            request_timeout_ms: 200,
        };
        let client = GraphStoreClient::new(&config);
        let tenant = TenantContext::default();

        let stats = client.ingest(&triples(), &tenant).await.unwrap();
        assert_eq!(stats.nodes_added, 2);
        assert!(client.neighbors("Alice", &tenant).await.unwrap().is_empty());
    }
}
