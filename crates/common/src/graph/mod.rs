//! Graph store access
//!
//! The remote graph engine is an optional accelerator: when it is absent the
//! client keeps answering with degraded results instead of failing callers.

mod client;
mod memory;

pub use client::GraphStoreClient;
pub use memory::InMemoryGraphStore;

use crate::errors::Result;
use crate::models::{GraphSnapshot, IngestStats, Neighbor, TenantContext, Triple};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of dropping a tenant's graph data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}

/// Storage and traversal over tenant-scoped triples
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Store triples for a tenant
    async fn ingest(&self, triples: &[Triple], tenant: &TenantContext) -> Result<IngestStats>;

    /// Outgoing edges of the node named `node`
    async fn neighbors(&self, node: &str, tenant: &TenantContext) -> Result<Vec<Neighbor>>;

    /// All triples stored for a tenant
    async fn snapshot(&self, tenant: &TenantContext) -> Result<GraphSnapshot>;

    /// Remove every triple stored for a tenant
    async fn delete_tenant(&self, tenant: &TenantContext) -> Result<DeleteOutcome>;

    /// Whether a live backend is answering calls
    async fn is_connected(&self) -> bool;
}
