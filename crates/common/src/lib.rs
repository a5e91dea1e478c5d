//! Grafka Common Library
//!
//! Shared code for the Grafka gateway and ingestion CLI including:
//! - Triple extraction and the ingestion pipeline
//! - Graph store and vector index clients
//! - Ontology reasoning
//! - Query orchestration and evidence synthesis
//! - Error types, configuration, and metrics
//! - gRPC messages for the graph engine

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod extraction;
pub mod graph;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod proto;
pub mod reasoner;
pub mod services;
pub mod synthesis;
pub mod vector;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use graph::GraphStore;
pub use models::{TenantContext, Triple};
pub use orchestrator::{QueryOrchestrator, QueryOutcome, QueryState};
pub use services::Services;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
