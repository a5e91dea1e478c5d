//! Configuration management for Grafka services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! Capability flags (which evidence sources run, whether generative synthesis
//! is attempted) are resolved here once at startup.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Tenant defaults
    #[serde(default)]
    pub tenant: TenantConfig,

    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    #[serde(default)]
    pub vector: VectorConfig,

    /// Remote graph engine configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Ontology reasoner configuration
    #[serde(default)]
    pub ontology: OntologyConfig,

    /// Generative backend configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Evidence source capability flags and bounds
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Triple extraction limits
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    /// Tenant used when a request does not name one
    #[serde(default = "default_tenant")]
    pub default_tenant: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, local
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorConfig {
    /// Qdrant URL; when absent an in-process index is used
    pub url: Option<String>,

    /// Qdrant API key
    pub api_key: Option<String>,

    /// Base collection name, suffixed with the tenant for non-default tenants
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Hits requested per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// gRPC endpoint of the graph engine; when absent the client runs degraded
    pub endpoint: Option<String>,

    /// Connect timeout in milliseconds
    #[serde(default = "default_graph_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_graph_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OntologyConfig {
    /// Path to the JSON ontology schema
    #[serde(default = "default_ontology_path")]
    pub path: String,

    /// Rule-set identifier reported with every inferred fact
    #[serde(default = "default_ruleset")]
    pub ruleset: String,

    /// Upper bound on fixpoint rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Attempt generative synthesis at all
    #[serde(default)]
    pub enabled: bool,

    /// Chat completions endpoint
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// API key
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_enabled")]
    pub reasoner_enabled: bool,

    #[serde(default = "default_enabled")]
    pub graph_enabled: bool,

    #[serde(default = "default_enabled")]
    pub vector_enabled: bool,

    /// Per-source timeout in milliseconds
    #[serde(default = "default_source_timeout")]
    pub timeout_ms: u64,

    /// Question terms looked up in the graph per query
    #[serde(default = "default_max_graph_terms")]
    pub max_graph_terms: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Document chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Cells at or above this length are treated as free text, not facts
    #[serde(default = "default_max_cell_chars")]
    pub max_cell_chars: usize,

    /// Property columns read per row after the subject column
    #[serde(default = "default_max_properties")]
    pub max_properties: usize,

    /// Keyed-object values at or above this length are skipped
    #[serde(default = "default_max_value_chars")]
    pub max_value_chars: usize,

    /// Triples included in extraction report previews
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,

    /// Directory HTTP callers may read `file_path` inputs from; unset refuses them
    #[serde(default)]
    pub allowed_root: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_tenant() -> String { crate::models::DEFAULT_TENANT.to_string() }
fn default_embedding_provider() -> String { "local".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_collection() -> String { "semantic_graph".to_string() }
fn default_top_k() -> usize { 5 }
fn default_graph_connect_timeout() -> u64 { 1_000 }
fn default_graph_request_timeout() -> u64 { 3_000 }
fn default_ontology_path() -> String { "ontology/core.json".to_string() }
fn default_ruleset() -> String { "owl-rl-lite".to_string() }
fn default_max_rounds() -> usize { 16 }
fn default_generation_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_generation_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.1 }
fn default_max_tokens() -> usize { 256 }
fn default_generation_timeout() -> u64 { 30 }
fn default_source_timeout() -> u64 { 5_000 }
fn default_max_graph_terms() -> usize { 5 }
fn default_chunk_size() -> usize { 400 }
fn default_max_cell_chars() -> usize { 50 }
fn default_max_properties() -> usize { 3 }
fn default_max_value_chars() -> usize { 100 }
fn default_preview_limit() -> usize { 50 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "grafka".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GRAPH__ENDPOINT=http://127.0.0.1:50051
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the per-source evidence timeout as Duration
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.sources.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            default_tenant: default_tenant(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            collection: default_collection(),
            top_k: default_top_k(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout_ms: default_graph_connect_timeout(),
            request_timeout_ms: default_graph_request_timeout(),
        }
    }
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            path: default_ontology_path(),
            ruleset: default_ruleset(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_generation_endpoint(),
            api_key: None,
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            reasoner_enabled: true,
            graph_enabled: true,
            vector_enabled: true,
            timeout_ms: default_source_timeout(),
            max_graph_terms: default_max_graph_terms(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_cell_chars: default_max_cell_chars(),
            max_properties: default_max_properties(),
            max_value_chars: default_max_value_chars(),
            preview_limit: default_preview_limit(),
            allowed_root: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tenant: TenantConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector: VectorConfig::default(),
            graph: GraphConfig::default(),
            ontology: OntologyConfig::default(),
            generation: GenerationConfig::default(),
            sources: SourcesConfig::default(),
            extraction: ExtractionConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
