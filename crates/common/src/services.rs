//! Service wiring shared by the gateway and the ingestion CLI

use crate::config::AppConfig;
use crate::embeddings::{create_embedder, Embedder};
use crate::errors::{AppError, Result};
use crate::extraction::Extractor;
use crate::graph::{GraphStore, GraphStoreClient, InMemoryGraphStore};
use crate::ingest::IngestionPipeline;
use crate::orchestrator::{
    EvidenceSources, OrchestratorConfig, QueryOrchestrator, ReasonerSource, VectorSource,
};
use crate::reasoner::OntologyReasoner;
use crate::synthesis::Synthesizer;
use crate::vector::{InMemoryBackend, QdrantBackend, VectorBackend, VectorIndexClient};
use std::sync::Arc;
use tracing::info;

/// Every long-lived component, built once at startup
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub graph: Arc<dyn GraphStore>,
    pub vector_index: Arc<VectorIndexClient>,
    pub embedder: Arc<dyn Embedder>,
    pub reasoner: Arc<OntologyReasoner>,
    pub synthesizer: Arc<Synthesizer>,
    pub orchestrator: Arc<QueryOrchestrator>,
    pub ingestion: Arc<IngestionPipeline>,
}

impl Services {
    /// Build from config. A graph endpoint selects the remote engine and a
    /// vector URL selects Qdrant; without them both run in process.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let graph: Arc<dyn GraphStore> = match &config.graph.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                Arc::new(GraphStoreClient::new(&config.graph))
            }
            _ => Arc::new(InMemoryGraphStore::new()),
        };

        let embedder = create_embedder(&config.embedding)?;
        let backend: Arc<dyn VectorBackend> = match &config.vector.url {
            Some(url) => Arc::new(QdrantBackend::connect(url, config.vector.api_key.as_deref())?),
            None => Arc::new(InMemoryBackend::new()),
        };
        Self::assemble(config, graph, backend, embedder)
    }

    /// Build around explicit backends
    pub fn assemble(
        config: &AppConfig,
        graph: Arc<dyn GraphStore>,
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if embedder.dimension() != config.embedding.dimension {
            return Err(AppError::Configuration {
                message: format!(
                    "embedder produces {} dimensions but embedding.dimension is {}",
                    embedder.dimension(),
                    config.embedding.dimension
                ),
            });
        }

        let vector_index = Arc::new(VectorIndexClient::new(
            backend,
            config.vector.collection.clone(),
            config.embedding.dimension,
        ));
        let reasoner = Arc::new(OntologyReasoner::load(&config.ontology));
        let synthesizer = Arc::new(Synthesizer::from_config(&config.generation)?);

        let sources = EvidenceSources {
            reasoner: config.sources.reasoner_enabled.then(|| ReasonerSource {
                reasoner: reasoner.clone(),
                graph: graph.clone(),
            }),
            graph: config.sources.graph_enabled.then(|| graph.clone()),
            vector: config.sources.vector_enabled.then(|| VectorSource {
                index: vector_index.clone(),
                embedder: embedder.clone(),
            }),
        };

        let orchestrator = Arc::new(QueryOrchestrator::new(
            sources,
            synthesizer.clone(),
            OrchestratorConfig::new(config),
        ));

        let ingestion = Arc::new(IngestionPipeline::new(
            Extractor::new(config.extraction.clone()),
            graph.clone(),
            vector_index.clone(),
            embedder.clone(),
        ));

        info!(
            vector_backend = vector_index.backend_name(),
            embedding_model = embedder.model_name(),
            reasoner_loaded = reasoner.is_loaded(),
            generation = synthesizer.generation_enabled(),
            sources = ?orchestrator.configured_sources(),
            "Services initialized"
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            graph,
            vector_index,
            embedder,
            reasoner,
            synthesizer,
            orchestrator,
            ingestion,
        })
    }
}
