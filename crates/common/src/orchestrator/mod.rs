//! Query orchestration
//!
//! One question runs `Received -> Dispatching -> Collecting -> Synthesizing -> Done`.
//! Evidence sources are asked concurrently, each under its own timeout, and
//! joined at a barrier. A failing or slow source becomes a failed bundle
//! entry; the query itself only fails when no source is configured.

mod state;
mod terms;

pub use state::{QueryState, QueryTrace};
pub use terms::question_terms;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::graph::GraphStore;
use crate::metrics::{record_query, record_source};
use crate::models::{
    EvidenceBundle, EvidenceEntry, EvidencePayload, EvidenceSource, GraphFact, SourceStatus,
    TenantContext,
};
use crate::reasoner::OntologyReasoner;
use crate::synthesis::Synthesizer;
use crate::vector::VectorIndexClient;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Ontology inference over the tenant's graph snapshot
#[derive(Clone)]
pub struct ReasonerSource {
    pub reasoner: Arc<OntologyReasoner>,
    pub graph: Arc<dyn GraphStore>,
}

/// Question embedding followed by nearest-neighbor search
#[derive(Clone)]
pub struct VectorSource {
    pub index: Arc<VectorIndexClient>,
    pub embedder: Arc<dyn Embedder>,
}

/// The evidence sources a query may consult; `None` means not configured
#[derive(Clone, Default)]
pub struct EvidenceSources {
    pub reasoner: Option<ReasonerSource>,
    pub graph: Option<Arc<dyn GraphStore>>,
    pub vector: Option<VectorSource>,
}

impl EvidenceSources {
    pub fn is_empty(&self) -> bool {
        self.reasoner.is_none() && self.graph.is_none() && self.vector.is_none()
    }

    pub fn configured(&self) -> Vec<EvidenceSource> {
        EvidenceSource::ALL
            .into_iter()
            .filter(|s| match s {
                EvidenceSource::Reasoner => self.reasoner.is_some(),
                EvidenceSource::Graph => self.graph.is_some(),
                EvidenceSource::Vector => self.vector.is_some(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound applied to each source independently
    pub source_timeout: Duration,
    /// Hits requested from the vector index
    pub top_k: usize,
    /// Question terms looked up in the graph
    pub max_graph_terms: usize,
}

impl OrchestratorConfig {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            source_timeout: config.source_timeout(),
            top_k: config.vector.top_k,
            max_graph_terms: config.sources.max_graph_terms,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

/// What a caller gets back for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub state: QueryState,
    pub transitions: Vec<QueryState>,
    pub sources: Vec<SourceStatus>,
}

pub struct QueryOrchestrator {
    sources: EvidenceSources,
    synthesizer: Arc<Synthesizer>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(
        sources: EvidenceSources,
        synthesizer: Arc<Synthesizer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            sources,
            synthesizer,
            config,
        }
    }

    pub fn configured_sources(&self) -> Vec<EvidenceSource> {
        self.sources.configured()
    }

    /// Answer a question for a tenant
    #[instrument(skip(self, question), fields(tenant = %tenant))]
    pub async fn answer(&self, question: &str, tenant: &TenantContext) -> Result<QueryOutcome> {
        let started = Instant::now();
        let mut trace = QueryTrace::start();

        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "question must not be empty".to_string(),
                field: Some("question".to_string()),
            });
        }

        if self.sources.is_empty() {
            trace.advance(QueryState::Failed);
            record_query(started.elapsed().as_secs_f64(), QueryState::Failed.as_str(), tenant.id());
            warn!("Query failed: no evidence sources configured");
            return Err(AppError::Configuration {
                message: "no evidence sources configured".to_string(),
            });
        }

        trace.advance(QueryState::Dispatching);
        let calls = self.dispatch(question, tenant);

        trace.advance(QueryState::Collecting);
        let bundle: EvidenceBundle = join_all(calls).await.into_iter().collect();

        trace.advance(QueryState::Synthesizing);
        let answer = self.synthesizer.synthesize(question, &bundle).await;

        trace.advance(QueryState::Done);
        let sources = bundle.summary();
        info!(
            succeeded = sources.iter().filter(|s| s.succeeded).count(),
            failed = sources.iter().filter(|s| !s.succeeded).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );
        record_query(started.elapsed().as_secs_f64(), QueryState::Done.as_str(), tenant.id());

        Ok(QueryOutcome {
            answer,
            state: trace.current(),
            transitions: trace.into_transitions(),
            sources,
        })
    }

    /// Like [`answer`](Self::answer), abandoned as soon as `cancel` fires.
    /// In-flight source calls are dropped and nothing is synthesized.
    pub async fn answer_with_cancellation(
        &self,
        question: &str,
        tenant: &TenantContext,
        cancel: CancellationToken,
    ) -> Result<QueryOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(tenant = %tenant, "Query cancelled");
                Err(AppError::Cancelled)
            }
            outcome = self.answer(question, tenant) => outcome,
        }
    }

    /// One guarded future per configured source, in dispatch order
    fn dispatch<'a>(
        &'a self,
        question: &'a str,
        tenant: &'a TenantContext,
    ) -> Vec<BoxFuture<'a, EvidenceEntry>> {
        let mut calls = Vec::with_capacity(3);

        if let Some(source) = &self.sources.reasoner {
            calls.push(self.guard(EvidenceSource::Reasoner, reasoner_call(source, tenant)));
        }
        if let Some(graph) = &self.sources.graph {
            calls.push(self.guard(
                EvidenceSource::Graph,
                graph_call(graph.as_ref(), question, tenant, self.config.max_graph_terms),
            ));
        }
        if let Some(source) = &self.sources.vector {
            calls.push(self.guard(
                EvidenceSource::Vector,
                vector_call(source, question, tenant, self.config.top_k),
            ));
        }

        debug!(sources = calls.len(), "Dispatched evidence calls");
        calls
    }

    /// Bound a source call by the timeout and turn any error into a failed entry
    fn guard<'a, F>(&self, source: EvidenceSource, call: F) -> BoxFuture<'a, EvidenceEntry>
    where
        F: std::future::Future<Output = Result<EvidencePayload>> + Send + 'a,
    {
        let timeout = self.config.source_timeout;
        async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout {
                    source_name: source.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
            let elapsed = started.elapsed();
            record_source(source.as_str(), elapsed.as_secs_f64(), result.is_ok());

            let entry = match result {
                Ok(payload) => EvidenceEntry::succeeded(source, payload),
                Err(e) => {
                    if e.is_degradable() {
                        warn!(source = %source, error = %e, "Evidence source failed");
                    } else {
                        error!(source = %source, error = %e, "Evidence source failed");
                    }
                    EvidenceEntry::failed(source, &e)
                }
            };
            entry.with_elapsed_ms(elapsed.as_millis() as u64)
        }
        .boxed()
    }
}

async fn reasoner_call(source: &ReasonerSource, tenant: &TenantContext) -> Result<EvidencePayload> {
    if !source.reasoner.is_loaded() {
        return Err(AppError::unavailable("ontology schema", "schema not loaded"));
    }
    let snapshot = source.graph.snapshot(tenant).await?;

    // Inference is CPU bound; keep it off the runtime workers and stop it
    // once this call is dropped
    let reasoner = source.reasoner.clone();
    let cancel = CancellationToken::new();
    let _stop = cancel.clone().drop_guard();
    let report = tokio::task::spawn_blocking(move || reasoner.infer_until(&snapshot, &cancel))
        .await
        .map_err(|e| AppError::unavailable("ontology reasoner", e))?;
    Ok(EvidencePayload::Inferred(report))
}

async fn graph_call(
    graph: &dyn GraphStore,
    question: &str,
    tenant: &TenantContext,
    max_terms: usize,
) -> Result<EvidencePayload> {
    let terms = question_terms(question, max_terms);
    let lookups = terms.iter().map(|term| graph.neighbors(term, tenant));
    let results = join_all(lookups).await;

    let mut facts = Vec::new();
    for (term, neighbors) in terms.iter().zip(results) {
        for neighbor in neighbors? {
            facts.push(GraphFact {
                node: term.clone(),
                edge_type: neighbor.edge_type,
                neighbor_id: neighbor.node_id,
            });
        }
    }
    Ok(EvidencePayload::GraphFacts(facts))
}

async fn vector_call(
    source: &VectorSource,
    question: &str,
    tenant: &TenantContext,
    top_k: usize,
) -> Result<EvidencePayload> {
    let embedding = source.embedder.embed(question).await?;
    let hits = source.index.search(&embedding, top_k, tenant).await?;
    Ok(EvidencePayload::SearchHits(hits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OntologyConfig;
    use crate::embeddings::HashingEmbedder;
    use crate::graph::{DeleteOutcome, InMemoryGraphStore};
    use crate::models::{GraphSnapshot, IngestStats, Neighbor, Triple};
    use crate::reasoner::OntologySchema;
    use crate::synthesis::NO_INFORMATION_MESSAGE;
    use crate::vector::InMemoryBackend;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    /// Graph store that never answers in time
    struct StalledGraph;

    #[async_trait]
    impl GraphStore for StalledGraph {
        async fn ingest(&self, triples: &[Triple], _: &TenantContext) -> Result<IngestStats> {
            Ok(IngestStats {
                nodes_added: 0,
                edges_added: triples.len() as u32,
            })
        }

        async fn neighbors(&self, _: &str, _: &TenantContext) -> Result<Vec<Neighbor>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        async fn snapshot(&self, _: &TenantContext) -> Result<GraphSnapshot> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(GraphSnapshot::default())
        }

        async fn delete_tenant(&self, _: &TenantContext) -> Result<DeleteOutcome> {
            Ok(DeleteOutcome {
                success: true,
                message: String::new(),
            })
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    /// In-memory graph whose snapshot arrives late
    struct SlowSnapshot {
        inner: Arc<InMemoryGraphStore>,
        delay: Duration,
    }

    #[async_trait]
    impl GraphStore for SlowSnapshot {
        async fn ingest(&self, triples: &[Triple], tenant: &TenantContext) -> Result<IngestStats> {
            self.inner.ingest(triples, tenant).await
        }

        async fn neighbors(&self, node: &str, tenant: &TenantContext) -> Result<Vec<Neighbor>> {
            self.inner.neighbors(node, tenant).await
        }

        async fn snapshot(&self, tenant: &TenantContext) -> Result<GraphSnapshot> {
            tokio::time::sleep(self.delay).await;
            self.inner.snapshot(tenant).await
        }

        async fn delete_tenant(&self, tenant: &TenantContext) -> Result<DeleteOutcome> {
            self.inner.delete_tenant(tenant).await
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>> {
            Err(AppError::EmbeddingError {
                message: "backend down".into(),
            })
        }

        async fn embed_batch(&self, _: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AppError::EmbeddingError {
                message: "backend down".into(),
            })
        }

        fn model_name(&self) -> &str {
            "broken"
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            source_timeout: Duration::from_millis(100),
            top_k: 3,
            max_graph_terms: 5,
        }
    }

    fn tenant() -> TenantContext {
        TenantContext::default()
    }

    fn location_reasoner() -> Arc<OntologyReasoner> {
        let schema = OntologySchema {
            transitive: BTreeSet::from(["locatedIn".to_string()]),
            ..OntologySchema::default()
        };
        Arc::new(OntologyReasoner::new(schema, &OntologyConfig::default()))
    }

    async fn seeded_graph() -> Arc<InMemoryGraphStore> {
        let graph = Arc::new(InMemoryGraphStore::new());
        graph
            .ingest(
                &[
                    Triple::from(("Alice", "locatedIn", "Farm1")),
                    Triple::from(("Farm1", "locatedIn", "Valley")),
                ],
                &tenant(),
            )
            .await
            .unwrap();
        graph
    }

    fn vector_source(embedder: Arc<dyn Embedder>) -> VectorSource {
        VectorSource {
            index: Arc::new(VectorIndexClient::new(
                Arc::new(InMemoryBackend::new()),
                "test",
                embedder.dimension(),
            )),
            embedder,
        }
    }

    #[tokio::test]
    async fn test_no_sources_is_configuration_error() {
        let orchestrator = QueryOrchestrator::new(
            EvidenceSources::default(),
            Arc::new(Synthesizer::fallback_only()),
            config(),
        );
        let err = orchestrator.answer("Where is Alice?", &tenant()).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let graph: Arc<dyn GraphStore> = seeded_graph().await;
        let orchestrator = QueryOrchestrator::new(
            EvidenceSources {
                graph: Some(graph),
                ..EvidenceSources::default()
            },
            Arc::new(Synthesizer::fallback_only()),
            config(),
        );
        let err = orchestrator.answer("   ", &tenant()).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_lifecycle_and_source_order() {
        let graph: Arc<dyn GraphStore> = seeded_graph().await;
        let sources = EvidenceSources {
            reasoner: Some(ReasonerSource {
                reasoner: location_reasoner(),
                graph: graph.clone(),
            }),
            graph: Some(graph),
            vector: Some(vector_source(Arc::new(HashingEmbedder::new(16)))),
        };
        let orchestrator =
            QueryOrchestrator::new(sources, Arc::new(Synthesizer::fallback_only()), config());

        let outcome = orchestrator.answer("Where is Alice?", &tenant()).await.unwrap();

        assert_eq!(outcome.state, QueryState::Done);
        assert_eq!(
            outcome.transitions,
            vec![
                QueryState::Received,
                QueryState::Dispatching,
                QueryState::Collecting,
                QueryState::Synthesizing,
                QueryState::Done,
            ]
        );
        let order: Vec<_> = outcome.sources.iter().map(|s| s.source).collect();
        assert_eq!(order, EvidenceSource::ALL.to_vec());
        assert!(outcome.sources.iter().all(|s| s.succeeded));
        assert!(outcome.answer.contains("(Alice, locatedIn, Valley)"));
        assert!(outcome.answer.contains("Graph Data"));
    }

    #[tokio::test]
    async fn test_stalled_source_times_out_without_failing_query() {
        let stalled: Arc<dyn GraphStore> = Arc::new(StalledGraph);
        let sources = EvidenceSources {
            reasoner: Some(ReasonerSource {
                reasoner: location_reasoner(),
                graph: seeded_graph().await,
            }),
            graph: Some(stalled),
            vector: None,
        };
        let orchestrator =
            QueryOrchestrator::new(sources, Arc::new(Synthesizer::fallback_only()), config());

        let started = Instant::now();
        let outcome = orchestrator.answer("Where is Alice?", &tenant()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(outcome.state, QueryState::Done);
        let graph = &outcome.sources[1];
        assert_eq!(graph.source, EvidenceSource::Graph);
        assert!(!graph.succeeded);
        assert!(graph.reason.as_deref().unwrap_or_default().contains("timed out"));
        assert!(outcome.sources[0].succeeded);
    }

    #[tokio::test]
    async fn test_all_sources_failing_still_answers() {
        let stalled: Arc<dyn GraphStore> = Arc::new(StalledGraph);
        let sources = EvidenceSources {
            reasoner: Some(ReasonerSource {
                reasoner: Arc::new(OntologyReasoner::unloaded(&OntologyConfig::default())),
                graph: stalled.clone(),
            }),
            graph: Some(stalled),
            vector: Some(vector_source(Arc::new(BrokenEmbedder))),
        };
        let orchestrator =
            QueryOrchestrator::new(sources, Arc::new(Synthesizer::fallback_only()), config());

        let outcome = orchestrator.answer("Where is Alice?", &tenant()).await.unwrap();
        assert_eq!(outcome.state, QueryState::Done);
        assert_eq!(outcome.answer, NO_INFORMATION_MESSAGE);
        // Vector fails at once while graph is still stalled; order holds
        let order: Vec<_> = outcome.sources.iter().map(|s| s.source).collect();
        assert_eq!(order, EvidenceSource::ALL.to_vec());
        assert!(outcome.sources.iter().all(|s| !s.succeeded));
    }

    #[tokio::test]
    async fn test_slow_reasoner_still_renders_first() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(16));
        let vector = vector_source(embedder.clone());
        let mut metadata = std::collections::HashMap::new();
        metadata.insert(
            "description".to_string(),
            serde_json::Value::String("Alice locatedIn Farm1.".into()),
        );
        vector
            .index
            .upsert(
                "Alice",
                embedder.embed("Alice locatedIn Farm1.").await.unwrap(),
                metadata,
                &tenant(),
            )
            .await
            .unwrap();

        let slow: Arc<dyn GraphStore> = Arc::new(SlowSnapshot {
            inner: seeded_graph().await,
            delay: Duration::from_millis(200),
        });
        let sources = EvidenceSources {
            reasoner: Some(ReasonerSource {
                reasoner: location_reasoner(),
                graph: slow,
            }),
            graph: None,
            vector: Some(vector),
        };
        let orchestrator = QueryOrchestrator::new(
            sources,
            Arc::new(Synthesizer::fallback_only()),
            OrchestratorConfig {
                source_timeout: Duration::from_secs(5),
                ..config()
            },
        );

        let outcome = orchestrator.answer("Where is Alice?", &tenant()).await.unwrap();

        let order: Vec<_> = outcome.sources.iter().map(|s| s.source).collect();
        assert_eq!(order, vec![EvidenceSource::Reasoner, EvidenceSource::Vector]);
        assert!(outcome.sources.iter().all(|s| s.succeeded));
        let deductions = outcome.answer.find("Logical Deductions").unwrap();
        let context = outcome.answer.find("Search Results").unwrap();
        assert!(deductions < context);
    }

    #[tokio::test]
    async fn test_heavy_inference_is_bounded_by_timeout() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let chain: Vec<Triple> = (0..600)
            .map(|i| Triple::new(format!("n{i}"), "next", format!("n{}", i + 1)))
            .collect();
        graph.ingest(&chain, &tenant()).await.unwrap();

        let schema = OntologySchema {
            transitive: BTreeSet::from(["next".to_string()]),
            ..OntologySchema::default()
        };
        let graph: Arc<dyn GraphStore> = graph;
        let sources = EvidenceSources {
            reasoner: Some(ReasonerSource {
                reasoner: Arc::new(OntologyReasoner::new(schema, &OntologyConfig::default())),
                graph: graph.clone(),
            }),
            graph: Some(graph),
            vector: None,
        };
        let orchestrator = QueryOrchestrator::new(
            sources,
            Arc::new(Synthesizer::fallback_only()),
            OrchestratorConfig {
                source_timeout: Duration::from_millis(5),
                ..config()
            },
        );

        let started = Instant::now();
        let outcome = orchestrator.answer("Where is n3?", &tenant()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        let reasoner = &outcome.sources[0];
        assert_eq!(reasoner.source, EvidenceSource::Reasoner);
        assert!(!reasoner.succeeded);
        assert!(reasoner.reason.as_deref().unwrap_or_default().contains("timed out"));
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app = AppConfig::default();
        app.sources.timeout_ms = 250;
        app.vector.top_k = 7;
        let config = OrchestratorConfig::new(&app);
        assert_eq!(config.source_timeout, Duration::from_millis(250));
        assert_eq!(config.top_k, 7);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let stalled: Arc<dyn GraphStore> = Arc::new(StalledGraph);
        let orchestrator = QueryOrchestrator::new(
            EvidenceSources {
                graph: Some(stalled),
                ..EvidenceSources::default()
            },
            Arc::new(Synthesizer::fallback_only()),
            OrchestratorConfig {
                source_timeout: Duration::from_secs(30),
                ..config()
            },
        );

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orchestrator
            .answer_with_cancellation("Where is Alice?", &tenant(), token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
