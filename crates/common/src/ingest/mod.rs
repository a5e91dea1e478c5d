//! Ingestion pipeline
//!
//! Extracted triples go to the graph store. Each subject also gets one
//! vector, embedded from a sentence-per-triple description, so the vector
//! source can find it by meaning.

use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::extraction::{ExtractInput, ExtractionReport, Extractor, InputKind};
use crate::graph::GraphStore;
use crate::models::{TenantContext, Triple};
use crate::vector::VectorIndexClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Metadata key holding the embedded description
pub const DESCRIPTION_KEY: &str = "description";
/// Metadata key holding the subject's triples
pub const TRIPLES_KEY: &str = "triples";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    #[serde(flatten)]
    pub extraction: ExtractionReport,
    pub nodes_added: u32,
    pub edges_added: u32,
    pub vectors_indexed: usize,
    pub ingested_at: DateTime<Utc>,
}

pub struct IngestionPipeline {
    extractor: Extractor,
    graph: Arc<dyn GraphStore>,
    index: Arc<VectorIndexClient>,
    embedder: Arc<dyn Embedder>,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Extractor,
        graph: Arc<dyn GraphStore>,
        index: Arc<VectorIndexClient>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            extractor,
            graph,
            index,
            embedder,
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Extract, store and index one input for a tenant
    #[instrument(skip(self, input), fields(tenant = %tenant))]
    pub async fn run(
        &self,
        input: &ExtractInput,
        kind: Option<InputKind>,
        tenant: &TenantContext,
    ) -> Result<IngestReport> {
        let (triples, mut extraction) = self.extractor.extract_input(input, kind).await?;

        if triples.is_empty() {
            return Ok(IngestReport {
                extraction,
                nodes_added: 0,
                edges_added: 0,
                vectors_indexed: 0,
                ingested_at: Utc::now(),
            });
        }

        let stats = self.graph.ingest(&triples, tenant).await?;
        extraction
            .logs
            .push(format!("Stored {} triples", triples.len()));

        let vectors_indexed = self.index_subjects(&triples, tenant).await?;
        extraction
            .logs
            .push(format!("Indexed {vectors_indexed} nodes"));

        info!(
            triples = triples.len(),
            nodes_added = stats.nodes_added,
            edges_added = stats.edges_added,
            vectors = vectors_indexed,
            "Ingestion complete"
        );

        Ok(IngestReport {
            extraction,
            nodes_added: stats.nodes_added,
            edges_added: stats.edges_added,
            vectors_indexed,
            ingested_at: Utc::now(),
        })
    }

    async fn index_subjects(&self, triples: &[Triple], tenant: &TenantContext) -> Result<usize> {
        let subjects = group_by_subject(triples);
        let descriptions: Vec<String> = subjects
            .values()
            .map(|triples| describe(triples))
            .collect();

        let embeddings = self.embedder.embed_batch(&descriptions).await?;
        if embeddings.len() != descriptions.len() {
            warn!(
                expected = descriptions.len(),
                actual = embeddings.len(),
                "Embedding batch size mismatch"
            );
        }

        let mut indexed = 0;
        for (((subject, triples), description), vector) in
            subjects.iter().zip(descriptions).zip(embeddings)
        {
            let mut metadata = HashMap::new();
            metadata.insert(
                DESCRIPTION_KEY.to_string(),
                serde_json::Value::String(description),
            );
            metadata.insert(TRIPLES_KEY.to_string(), serde_json::to_value(triples)?);

            self.index.upsert(subject, vector, metadata, tenant).await?;
            indexed += 1;
        }
        Ok(indexed)
    }
}

/// Triples keyed by subject, subjects in sorted order
fn group_by_subject(triples: &[Triple]) -> BTreeMap<String, Vec<Triple>> {
    let mut subjects: BTreeMap<String, Vec<Triple>> = BTreeMap::new();
    for triple in triples {
        subjects
            .entry(triple.subject().to_string())
            .or_default()
            .push(triple.clone());
    }
    subjects
}

/// `"s p o. s p o."`
fn describe(triples: &[Triple]) -> String {
    triples
        .iter()
        .map(|t| format!("{} {} {}.", t.subject(), t.predicate(), t.object()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::graph::InMemoryGraphStore;
    use crate::vector::InMemoryBackend;

    fn pipeline() -> (Arc<InMemoryGraphStore>, Arc<InMemoryBackend>, IngestionPipeline) {
        let graph = Arc::new(InMemoryGraphStore::new());
        let backend = Arc::new(InMemoryBackend::new());
        let embedder = Arc::new(HashingEmbedder::new(32));
        let index = Arc::new(VectorIndexClient::new(backend.clone(), "kg", 32));
        let pipeline = IngestionPipeline::new(Extractor::default(), graph.clone(), index, embedder);
        (graph, backend, pipeline)
    }

    #[test]
    fn test_describe_subject() {
        let triples = vec![
            Triple::from(("Farm1", "hasSoil", "Loam")),
            Triple::from(("Farm1", "grows", "Wheat")),
        ];
        assert_eq!(describe(&triples), "Farm1 hasSoil Loam. Farm1 grows Wheat.");
    }

    #[tokio::test]
    async fn test_tabular_ingest_stores_and_indexes() {
        let (graph, backend, pipeline) = pipeline();
        let tenant = TenantContext::default();

        let report = tokio_test::assert_ok!(
            pipeline
                .run(
                    &ExtractInput::RawText("farm,soil,crop\nFarm1,Loam,Wheat\nFarm2,Clay,Rice".into()),
                    Some(InputKind::Tabular),
                    &tenant,
                )
                .await
        );

        assert_eq!(report.extraction.triples_count, 4);
        assert_eq!(report.edges_added, 4);
        assert_eq!(report.vectors_indexed, 2);
        assert!(report.extraction.logs.iter().any(|l| l == "Stored 4 triples"));

        let snapshot = graph.snapshot(&tenant).await.unwrap();
        assert_eq!(snapshot.triples.len(), 4);
        assert_eq!(backend.point_count("kg").await, 2);
    }

    #[tokio::test]
    async fn test_nothing_extracted_touches_nothing() {
        let (graph, backend, pipeline) = pipeline();
        let tenant = TenantContext::default();

        let report = pipeline
            .run(&ExtractInput::RawText("too short".into()), None, &tenant)
            .await
            .unwrap();

        assert_eq!(report.vectors_indexed, 0);
        assert!(graph.snapshot(&tenant).await.unwrap().triples.is_empty());
        assert_eq!(backend.point_count("kg").await, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_input_error() {
        let (_, _, pipeline) = pipeline();
        let err = tokio_test::assert_err!(
            pipeline
                .run(
                    &ExtractInput::FilePath("/nonexistent/farms.csv".into()),
                    None,
                    &TenantContext::default(),
                )
                .await
        );
        assert!(err.is_client_error());
    }

    use ::metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};

    /// Sums increments of one counter, ignoring every other metric
    struct CountingRecorder {
        name: &'static str,
        total: Arc<std::sync::atomic::AtomicU64>,
    }

    impl Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == self.name {
                Counter::from_arc(self.total.clone())
            } else {
                Counter::noop()
            }
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_extracted_triples_counted_once() {
        let recorder = CountingRecorder {
            name: "grafka_triples_extracted_total",
            total: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        };
        let (_, _, pipeline) = pipeline();

        let report = ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(pipeline.run(
                &ExtractInput::RawText("farm,crop\nFarm1,Wheat\nFarm2,Rice".into()),
                Some(InputKind::Tabular),
                &TenantContext::default(),
            ))
        })
        .unwrap();

        assert_eq!(report.extraction.triples_count, 2);
        assert_eq!(recorder.total.load(std::sync::atomic::Ordering::Relaxed), 2);
    }
}
