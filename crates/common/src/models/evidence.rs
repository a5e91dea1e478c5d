//! Evidence types exchanged between the evidence sources, the orchestrator
//! and the synthesizer

use super::Triple;
use crate::errors::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Metadata keys that carry human-readable hit text, in lookup order
pub const HIT_TEXT_KEYS: &[&str] = &["description", "content"];

/// Where a piece of evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    Reasoner,
    Graph,
    Vector,
}

impl EvidenceSource {
    /// Fixed dispatch order
    pub const ALL: [EvidenceSource; 3] = [
        EvidenceSource::Reasoner,
        EvidenceSource::Graph,
        EvidenceSource::Vector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSource::Reasoner => "reasoner",
            EvidenceSource::Graph => "graph",
            EvidenceSource::Vector => "vector",
        }
    }
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nearest-neighbor result from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub node_id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SearchHit {
    /// Readable text carried by the hit, if any
    pub fn text(&self) -> Option<&str> {
        HIT_TEXT_KEYS.iter().find_map(|key| {
            self.metadata
                .get(*key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
        })
    }
}

/// A derived triple with its provenance. Never written to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredFact {
    pub triple: Triple,
    pub rule: String,
    pub ruleset: String,
}

/// Output of one reasoner run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceReport {
    pub facts: Vec<InferredFact>,
    pub rules_applied: BTreeMap<String, usize>,
    pub ruleset: String,
}

impl InferenceReport {
    pub fn empty(ruleset: impl Into<String>) -> Self {
        Self {
            facts: Vec::new(),
            rules_applied: BTreeMap::new(),
            ruleset: ruleset.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// A neighbor edge as returned by the graph engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub node_id: String,
    pub edge_type: String,
}

/// A neighbor relation found for one question term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFact {
    pub node: String,
    pub edge_type: String,
    pub neighbor_id: String,
}

/// Counts reported by the graph engine after an ingest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub nodes_added: u32,
    pub edges_added: u32,
}

/// Every stored triple of one tenant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub triples: Vec<Triple>,
}

/// Successful evidence payload, one variant per source kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum EvidencePayload {
    Inferred(InferenceReport),
    GraphFacts(Vec<GraphFact>),
    SearchHits(Vec<SearchHit>),
}

impl EvidencePayload {
    pub fn len(&self) -> usize {
        match self {
            EvidencePayload::Inferred(report) => report.facts.len(),
            EvidencePayload::GraphFacts(facts) => facts.len(),
            EvidencePayload::SearchHits(hits) => hits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of asking one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvidenceOutcome {
    Succeeded { payload: EvidencePayload },
    Failed { code: ErrorCode, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub source: EvidenceSource,
    pub outcome: EvidenceOutcome,
    pub elapsed_ms: u64,
}

impl EvidenceEntry {
    pub fn succeeded(source: EvidenceSource, payload: EvidencePayload) -> Self {
        Self {
            source,
            outcome: EvidenceOutcome::Succeeded { payload },
            elapsed_ms: 0,
        }
    }

    pub fn failed(source: EvidenceSource, error: &AppError) -> Self {
        Self {
            source,
            outcome: EvidenceOutcome::Failed {
                code: error.code(),
                reason: error.to_string(),
            },
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn payload(&self) -> Option<&EvidencePayload> {
        match &self.outcome {
            EvidenceOutcome::Succeeded { payload } => Some(payload),
            EvidenceOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, EvidenceOutcome::Succeeded { .. })
    }
}

/// Per-query evidence, kept in dispatch order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    entries: Vec<EvidenceEntry>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: EvidenceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[EvidenceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only per-source summary handed back to callers
    pub fn summary(&self) -> Vec<SourceStatus> {
        self.entries
            .iter()
            .map(|entry| match &entry.outcome {
                EvidenceOutcome::Succeeded { payload } => SourceStatus {
                    source: entry.source,
                    succeeded: true,
                    items: payload.len(),
                    reason: None,
                    elapsed_ms: entry.elapsed_ms,
                },
                EvidenceOutcome::Failed { reason, .. } => SourceStatus {
                    source: entry.source,
                    succeeded: false,
                    items: 0,
                    reason: Some(reason.clone()),
                    elapsed_ms: entry.elapsed_ms,
                },
            })
            .collect()
    }
}

impl FromIterator<EvidenceEntry> for EvidenceBundle {
    fn from_iter<I: IntoIterator<Item = EvidenceEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: EvidenceSource,
    pub succeeded: bool,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(metadata: serde_json::Value) -> SearchHit {
        SearchHit {
            node_id: "n".into(),
            score: 0.5,
            metadata: serde_json::from_value(metadata).unwrap(),
        }
    }

    #[test]
    fn test_hit_text_prefers_description() {
        let h = hit(serde_json::json!({"description": "Farm1 has rich soil", "content": "x"}));
        assert_eq!(h.text(), Some("Farm1 has rich soil"));

        let h = hit(serde_json::json!({"content": "chunk"}));
        assert_eq!(h.text(), Some("chunk"));

        let h = hit(serde_json::json!({"original_id": "n", "description": "  "}));
        assert_eq!(h.text(), None);
    }

    #[test]
    fn test_summary_keeps_order() {
        let bundle: EvidenceBundle = vec![
            EvidenceEntry::failed(
                EvidenceSource::Reasoner,
                &AppError::unavailable("ontology", "missing"),
            ),
            EvidenceEntry::succeeded(EvidenceSource::Vector, EvidencePayload::SearchHits(vec![])),
        ]
        .into_iter()
        .collect();

        let summary = bundle.summary();
        assert_eq!(summary[0].source, EvidenceSource::Reasoner);
        assert!(!summary[0].succeeded);
        assert!(summary[0].reason.as_deref().unwrap().contains("missing"));
        assert_eq!(summary[1].source, EvidenceSource::Vector);
        assert!(summary[1].succeeded);
    }
}
