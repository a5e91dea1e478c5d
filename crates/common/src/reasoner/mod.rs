//! Ontology reasoner
//!
//! Forward-chains a small OWL-RL style rule set over a graph snapshot.
//! Rules run in [`Rule::ORDER`] once per round until a round adds nothing
//! or the round limit is hit, so the same snapshot and schema always give
//! the same facts in the same order. Each rule only looks at facts it has
//! not seen in an earlier application.

mod rules;
mod schema;

pub use rules::{Rule, RDF_TYPE};
pub use schema::OntologySchema;

use crate::config::OntologyConfig;
use crate::models::{GraphSnapshot, InferenceReport, InferredFact, Triple};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct OntologyReasoner {
    schema: Option<OntologySchema>,
    ruleset: String,
    max_rounds: usize,
}

impl OntologyReasoner {
    pub fn new(schema: OntologySchema, config: &OntologyConfig) -> Self {
        Self {
            schema: Some(schema),
            ruleset: config.ruleset.clone(),
            max_rounds: config.max_rounds,
        }
    }

    /// Load the schema named in the config. A missing or invalid schema
    /// leaves the reasoner running with no rules.
    pub fn load(config: &OntologyConfig) -> Self {
        match OntologySchema::from_file(&config.path) {
            Ok(schema) => {
                info!(
                    path = %config.path,
                    axioms = schema.axiom_count(),
                    facts = schema.facts.len(),
                    "Ontology schema loaded"
                );
                Self::new(schema, config)
            }
            Err(e) => {
                warn!(path = %config.path, error = %e, "Ontology schema unavailable, reasoning disabled");
                Self::unloaded(config)
            }
        }
    }

    /// A reasoner whose every answer is empty
    pub fn unloaded(config: &OntologyConfig) -> Self {
        Self {
            schema: None,
            ruleset: config.ruleset.clone(),
            max_rounds: config.max_rounds,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.schema.is_some()
    }

    pub fn ruleset(&self) -> &str {
        &self.ruleset
    }

    /// Derive facts not present in the snapshot
    pub fn infer(&self, snapshot: &GraphSnapshot) -> InferenceReport {
        self.infer_until(snapshot, &CancellationToken::new())
    }

    /// Like [`infer`](Self::infer), stopping between rule applications once
    /// `cancel` fires. A cancelled run returns the facts derived so far.
    pub fn infer_until(&self, snapshot: &GraphSnapshot, cancel: &CancellationToken) -> InferenceReport {
        let mut report = InferenceReport::empty(self.ruleset.clone());
        let Some(schema) = &self.schema else {
            return report;
        };

        let mut known: Vec<Triple> = Vec::with_capacity(snapshot.triples.len() + schema.facts.len());
        let mut seen: HashSet<Triple> = HashSet::new();
        for triple in snapshot.triples.iter().chain(&schema.facts) {
            if seen.insert(triple.clone()) {
                known.push(triple.clone());
            }
        }

        // Per rule, how much of `known` it has already consumed
        let mut consumed = [0usize; Rule::ORDER.len()];
        let mut rounds = 0;
        'rounds: while rounds < self.max_rounds {
            rounds += 1;
            let mut added = false;

            for (rule, cursor) in Rule::ORDER.iter().zip(consumed.iter_mut()) {
                if cancel.is_cancelled() {
                    debug!(rounds, inferred = report.facts.len(), "Inference cancelled");
                    break 'rounds;
                }

                let end = known.len();
                let conclusions = rule.apply(&known, *cursor, schema);
                *cursor = end;

                for triple in conclusions {
                    if seen.insert(triple.clone()) {
                        known.push(triple.clone());
                        report.facts.push(InferredFact {
                            triple,
                            rule: rule.name().to_string(),
                            ruleset: self.ruleset.clone(),
                        });
                        *report.rules_applied.entry(rule.name().to_string()).or_insert(0) += 1;
                        added = true;
                    }
                }
            }

            if !added {
                break;
            }
        }

        debug!(
            rounds,
            asserted = snapshot.triples.len(),
            inferred = report.facts.len(),
            "Inference finished"
        );
        report
    }
}
