//! Ontology schema file format

use crate::errors::{AppError, Result};
use crate::models::Triple;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Class and property axioms plus asserted individuals.
///
/// Ordered collections keep rule output independent of hash seeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OntologySchema {
    /// class -> direct superclasses
    #[serde(default)]
    pub subclass_of: BTreeMap<String, Vec<String>>,

    /// property -> direct superproperties
    #[serde(default)]
    pub subproperty_of: BTreeMap<String, Vec<String>>,

    /// property -> inverse property, read in both directions
    #[serde(default)]
    pub inverse_of: BTreeMap<String, String>,

    #[serde(default)]
    pub symmetric: BTreeSet<String>,

    #[serde(default)]
    pub transitive: BTreeSet<String>,

    /// property -> class of its subjects
    #[serde(default)]
    pub domain: BTreeMap<String, String>,

    /// property -> class of its objects
    #[serde(default)]
    pub range: BTreeMap<String, String>,

    /// Facts declared by the ontology itself
    #[serde(default)]
    pub facts: Vec<Triple>,
}

impl OntologySchema {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::unavailable("ontology schema", format!("{}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::unavailable("ontology schema", format!("invalid schema: {e}")))
    }

    /// Properties declared inverse to `property`, in either direction
    pub fn inverses_of(&self, property: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(q) = self.inverse_of.get(property) {
            out.push(q);
        }
        for (p, q) in &self.inverse_of {
            if q == property && !out.contains(&p.as_str()) {
                out.push(p);
            }
        }
        out
    }

    pub fn axiom_count(&self) -> usize {
        self.subclass_of.values().map(Vec::len).sum::<usize>()
            + self.subproperty_of.values().map(Vec::len).sum::<usize>()
            + self.inverse_of.len()
            + self.symmetric.len()
            + self.transitive.len()
            + self.domain.len()
            + self.range.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_schema() {
        let schema = OntologySchema::from_json(
            r#"{
                "transitive": ["locatedIn"],
                "inverse_of": {"locatedIn": "contains"},
                "facts": [{"subject": "Farm1", "predicate": "locatedIn", "object": "Valley"}]
            }"#,
        )
        .unwrap();

        assert!(schema.transitive.contains("locatedIn"));
        assert_eq!(schema.inverses_of("contains"), vec!["locatedIn"]);
        assert_eq!(schema.inverses_of("locatedIn"), vec!["contains"]);
        assert_eq!(schema.facts.len(), 1);
        assert_eq!(schema.axiom_count(), 2);
    }

    #[test]
    fn test_bad_schema_is_unavailable() {
        let err = OntologySchema::from_json("{ \"transitiv\": [] }").unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable { .. }));

        let err = OntologySchema::from_file("/no/such/ontology.json").unwrap_err();
        assert!(err.is_degradable());
    }
}
