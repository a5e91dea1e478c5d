//! Inference rules, applied in a fixed order

use super::schema::OntologySchema;
use crate::models::Triple;
use std::collections::HashMap;

/// Class membership predicate
pub const RDF_TYPE: &str = "rdf:type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    SubProperty,
    Inverse,
    Symmetric,
    Transitive,
    Domain,
    Range,
    SubClass,
}

impl Rule {
    /// Application order within each round
    pub const ORDER: [Rule; 7] = [
        Rule::SubProperty,
        Rule::Inverse,
        Rule::Symmetric,
        Rule::Transitive,
        Rule::Domain,
        Rule::Range,
        Rule::SubClass,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::SubProperty => "subproperty",
            Rule::Inverse => "inverse",
            Rule::Symmetric => "symmetric",
            Rule::Transitive => "transitive",
            Rule::Domain => "domain",
            Rule::Range => "range",
            Rule::SubClass => "subclass",
        }
    }

    /// Candidate conclusions with at least one premise in `facts[from..]`,
    /// in fact order. May repeat known facts.
    pub fn apply(&self, facts: &[Triple], from: usize, schema: &OntologySchema) -> Vec<Triple> {
        let fresh = &facts[from.min(facts.len())..];
        match self {
            Rule::SubProperty => fresh
                .iter()
                .flat_map(|t| {
                    schema
                        .subproperty_of
                        .get(t.predicate())
                        .into_iter()
                        .flatten()
                        .map(move |q| Triple::new(t.subject(), q.as_str(), t.object()))
                })
                .collect(),

            Rule::Inverse => fresh
                .iter()
                .flat_map(|t| {
                    schema
                        .inverses_of(t.predicate())
                        .into_iter()
                        .map(move |q| Triple::new(t.object(), q, t.subject()))
                })
                .collect(),

            Rule::Symmetric => fresh
                .iter()
                .filter(|t| schema.symmetric.contains(t.predicate()))
                .map(|t| Triple::new(t.object(), t.predicate(), t.subject()))
                .collect(),

            Rule::Transitive => transitive_step(facts, from, schema),

            Rule::Domain => fresh
                .iter()
                .filter_map(|t| {
                    schema
                        .domain
                        .get(t.predicate())
                        .map(|class| Triple::new(t.subject(), RDF_TYPE, class.as_str()))
                })
                .collect(),

            Rule::Range => fresh
                .iter()
                .filter_map(|t| {
                    schema
                        .range
                        .get(t.predicate())
                        .map(|class| Triple::new(t.object(), RDF_TYPE, class.as_str()))
                })
                .collect(),

            Rule::SubClass => fresh
                .iter()
                .filter(|t| t.predicate() == RDF_TYPE)
                .flat_map(|t| {
                    schema
                        .subclass_of
                        .get(t.object())
                        .into_iter()
                        .flatten()
                        .map(move |d| Triple::new(t.subject(), RDF_TYPE, d.as_str()))
                })
                .collect(),
        }
    }
}

/// One composition step `(a p b), (b p c) => (a p c)` per transitive property,
/// where at least one premise lies in `facts[from..]`. Longer chains close
/// over later rounds. Reflexive conclusions are dropped.
fn transitive_step(facts: &[Triple], from: usize, schema: &OntologySchema) -> Vec<Triple> {
    let mut out = Vec::new();
    for property in &schema.transitive {
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut fresh_successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (i, t) in facts.iter().enumerate().filter(|(_, t)| t.predicate() == property) {
            successors.entry(t.subject()).or_default().push(t.object());
            if i >= from {
                fresh_successors.entry(t.subject()).or_default().push(t.object());
            }
        }

        for (i, t) in facts.iter().enumerate().filter(|(_, t)| t.predicate() == property) {
            let next = if i >= from { &successors } else { &fresh_successors };
            for c in next.get(t.object()).into_iter().flatten() {
                if *c != t.subject() {
                    out.push(Triple::new(t.subject(), property.as_str(), *c));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OntologySchema {
        OntologySchema::from_json(
            r#"{
                "subclass_of": {"Farmer": ["Person"]},
                "subproperty_of": {"worksAt": ["associatedWith"]},
                "inverse_of": {"locatedIn": "contains"},
                "symmetric": ["neighborOf"],
                "transitive": ["locatedIn"],
                "domain": {"worksAt": "Farmer"},
                "range": {"worksAt": "Farm"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_each_rule() {
        let s = schema();
        let t = |a: &str, p: &str, b: &str| Triple::new(a, p, b);

        assert_eq!(
            Rule::SubProperty.apply(&[t("Alice", "worksAt", "Farm1")], 0, &s),
            vec![t("Alice", "associatedWith", "Farm1")]
        );
        assert_eq!(
            Rule::Inverse.apply(&[t("Farm1", "locatedIn", "Valley")], 0, &s),
            vec![t("Valley", "contains", "Farm1")]
        );
        assert_eq!(
            Rule::Inverse.apply(&[t("Valley", "contains", "Farm1")], 0, &s),
            vec![t("Farm1", "locatedIn", "Valley")]
        );
        assert_eq!(
            Rule::Symmetric.apply(&[t("Farm1", "neighborOf", "Farm2")], 0, &s),
            vec![t("Farm2", "neighborOf", "Farm1")]
        );
        assert_eq!(
            Rule::Transitive.apply(
                &[t("Farm1", "locatedIn", "Valley"), t("Valley", "locatedIn", "Region")],
                0,
                &s
            ),
            vec![t("Farm1", "locatedIn", "Region")]
        );
        assert_eq!(
            Rule::Domain.apply(&[t("Alice", "worksAt", "Farm1")], 0, &s),
            vec![t("Alice", RDF_TYPE, "Farmer")]
        );
        assert_eq!(
            Rule::Range.apply(&[t("Alice", "worksAt", "Farm1")], 0, &s),
            vec![t("Farm1", RDF_TYPE, "Farm")]
        );
        assert_eq!(
            Rule::SubClass.apply(&[t("Alice", RDF_TYPE, "Farmer")], 0, &s),
            vec![t("Alice", RDF_TYPE, "Person")]
        );
    }

    #[test]
    fn test_transitive_skips_cycles() {
        let s = schema();
        let facts = vec![
            Triple::new("a", "locatedIn", "b"),
            Triple::new("b", "locatedIn", "a"),
        ];
        assert!(Rule::Transitive.apply(&facts, 0, &s).is_empty());
    }

    #[test]
    fn test_only_fresh_premises_fire() {
        let s = schema();
        let t = |a: &str, p: &str, b: &str| Triple::new(a, p, b);
        let facts = vec![
            t("a", "locatedIn", "b"),
            t("b", "locatedIn", "c"),
            t("c", "locatedIn", "d"),
        ];

        // Only (b, c) and (c, d) are new: (a, b)+(b, c) is old news
        assert_eq!(
            Rule::Transitive.apply(&facts, 2, &s),
            vec![t("b", "locatedIn", "d")]
        );
        assert!(Rule::Transitive.apply(&facts, 3, &s).is_empty());
        assert_eq!(
            Rule::Inverse.apply(&facts, 2, &s),
            vec![t("d", "contains", "c")]
        );
    }

    #[test]
    fn test_order_is_fixed() {
        let names: Vec<_> = Rule::ORDER.iter().map(Rule::name).collect();
        assert_eq!(
            names,
            ["subproperty", "inverse", "symmetric", "transitive", "domain", "range", "subclass"]
        );
    }
}
