//! Rule-based triple heuristics

use crate::models::Triple;

/// Relation label used by the endpoint heuristic
pub const RELATED_TO: &str = "relatedTo";

/// Relation label for keyed-object values
pub const HAS_VALUE: &str = "hasValue";

/// Free-text extraction strategy.
///
/// Implementations must never fail: unusable text yields an empty vector.
pub trait TripleHeuristic: Send + Sync {
    fn extract(&self, text: &str) -> Vec<Triple>;

    fn name(&self) -> &'static str;
}

/// Links the first and last whitespace token of texts with more than three
/// tokens. A stand-in until a model-backed extractor is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointHeuristic;

impl TripleHeuristic for EndpointHeuristic {
    fn extract(&self, text: &str) -> Vec<Triple> {
        let words: Vec<&str> = text.split_whitespace().collect();
        match words.as_slice() {
            [first, .., last] if words.len() > 3 => vec![Triple::new(*first, RELATED_TO, *last)],
            _ => Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        "endpoint"
    }
}

/// `(key, hasValue, value)` for every short string value of a top-level object
pub fn keyed_object_triples(
    object: &serde_json::Map<String, serde_json::Value>,
    max_value_chars: usize,
) -> Vec<Triple> {
    object
        .iter()
        .filter_map(|(key, value)| {
            let value = value.as_str()?;
            (value.chars().count() < max_value_chars).then(|| Triple::new(key.as_str(), HAS_VALUE, value))
        })
        .collect()
}
