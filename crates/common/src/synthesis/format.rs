//! Evidence rendering
//!
//! Output depends only on the bundle, so the fallback answer is
//! reproducible byte for byte.

use crate::models::{EvidenceBundle, EvidencePayload, EvidenceSource, GraphFact, InferenceReport, SearchHit};

/// Inferred facts listed per deduction block
pub const MAX_DEDUCTIONS: usize = 10;
/// Characters kept from each search hit
pub const MAX_HIT_CHARS: usize = 200;
/// Characters kept from a generic structured dump
pub const MAX_DUMP_CHARS: usize = 500;

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Deduction block, `None` when nothing was inferred
pub fn format_deductions(report: &InferenceReport) -> Option<String> {
    if report.facts.is_empty() {
        return None;
    }

    let facts = report
        .facts
        .iter()
        .take(MAX_DEDUCTIONS)
        .map(|f| f.triple.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let rules = serde_json::to_string(&report.rules_applied).unwrap_or_default();

    Some(format!(
        "Logical Deductions (OWL):\n- Inferred Facts: {facts}\n- Rule Set: {}\n- Rules Applied: {rules}",
        report.ruleset
    ))
}

/// Context block, `None` when no hit carries readable text
pub fn format_search_hits(hits: &[SearchHit]) -> Option<String> {
    let lines: Vec<String> = hits
        .iter()
        .filter_map(SearchHit::text)
        .map(|text| format!("- {}", truncate_chars(text, MAX_HIT_CHARS)))
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!("Search Results (Context):\n{}", lines.join("\n")))
}

/// Bounded JSON dump tagged with the producing source
pub fn format_structured(source: EvidenceSource, facts: &[GraphFact]) -> Option<String> {
    if facts.is_empty() {
        return None;
    }
    let dump = serde_json::to_string(facts).unwrap_or_default();
    Some(format!(
        "Graph Data ({source}):\n{}",
        truncate_chars(&dump, MAX_DUMP_CHARS)
    ))
}

/// Every usable successful entry, in bundle order, separated by blank lines.
/// `None` when no entry renders anything.
pub fn format_evidence(bundle: &EvidenceBundle) -> Option<String> {
    let parts: Vec<String> = bundle
        .entries()
        .iter()
        .filter_map(|entry| match entry.payload()? {
            EvidencePayload::Inferred(report) => format_deductions(report),
            EvidencePayload::SearchHits(hits) => format_search_hits(hits),
            EvidencePayload::GraphFacts(facts) => format_structured(entry.source, facts),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
