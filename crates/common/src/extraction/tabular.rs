//! CSV row extraction

use crate::models::Triple;

/// Progress is logged every this many rows
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct TabularLimits {
    /// Property columns read after the subject column
    pub max_properties: usize,
    /// Cells with this many characters or more are skipped
    pub max_cell_chars: usize,
}

/// Column name as a predicate: `_` and `-` become spaces
pub fn normalize_predicate(column: &str) -> String {
    column.replace(['_', '-'], " ")
}

/// Extract triples from CSV text with a header row. Malformed rows are
/// skipped and noted in `log`.
pub fn extract_rows(text: &str, limits: TabularLimits, log: &mut Vec<String>) -> Vec<Triple> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = match reader.headers() {
        Ok(header) => header.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => {
            log.push(format!("CSV header error: {e}"));
            return Vec::new();
        }
    };
    log.push(format!("CSV columns: {header:?}"));

    if header.len() < 2 {
        log.push("CSV needs a subject column and at least one property column".to_string());
        return Vec::new();
    }

    let properties: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .skip(1)
        .take(limits.max_properties)
        .map(|(i, name)| (i, normalize_predicate(name)))
        .collect();

    let mut triples = Vec::new();
    let mut rows = 0usize;

    for (i, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log.push(format!("Skipping malformed row {}: {e}", i + 1));
                continue;
            }
        };
        rows += 1;

        if i % PROGRESS_EVERY == 0 {
            log.push(format!("Processed {i} rows"));
        }

        let subject = record.get(0).map(str::trim).unwrap_or_default();
        if subject.is_empty() {
            continue;
        }

        for (column, predicate) in &properties {
            let value = record.get(*column).map(str::trim).unwrap_or_default();
            if value.is_empty() || value.chars().count() >= limits.max_cell_chars {
                continue;
            }
            triples.push(Triple::new(subject, predicate.as_str(), value));
        }
    }

    log.push(format!("Found {rows} rows"));
    triples
}
