//! Triple extraction
//!
//! Turns raw input into candidate triples:
//! - Tabular (CSV): first column is the subject, up to three property columns
//! - Document (Markdown): chunked, each chunk run through the free-text heuristic
//! - Keyed object (JSON): short string values become `hasValue` facts
//! - Free text: pluggable [`TripleHeuristic`]
//!
//! Extraction itself never fails. Malformed input produces no triples and a
//! log line; only an unreadable input file is reported as an error.

mod chunker;
mod heuristics;
mod tabular;

pub use chunker::{chunk_markdown, TextChunk};
pub use heuristics::{keyed_object_triples, EndpointHeuristic, TripleHeuristic, HAS_VALUE, RELATED_TO};
pub use tabular::{normalize_predicate, TabularLimits};

use crate::config::ExtractionConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_extraction;
use crate::models::Triple;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shape of the input being extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Tabular,
    Document,
    KeyedObject,
    FreeText,
}

impl InputKind {
    /// Kind implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputKind::Tabular),
            "md" | "markdown" => Some(InputKind::Document),
            "json" => Some(InputKind::KeyedObject),
            "txt" => Some(InputKind::FreeText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Tabular => "tabular",
            InputKind::Document => "document",
            InputKind::KeyedObject => "keyed_object",
            InputKind::FreeText => "free_text",
        }
    }
}

impl FromStr for InputKind {
    type Err = String;

    /// Accepts the snake_case names, with `-` allowed in place of `_`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tabular" => Ok(InputKind::Tabular),
            "document" => Ok(InputKind::Document),
            "keyed_object" => Ok(InputKind::KeyedObject),
            "free_text" => Ok(InputKind::FreeText),
            other => Err(format!(
                "unknown input kind `{other}`, expected tabular, document, keyed_object or free_text"
            )),
        }
    }
}

/// Caller-tagged input; nothing is guessed from the string itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExtractInput {
    FilePath(PathBuf),
    RawText(String),
}

/// Result of one extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// File path, or `raw_text`
    pub source: String,
    /// `None` when the file type is unsupported
    pub input_kind: Option<InputKind>,
    pub triples_count: usize,
    /// Capped preview of the extracted triples
    pub triples: Vec<Triple>,
    pub logs: Vec<String>,
}

#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    heuristic: Arc<dyn TripleHeuristic>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_heuristic(config, Arc::new(EndpointHeuristic))
    }

    /// Swap the free-text strategy
    pub fn with_heuristic(config: ExtractionConfig, heuristic: Arc<dyn TripleHeuristic>) -> Self {
        Self { config, heuristic }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract triples from text of a known kind. Never fails.
    pub fn extract(&self, text: &str, kind: InputKind) -> Vec<Triple> {
        let mut log = Vec::new();
        let triples = self.extract_logged(text, kind, &mut log);
        for line in &log {
            tracing::debug!(kind = kind.as_str(), "{line}");
        }
        triples
    }

    fn extract_logged(&self, text: &str, kind: InputKind, log: &mut Vec<String>) -> Vec<Triple> {
        if text.trim().is_empty() {
            warn!(kind = kind.as_str(), "Empty input, nothing to extract");
            log.push("Empty input".to_string());
            return Vec::new();
        }

        let triples = match kind {
            InputKind::Tabular => tabular::extract_rows(
                text,
                TabularLimits {
                    max_properties: self.config.max_properties,
                    max_cell_chars: self.config.max_cell_chars,
                },
                log,
            ),
            InputKind::Document => {
                log.push(format!("Text length: {} chars", text.chars().count()));
                let chunks = chunk_markdown(text, self.config.chunk_size);
                log.push(format!("Split into {} chunks", chunks.len()));
                chunks
                    .iter()
                    .flat_map(|chunk| self.heuristic.extract(&chunk.content))
                    .collect()
            }
            InputKind::KeyedObject => match serde_json::from_str::<serde_json::Value>(text) {
                Ok(serde_json::Value::Object(map)) => {
                    keyed_object_triples(&map, self.config.max_value_chars)
                }
                Ok(_) => {
                    log.push("JSON document is not an object".to_string());
                    Vec::new()
                }
                Err(e) => {
                    log.push(format!("JSON error: {e}"));
                    Vec::new()
                }
            },
            InputKind::FreeText => self.heuristic.extract(text),
        };

        if triples.is_empty() {
            warn!(kind = kind.as_str(), "No triples extracted");
        }
        record_extraction(kind.as_str(), triples.len());
        triples
    }

    /// Resolve a tagged input and extract from it.
    ///
    /// `kind` overrides the kind implied by the file extension, or the
    /// free-text default for raw text. A missing or unreadable file is an
    /// `Input` error.
    #[instrument(skip(self, input))]
    pub async fn extract_input(
        &self,
        input: &ExtractInput,
        kind: Option<InputKind>,
    ) -> Result<(Vec<Triple>, ExtractionReport)> {
        let mut logs = Vec::new();

        let (source, kind, text) = match input {
            ExtractInput::RawText(text) => {
                logs.push("Treating input as raw text".to_string());
                ("raw_text".to_string(), Some(kind.unwrap_or(InputKind::FreeText)), text.clone())
            }
            ExtractInput::FilePath(path) => {
                let unreadable =
                    |e: std::io::Error| AppError::input(format!("cannot read {}: {e}", path.display()));
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let resolved = kind.or_else(|| InputKind::from_path(path));
                let text = match resolved {
                    Some(_) => tokio::fs::read_to_string(path).await.map_err(unreadable)?,
                    None => {
                        // Still report missing files, but never decode unsupported ones
                        tokio::fs::metadata(path).await.map_err(unreadable)?;
                        String::new()
                    }
                };
                logs.push(format!("Processing file: {name}"));

                if resolved.is_none() {
                    let ext = path
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    warn!(path = %path.display(), "Unsupported input format");
                    logs.push(format!("Unsupported format: .{ext}"));
                }
                (path.display().to_string(), resolved, text)
            }
        };

        let triples = match kind {
            Some(kind) => self.extract_logged(&text, kind, &mut logs),
            None => Vec::new(),
        };

        info!(
            source = %source,
            kind = kind.map(|k| k.as_str()).unwrap_or("unsupported"),
            triples = triples.len(),
            "Extraction finished"
        );

        let report = ExtractionReport {
            source,
            input_kind: kind,
            triples_count: triples.len(),
            triples: triples.iter().take(self.config.preview_limit).cloned().collect(),
            logs,
        };
        Ok((triples, report))
    }
}
