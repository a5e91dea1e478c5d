//! Evidence synthesis
//!
//! Renders the evidence bundle and, when a generator is available, asks it
//! for a short grounded answer. Any generator problem falls back to the
//! rendered evidence itself.

mod format;
mod generator;

pub use format::{
    format_deductions, format_evidence, format_search_hits, format_structured, MAX_DEDUCTIONS,
    MAX_DUMP_CHARS, MAX_HIT_CHARS,
};
pub use generator::{ChatGenerator, Generator};

use crate::config::GenerationConfig;
use crate::errors::Result;
use crate::models::EvidenceBundle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Answer when no source produced usable evidence
pub const NO_INFORMATION_MESSAGE: &str =
    "No information found: the requested information is unavailable from the configured knowledge sources.";

/// First line of a fallback answer
pub const FALLBACK_HEADER: &str = "**Analysis based on evidence:**";

/// Last line of a fallback answer
pub const FALLBACK_NOTICE: &str = "(Note: generative synthesis unavailable, showing raw evidence)";

pub struct Synthesizer {
    generator: Option<Arc<dyn Generator>>,
}

impl Synthesizer {
    pub fn new(generator: Option<Arc<dyn Generator>>) -> Self {
        Self { generator }
    }

    /// Deterministic synthesis only
    pub fn fallback_only() -> Self {
        Self::new(None)
    }

    /// Build from config: a generator exists only when generation is enabled
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::fallback_only());
        }
        let generator: Arc<dyn Generator> = Arc::new(ChatGenerator::new(config)?);
        Ok(Self::new(Some(generator)))
    }

    pub fn generation_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Answer a question from a bundle. Never fails.
    pub async fn synthesize(&self, question: &str, bundle: &EvidenceBundle) -> String {
        let Some(evidence) = format_evidence(bundle) else {
            debug!("No usable evidence");
            return NO_INFORMATION_MESSAGE.to_string();
        };

        let Some(generator) = &self.generator else {
            return Self::fallback(&evidence);
        };

        match generator.generate(&build_prompt(question, &evidence)).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!(model = generator.model_name(), "Generator returned an empty answer");
                Self::fallback(&evidence)
            }
            Err(e) => {
                warn!(model = generator.model_name(), error = %e, "Generative synthesis failed");
                Self::fallback(&evidence)
            }
        }
    }

    /// Rendered evidence between the fallback header and notice
    pub fn fallback(evidence: &str) -> String {
        format!("{FALLBACK_HEADER}\n\n{evidence}\n\n{FALLBACK_NOTICE}")
    }
}

/// Single-turn prompt for the generator
pub fn build_prompt(question: &str, evidence: &str) -> String {
    format!(
        "You synthesize answers for a hybrid knowledge system. Answer using ONLY the evidence below \
        (logical deductions, graph data, retrieved context).\n\n\
        Question: \"{question}\"\n\n\
        Evidence:\n{evidence}\n\n\
        Instructions:\n\
        1. Answer the question directly from the evidence.\n\
        2. If any part of the answer rests on Logical Deductions, say that it was inferred by reasoning.\n\
        3. If the evidence is insufficient, say so.\n\
        4. Use at most four sentences.\n\n\
        Answer:"
    )
}
