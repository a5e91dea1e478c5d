//! Domain models shared across the pipeline

mod evidence;
mod tenant;
mod triple;

pub use evidence::{
    EvidenceBundle, EvidenceEntry, EvidenceOutcome, EvidencePayload, EvidenceSource, GraphFact,
    GraphSnapshot, InferenceReport, InferredFact, IngestStats, Neighbor, SearchHit, SourceStatus,
    HIT_TEXT_KEYS,
};
pub use tenant::{TenantContext, DEFAULT_TENANT};
pub use triple::Triple;
