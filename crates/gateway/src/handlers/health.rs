//! Health check handlers

use axum::{extract::State, Json};
use grafka_common::graph::GraphStore;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub graph: CheckResult,
    pub reasoner: CheckResult,
    pub vector: CheckResult,
    pub generation: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn up(detail: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: grafka_common::VERSION.to_string(),
    })
}

/// Readiness probe. Degraded sources never make the service unready since
/// queries still answer without them.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let services = &state.services;

    let graph = if services.graph.is_connected().await {
        CheckResult::up("connected")
    } else {
        CheckResult::degraded("graph engine not connected")
    };

    let reasoner = if services.reasoner.is_loaded() {
        CheckResult::up(services.reasoner.ruleset())
    } else {
        CheckResult::degraded("ontology schema not loaded")
    };

    let vector = CheckResult::up(format!(
        "{} ({} dims)",
        services.vector_index.backend_name(),
        services.vector_index.dimension()
    ));

    let generation = if services.synthesizer.generation_enabled() {
        CheckResult::up(state.config.generation.model.clone())
    } else {
        CheckResult::degraded("fallback synthesis only")
    };

    let all_up = [&graph, &reasoner, &generation]
        .iter()
        .all(|c| c.status == "up");

    Json(ReadyResponse {
        status: if all_up { "ready" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            graph,
            reasoner,
            vector,
            generation,
        },
    })
}
