//! Extraction handler

use axum::{extract::State, Json};
use grafka_common::{
    errors::{AppError, Result},
    extraction::{ExtractInput, InputKind},
    ingest::IngestReport,
    metrics::RequestMetrics,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::Tenant;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub input: ExtractInput,
    /// Overrides the kind implied by the file extension
    #[serde(default)]
    pub kind: Option<InputKind>,
}

/// Extract triples from text or a file, then store and index them
pub async fn extract(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<IngestReport>> {
    let metrics = RequestMetrics::start("POST", "/v1/extract");

    let input = match request.input {
        ExtractInput::RawText(text) if text.trim().is_empty() => {
            metrics.finish(400);
            return Err(invalid_input("text must not be empty"));
        }
        ExtractInput::FilePath(path) => {
            let root = state.config.extraction.allowed_root.as_deref();
            match confine_path(&path, root).await {
                Ok(resolved) => ExtractInput::FilePath(resolved),
                Err(e) => {
                    metrics.finish(e.status_code().as_u16());
                    return Err(e);
                }
            }
        }
        input => input,
    };

    let result = state
        .services
        .ingestion
        .run(&input, request.kind, &tenant)
        .await;

    metrics.finish(match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    });
    Ok(Json(result?))
}

fn invalid_input(message: &str) -> AppError {
    AppError::Validation {
        message: message.to_string(),
        field: Some("input".to_string()),
    }
}

/// Resolve a requested file inside `root`. Without a root, file inputs are refused.
async fn confine_path(path: &Path, root: Option<&str>) -> Result<PathBuf> {
    let Some(root) = root else {
        return Err(invalid_input("file_path inputs are not accepted"));
    };
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| AppError::Configuration {
            message: format!("extraction.allowed_root {root}: {e}"),
        })?;

    let requested = if path.is_relative() {
        root.join(path)
    } else {
        path.to_path_buf()
    };
    let resolved = tokio::fs::canonicalize(&requested)
        .await
        .map_err(|_| invalid_input("file not found"))?;

    if !resolved.starts_with(&root) {
        tracing::warn!(path = %path.display(), "Rejected file outside the allowed root");
        return Err(invalid_input("file is outside the allowed root"));
    }
    Ok(resolved)
}
