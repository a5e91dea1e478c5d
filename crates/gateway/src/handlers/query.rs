//! Query handler

use axum::{extract::State, Json};
use grafka_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    QueryOutcome,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use super::Tenant;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

/// Answer a question from every configured evidence source
pub async fn query(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryOutcome>> {
    let metrics = RequestMetrics::start("POST", "/v1/query");

    let result = match request.validate() {
        Ok(()) => {
            // Dropping the handler future (client gone) cancels the query
            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();

            state
                .services
                .orchestrator
                .answer_with_cancellation(&request.question, &tenant, cancel)
                .await
        }
        Err(e) => Err(AppError::Validation {
            message: e.to_string(),
            field: Some("question".to_string()),
        }),
    };

    metrics.finish(match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    });
    Ok(Json(result?))
}
