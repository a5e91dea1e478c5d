//! API handlers module

pub mod extract;
pub mod health;
pub mod query;

use axum::{extract::FromRequestParts, http::request::Parts};
use grafka_common::{errors::AppError, TenantContext};

use crate::AppState;

/// Header naming the tenant a request acts for
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant resolved from `x-tenant-id`, or the configured default
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

impl FromRequestParts<AppState> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let id = match parts.headers.get(TENANT_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::Validation {
                    message: "tenant header must be visible ASCII".to_string(),
                    field: Some(TENANT_HEADER.to_string()),
                })?
                .to_string(),
            None => state.config.tenant.default_tenant.clone(),
        };
        Ok(Tenant(TenantContext::new(id)?))
    }
}
