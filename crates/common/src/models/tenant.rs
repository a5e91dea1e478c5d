//! Tenant scoping

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant used when callers do not name one
pub const DEFAULT_TENANT: &str = "default";

/// Isolation boundary carried by every storage call and every query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantContext(String);

impl TenantContext {
    /// Build a tenant context, rejecting blank identifiers
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation {
                message: "tenant id must not be empty".to_string(),
                field: Some("tenant_id".to_string()),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT
    }
}

impl Default for TenantContext {
    fn default() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantContext {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        TenantContext::new(value)
    }
}

impl From<TenantContext> for String {
    fn from(tenant: TenantContext) -> Self {
        tenant.0
    }
}
