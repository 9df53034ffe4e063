//! Extract the tenant data context attached by the resolution middleware.

use crate::error::AppError;
use crate::tenant::context::TenantContext;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The middleware rejects unresolvable tenants before any handler
        // runs; absence here means a route was wired without it.
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::Internal("tenant database connection is missing".into()))
    }
}
