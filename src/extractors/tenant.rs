//! Request context from headers: tenant id from `X-Tenant-ID`.

use crate::service::RequestContext;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Trimmed header value; absent, blank or non-ASCII values are `None`.
pub fn tenant_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::with_tenant(tenant_from_headers(&parts.headers)))
    }
}
