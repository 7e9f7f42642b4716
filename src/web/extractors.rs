//! Axum extractors for tenant resolution.

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::tenant::TENANT_HEADER;

/// Raw tenant header value, if one was sent.
///
/// Handlers combine it with the payload's `tenant_id` field through
/// [`crate::tenant::resolve_tenant`]; the header wins. Extraction itself
/// never fails so that header-less requests can still carry the tenant in
/// the body.
pub struct TenantHeader(pub Option<String>);

impl<S> FromRequestParts<S> for TenantHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(TenantHeader(header))
    }
}
