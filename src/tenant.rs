//! Tenant identity and request-scoped resolution.
//!
//! Every entity and every query is scoped by a [`TenantId`]. The id doubles
//! as the external record-store base identifier, so it follows that store's
//! wire format: `app` followed by 8-20 alphanumerics/underscores.
//!
//! Resolution priority for a request: explicit header, then payload field,
//! then failure. There is no ambient fallback; storage operations take the
//! tenant as a mandatory parameter.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Header carrying the tenant id; wins over the payload field.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

static TENANT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^app[A-Za-z0-9_]{8,20}$").expect("tenant id regex"));

/// Validated tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Parse and validate a raw tenant id.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::TenantRequired("empty tenant id".to_string()));
        }
        if !TENANT_ID_RE.is_match(trimmed) {
            return Err(Error::TenantRequired(format!(
                "invalid tenant id format: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the tenant for one request from the header and the payload field.
///
/// The header wins when both are present. Fails with `TenantRequired` when
/// neither is supplied.
pub fn resolve_tenant(header: Option<&str>, payload: Option<&str>) -> Result<TenantId> {
    if let Some(raw) = header.filter(|v| !v.trim().is_empty()) {
        return TenantId::parse(raw);
    }
    if let Some(raw) = payload.filter(|v| !v.trim().is_empty()) {
        return TenantId::parse(raw);
    }
    Err(Error::TenantRequired(format!(
        "provide it via the {TENANT_HEADER} header or the tenant_id payload field"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ids() {
        for raw in ["appXYZ123ABC", "app12345678", "app_scraper_2026", "  appABCDEFGH  "] {
            assert!(TenantId::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "appshort", "tblXYZ123ABC", "app has spaces", "app!BADCHARS"] {
            assert!(TenantId::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn rejects_overlong_ids() {
        let raw = format!("app{}", "a".repeat(21));
        assert!(TenantId::parse(&raw).is_err());
    }

    #[test]
    fn header_wins_over_payload() {
        let tenant = resolve_tenant(Some("appHEADER1234"), Some("appPAYLOAD1234")).unwrap();
        assert_eq!(tenant.as_str(), "appHEADER1234");
    }

    #[test]
    fn payload_used_when_header_absent() {
        let tenant = resolve_tenant(None, Some("appPAYLOAD1234")).unwrap();
        assert_eq!(tenant.as_str(), "appPAYLOAD1234");
    }

    #[test]
    fn blank_header_falls_through_to_payload() {
        let tenant = resolve_tenant(Some("   "), Some("appPAYLOAD1234")).unwrap();
        assert_eq!(tenant.as_str(), "appPAYLOAD1234");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        assert!(matches!(
            resolve_tenant(None, None),
            Err(Error::TenantRequired(_))
        ));
    }
}
