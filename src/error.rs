//! Crate-wide error taxonomy.
//!
//! Operations return a typed error instead of panicking or stringly-typed
//! failures; the web layer maps each variant to a status code. Transient
//! failures are retried inside the adapters and only surface here once the
//! retry budget is exhausted.

/// Errors produced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed tenant id on a tenant-scoped operation.
    #[error("tenant id required: {0}")]
    TenantRequired(String),

    /// Malformed or rejected input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity has no row for this tenant.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The operation is valid but the entity is not in the right state yet.
    #[error("{0}")]
    Precondition(String),

    /// Daily selection found zero unused profiles in the pool.
    #[error("no unused profiles available")]
    NoProfilesAvailable,

    /// Duplicate on race or duplicate external resource. Counted, not fatal.
    #[error("{0}")]
    Conflict(String),

    /// Retry budget exhausted on an upstream or external-store call.
    #[error("transient failure: {0}")]
    Transient(#[source] anyhow::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Whether this error is the caller's fault (4xx territory).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TenantRequired(_)
                | Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Precondition(_)
                | Self::NoProfilesAvailable
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
