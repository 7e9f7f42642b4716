//! Database context and tenant-scoped domain operations.

mod assignments;
mod campaigns;
mod jobs;
mod profiles;
mod tenants;

pub use assignments::{AssignmentOps, SlotUpdate};
pub use campaigns::CampaignOps;
pub use jobs::{JobOps, ResultsPage};
pub use profiles::{IngestSummary, ProfileOps};
pub use tenants::TenantOps;

use sqlx::PgPool;

/// Shared database handle.
///
/// All domain operations hang off this context so call sites read as
/// `db.profiles().ingest_batch(...)`. Every operation takes the tenant
/// explicitly; there is no ambient tenant state.
#[derive(Clone)]
pub struct DbContext {
    pool: PgPool,
}

impl DbContext {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Profile pool and raw-scrape-log operations.
    pub fn profiles(&self) -> ProfileOps<'_> {
        ProfileOps::new(self)
    }

    /// Scrape job and job result operations.
    pub fn jobs(&self) -> JobOps<'_> {
        JobOps::new(self)
    }

    /// Campaign operations.
    pub fn campaigns(&self) -> CampaignOps<'_> {
        CampaignOps::new(self)
    }

    /// Assignment operations.
    pub fn assignments(&self) -> AssignmentOps<'_> {
        AssignmentOps::new(self)
    }

    /// Tenant settings operations.
    pub fn tenants(&self) -> TenantOps<'_> {
        TenantOps::new(self)
    }
}
