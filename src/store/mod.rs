//! External record-store client.
//!
//! The record-store is the operator-facing system of record: one table per
//! worker queue, named `WorkQueue_NN`, each row mirroring one assignment.
//! Operators edit the `state` column there; pull sync reads it back.
//!
//! [`RecordStore`] is the interface the core consumes. [`HttpRecordStore`]
//! talks to the real service; [`MemoryRecordStore`] backs tests and local
//! development.

mod http;
mod memory;
pub mod provision;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::DbContext;
use crate::error::Result;
use crate::models::AssignmentState;
use crate::tenant::TenantId;

/// Naming scheme for worker-queue tables.
pub fn queue_table_name(index: u32) -> String {
    format!("WorkQueue_{index:02}")
}

/// Max records per create/delete call, imposed by the store's API.
pub const RECORD_BATCH: usize = 10;

/// The mirrored row shape, as written to and read from a queue table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub profile_id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub platform: String,
    pub position: i32,
    pub campaign_date: NaiveDate,
    pub state: AssignmentState,
}

/// A record as stored, with the store's own record id attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub record_id: String,
    pub fields: QueueRecord,
}

/// Outcome of a table-creation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOutcome {
    Created,
    /// Duplicate table name; treated as success by provisioning.
    AlreadyExists,
}

/// Operations the core needs from the record-store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Names of all tables in the tenant's base.
    async fn list_tables(&self, base: &TenantId) -> Result<Vec<String>>;

    /// Create one queue table with the standard column schema.
    async fn create_table(&self, base: &TenantId, table: &str) -> Result<TableOutcome>;

    /// Every record in a table.
    async fn list_records(&self, base: &TenantId, table: &str) -> Result<Vec<StoredRecord>>;

    /// Append records. Callers chunk to [`RECORD_BATCH`].
    async fn create_records(
        &self,
        base: &TenantId,
        table: &str,
        records: &[QueueRecord],
    ) -> Result<usize>;

    /// Update the state column of one record.
    async fn update_record_state(
        &self,
        base: &TenantId,
        table: &str,
        record_id: &str,
        state: AssignmentState,
    ) -> Result<()>;

    /// Delete records by store id. Callers chunk to [`RECORD_BATCH`].
    async fn delete_records(
        &self,
        base: &TenantId,
        table: &str,
        record_ids: &[String],
    ) -> Result<usize>;
}

/// Resolve the queue fan-out N for a tenant.
///
/// Priority: the tenant's configured count, then counting `WorkQueue_NN`
/// tables in the live store schema, then the process-wide default.
pub async fn discover_queue_count(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
    fallback: u32,
) -> u32 {
    match db.tenants().configured_queue_count(tenant).await {
        Ok(Some(n)) => return n as u32,
        Ok(None) => {}
        Err(e) => {
            warn!(tenant_id = %tenant, error = %e, "failed to read tenant settings for queue count")
        }
    }

    match store.list_tables(tenant).await {
        Ok(tables) => {
            let count = tables
                .iter()
                .filter(|t| t.starts_with("WorkQueue_"))
                .count() as u32;
            if count > 0 {
                return count;
            }
        }
        Err(e) => {
            warn!(tenant_id = %tenant, error = %e, "failed to inspect record-store schema for queue count")
        }
    }

    warn!(tenant_id = %tenant, fallback, "using fallback queue count");
    fallback
}
