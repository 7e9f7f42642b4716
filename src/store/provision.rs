//! Queue-table provisioning and verification for a tenant's base.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;
use crate::store::{RecordStore, TableOutcome, queue_table_name};
use crate::tenant::TenantId;

/// Pacing between table-creation calls; the store allows ~5 req/s.
const CREATE_PACING: Duration = Duration::from_millis(250);

/// Outcome of provisioning a base.
#[derive(Debug, serde::Serialize)]
pub struct ProvisionReport {
    pub tables_created: usize,
    pub tables_skipped: usize,
    pub tables_failed: usize,
    pub failed_tables: Vec<FailedTable>,
}

#[derive(Debug, serde::Serialize)]
pub struct FailedTable {
    pub table_name: String,
    pub error: String,
}

/// Outcome of verifying a base against the expected queue-table list.
#[derive(Debug, serde::Serialize)]
pub struct VerifyReport {
    pub valid: bool,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

/// Create `WorkQueue_01 .. WorkQueue_NN` in the tenant's base.
///
/// An already-existing table counts as skipped, not failed. Creation
/// failures are collected and reported; remaining tables are still
/// attempted.
pub async fn create_queue_tables(
    store: &dyn RecordStore,
    base: &TenantId,
    num_queues: u32,
) -> Result<ProvisionReport> {
    let mut report = ProvisionReport {
        tables_created: 0,
        tables_skipped: 0,
        tables_failed: 0,
        failed_tables: Vec::new(),
    };

    info!(base_id = %base, num_queues, "provisioning queue tables");

    for index in 1..=num_queues {
        let table = queue_table_name(index);
        match store.create_table(base, &table).await {
            Ok(TableOutcome::Created) => report.tables_created += 1,
            Ok(TableOutcome::AlreadyExists) => {
                info!(base_id = %base, table, "table already exists, skipping");
                report.tables_skipped += 1;
            }
            Err(e) => {
                warn!(base_id = %base, table, error = %e, "table creation failed");
                report.tables_failed += 1;
                report.failed_tables.push(FailedTable {
                    table_name: table,
                    error: e.to_string(),
                });
            }
        }

        if index < num_queues {
            tokio::time::sleep(CREATE_PACING).await;
        }
    }

    info!(
        base_id = %base,
        created = report.tables_created,
        skipped = report.tables_skipped,
        failed = report.tables_failed,
        "provisioning complete"
    );

    Ok(report)
}

/// Diff the live schema against the expected queue-table list.
pub async fn verify_queue_tables(
    store: &dyn RecordStore,
    base: &TenantId,
    num_queues: u32,
) -> Result<VerifyReport> {
    let existing = store.list_tables(base).await?;

    let expected: Vec<String> = (1..=num_queues).map(queue_table_name).collect();
    let missing: Vec<String> = expected
        .iter()
        .filter(|t| !existing.contains(t))
        .cloned()
        .collect();
    let extra: Vec<String> = existing
        .iter()
        .filter(|t| t.starts_with("WorkQueue_") && !expected.contains(t))
        .cloned()
        .collect();

    Ok(VerifyReport {
        valid: missing.is_empty(),
        missing,
        extra,
    })
}
