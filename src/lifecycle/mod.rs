//! Time-triggered lifecycle transitions and garbage collection.
//!
//! Three sweeps, each safe to run repeatedly and each tolerant of per-row
//! failures:
//!
//! - aging: pending/followed assignments older than 7 days become
//!   `unfollow`, internally first, then mirrored to the external store
//! - delayed deletion: completed assignments untouched for 24 hours are
//!   deleted, external record first, internal row second
//! - telemetry purge: raw scrape logs, campaigns, and assignments older
//!   than 8 days are dropped; the profile pool is never touched

use std::collections::{BTreeMap, HashMap};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::Result;
use crate::models::{Assignment, AssignmentState};
use crate::store::{RECORD_BATCH, RecordStore, queue_table_name};
use crate::tenant::TenantId;

/// Age at which pending/followed assignments transition to unfollow.
const UNFOLLOW_AGE_DAYS: i64 = 7;

/// Delay between an assignment completing and its deletion.
const DELETE_DELAY_HOURS: i64 = 24;

/// Age past which telemetry rows are purged.
const PURGE_AGE_DAYS: i64 = 8;

/// Pacing between external-store writes (~5 req/s).
const WRITE_PACING: StdDuration = StdDuration::from_millis(200);

/// Counters from one telemetry purge.
#[derive(Debug, serde::Serialize)]
pub struct PurgeReport {
    pub raw_profiles: u64,
    pub campaigns: u64,
    pub assignments: u64,
}

/// Group assignments by their queue index, position order preserved.
fn by_queue(rows: &[Assignment]) -> BTreeMap<i32, Vec<&Assignment>> {
    let mut queues: BTreeMap<i32, Vec<&Assignment>> = BTreeMap::new();
    for row in rows {
        queues.entry(row.queue_index).or_default().push(row);
    }
    queues
}

/// Store record ids per profile for one queue table.
async fn external_index(
    store: &dyn RecordStore,
    tenant: &TenantId,
    table: &str,
) -> Result<HashMap<String, String>> {
    let records = store.list_records(tenant, table).await?;
    Ok(records
        .into_iter()
        .map(|r| (r.fields.profile_id, r.record_id))
        .collect())
}

/// Age pending and followed assignments into `unfollow`.
///
/// The internal transition happens first; the external mirror follows,
/// grouped by queue and rate-limited. An external failure leaves the
/// internal state in place for pull sync to reconcile later.
pub async fn mark_unfollow_due(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
) -> Result<usize> {
    let cutoff = Utc::now() - Duration::days(UNFOLLOW_AGE_DAYS);
    let due = db.assignments().due_for_unfollow(tenant, cutoff).await?;
    if due.is_empty() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = due.iter().map(|a| a.assignment_id).collect();
    let marked = db
        .assignments()
        .set_states(tenant, &ids, AssignmentState::Unfollow)
        .await? as usize;

    let mut mirrored = 0usize;
    let mut failures = 0usize;
    for (queue_index, assignments) in by_queue(&due) {
        let table = queue_table_name(queue_index as u32);
        let index = match external_index(store, tenant, &table).await {
            Ok(index) => index,
            Err(e) => {
                warn!(tenant_id = %tenant, table, error = %e, "failed to index queue table");
                failures += assignments.len();
                continue;
            }
        };

        for assignment in assignments {
            let Some(record_id) = index.get(&assignment.profile_id) else {
                continue;
            };
            match store
                .update_record_state(tenant, &table, record_id, AssignmentState::Unfollow)
                .await
            {
                Ok(()) => mirrored += 1,
                Err(e) => {
                    failures += 1;
                    warn!(
                        tenant_id = %tenant,
                        table,
                        profile_id = %assignment.profile_id,
                        error = %e,
                        "failed to mirror unfollow transition"
                    );
                }
            }
            tokio::time::sleep(WRITE_PACING).await;
        }
    }

    info!(
        tenant_id = %tenant,
        marked,
        mirrored,
        failures,
        "unfollow aging sweep complete"
    );
    Ok(marked)
}

/// Delete completed assignments 24 hours after their last update.
///
/// Per chunk of 10: the external records are deleted first, and only on
/// success are the internal rows removed. A failed external delete leaves
/// that chunk intact for the next sweep.
pub async fn delete_completed_after_delay(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
) -> Result<usize> {
    let cutoff = Utc::now() - Duration::hours(DELETE_DELAY_HOURS);
    let done = db.assignments().completed_before(tenant, cutoff).await?;
    if done.is_empty() {
        return Ok(0);
    }

    let mut deleted = 0usize;
    for (queue_index, assignments) in by_queue(&done) {
        let table = queue_table_name(queue_index as u32);
        let index = match external_index(store, tenant, &table).await {
            Ok(index) => index,
            Err(e) => {
                warn!(tenant_id = %tenant, table, error = %e, "failed to index queue table");
                continue;
            }
        };

        for chunk in assignments.chunks(RECORD_BATCH) {
            let record_ids: Vec<String> = chunk
                .iter()
                .filter_map(|a| index.get(&a.profile_id).cloned())
                .collect();

            if !record_ids.is_empty() {
                if let Err(e) = store.delete_records(tenant, &table, &record_ids).await {
                    warn!(
                        tenant_id = %tenant,
                        table,
                        chunk = chunk.len(),
                        error = %e,
                        "external delete failed, keeping internal rows"
                    );
                    tokio::time::sleep(WRITE_PACING).await;
                    continue;
                }
            }

            let assignment_ids: Vec<Uuid> = chunk.iter().map(|a| a.assignment_id).collect();
            match db.assignments().delete_by_ids(tenant, &assignment_ids).await {
                Ok(n) => deleted += n as usize,
                Err(e) => {
                    warn!(
                        tenant_id = %tenant,
                        table,
                        error = %e,
                        "internal delete failed after external delete"
                    );
                }
            }
            tokio::time::sleep(WRITE_PACING).await;
        }
    }

    info!(tenant_id = %tenant, deleted, "delayed deletion sweep complete");
    Ok(deleted)
}

/// Purge telemetry older than 8 days: raw profiles, campaigns, then
/// assignments. The profile pool is never purged here.
pub async fn purge_old_telemetry(db: &DbContext, tenant: &TenantId) -> Result<PurgeReport> {
    let now = Utc::now();
    let timestamp_cutoff = now - Duration::days(PURGE_AGE_DAYS);
    let date_cutoff = timestamp_cutoff.date_naive();

    let raw_profiles = db
        .profiles()
        .purge_raw_before(tenant, timestamp_cutoff)
        .await?;
    let campaigns = db.campaigns().purge_before(tenant, date_cutoff).await?;
    let assignments = db
        .assignments()
        .purge_before(tenant, timestamp_cutoff)
        .await?;

    info!(
        tenant_id = %tenant,
        raw_profiles,
        campaigns,
        assignments,
        "telemetry purge complete"
    );

    Ok(PurgeReport {
        raw_profiles,
        campaigns,
        assignments,
    })
}
