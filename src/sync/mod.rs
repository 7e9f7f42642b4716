//! Bidirectional synchronization with the external record-store.
//!
//! Push mirrors a distributed campaign into the per-queue tables; pull
//! reads operator-edited states back into the assignments. Push clears each
//! queue table before writing, so re-running it cannot duplicate records.
//! Pull is idempotent by construction.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::{Error, Result};
use crate::models::Assignment;
use crate::store::{QueueRecord, RECORD_BATCH, RecordStore, queue_table_name};
use crate::tenant::TenantId;

/// Pacing between chunk submissions; the store allows ~5 req/s per queue.
const CHUNK_PACING: Duration = Duration::from_millis(200);

/// Attempts per chunk, with exponential backoff between them.
const CHUNK_ATTEMPTS: u32 = 3;

/// Outcome of pushing one campaign.
#[derive(Debug, serde::Serialize)]
pub struct PushReport {
    /// Queues whose records were all pushed.
    pub tables_synced: usize,
    pub records_synced: usize,
    /// True iff every queue was fully mirrored and at least one record
    /// was pushed.
    pub status: bool,
}

/// Mirror a distributed campaign into the external store.
pub async fn push_campaign(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
    campaign_id: Uuid,
) -> Result<PushReport> {
    let campaign = db.campaigns().fetch(tenant, campaign_id).await?;

    let rows = db.assignments().fetch_packed(tenant, campaign_id).await?;
    if rows.is_empty() {
        return Err(Error::precondition(format!(
            "campaign {campaign_id} is not distributed yet"
        )));
    }

    let platform = match db.tenants().fetch(tenant).await? {
        Some(settings) => settings.platform,
        None => "instagram".to_string(),
    };

    // Group by queue, preserving position order within each.
    let mut queues: BTreeMap<i32, Vec<&Assignment>> = BTreeMap::new();
    for row in &rows {
        queues.entry(row.queue_index).or_default().push(row);
    }

    let total_queues = queues.len();
    let mut tables_synced = 0usize;
    let mut records_synced = 0usize;

    for (queue_index, assignments) in queues {
        let table = queue_table_name(queue_index as u32);

        if let Err(e) = clear_table(store, tenant, &table).await {
            warn!(
                tenant_id = %tenant,
                %campaign_id,
                table,
                error = %e,
                "failed to clear queue table, skipping queue"
            );
            continue;
        }

        let records: Vec<QueueRecord> = assignments
            .iter()
            .map(|a| QueueRecord {
                profile_id: a.profile_id.clone(),
                username: a.username.clone(),
                display_name: a.display_name.clone(),
                platform: platform.clone(),
                position: a.position,
                campaign_date: campaign.campaign_date,
                state: a.state,
            })
            .collect();

        let mut queue_complete = true;
        for chunk in records.chunks(RECORD_BATCH) {
            match push_chunk(store, tenant, &table, chunk).await {
                Ok(n) => records_synced += n,
                Err(e) => {
                    warn!(
                        tenant_id = %tenant,
                        %campaign_id,
                        table,
                        error = %e,
                        "chunk push exhausted retries, skipping queue remainder"
                    );
                    queue_complete = false;
                    break;
                }
            }
            tokio::time::sleep(CHUNK_PACING).await;
        }

        if queue_complete {
            tables_synced += 1;
        }
    }

    let status = tables_synced == total_queues && records_synced > 0;
    db.campaigns().set_status(tenant, campaign_id, status).await?;

    info!(
        tenant_id = %tenant,
        %campaign_id,
        tables_synced,
        total_queues,
        records_synced,
        status,
        "campaign push complete"
    );

    Ok(PushReport {
        tables_synced,
        records_synced,
        status,
    })
}

/// Delete every existing record in a queue table, in store-sized batches.
async fn clear_table(store: &dyn RecordStore, tenant: &TenantId, table: &str) -> Result<usize> {
    let existing = store.list_records(tenant, table).await?;
    if existing.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = existing.into_iter().map(|r| r.record_id).collect();
    let mut deleted = 0usize;
    for chunk in ids.chunks(RECORD_BATCH) {
        deleted += store.delete_records(tenant, table, chunk).await?;
        tokio::time::sleep(CHUNK_PACING).await;
    }
    Ok(deleted)
}

/// Push one chunk with bounded exponential backoff (1 s, 2 s between
/// attempts).
async fn push_chunk(
    store: &dyn RecordStore,
    tenant: &TenantId,
    table: &str,
    chunk: &[QueueRecord],
) -> Result<usize> {
    let mut last_error: Option<Error> = None;

    for attempt in 0..CHUNK_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1 << (attempt - 1))).await;
        }
        match store.create_records(tenant, table, chunk).await {
            Ok(n) => return Ok(n),
            Err(e) => {
                warn!(
                    tenant_id = %tenant,
                    table,
                    attempt = attempt + 1,
                    max_attempts = CHUNK_ATTEMPTS,
                    error = %e,
                    "chunk push failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other(anyhow::anyhow!("no attempts made"))))
}

/// Pull operator-edited states back into the assignments.
///
/// For each queue table, every record is matched to an assignment by
/// `(tenant, profile_id, queue_index)`; a differing state is written back
/// with a fresh `updated_at`. Safe to run repeatedly, and safe to race a
/// push: a partial mirror just reconciles on the next run.
pub async fn pull_statuses(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
    num_queues: u32,
) -> Result<usize> {
    let mut synced = 0usize;

    for queue_index in 1..=num_queues as i32 {
        let table = queue_table_name(queue_index as u32);
        let records = match store.list_records(tenant, &table).await {
            Ok(records) => records,
            Err(e) => {
                warn!(tenant_id = %tenant, table, error = %e, "failed to list queue records");
                continue;
            }
        };
        if records.is_empty() {
            continue;
        }

        // Newest assignment per profile wins when purge lag leaves several.
        let assignments = db.assignments().fetch_queue(tenant, queue_index).await?;
        let mut by_profile: HashMap<&str, &Assignment> = HashMap::new();
        for a in &assignments {
            by_profile.entry(a.profile_id.as_str()).or_insert(a);
        }

        for record in &records {
            let Some(assignment) = by_profile.get(record.fields.profile_id.as_str()) else {
                continue;
            };
            if assignment.state == record.fields.state {
                continue;
            }
            match db
                .assignments()
                .set_state(tenant, assignment.assignment_id, record.fields.state)
                .await
            {
                Ok(_) => synced += 1,
                Err(e) => {
                    warn!(
                        tenant_id = %tenant,
                        assignment_id = %assignment.assignment_id,
                        error = %e,
                        "failed to reconcile assignment state"
                    );
                }
            }
        }
    }

    info!(tenant_id = %tenant, synced, "status pull complete");
    Ok(synced)
}
