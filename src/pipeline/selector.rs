//! Daily working-set selection.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::{Error, Result};
use crate::tenant::TenantId;

/// Outcome of one selection run.
#[derive(Debug, serde::Serialize)]
pub struct SelectionOutcome {
    pub campaign_id: Uuid,
    pub campaign_date: NaiveDate,
    pub total_selected: usize,
}

/// Select up to `num_queues * profiles_per_queue` unused profiles, burn
/// them, and write placeholder assignments for a new campaign.
///
/// Step order matters: profiles are marked used before the placeholders are
/// written. The backing store offers no cross-table transaction, so a crash
/// between the two leaves burned profiles without assignments; the gap is
/// logged rather than papered over.
pub async fn select_daily_batch(
    db: &DbContext,
    tenant: &TenantId,
    campaign_date: Option<NaiveDate>,
    num_queues: u32,
    profiles_per_queue: u32,
) -> Result<SelectionOutcome> {
    let campaign_date = campaign_date.unwrap_or_else(|| Utc::now().date_naive());
    let campaign_id = Uuid::new_v4();
    db.campaigns()
        .insert(tenant, campaign_id, campaign_date)
        .await?;

    let targets = (num_queues as i64) * (profiles_per_queue as i64);
    let batch = db.profiles().select_unused(tenant, targets).await?;
    if batch.is_empty() {
        info!(tenant_id = %tenant, %campaign_id, "no unused profiles available");
        return Err(Error::NoProfilesAvailable);
    }

    let profile_ids: Vec<String> = batch.iter().map(|p| p.profile_id.clone()).collect();
    let marked = db.profiles().mark_used(tenant, &profile_ids).await?;
    if marked != batch.len() as u64 {
        // Someone raced us between select and mark; the extra rows will be
        // assigned anyway, they were simply burned by the other caller.
        warn!(
            tenant_id = %tenant,
            %campaign_id,
            selected = batch.len(),
            marked,
            "mark_used count differs from selection"
        );
    }

    let placed = db
        .assignments()
        .insert_placeholders(tenant, campaign_id, &batch)
        .await;
    let placed = match placed {
        Ok(n) => n,
        Err(e) => {
            // Burned profiles now have no assignments; surface loudly.
            warn!(
                tenant_id = %tenant,
                %campaign_id,
                burned = batch.len(),
                error = %e,
                "placeholder insert failed after profiles were marked used"
            );
            return Err(e);
        }
    };

    db.campaigns()
        .set_total_assigned(tenant, campaign_id, placed as i32)
        .await?;

    info!(
        tenant_id = %tenant,
        %campaign_id,
        %campaign_date,
        total_selected = placed,
        targets,
        "daily selection complete"
    );

    Ok(SelectionOutcome {
        campaign_id,
        campaign_date,
        total_selected: placed,
    })
}
