//! Daily pipeline: selection, distribution, and outbound sync.

pub mod distributor;
pub mod selector;

pub use distributor::{DistributionReport, distribute};
pub use selector::{SelectionOutcome, select_daily_batch};

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::Result;
use crate::store::RecordStore;
use crate::sync;
use crate::tenant::TenantId;

/// One step's outcome inside a pipeline run.
#[derive(Debug, serde::Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub success: bool,
    pub detail: String,
}

/// Structured summary of one `RunDaily` invocation.
#[derive(Debug, serde::Serialize)]
pub struct PipelineSummary {
    pub campaign_id: Option<Uuid>,
    pub steps: Vec<StepReport>,
}

/// Run the full daily pipeline for one tenant: select a fresh working set,
/// distribute it across the worker queues, and mirror it externally.
///
/// A failed step is recorded and skips only the steps that depend on it;
/// the summary always covers all three.
pub async fn run_daily(
    db: &DbContext,
    store: &dyn RecordStore,
    tenant: &TenantId,
    campaign_date: Option<NaiveDate>,
    num_queues: u32,
    profiles_per_queue: u32,
) -> Result<PipelineSummary> {
    let mut steps = Vec::with_capacity(3);

    info!(
        tenant_id = %tenant,
        num_queues,
        profiles_per_queue,
        "daily pipeline started"
    );

    let selection = select_daily_batch(db, tenant, campaign_date, num_queues, profiles_per_queue)
        .await;
    let campaign_id = match selection {
        Ok(outcome) => {
            steps.push(StepReport {
                step: "select",
                success: true,
                detail: format!("selected {} profiles", outcome.total_selected),
            });
            Some(outcome.campaign_id)
        }
        Err(e) => {
            warn!(tenant_id = %tenant, error = %e, "selection step failed");
            steps.push(StepReport {
                step: "select",
                success: false,
                detail: e.to_string(),
            });
            None
        }
    };

    let distributed = match campaign_id {
        Some(campaign_id) => {
            match distribute(db, tenant, campaign_id, num_queues, profiles_per_queue).await {
                Ok(report) => {
                    steps.push(StepReport {
                        step: "distribute",
                        success: true,
                        detail: format!(
                            "{} assignments across {} queues",
                            report.total_distributed, report.tables_used
                        ),
                    });
                    report.total_distributed > 0
                }
                Err(e) => {
                    warn!(tenant_id = %tenant, error = %e, "distribution step failed");
                    steps.push(StepReport {
                        step: "distribute",
                        success: false,
                        detail: e.to_string(),
                    });
                    false
                }
            }
        }
        None => {
            steps.push(StepReport {
                step: "distribute",
                success: false,
                detail: "skipped: selection failed".to_string(),
            });
            false
        }
    };

    match (campaign_id, distributed) {
        (Some(campaign_id), true) => {
            match sync::push_campaign(db, store, tenant, campaign_id).await {
                Ok(report) => steps.push(StepReport {
                    step: "sync_out",
                    success: report.status,
                    detail: format!(
                        "{} records across {} queues",
                        report.records_synced, report.tables_synced
                    ),
                }),
                Err(e) => {
                    warn!(tenant_id = %tenant, error = %e, "outbound sync step failed");
                    steps.push(StepReport {
                        step: "sync_out",
                        success: false,
                        detail: e.to_string(),
                    });
                }
            }
        }
        _ => steps.push(StepReport {
            step: "sync_out",
            success: false,
            detail: "skipped: nothing distributed".to_string(),
        }),
    }

    info!(
        tenant_id = %tenant,
        campaign_id = ?campaign_id,
        succeeded = steps.iter().filter(|s| s.success).count(),
        "daily pipeline finished"
    );

    Ok(PipelineSummary { campaign_id, steps })
}
