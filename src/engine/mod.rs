//! Job execution engine.
//!
//! A submitted scrape job fans out into per-batch tasks on the worker pool.
//! Each batch scrapes its slice of accounts, applies the gender filter, and
//! reports an outcome over the job's result channel. A per-job aggregator
//! acts as the barrier: it waits for every batch outcome, persists the
//! combined results, and drives the job to its terminal state exactly once.
//!
//! The aggregator runs as its own task rather than occupying a pool worker;
//! parking it in the pool could deadlock a small pool whose every worker is
//! waiting on batches that cannot be scheduled.

mod pool;

pub use pool::{PoolTask, WorkerPool};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::db::DbContext;
use crate::error::{Error, Result};
use crate::gender::{self, TargetGender};
use crate::models::ProfileInput;
use crate::scrape::{Platform, ProfileSource};
use crate::tenant::TenantId;

/// Accounts per batch task.
const BATCH_SIZE: usize = 50;

/// Default followers scraped per account when no total is requested.
const DEFAULT_PER_ACCOUNT: i64 = 5;

/// Receipt returned to the submitter.
#[derive(Debug, serde::Serialize)]
pub struct SubmitReceipt {
    pub job_id: Uuid,
    pub total_batches: i32,
    pub status_url: String,
    pub results_url: String,
}

/// Outcome of one batch task, delivered to the aggregation barrier.
struct BatchOutcome {
    batch_number: usize,
    scraped: usize,
    filtered: Vec<ProfileInput>,
    error: Option<String>,
}

/// The job engine: submission, fan-out, and aggregation.
pub struct JobEngine {
    db: DbContext,
    source: Arc<dyn ProfileSource>,
    pool: WorkerPool,
    limits: WorkerConfig,
    ingest_delay: Duration,
}

impl JobEngine {
    pub fn new(
        db: DbContext,
        source: Arc<dyn ProfileSource>,
        pool: WorkerPool,
        limits: WorkerConfig,
        ingest_delay: Duration,
    ) -> Self {
        Self {
            db,
            source,
            pool,
            limits,
            ingest_delay,
        }
    }

    /// Submit a scrape job and return immediately with a poll receipt.
    ///
    /// Computes the per-account count, partitions accounts into batches,
    /// persists the job, enqueues the batch tasks plus the aggregation
    /// barrier, and transitions the job to `processing`.
    pub async fn submit(
        &self,
        tenant: &TenantId,
        accounts: Vec<String>,
        target_gender: &str,
        total_scrape_count: Option<i64>,
    ) -> Result<SubmitReceipt> {
        let accounts: Vec<String> = accounts
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if accounts.is_empty() {
            return Err(Error::validation("accounts must be a non-empty list"));
        }

        let target = TargetGender::parse(target_gender)?;

        let per_account = match total_scrape_count {
            Some(total) if total <= 0 => {
                return Err(Error::validation("total_scrape_count must be positive"));
            }
            Some(total) => {
                let per = total / accounts.len() as i64;
                if per == 0 {
                    return Err(Error::validation(
                        "total_scrape_count too small for number of accounts",
                    ));
                }
                per
            }
            None => DEFAULT_PER_ACCOUNT,
        };

        let platform = self.resolve_platform(tenant).await?;

        let account_count = accounts.len();
        let batches: Vec<Vec<String>> = accounts
            .chunks(BATCH_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_batches = batches.len() as i32;
        let accounts_json = json!(accounts);

        let job_id = Uuid::new_v4();
        self.db
            .jobs()
            .insert(
                tenant,
                job_id,
                &accounts_json,
                target.as_str(),
                per_account as i32,
                total_batches,
            )
            .await?;

        info!(
            tenant_id = %tenant,
            %job_id,
            %platform,
            accounts = account_count,
            total_batches,
            per_account,
            "scrape job created"
        );

        // Transition before fan-out: a fast batch must never observe a job
        // still queued.
        self.db.jobs().mark_processing(tenant, job_id).await?;

        let (outcome_tx, outcome_rx) = mpsc::channel::<BatchOutcome>(batches.len());

        for (i, batch) in batches.into_iter().enumerate() {
            let batch_number = i + 1;
            let ctx = BatchContext {
                db: self.db.clone(),
                source: self.source.clone(),
                tenant: tenant.clone(),
                job_id,
                platform,
                target,
                per_account: per_account as u32,
                soft_limit: self.limits.task_soft_limit,
                hard_limit: self.limits.task_hard_limit,
            };
            let tx = outcome_tx.clone();
            self.pool
                .submit(Box::pin(async move {
                    let outcome = run_batch(ctx, batch_number, batch).await;
                    // Receiver gone means the aggregator died; nothing to do.
                    let _ = tx.send(outcome).await;
                }))
                .await?;
        }
        drop(outcome_tx);

        // Aggregation barrier; see module docs for why this bypasses the pool.
        tokio::spawn(aggregate(
            self.db.clone(),
            tenant.clone(),
            job_id,
            total_batches as usize,
            self.ingest_delay,
            outcome_rx,
        ));

        Ok(SubmitReceipt {
            job_id,
            total_batches,
            status_url: format!("/api/job-status/{job_id}"),
            results_url: format!("/api/job-results/{job_id}"),
        })
    }

    /// Platform for this tenant, from its settings row. Defaults to
    /// Instagram for unregistered tenants.
    async fn resolve_platform(&self, tenant: &TenantId) -> Result<Platform> {
        match self.db.tenants().fetch(tenant).await? {
            Some(settings) => Platform::parse(&settings.platform),
            None => Ok(Platform::Instagram),
        }
    }
}

/// Everything a batch task needs, cloned out of the engine.
struct BatchContext {
    db: DbContext,
    source: Arc<dyn ProfileSource>,
    tenant: TenantId,
    job_id: Uuid,
    platform: Platform,
    target: TargetGender,
    per_account: u32,
    soft_limit: Duration,
    hard_limit: Duration,
}

/// Execute one batch under the soft/hard deadline pair.
async fn run_batch(ctx: BatchContext, batch_number: usize, accounts: Vec<String>) -> BatchOutcome {
    let work = run_batch_inner(&ctx, &accounts);
    tokio::pin!(work);

    // Soft deadline first: log and keep waiting up to the hard deadline.
    let result = tokio::select! {
        res = &mut work => Some(res),
        _ = tokio::time::sleep(ctx.soft_limit) => None,
    };

    let result = match result {
        Some(res) => res,
        None => {
            warn!(
                tenant_id = %ctx.tenant,
                job_id = %ctx.job_id,
                batch_number,
                soft_limit = format!("{:?}", ctx.soft_limit),
                "batch exceeded soft time limit, winding down"
            );
            let remaining = ctx.hard_limit.saturating_sub(ctx.soft_limit);
            match tokio::time::timeout(remaining, &mut work).await {
                Ok(res) => res,
                Err(_) => Err(Error::Other(anyhow::anyhow!(
                    "batch {batch_number} exceeded the hard time limit of {:?}",
                    ctx.hard_limit
                ))),
            }
        }
    };

    match result {
        Ok((scraped, filtered)) => {
            info!(
                tenant_id = %ctx.tenant,
                job_id = %ctx.job_id,
                batch_number,
                scraped,
                filtered = filtered.len(),
                "batch complete"
            );
            BatchOutcome {
                batch_number,
                scraped,
                filtered,
                error: None,
            }
        }
        Err(e) => {
            error!(
                tenant_id = %ctx.tenant,
                job_id = %ctx.job_id,
                batch_number,
                error = %e,
                "batch failed"
            );
            let message = format!("batch {batch_number} failed: {e}");
            // Record the failure now; sibling batches keep running and the
            // barrier still fires.
            if let Err(db_err) = ctx
                .db
                .jobs()
                .mark_failed(&ctx.tenant, ctx.job_id, &message)
                .await
            {
                error!(
                    tenant_id = %ctx.tenant,
                    job_id = %ctx.job_id,
                    error = %db_err,
                    "failed to record batch failure"
                );
            }
            BatchOutcome {
                batch_number,
                scraped: 0,
                filtered: Vec::new(),
                error: Some(message),
            }
        }
    }
}

/// Scrape, classify, filter, and record progress for one batch.
async fn run_batch_inner(
    ctx: &BatchContext,
    accounts: &[String],
) -> Result<(usize, Vec<ProfileInput>)> {
    let profiles = ctx
        .source
        .scrape(ctx.platform, accounts, ctx.per_account)
        .await?;
    let scraped = profiles.len();

    let retained = gender::filter_inclusive(
        profiles.into_values().collect::<Vec<_>>(),
        ctx.target,
        |p| (p.username.as_str(), p.display_name.as_str()),
    );
    let filtered: Vec<ProfileInput> = retained
        .into_iter()
        .map(|p| ProfileInput {
            id: p.id,
            username: p.username,
            display_name: p.display_name,
        })
        .collect();

    ctx.db
        .jobs()
        .record_batch_progress(&ctx.tenant, ctx.job_id, scraped as i32)
        .await?;

    Ok((scraped, filtered))
}

/// The aggregation barrier: runs once per job, after every batch resolves.
///
/// Persists whatever results were collected (even on failure) and performs
/// the single terminal transition.
async fn aggregate(
    db: DbContext,
    tenant: TenantId,
    job_id: Uuid,
    total_batches: usize,
    ingest_delay: Duration,
    mut outcome_rx: mpsc::Receiver<BatchOutcome>,
) {
    let mut outcomes: Vec<BatchOutcome> = Vec::with_capacity(total_batches);
    while outcomes.len() < total_batches {
        match outcome_rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            // Channel closed early: a batch task was dropped before
            // reporting (e.g. shutdown mid-job).
            None => break,
        }
    }

    let aborted = total_batches - outcomes.len();
    let total_scraped: usize = outcomes.iter().map(|o| o.scraped).sum();
    let mut failure = outcomes.iter().find_map(|o| o.error.clone());
    if failure.is_none() && aborted > 0 {
        failure = Some(format!("{aborted} batch task(s) aborted before completion"));
    }

    outcomes.sort_by_key(|o| o.batch_number);
    let filtered: Vec<ProfileInput> = outcomes.into_iter().flat_map(|o| o.filtered).collect();
    let total_filtered = filtered.len();

    // Partial results are worth keeping either way.
    if let Err(e) = db.jobs().insert_results(&tenant, job_id, &filtered).await {
        error!(tenant_id = %tenant, %job_id, error = %e, "failed to persist job results");
        failure.get_or_insert_with(|| format!("failed to persist results: {e}"));
    }

    // Feed the filtered profiles into the tenant's pool: one raw event per
    // profile, deduplicated on the pool itself.
    match db
        .profiles()
        .ingest_batch(&tenant, &filtered, ingest_delay)
        .await
    {
        Ok(summary) => info!(
            tenant_id = %tenant,
            %job_id,
            added_global = summary.added_global,
            skipped = summary.skipped,
            "job results ingested into profile pool"
        ),
        Err(e) => {
            error!(tenant_id = %tenant, %job_id, error = %e, "failed to ingest job results");
            failure.get_or_insert_with(|| format!("failed to ingest results: {e}"));
        }
    }

    let terminal = match failure {
        Some(message) => {
            let res = db.jobs().mark_failed(&tenant, job_id, &message).await;
            info!(
                tenant_id = %tenant,
                %job_id,
                total_scraped,
                total_filtered,
                error = %message,
                "job failed"
            );
            res
        }
        None => {
            let res = db
                .jobs()
                .mark_completed(&tenant, job_id, total_scraped as i32, total_filtered as i32)
                .await;
            info!(
                tenant_id = %tenant,
                %job_id,
                total_scraped,
                total_filtered,
                "job completed"
            );
            res
        }
    };

    if let Err(e) = terminal {
        error!(tenant_id = %tenant, %job_id, error = %e, "failed to finalize job");
    }
}
