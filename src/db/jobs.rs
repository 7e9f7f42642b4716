//! Scrape job and job-result operations.

use serde_json::Value;
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::{Error, Result};
use crate::models::{JobStatus, ProfileInput, ScrapeJob, ScrapeResult};
use crate::tenant::TenantId;

/// Max rows per bulk result insert.
const RESULT_BATCH: usize = 1000;

/// One page of job results.
#[derive(Debug, serde::Serialize)]
pub struct ResultsPage {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub profiles: Vec<ScrapeResult>,
}

/// Scrape job operations.
pub struct JobOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> JobOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Persist a freshly submitted job in the `queued` state.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        tenant: &TenantId,
        job_id: Uuid,
        accounts: &Value,
        target_gender: &str,
        max_count_per_account: i32,
        total_batches: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scrape_jobs (
                job_id, tenant_id, status, accounts, target_gender,
                max_count_per_account, total_batches
            ) VALUES ($1, $2, 'queued', $3, $4, $5, $6)
            "#,
        )
        .bind(job_id)
        .bind(tenant)
        .bind(accounts)
        .bind(target_gender)
        .bind(max_count_per_account)
        .bind(total_batches)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Transition `queued -> processing` and stamp `started_at`.
    pub async fn mark_processing(&self, tenant: &TenantId, job_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs SET status = 'processing', started_at = NOW()
             WHERE tenant_id = $1 AND job_id = $2 AND status = 'queued'",
        )
        .bind(tenant)
        .bind(job_id)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Record one finished batch: bump the scraped counter, the batch
    /// counter, and the derived progress percentage.
    ///
    /// Plain read-modify-write through the store; progress is cosmetic, so
    /// a lost increment under contention is tolerable.
    pub async fn record_batch_progress(
        &self,
        tenant: &TenantId,
        job_id: Uuid,
        scraped_delta: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scrape_jobs SET
                profiles_scraped = profiles_scraped + $3,
                current_batch = current_batch + 1,
                progress = LEAST(
                    100.0,
                    (current_batch + 1)::float8 / GREATEST(total_batches, 1)::float8 * 100.0
                )
            WHERE tenant_id = $1 AND job_id = $2
            "#,
        )
        .bind(tenant)
        .bind(job_id)
        .bind(scraped_delta)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Mark the job failed, keeping the first recorded error message.
    pub async fn mark_failed(&self, tenant: &TenantId, job_id: Uuid, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scrape_jobs SET
                status = 'failed',
                error_message = COALESCE(error_message, $3),
                completed_at = COALESCE(completed_at, NOW())
            WHERE tenant_id = $1 AND job_id = $2 AND status <> 'completed'
            "#,
        )
        .bind(tenant)
        .bind(job_id)
        .bind(message)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Terminal success transition with final counters.
    pub async fn mark_completed(
        &self,
        tenant: &TenantId,
        job_id: Uuid,
        total_scraped: i32,
        total_filtered: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scrape_jobs SET
                status = 'completed',
                total_scraped = $3,
                total_filtered = $4,
                progress = 100.0,
                completed_at = NOW()
            WHERE tenant_id = $1 AND job_id = $2 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(tenant)
        .bind(job_id)
        .bind(total_scraped)
        .bind(total_filtered)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Fetch a job row, or `JobNotFound` for this tenant.
    pub async fn fetch(&self, tenant: &TenantId, job_id: Uuid) -> Result<ScrapeJob> {
        sqlx::query_as::<_, ScrapeJob>(
            "SELECT * FROM scrape_jobs WHERE tenant_id = $1 AND job_id = $2",
        )
        .bind(tenant)
        .bind(job_id)
        .fetch_optional(self.ctx.pool())
        .await?
        .ok_or_else(|| Error::not_found("job", job_id.to_string()))
    }

    /// Bulk-insert filtered profiles as job results, chunked.
    pub async fn insert_results(
        &self,
        tenant: &TenantId,
        job_id: Uuid,
        profiles: &[ProfileInput],
    ) -> Result<usize> {
        let mut inserted = 0usize;

        for chunk in profiles.chunks(RESULT_BATCH) {
            let ids: Vec<&str> = chunk.iter().map(|p| p.id.as_str()).collect();
            let usernames: Vec<&str> = chunk.iter().map(|p| p.username.as_str()).collect();
            let names: Vec<&str> = chunk.iter().map(|p| p.display_name.as_str()).collect();

            sqlx::query(
                r#"
                INSERT INTO scrape_results (job_id, profile_id, username, display_name, tenant_id)
                SELECT $4, v.profile_id, v.username, v.display_name, $5
                FROM UNNEST($1::text[], $2::text[], $3::text[]) AS v(profile_id, username, display_name)
                "#,
            )
            .bind(&ids)
            .bind(&usernames)
            .bind(&names)
            .bind(job_id)
            .bind(tenant)
            .execute(self.ctx.pool())
            .await?;
            inserted += chunk.len();
        }

        Ok(inserted)
    }

    /// Paginated results, newest first. Only valid for completed jobs; any
    /// other state is a precondition failure.
    pub async fn fetch_results(
        &self,
        tenant: &TenantId,
        job_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<ResultsPage> {
        let job = self.fetch(tenant, job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(Error::precondition(format!(
                "job is not completed yet (status: {})",
                job.status.as_str()
            )));
        }

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM scrape_results WHERE tenant_id = $1 AND job_id = $2",
        )
        .bind(tenant)
        .bind(job_id)
        .fetch_one(self.ctx.pool())
        .await?;

        let offset = (page - 1) * limit;
        let profiles = sqlx::query_as::<_, ScrapeResult>(
            "SELECT job_id, profile_id, username, display_name, created_at, tenant_id
             FROM scrape_results
             WHERE tenant_id = $1 AND job_id = $2
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(tenant)
        .bind(job_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.ctx.pool())
        .await?;

        Ok(ResultsPage {
            page,
            limit,
            total,
            profiles,
        })
    }
}
