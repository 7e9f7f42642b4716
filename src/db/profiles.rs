//! Profile pool and raw-scrape-log operations.
//!
//! Ingestion is bulk-safe: one existence probe per 5000 ids, then UNNEST
//! inserts in batches of 1000 with a per-row fallback when a whole batch
//! fails. This bounds round-trips to `ceil(N/5000) + 2*ceil(N/1000)` for N
//! profiles instead of 2N.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::DbContext;
use crate::error::Result;
use crate::models::{GlobalProfile, ProfileInput};
use crate::tenant::TenantId;

/// Max ids per existence probe (`= ANY($1)` array size).
const PROBE_CHUNK: usize = 5000;

/// Max rows per bulk insert.
const INSERT_BATCH: usize = 1000;

/// Outcome counters for one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestSummary {
    /// Rows appended to the raw scrape log.
    pub inserted_raw: usize,
    /// New rows added to the deduplicated pool.
    pub added_global: usize,
    /// Inputs skipped because the pool already had the profile.
    pub skipped: usize,
}

/// Profile store operations.
pub struct ProfileOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> ProfileOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Bulk-ingest scraped profiles.
    ///
    /// Idempotent on the pool: re-ingesting the same profiles adds nothing
    /// to `global_profiles` but always appends to `raw_profiles`. A
    /// duplicate that appears between the probe and the insert (concurrent
    /// request) is counted as skipped, not an error.
    pub async fn ingest_batch(
        &self,
        tenant: &TenantId,
        profiles: &[ProfileInput],
        batch_delay: Duration,
    ) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        // Drop inputs missing id or username.
        let valid: Vec<&ProfileInput> = profiles
            .iter()
            .filter(|p| {
                let ok = !p.id.trim().is_empty() && !p.username.trim().is_empty();
                if !ok {
                    warn!(tenant_id = %tenant, username = %p.username, "skipping profile with missing id or username");
                }
                ok
            })
            .collect();

        if valid.is_empty() {
            return Ok(summary);
        }

        let existing = self
            .probe_existing(tenant, valid.iter().map(|p| p.id.as_str()))
            .await?;

        let new_global: Vec<&ProfileInput> = valid
            .iter()
            .copied()
            .filter(|p| !existing.contains(p.id.as_str()))
            .collect();
        summary.skipped = valid.len() - new_global.len();

        info!(
            tenant_id = %tenant,
            total = valid.len(),
            existing = summary.skipped,
            new = new_global.len(),
            "prepared bulk ingestion"
        );

        summary.inserted_raw = self.insert_raw_batches(tenant, &valid, batch_delay).await;
        let (added, race_skipped) = self
            .insert_global_batches(tenant, &new_global, batch_delay)
            .await;
        summary.added_global = added;
        summary.skipped += race_skipped;

        info!(
            tenant_id = %tenant,
            inserted_raw = summary.inserted_raw,
            added_global = summary.added_global,
            skipped = summary.skipped,
            "bulk ingestion complete"
        );

        Ok(summary)
    }

    /// Collect the set of profile ids already present in the pool.
    async fn probe_existing(
        &self,
        tenant: &TenantId,
        ids: impl Iterator<Item = &str>,
    ) -> Result<HashSet<String>> {
        let all_ids: Vec<&str> = ids.collect();
        let mut existing = HashSet::new();

        for chunk in all_ids.chunks(PROBE_CHUNK) {
            let ids: Vec<String> = chunk.iter().map(|s| s.to_string()).collect();
            let found: Vec<(String,)> = sqlx::query_as(
                "SELECT profile_id FROM global_profiles WHERE tenant_id = $1 AND profile_id = ANY($2)",
            )
            .bind(tenant)
            .bind(&ids)
            .fetch_all(self.ctx.pool())
            .await?;
            existing.extend(found.into_iter().map(|(id,)| id));
        }

        Ok(existing)
    }

    /// Append every valid input to the raw scrape log, batched.
    async fn insert_raw_batches(
        &self,
        tenant: &TenantId,
        profiles: &[&ProfileInput],
        batch_delay: Duration,
    ) -> usize {
        let scraped_at = Utc::now();
        let mut inserted = 0usize;
        let batches: Vec<&[&ProfileInput]> = profiles.chunks(INSERT_BATCH).collect();
        let total_batches = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let ids: Vec<&str> = batch.iter().map(|p| p.id.as_str()).collect();
            let usernames: Vec<&str> = batch.iter().map(|p| p.username.as_str()).collect();
            let names: Vec<&str> = batch.iter().map(|p| p.display_name.as_str()).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO raw_profiles (profile_id, username, display_name, scraped_at, tenant_id)
                SELECT v.profile_id, v.username, v.display_name, $4, $5
                FROM UNNEST($1::text[], $2::text[], $3::text[]) AS v(profile_id, username, display_name)
                "#,
            )
            .bind(&ids)
            .bind(&usernames)
            .bind(&names)
            .bind(scraped_at)
            .bind(tenant)
            .execute(self.ctx.pool())
            .await;

            match result {
                Ok(_) => {
                    inserted += batch.len();
                    if i + 1 < total_batches {
                        tokio::time::sleep(batch_delay).await;
                    }
                }
                Err(e) => {
                    warn!(
                        tenant_id = %tenant,
                        batch = i + 1,
                        total_batches,
                        error = %e,
                        "raw batch insert failed, falling back to per-row inserts"
                    );
                    for p in batch {
                        let row = sqlx::query(
                            "INSERT INTO raw_profiles (profile_id, username, display_name, scraped_at, tenant_id)
                             VALUES ($1, $2, $3, $4, $5)",
                        )
                        .bind(&p.id)
                        .bind(&p.username)
                        .bind(&p.display_name)
                        .bind(scraped_at)
                        .bind(tenant)
                        .execute(self.ctx.pool())
                        .await;
                        match row {
                            Ok(_) => inserted += 1,
                            Err(e) => {
                                warn!(tenant_id = %tenant, username = %p.username, error = %e, "raw per-row insert failed")
                            }
                        }
                    }
                }
            }
        }

        inserted
    }

    /// Insert the not-yet-present profiles into the pool, batched.
    ///
    /// Returns `(added, skipped_on_race)`.
    async fn insert_global_batches(
        &self,
        tenant: &TenantId,
        profiles: &[&ProfileInput],
        batch_delay: Duration,
    ) -> (usize, usize) {
        let created_at = Utc::now();
        let mut added = 0usize;
        let mut race_skipped = 0usize;
        let batches: Vec<&[&ProfileInput]> = profiles.chunks(INSERT_BATCH).collect();
        let total_batches = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let ids: Vec<&str> = batch.iter().map(|p| p.id.as_str()).collect();
            let usernames: Vec<&str> = batch.iter().map(|p| p.username.as_str()).collect();
            let names: Vec<&str> = batch.iter().map(|p| p.display_name.as_str()).collect();

            let result: std::result::Result<Vec<(String,)>, sqlx::Error> = sqlx::query_as(
                r#"
                INSERT INTO global_profiles (profile_id, username, display_name, used, created_at, tenant_id)
                SELECT v.profile_id, v.username, v.display_name, FALSE, $4, $5
                FROM UNNEST($1::text[], $2::text[], $3::text[]) AS v(profile_id, username, display_name)
                ON CONFLICT (tenant_id, profile_id) DO NOTHING
                RETURNING profile_id
                "#,
            )
            .bind(&ids)
            .bind(&usernames)
            .bind(&names)
            .bind(created_at)
            .bind(tenant)
            .fetch_all(self.ctx.pool())
            .await;

            match result {
                Ok(rows) => {
                    added += rows.len();
                    race_skipped += batch.len() - rows.len();
                    if i + 1 < total_batches {
                        tokio::time::sleep(batch_delay).await;
                    }
                }
                Err(e) => {
                    warn!(
                        tenant_id = %tenant,
                        batch = i + 1,
                        total_batches,
                        error = %e,
                        "pool batch insert failed, falling back to per-row inserts"
                    );
                    for p in batch {
                        let row = sqlx::query(
                            r#"
                            INSERT INTO global_profiles (profile_id, username, display_name, used, created_at, tenant_id)
                            VALUES ($1, $2, $3, FALSE, $4, $5)
                            ON CONFLICT (tenant_id, profile_id) DO NOTHING
                            "#,
                        )
                        .bind(&p.id)
                        .bind(&p.username)
                        .bind(&p.display_name)
                        .bind(created_at)
                        .bind(tenant)
                        .execute(self.ctx.pool())
                        .await;
                        match row {
                            Ok(done) if done.rows_affected() > 0 => added += 1,
                            Ok(_) => race_skipped += 1,
                            Err(e) => {
                                warn!(tenant_id = %tenant, username = %p.username, error = %e, "pool per-row insert failed");
                                race_skipped += 1;
                            }
                        }
                    }
                }
            }
        }

        (added, race_skipped)
    }

    /// Fetch up to `limit` unused profiles, oldest first.
    pub async fn select_unused(&self, tenant: &TenantId, limit: i64) -> Result<Vec<GlobalProfile>> {
        let rows = sqlx::query_as::<_, GlobalProfile>(
            "SELECT * FROM global_profiles
             WHERE tenant_id = $1 AND NOT used
             ORDER BY created_at ASC
             LIMIT $2",
        )
        .bind(tenant)
        .bind(limit)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Flip `used` on rows that are currently unused. One-way transition.
    pub async fn mark_used(&self, tenant: &TenantId, profile_ids: &[String]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE global_profiles SET used = TRUE, used_at = NOW()
             WHERE tenant_id = $1 AND profile_id = ANY($2) AND NOT used",
        )
        .bind(tenant)
        .bind(profile_ids)
        .execute(self.ctx.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete raw scrape-log rows older than the cutoff.
    pub async fn purge_raw_before(
        &self,
        tenant: &TenantId,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM raw_profiles WHERE tenant_id = $1 AND scraped_at < $2")
                .bind(tenant)
                .bind(cutoff)
                .execute(self.ctx.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
