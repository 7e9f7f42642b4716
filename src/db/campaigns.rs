//! Campaign operations.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::{Error, Result};
use crate::models::Campaign;
use crate::tenant::TenantId;

/// Campaign operations.
pub struct CampaignOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> CampaignOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Create an empty campaign for the given date.
    pub async fn insert(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
        campaign_date: NaiveDate,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO campaigns (campaign_id, campaign_date, total_assigned, status, tenant_id)
             VALUES ($1, $2, 0, FALSE, $3)",
        )
        .bind(campaign_id)
        .bind(campaign_date)
        .bind(tenant)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Fetch a campaign row, or `CampaignNotFound` for this tenant.
    pub async fn fetch(&self, tenant: &TenantId, campaign_id: Uuid) -> Result<Campaign> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE tenant_id = $1 AND campaign_id = $2",
        )
        .bind(tenant)
        .bind(campaign_id)
        .fetch_optional(self.ctx.pool())
        .await?
        .ok_or_else(|| Error::not_found("campaign", campaign_id.to_string()))
    }

    pub async fn set_total_assigned(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
        total: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE campaigns SET total_assigned = $3 WHERE tenant_id = $1 AND campaign_id = $2",
        )
        .bind(tenant)
        .bind(campaign_id)
        .bind(total)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    /// Record whether the campaign is fully mirrored in the external store.
    pub async fn set_status(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
        status: bool,
    ) -> Result<()> {
        sqlx::query("UPDATE campaigns SET status = $3 WHERE tenant_id = $1 AND campaign_id = $2")
            .bind(tenant)
            .bind(campaign_id)
            .bind(status)
            .execute(self.ctx.pool())
            .await?;
        Ok(())
    }

    /// Delete campaigns dated before the cutoff.
    pub async fn purge_before(&self, tenant: &TenantId, cutoff: NaiveDate) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM campaigns WHERE tenant_id = $1 AND campaign_date < $2")
                .bind(tenant)
                .bind(cutoff)
                .execute(self.ctx.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
