//! Tenant settings operations.

use crate::db::DbContext;
use crate::error::Result;
use crate::models::TenantSettings;
use crate::tenant::TenantId;

/// Tenant settings operations.
pub struct TenantOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> TenantOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Create or update the tenant's configuration row.
    pub async fn upsert(
        &self,
        tenant: &TenantId,
        display_name: &str,
        platform: &str,
        num_queues: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_settings (tenant_id, display_name, platform, num_queues)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                platform = EXCLUDED.platform,
                num_queues = COALESCE(EXCLUDED.num_queues, tenant_settings.num_queues)
            "#,
        )
        .bind(tenant)
        .bind(display_name)
        .bind(platform)
        .bind(num_queues)
        .execute(self.ctx.pool())
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, tenant: &TenantId) -> Result<Option<TenantSettings>> {
        let row = sqlx::query_as::<_, TenantSettings>(
            "SELECT * FROM tenant_settings WHERE tenant_id = $1",
        )
        .bind(tenant)
        .fetch_optional(self.ctx.pool())
        .await?;
        Ok(row)
    }

    /// Configured queue count for this tenant, when one is set.
    pub async fn configured_queue_count(&self, tenant: &TenantId) -> Result<Option<i32>> {
        let row: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT num_queues FROM tenant_settings WHERE tenant_id = $1")
                .bind(tenant)
                .fetch_optional(self.ctx.pool())
                .await?;
        Ok(row.and_then(|(n,)| n).filter(|n| *n > 0))
    }
}
