use chrono::{DateTime, Utc};
use outreach::models::ProfileInput;
use outreach::tenant::TenantId;
use sqlx::PgPool;
use uuid::Uuid;

/// Primary test tenant.
pub fn tenant() -> TenantId {
    TenantId::parse("appTESTTENANT1").unwrap()
}

/// A second tenant for isolation checks.
pub fn other_tenant() -> TenantId {
    TenantId::parse("appOTHERTENANT").unwrap()
}

/// Build a profile input with the given identity.
pub fn profile(id: &str, username: &str, display_name: &str) -> ProfileInput {
    ProfileInput {
        id: id.to_string(),
        username: username.to_string(),
        display_name: display_name.to_string(),
    }
}

/// Insert `count` unused pool profiles directly, ids `p1..pN`.
pub async fn seed_pool(pool: &PgPool, tenant: &TenantId, count: usize) {
    for i in 1..=count {
        sqlx::query(
            "INSERT INTO global_profiles (profile_id, username, display_name, used, tenant_id)
             VALUES ($1, $2, $3, FALSE, $4)",
        )
        .bind(format!("p{i}"))
        .bind(format!("user{i}"))
        .bind(format!("User {i}"))
        .bind(tenant)
        .execute(pool)
        .await
        .unwrap();
    }
}

/// Count pool rows for a tenant, optionally restricted to unused.
pub async fn pool_count(pool: &PgPool, tenant: &TenantId, unused_only: bool) -> i64 {
    let sql = if unused_only {
        "SELECT COUNT(*) FROM global_profiles WHERE tenant_id = $1 AND NOT used"
    } else {
        "SELECT COUNT(*) FROM global_profiles WHERE tenant_id = $1"
    };
    let (count,): (i64,) = sqlx::query_as(sql).bind(tenant).fetch_one(pool).await.unwrap();
    count
}

/// Count raw scrape-log rows for a tenant.
pub async fn raw_count(pool: &PgPool, tenant: &TenantId) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_profiles WHERE tenant_id = $1")
        .bind(tenant)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

/// Shift every assignment's `assigned_at` for a tenant by a negative
/// interval, e.g. "-8 days".
pub async fn backdate_assignments(pool: &PgPool, tenant: &TenantId, interval: &str) {
    sqlx::query(&format!(
        "UPDATE assignments SET assigned_at = assigned_at + INTERVAL '{interval}' WHERE tenant_id = $1"
    ))
    .bind(tenant)
    .execute(pool)
    .await
    .unwrap();
}

/// Shift every assignment's `updated_at` for a tenant.
pub async fn backdate_assignment_updates(pool: &PgPool, tenant: &TenantId, interval: &str) {
    sqlx::query(&format!(
        "UPDATE assignments SET updated_at = updated_at + INTERVAL '{interval}' WHERE tenant_id = $1"
    ))
    .bind(tenant)
    .execute(pool)
    .await
    .unwrap();
}

/// All assignment states for one campaign, keyed by profile id.
pub async fn assignment_states(
    pool: &PgPool,
    tenant: &TenantId,
    campaign_id: Uuid,
) -> Vec<(String, String, i32, i32)> {
    sqlx::query_as(
        "SELECT profile_id, state::TEXT, queue_index, position
         FROM assignments
         WHERE tenant_id = $1 AND campaign_id = $2
         ORDER BY queue_index, position, profile_id",
    )
    .bind(tenant)
    .bind(campaign_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

/// `used_at` of one pool profile.
pub async fn used_at(pool: &PgPool, tenant: &TenantId, profile_id: &str) -> Option<DateTime<Utc>> {
    let (used_at,): (Option<DateTime<Utc>>,) = sqlx::query_as(
        "SELECT used_at FROM global_profiles WHERE tenant_id = $1 AND profile_id = $2",
    )
    .bind(tenant)
    .bind(profile_id)
    .fetch_one(pool)
    .await
    .unwrap();
    used_at
}
