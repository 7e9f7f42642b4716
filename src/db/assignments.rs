//! Assignment operations.
//!
//! Placeholder rows (`queue_index = 0, position = 0`) are written by the
//! campaign selector; the distributor packs them into queue slots with a
//! single bulk update. Lifecycle sweeps and pull sync update `state`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::DbContext;
use crate::error::Result;
use crate::models::{Assignment, AssignmentState, GlobalProfile};
use crate::tenant::TenantId;

/// One slot assignment produced by the distributor.
#[derive(Debug, Clone, Copy)]
pub struct SlotUpdate {
    pub assignment_id: Uuid,
    pub queue_index: i32,
    pub position: i32,
}

/// Assignment operations.
pub struct AssignmentOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> AssignmentOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// Insert one placeholder assignment per selected profile.
    pub async fn insert_placeholders(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
        profiles: &[GlobalProfile],
    ) -> Result<usize> {
        if profiles.is_empty() {
            return Ok(0);
        }

        let assignment_ids: Vec<Uuid> = profiles.iter().map(|_| Uuid::new_v4()).collect();
        let profile_ids: Vec<&str> = profiles.iter().map(|p| p.profile_id.as_str()).collect();
        let usernames: Vec<&str> = profiles.iter().map(|p| p.username.as_str()).collect();
        let names: Vec<&str> = profiles.iter().map(|p| p.display_name.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO assignments (
                assignment_id, campaign_id, profile_id, username, display_name,
                queue_index, position, state, tenant_id
            )
            SELECT v.assignment_id, $5, v.profile_id, v.username, v.display_name,
                   0, 0, 'pending', $6
            FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[])
                AS v(assignment_id, profile_id, username, display_name)
            "#,
        )
        .bind(&assignment_ids)
        .bind(&profile_ids)
        .bind(&usernames)
        .bind(&names)
        .bind(campaign_id)
        .bind(tenant)
        .execute(self.ctx.pool())
        .await?;

        Ok(profiles.len())
    }

    /// Fetch the campaign's undistributed placeholder rows.
    pub async fn fetch_placeholders(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
    ) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments
             WHERE tenant_id = $1 AND campaign_id = $2 AND queue_index = 0",
        )
        .bind(tenant)
        .bind(campaign_id)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Count rows already packed into queue slots for this campaign.
    pub async fn count_packed(&self, tenant: &TenantId, campaign_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM assignments
             WHERE tenant_id = $1 AND campaign_id = $2 AND queue_index > 0",
        )
        .bind(tenant)
        .bind(campaign_id)
        .fetch_one(self.ctx.pool())
        .await?;
        Ok(count)
    }

    /// Apply the distributor's slot assignments in one bulk update.
    pub async fn assign_slots(&self, tenant: &TenantId, updates: &[SlotUpdate]) -> Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = updates.iter().map(|u| u.assignment_id).collect();
        let queues: Vec<i32> = updates.iter().map(|u| u.queue_index).collect();
        let positions: Vec<i32> = updates.iter().map(|u| u.position).collect();

        let result = sqlx::query(
            r#"
            UPDATE assignments AS a SET
                queue_index = v.queue_index,
                position = v.position,
                updated_at = NOW()
            FROM UNNEST($2::uuid[], $3::int4[], $4::int4[]) AS v(assignment_id, queue_index, position)
            WHERE a.tenant_id = $1 AND a.assignment_id = v.assignment_id AND a.queue_index = 0
            "#,
        )
        .bind(tenant)
        .bind(&ids)
        .bind(&queues)
        .bind(&positions)
        .execute(self.ctx.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Fetch the campaign's packed rows ordered by `(queue_index, position)`.
    pub async fn fetch_packed(
        &self,
        tenant: &TenantId,
        campaign_id: Uuid,
    ) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments
             WHERE tenant_id = $1 AND campaign_id = $2 AND queue_index > 0
             ORDER BY queue_index ASC, position ASC",
        )
        .bind(tenant)
        .bind(campaign_id)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Fetch every packed assignment in one queue, newest campaign first.
    pub async fn fetch_queue(&self, tenant: &TenantId, queue_index: i32) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments
             WHERE tenant_id = $1 AND queue_index = $2
             ORDER BY assigned_at DESC",
        )
        .bind(tenant)
        .bind(queue_index)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Set the state of a single assignment and bump `updated_at`.
    pub async fn set_state(
        &self,
        tenant: &TenantId,
        assignment_id: Uuid,
        state: AssignmentState,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE assignments SET state = $3, updated_at = NOW()
             WHERE tenant_id = $1 AND assignment_id = $2",
        )
        .bind(tenant)
        .bind(assignment_id)
        .bind(state)
        .execute(self.ctx.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Set the state of many assignments at once.
    pub async fn set_states(
        &self,
        tenant: &TenantId,
        assignment_ids: &[Uuid],
        state: AssignmentState,
    ) -> Result<u64> {
        if assignment_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE assignments SET state = $3, updated_at = NOW()
             WHERE tenant_id = $1 AND assignment_id = ANY($2)",
        )
        .bind(tenant)
        .bind(assignment_ids)
        .bind(state)
        .execute(self.ctx.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Assignments due for the aging transition to `unfollow`: still
    /// pending or followed, and assigned at or before the cutoff.
    pub async fn due_for_unfollow(
        &self,
        tenant: &TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments
             WHERE tenant_id = $1
               AND state IN ('pending', 'followed')
               AND queue_index > 0
               AND assigned_at <= $2
             ORDER BY queue_index ASC, position ASC",
        )
        .bind(tenant)
        .bind(cutoff)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Completed assignments whose last update is at or before the cutoff.
    pub async fn completed_before(
        &self,
        tenant: &TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments
             WHERE tenant_id = $1 AND state = 'completed' AND updated_at <= $2
             ORDER BY queue_index ASC, position ASC",
        )
        .bind(tenant)
        .bind(cutoff)
        .fetch_all(self.ctx.pool())
        .await?;
        Ok(rows)
    }

    /// Delete assignments by id.
    pub async fn delete_by_ids(&self, tenant: &TenantId, assignment_ids: &[Uuid]) -> Result<u64> {
        if assignment_ids.is_empty() {
            return Ok(0);
        }
        let result =
            sqlx::query("DELETE FROM assignments WHERE tenant_id = $1 AND assignment_id = ANY($2)")
                .bind(tenant)
                .bind(assignment_ids)
                .execute(self.ctx.pool())
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete assignments assigned before the cutoff.
    pub async fn purge_before(&self, tenant: &TenantId, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM assignments WHERE tenant_id = $1 AND assigned_at < $2")
                .bind(tenant)
                .bind(cutoff)
                .execute(self.ctx.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
