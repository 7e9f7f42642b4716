//! Database row types and enums shared across the crate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tenant::TenantId;

/// Status of an asynchronous scrape job. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Lifecycle state of one assignment. The external record-store owns the
/// operator-edited copy of this value; pull sync reconciles it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assignment_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssignmentState {
    Pending,
    Followed,
    Unfollow,
    Completed,
}

impl AssignmentState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Followed => "followed",
            Self::Unfollow => "unfollow",
            Self::Completed => "completed",
        }
    }

    /// Parse an operator-entered value from the external store.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "followed" => Some(Self::Followed),
            "unfollow" | "unfollowed" => Some(Self::Unfollow),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// One scrape event in the append-only telemetry log.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawProfile {
    pub id: i64,
    pub profile_id: String,
    pub username: String,
    pub display_name: String,
    pub scraped_at: DateTime<Utc>,
    pub tenant_id: TenantId,
}

/// One row of the deduplicated profile pool.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GlobalProfile {
    pub profile_id: String,
    pub username: String,
    pub display_name: String,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub tenant_id: TenantId,
}

/// One daily distribution event.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Campaign {
    pub campaign_id: Uuid,
    pub campaign_date: NaiveDate,
    pub total_assigned: i32,
    /// True once every queue was fully mirrored to the external store.
    pub status: bool,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
}

/// One profile's slot in a campaign's working set.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Assignment {
    pub assignment_id: Uuid,
    pub campaign_id: Uuid,
    pub profile_id: String,
    pub username: String,
    pub display_name: String,
    /// 0 = placeholder, 1..N = a worker queue.
    pub queue_index: i32,
    /// 0 = placeholder, 1..M within a queue.
    pub position: i32,
    pub state: AssignmentState,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tenant_id: TenantId,
}

impl Assignment {
    pub fn is_placeholder(&self) -> bool {
        self.queue_index == 0
    }
}

/// One asynchronous scrape job.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScrapeJob {
    pub job_id: Uuid,
    pub tenant_id: TenantId,
    pub status: JobStatus,
    /// Source account usernames, as submitted.
    pub accounts: Value,
    pub target_gender: String,
    pub max_count_per_account: i32,
    pub total_batches: i32,
    pub current_batch: i32,
    pub progress: f64,
    pub profiles_scraped: i32,
    pub total_scraped: Option<i32>,
    pub total_filtered: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One filtered profile attached to a completed job.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScrapeResult {
    pub job_id: Uuid,
    pub profile_id: String,
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub tenant_id: TenantId,
}

/// Per-tenant configuration row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TenantSettings {
    pub tenant_id: TenantId,
    pub display_name: String,
    pub platform: String,
    pub num_queues: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A profile as submitted to ingestion (validated later; inputs missing id
/// or username are dropped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInput {
    pub id: String,
    pub username: String,
    #[serde(default, alias = "full_name")]
    pub display_name: String,
}
