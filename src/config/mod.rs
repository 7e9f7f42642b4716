//! Configuration loading from environment variables.
//!
//! Uses figment for env extraction with serde defaults. Duration fields
//! accept both bare numbers (seconds) and duration strings with units
//! ("200ms", "2h", "30s").

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration.
#[derive(Deserialize)]
pub struct Config {
    /// Log level for this application's target ("trace" through "error").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Port for the web server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database connection URL.
    pub database_url: String,
    /// Connection pool size. Small by default for constrained tiers.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// Graceful shutdown timeout.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// API token for the upstream extraction service.
    pub upstream_api_token: String,
    /// Base URL for the upstream extraction service.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,
    /// Upstream actor ids, one per platform.
    pub instagram_actor_id: Option<String>,
    pub threads_actor_id: Option<String>,
    pub tiktok_actor_id: Option<String>,
    pub x_actor_id: Option<String>,

    /// Access token for the external record-store.
    pub record_store_token: String,
    /// Base URL for the external record-store API.
    #[serde(default = "default_record_store_base_url")]
    pub record_store_base_url: String,

    /// Fallback worker-queue count when a tenant has no configured value
    /// and the record-store schema cannot be inspected.
    #[serde(default = "default_num_queues")]
    pub num_queues_default: u32,
    /// Default slots per worker queue, overridable per request.
    #[serde(default = "default_profiles_per_queue")]
    pub profiles_per_queue: u32,

    /// Pause between successful bulk-ingestion batches.
    #[serde(
        default = "default_ingest_batch_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub ingest_batch_delay: Duration,

    /// Background worker pool sizing and task limits.
    #[serde(default = "default_workers")]
    pub workers: WorkerConfig,

    /// Comma-separated list of allowed CORS origins; empty allows any.
    #[serde(default)]
    pub allowed_origins: String,
}

/// Worker pool configuration for the job engine.
#[derive(Deserialize, Clone, Debug)]
pub struct WorkerConfig {
    /// Number of concurrent background workers.
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,
    /// Tasks a worker processes before recycling itself (bounds memory).
    #[serde(default = "default_worker_recycle_after")]
    pub recycle_after: usize,
    /// Soft task deadline: the task is asked to wind down.
    #[serde(
        default = "default_task_soft_limit",
        deserialize_with = "deserialize_duration"
    )]
    pub task_soft_limit: Duration,
    /// Hard task deadline: the task is aborted and reported failed.
    #[serde(
        default = "default_task_hard_limit",
        deserialize_with = "deserialize_duration"
    )]
    pub task_hard_limit: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_upstream_base_url() -> String {
    "https://api.apify.com".to_string()
}

fn default_record_store_base_url() -> String {
    "https://api.airtable.com".to_string()
}

fn default_num_queues() -> u32 {
    80
}

fn default_profiles_per_queue() -> u32 {
    180
}

/// 100 ms between bulk batches keeps constrained store tiers happy.
fn default_ingest_batch_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_workers() -> WorkerConfig {
    WorkerConfig {
        concurrency: default_worker_concurrency(),
        recycle_after: default_worker_recycle_after(),
        task_soft_limit: default_task_soft_limit(),
        task_hard_limit: default_task_hard_limit(),
    }
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_worker_recycle_after() -> usize {
    50
}

/// 1 h 55 m soft limit.
fn default_task_soft_limit() -> Duration {
    Duration::from_secs(6900)
}

/// 2 h hard limit.
fn default_task_hard_limit() -> Duration {
    Duration::from_secs(7200)
}

/// Duration parser with seconds as the default unit.
///
/// Supports ms/s/m/h, whitespace between number and unit, and multiple
/// summed units ("1m 30s"). No fractions, exponents, or infinity.
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Accepts either a number (seconds) or a duration string ("200ms", "2h").
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER
                .parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Invalid duration format '{}': {}. Examples: '5' (5 seconds), '200ms', '30s', '2m', '2h'",
                        value, e
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("Duration conversion error: {}", e)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("Duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

impl Config {
    /// Actor id configured for a platform key, if any.
    pub fn actor_id(&self, platform: &str) -> Option<&str> {
        match platform {
            "instagram" => self.instagram_actor_id.as_deref(),
            "threads" => self.threads_actor_id.as_deref(),
            "tiktok" => self.tiktok_actor_id.as_deref(),
            "x" => self.x_actor_id.as_deref(),
            _ => None,
        }
    }
}
