//! Upstream extraction-service adapter.
//!
//! The extraction service runs platform-specific "actors" that each accept a
//! different input schema and emit a different output shape. [`Platform`]
//! owns both quirks; [`ProfileSource`] is the seam the job engine consumes,
//! so tests can substitute a canned source.

mod actor;
mod platform;

pub use actor::ActorClient;
pub use platform::Platform;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;

/// Profile shape normalized across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalProfile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
}

/// The scrape operation the engine depends on.
///
/// Returns profiles keyed by username; the map collapses duplicate
/// usernames across source accounts.
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    async fn scrape(
        &self,
        platform: Platform,
        accounts: &[String],
        max_per_account: u32,
    ) -> Result<HashMap<String, CanonicalProfile>>;
}
