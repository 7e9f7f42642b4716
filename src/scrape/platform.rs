//! Platform registry: actor selection, input construction, and output
//! normalization for each supported platform.

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::scrape::CanonicalProfile;

/// Supported social platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Threads,
    Tiktok,
    X,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Threads,
        Platform::Tiktok,
        Platform::X,
    ];

    /// Parse a platform key. Unknown platforms are a configuration error.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "instagram" => Ok(Self::Instagram),
            "threads" => Ok(Self::Threads),
            "tiktok" => Ok(Self::Tiktok),
            "x" | "twitter" => Ok(Self::X),
            other => Err(Error::validation(format!("unknown platform '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Threads => "threads",
            Self::Tiktok => "tiktok",
            Self::X => "x",
        }
    }

    /// Build the actor input payload for this platform.
    ///
    /// Each actor expects its own key names; TikTok additionally needs
    /// usernames cleaned of `@` prefixes and profile-URL wrappers.
    pub fn build_input(self, accounts: &[String], max_per_account: u32) -> Value {
        match self {
            Self::Instagram | Self::Threads => json!({
                "usernames": accounts,
                "max_count": max_per_account,
            }),
            Self::Tiktok => {
                let clean: Vec<String> = accounts
                    .iter()
                    .map(|a| clean_tiktok_username(a))
                    .collect();
                json!({
                    "usernames": clean,
                    "numFollowers": max_per_account,
                })
            }
            Self::X => json!({
                "user_names": accounts,
                "getFollowers": true,
                "getFollowing": true,
                "maxFollowers": max_per_account,
                "maxFollowings": max_per_account,
            }),
        }
    }

    /// Normalize one raw dataset item to the canonical shape.
    ///
    /// Returns `None` for rows without a usable username.
    pub fn normalize_row(self, row: &Value) -> Option<CanonicalProfile> {
        let profile = match self {
            Self::Instagram | Self::Threads => {
                let username = str_field(row, &["username"])?;
                CanonicalProfile {
                    id: str_field(row, &["id"]).unwrap_or_else(|| username.clone()),
                    display_name: str_field(row, &["full_name", "fullname"]).unwrap_or_default(),
                    follower_count: num_field(row, &["follower_count"]),
                    following_count: num_field(row, &["following_count"]),
                    posts_count: num_field(row, &["posts_count"]),
                    username,
                }
            }
            Self::Tiktok => {
                let username = str_field(row, &["uniqueId", "unique_id", "username"])?;
                CanonicalProfile {
                    id: str_field(row, &["id"])?,
                    display_name: str_field(row, &["nickname"]).unwrap_or_default(),
                    follower_count: num_field(row, &["followerCount", "follower_count", "followers"]),
                    following_count: num_field(
                        row,
                        &["followingCount", "following_count", "following"],
                    ),
                    posts_count: num_field(row, &["videoCount", "aweme_count", "videos"]),
                    username,
                }
            }
            Self::X => {
                let username = str_field(row, &["screen_name"])?;
                CanonicalProfile {
                    id: str_field(row, &["id_str", "id"])?,
                    display_name: str_field(row, &["name"]).unwrap_or_default(),
                    follower_count: 0,
                    following_count: 0,
                    posts_count: 0,
                    username,
                }
            }
        };

        if profile.username.is_empty() {
            return None;
        }
        Some(profile)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip `@` prefixes and profile-URL wrappers from a TikTok handle.
fn clean_tiktok_username(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(rest) = name.split("tiktok.com/").nth(1) {
        name = rest;
    }
    name.trim_start_matches('@')
        .trim_end_matches('/')
        .to_string()
}

/// First present, non-empty string among the aliases. Numeric ids are
/// stringified since some actors emit them as numbers.
fn str_field(row: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match row.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First present numeric value among the aliases, tolerating stringified
/// numbers. Missing or malformed counts default to zero.
fn num_field(row: &Value, keys: &[&str]) -> i64 {
    for key in keys {
        match row.get(key) {
            Some(Value::Number(n)) => return n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => {
                if let Ok(n) = s.parse::<i64>() {
                    return n;
                }
            }
            _ => {}
        }
    }
    0
}
