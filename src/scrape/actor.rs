//! HTTP client for the upstream extraction service.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::scrape::{CanonicalProfile, Platform, ProfileSource};

/// Retry attempts per scrape call.
const MAX_RETRIES: u32 = 3;

/// Extraction-service client.
///
/// Each platform maps to a distinct actor id; the actor runs synchronously
/// and the dataset items come back in the response body.
pub struct ActorClient {
    client: Client,
    base_url: String,
    token: String,
    actor_ids: HashMap<Platform, String>,
}

impl ActorClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("outreach/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .context("Failed to create HTTP client")?;

        let mut actor_ids = HashMap::new();
        for platform in Platform::ALL {
            if let Some(actor_id) = config.actor_id(platform.as_str()) {
                actor_ids.insert(platform, actor_id.to_string());
            }
        }

        Ok(Self {
            client,
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            token: config.upstream_api_token.clone(),
            actor_ids,
        })
    }

    fn actor_id(&self, platform: Platform) -> Result<&str> {
        self.actor_ids
            .get(&platform)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                Error::validation(format!(
                    "no actor id configured for platform '{platform}'"
                ))
            })
    }

    /// Run the platform actor once and collect its dataset items.
    async fn run_actor(&self, actor_id: &str, input: &Value) -> anyhow::Result<Vec<Value>> {
        let url = format!(
            "{}/v2/acts/{}/run-sync-get-dataset-items",
            self.base_url, actor_id
        );

        let response = self
            .client
            .post(&url)
            .query(&[("token", self.token.as_str()), ("clean", "1")])
            .json(input)
            .send()
            .await
            .context("extraction request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("extraction returned {status}: {body}"));
        }

        let items: Vec<Value> = response
            .json()
            .await
            .context("failed to parse extraction dataset")?;
        Ok(items)
    }
}

/// Whether an error message looks like a rate-limit response.
fn is_rate_limited(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("429")
}

/// Whether an error message looks like a transient network failure.
fn is_network_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("connection") || lower.contains("timeout") || lower.contains("timed out")
}

#[async_trait::async_trait]
impl ProfileSource for ActorClient {
    /// Scrape followers for the given accounts with retry and exponential
    /// backoff. Every error class is retried up to the budget; after the
    /// last attempt the error is promoted to `Transient`.
    async fn scrape(
        &self,
        platform: Platform,
        accounts: &[String],
        max_per_account: u32,
    ) -> Result<HashMap<String, CanonicalProfile>> {
        let actor_id = self.actor_id(platform)?.to_string();
        let input = platform.build_input(accounts, max_per_account);

        info!(
            %platform,
            actor_id,
            accounts = accounts.len(),
            max_per_account,
            "calling extraction actor"
        );

        let mut last_error: Option<anyhow::Error> = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let backoff = Duration::from_secs(1 << attempt);
                info!(
                    %platform,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    backoff = format!("{backoff:?}"),
                    "retrying extraction"
                );
                tokio::time::sleep(backoff).await;
            }

            match self.run_actor(&actor_id, &input).await {
                Ok(items) => {
                    let mut profiles = HashMap::with_capacity(items.len());
                    for item in &items {
                        if let Some(profile) = platform.normalize_row(item) {
                            profiles.insert(profile.username.clone(), profile);
                        }
                    }
                    info!(
                        %platform,
                        raw = items.len(),
                        normalized = profiles.len(),
                        "extraction complete"
                    );
                    return Ok(profiles);
                }
                Err(e) => {
                    let message = e.to_string();
                    if is_rate_limited(&message) {
                        warn!(%platform, attempt = attempt + 1, error = %e, "extraction rate limited");
                    } else if is_network_error(&message) {
                        warn!(%platform, attempt = attempt + 1, error = %e, "extraction network error");
                    } else {
                        warn!(%platform, attempt = attempt + 1, error = %e, "extraction error");
                    }
                    last_error = Some(e);
                }
            }
        }

        let cause = last_error.unwrap_or_else(|| anyhow!("no attempts made"));
        Err(Error::Transient(cause.context(format!(
            "failed to scrape {platform} after {MAX_RETRIES} attempts"
        ))))
    }
}
