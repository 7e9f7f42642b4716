//! HTTP implementation of the record-store interface.
//!
//! REST shape: `/v0/{base}/{table}` for records with offset pagination,
//! `/v0/meta/bases/{base}/tables` for schema. Authentication is a bearer
//! token. The store rate-limits aggressively (~5 req/s per base); pacing is
//! the caller's job, this client only classifies the errors.

use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::AssignmentState;
use crate::store::{QueueRecord, RecordStore, StoredRecord, TableOutcome};
use crate::tenant::TenantId;

pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRecordStore {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("outreach/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.record_store_base_url.trim_end_matches('/').to_string(),
            token: config.record_store_token.clone(),
        })
    }

    /// Map a non-success response to the error taxonomy.
    async fn response_error(&self, response: reqwest::Response, what: &str) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let cause = anyhow!("{what} returned {status}: {body}");
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                Error::Transient(cause)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Validation(format!("record-store auth failure: {status}"))
            }
            _ => Error::Other(cause),
        }
    }

    fn fields_to_json(record: &QueueRecord) -> Value {
        json!({
            "profile_id": record.profile_id,
            "username": record.username,
            "display_name": record.display_name,
            "platform": record.platform,
            "position": record.position,
            "campaign_date": record.campaign_date.format("%Y-%m-%d").to_string(),
            "state": record.state.as_str(),
        })
    }

    fn record_from_json(row: &Value) -> Option<StoredRecord> {
        let record_id = row.get("id")?.as_str()?.to_string();
        let fields = row.get("fields")?;
        let state = fields
            .get("state")
            .and_then(Value::as_str)
            .and_then(AssignmentState::parse)
            .unwrap_or(AssignmentState::Pending);
        let campaign_date = fields
            .get("campaign_date")
            .and_then(Value::as_str)
            .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;

        Some(StoredRecord {
            record_id,
            fields: QueueRecord {
                profile_id: fields.get("profile_id")?.as_str()?.to_string(),
                username: fields
                    .get("username")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                display_name: fields
                    .get("display_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                platform: fields
                    .get("platform")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                position: fields.get("position").and_then(Value::as_i64).unwrap_or(0) as i32,
                campaign_date,
                state,
            },
        })
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_tables(&self, base: &TenantId) -> Result<Vec<String>> {
        let url = format!("{}/v0/meta/bases/{}/tables", self.base_url, base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("schema request failed")?;

        if !response.status().is_success() {
            return Err(self.response_error(response, "schema list").await);
        }

        let body: Value = response.json().await.context("invalid schema response")?;
        let tables = body["tables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .filter_map(|t| t["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(tables)
    }

    async fn create_table(&self, base: &TenantId, table: &str) -> Result<TableOutcome> {
        let url = format!("{}/v0/meta/bases/{}/tables", self.base_url, base);
        let schema = json!({
            "name": table,
            "fields": [
                {"name": "profile_id", "type": "singleLineText"},
                {"name": "username", "type": "singleLineText"},
                {"name": "display_name", "type": "singleLineText"},
                {"name": "platform", "type": "singleSelect", "options": {"choices": [
                    {"name": "instagram"}, {"name": "threads"}, {"name": "tiktok"}, {"name": "x"}
                ]}},
                {"name": "position", "type": "number", "options": {"precision": 0}},
                {"name": "campaign_date", "type": "date", "options": {"dateFormat": {"name": "iso"}}},
                {"name": "state", "type": "singleSelect", "options": {"choices": [
                    {"name": "pending"}, {"name": "followed"}, {"name": "unfollow"}, {"name": "completed"}
                ]}}
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&schema)
            .send()
            .await
            .context("table creation request failed")?;

        if response.status().is_success() {
            debug!(base_id = %base, table, "queue table created");
            return Ok(TableOutcome::Created);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if body.contains("DUPLICATE_TABLE_NAME") || body.to_ascii_lowercase().contains("already exists")
        {
            return Ok(TableOutcome::AlreadyExists);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Validation(format!(
                "record-store auth failure: {status}"
            )));
        }
        Err(Error::Other(anyhow!(
            "table creation returned {status}: {body}"
        )))
    }

    async fn list_records(&self, base: &TenantId, table: &str) -> Result<Vec<StoredRecord>> {
        let url = format!("{}/v0/{}/{}", self.base_url, base, table);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).bearer_auth(&self.token);
            if let Some(ref cursor) = offset {
                request = request.query(&[("offset", cursor.as_str())]);
            }
            let response = request.send().await.context("record list request failed")?;

            if !response.status().is_success() {
                return Err(self.response_error(response, "record list").await);
            }

            let body: Value = response.json().await.context("invalid record list")?;
            if let Some(rows) = body["records"].as_array() {
                records.extend(rows.iter().filter_map(Self::record_from_json));
            }

            match body["offset"].as_str() {
                Some(next) => offset = Some(next.to_string()),
                None => break,
            }
        }

        Ok(records)
    }

    async fn create_records(
        &self,
        base: &TenantId,
        table: &str,
        records: &[QueueRecord],
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/v0/{}/{}", self.base_url, base, table);
        let payload = json!({
            "records": records
                .iter()
                .map(|r| json!({"fields": Self::fields_to_json(r)}))
                .collect::<Vec<_>>(),
            "typecast": true,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .context("record create request failed")?;

        if !response.status().is_success() {
            return Err(self.response_error(response, "record create").await);
        }

        Ok(records.len())
    }

    async fn update_record_state(
        &self,
        base: &TenantId,
        table: &str,
        record_id: &str,
        state: AssignmentState,
    ) -> Result<()> {
        let url = format!("{}/v0/{}/{}/{}", self.base_url, base, table, record_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&json!({"fields": {"state": state.as_str()}}))
            .send()
            .await
            .context("record update request failed")?;

        if !response.status().is_success() {
            return Err(self.response_error(response, "record update").await);
        }
        Ok(())
    }

    async fn delete_records(
        &self,
        base: &TenantId,
        table: &str,
        record_ids: &[String],
    ) -> Result<usize> {
        if record_ids.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/v0/{}/{}", self.base_url, base, table);
        let query: Vec<(&str, &str)> = record_ids
            .iter()
            .map(|id| ("records[]", id.as_str()))
            .collect();

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .context("record delete request failed")?;

        if !response.status().is_success() {
            return Err(self.response_error(response, "record delete").await);
        }

        Ok(record_ids.len())
    }
}
