//! In-memory record-store for tests and local development.
//!
//! Mirrors the real store's semantics closely enough for the sync and
//! lifecycle paths: per-base tables, opaque record ids, duplicate-table
//! detection. Extra helpers simulate operator edits.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::models::AssignmentState;
use crate::store::{QueueRecord, RecordStore, StoredRecord, TableOutcome};
use crate::tenant::TenantId;

type Tables = HashMap<String, Vec<StoredRecord>>;

#[derive(Default)]
pub struct MemoryRecordStore {
    bases: Mutex<HashMap<String, Tables>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_record_id(&self) -> String {
        format!("rec{:08}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Simulate an operator editing the state column of one profile's row.
    pub fn edit_state(
        &self,
        base: &TenantId,
        table: &str,
        profile_id: &str,
        state: AssignmentState,
    ) -> bool {
        let mut bases = self.bases.lock().unwrap();
        let Some(records) = bases.get_mut(base.as_str()).and_then(|t| t.get_mut(table)) else {
            return false;
        };
        for record in records.iter_mut() {
            if record.fields.profile_id == profile_id {
                record.fields.state = state;
                return true;
            }
        }
        false
    }

    /// Total records across all tables in a base.
    pub fn record_count(&self, base: &TenantId) -> usize {
        let bases = self.bases.lock().unwrap();
        bases
            .get(base.as_str())
            .map(|tables| tables.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_tables(&self, base: &TenantId) -> Result<Vec<String>> {
        let bases = self.bases.lock().unwrap();
        let mut tables: Vec<String> = bases
            .get(base.as_str())
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        tables.sort();
        Ok(tables)
    }

    async fn create_table(&self, base: &TenantId, table: &str) -> Result<TableOutcome> {
        let mut bases = self.bases.lock().unwrap();
        let tables = bases.entry(base.as_str().to_string()).or_default();
        if tables.contains_key(table) {
            return Ok(TableOutcome::AlreadyExists);
        }
        tables.insert(table.to_string(), Vec::new());
        Ok(TableOutcome::Created)
    }

    async fn list_records(&self, base: &TenantId, table: &str) -> Result<Vec<StoredRecord>> {
        let bases = self.bases.lock().unwrap();
        Ok(bases
            .get(base.as_str())
            .and_then(|t| t.get(table))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_records(
        &self,
        base: &TenantId,
        table: &str,
        records: &[QueueRecord],
    ) -> Result<usize> {
        let mut bases = self.bases.lock().unwrap();
        let tables = bases.entry(base.as_str().to_string()).or_default();
        let stored = tables.entry(table.to_string()).or_default();
        for fields in records {
            stored.push(StoredRecord {
                record_id: self.next_record_id(),
                fields: fields.clone(),
            });
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
        let mut bases = self.bases.lock().unwrap();
        let records = bases
            .get_mut(base.as_str())
            .and_then(|t| t.get_mut(table))
            .ok_or_else(|| Error::not_found("table", table))?;
        for record in records.iter_mut() {
            if record.record_id == record_id {
                record.fields.state = state;
                return Ok(());
            }
        }
        Err(Error::not_found("record", record_id))
    }

    async fn delete_records(
        &self,
        base: &TenantId,
        table: &str,
        record_ids: &[String],
    ) -> Result<usize> {
        let mut bases = self.bases.lock().unwrap();
        let Some(records) = bases.get_mut(base.as_str()).and_then(|t| t.get_mut(table)) else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|r| !record_ids.contains(&r.record_id));
        Ok(before - records.len())
    }
}
