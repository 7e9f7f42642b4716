//! Application state shared across web handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::db::DbContext;
use crate::engine::JobEngine;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DbContext,
    pub engine: Arc<JobEngine>,
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: DbContext,
        engine: Arc<JobEngine>,
        store: Arc<dyn RecordStore>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            engine,
            store,
            config,
        }
    }
}
