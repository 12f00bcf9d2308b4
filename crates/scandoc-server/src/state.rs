use std::sync::Arc;

use scandoc::{Database, Pipeline};

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }

    pub fn db(&self) -> &Database {
        self.pipeline.database()
    }
}
