use chrono::{DateTime, Utc};

use feedstore_storage::SnapshotCache;

pub struct AppState {
    pub cache: SnapshotCache,
    /// Redacted config, served by `/health`.
    pub config_summary: serde_json::Value,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(cache: SnapshotCache, config_summary: serde_json::Value) -> Self {
        Self {
            cache,
            config_summary,
            started_at: Utc::now(),
        }
    }
}
