use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every operation of a [`crate::DatabaseManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Open with `SQLITE_OPEN_READ_ONLY`
    pub read_only: bool,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
    /// Run `PRAGMA foreign_keys = ON` after opening
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
    /// Row-addressing column used when a table has no single primary key
    pub key_column: String,
    pub default_page_size: usize,
    /// Row cap for free-form queries; 0 fetches everything
    pub default_max_rows: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            create_if_missing: false,
            foreign_keys: true,
            busy_timeout_ms: 5_000,
            key_column: "id".to_string(),
            default_page_size: 50,
            default_max_rows: 5_000,
        }
    }
}

impl ManagerConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
