//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Endpoint the feed is read from
pub const DEFAULT_FEED_URL: &str = "https://api.github.com/repos/apple/swift/commits";
/// Records requested per fetch
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Settings shared by the feed client and the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub feed_url: String,
    pub per_page: u32,
    /// Sent with every request; the GitHub API rejects requests without one
    pub user_agent: String,
    /// Store file; `None` means the per-user default location
    pub db_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            user_agent: concat!("commitsync/", env!("CARGO_PKG_VERSION")).to_string(),
            db_path: None,
        }
    }
}

impl SyncConfig {
    /// The configured store path, or the default (~/.local/share/commitsync/commitsync.db)
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

/// Default store location under the platform data directory
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("commitsync").join("commitsync.db")
}
