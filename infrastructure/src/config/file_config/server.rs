//! Transport, logging and criteria settings

use medreason_domain::DEFAULT_CRITERIA_KEY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[server]` section
///
/// ```toml
/// [server]
/// addr = "127.0.0.1:8000"
/// progress_poll_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub addr: String,
    pub progress_poll_ms: u64,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            progress_poll_ms: 500,
        }
    }
}

impl FileServerConfig {
    pub fn progress_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_poll_ms)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL conversation log; disabled when unset.
    pub conversation_log: Option<String>,
}

/// `[criteria]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCriteriaConfig {
    pub active: String,
}

impl Default for FileCriteriaConfig {
    fn default() -> Self {
        Self {
            active: DEFAULT_CRITERIA_KEY.to_string(),
        }
    }
}
