//! Journal and log file locations from TOML (`[journal]`, `[logging]`)

use serde::{Deserialize, Serialize};

/// Raw action journal configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileJournalConfig {
    /// JSONL file receiving one record per remediation action
    pub path: Option<String>,
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily-rotated log files (stderr only when unset)
    pub directory: Option<String>,
    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "blacknight.log".to_string(),
        }
    }
}
