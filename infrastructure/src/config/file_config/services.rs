//! Service control from TOML (`[services]` section)

use crate::services::{CommandServiceController, CommandTemplates};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw service control configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServicesConfig {
    /// Start command template (`{role}`, `{member}`)
    pub start_command: Option<String>,
    /// Stop command template (`{role}`, `{member}`)
    pub stop_command: Option<String>,
    /// Log commands instead of running them
    pub dry_run: bool,
    /// Per-command timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FileServicesConfig {
    fn default() -> Self {
        Self {
            start_command: None,
            stop_command: None,
            dry_run: true,
            timeout_secs: 60,
        }
    }
}

impl FileServicesConfig {
    pub fn to_controller(&self) -> CommandServiceController {
        CommandServiceController::new(CommandTemplates {
            start: self.start_command.clone(),
            stop: self.stop_command.clone(),
        })
        .with_dry_run(self.dry_run)
        .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}
