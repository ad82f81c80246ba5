//! Control loop timing from TOML (`[reconcile]` section)

use blacknight_application::ReconcileParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw reconcile configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReconcileConfig {
    /// Membership settle window in milliseconds
    pub debounce_ms: u64,
    /// Ensemble settle window in milliseconds
    pub ensemble_debounce_ms: u64,
    /// Attempts per stabilized ensemble change
    pub reconfig_max_attempts: u32,
    pub reconfig_backoff_ms: u64,
    /// Delay between session restoration attempts
    pub session_retry_ms: u64,
}

impl Default for FileReconcileConfig {
    fn default() -> Self {
        Self::from(&ReconcileParams::default())
    }
}

impl From<&ReconcileParams> for FileReconcileConfig {
    fn from(params: &ReconcileParams) -> Self {
        Self {
            debounce_ms: params.membership_debounce.as_millis() as u64,
            ensemble_debounce_ms: params.ensemble_debounce.as_millis() as u64,
            reconfig_max_attempts: params.reconfig_max_attempts,
            reconfig_backoff_ms: params.reconfig_backoff.as_millis() as u64,
            session_retry_ms: params.session_retry.as_millis() as u64,
        }
    }
}

impl FileReconcileConfig {
    pub fn to_params(&self) -> ReconcileParams {
        ReconcileParams::default()
            .with_membership_debounce(Duration::from_millis(self.debounce_ms))
            .with_ensemble_debounce(Duration::from_millis(self.ensemble_debounce_ms))
            .with_reconfig_retry(
                self.reconfig_max_attempts,
                Duration::from_millis(self.reconfig_backoff_ms),
            )
            .with_session_retry(Duration::from_millis(self.session_retry_ms))
    }
}
