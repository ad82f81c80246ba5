//! Reconciliation parameters: control loop timing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and retry parameters of the leader's control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileParams {
    /// Settle window for `/services` churn before reconciling.
    pub membership_debounce: Duration,
    /// Settle window for `/ensemble` churn before reconfiguring.
    pub ensemble_debounce: Duration,
    /// Attempts per stabilized ensemble change (first try included).
    pub reconfig_max_attempts: u32,
    /// Delay between reconfiguration attempts.
    pub reconfig_backoff: Duration,
    /// Delay between session restoration attempts.
    pub session_retry: Duration,
}

impl Default for ReconcileParams {
    fn default() -> Self {
        Self {
            membership_debounce: Duration::from_secs(2),
            ensemble_debounce: Duration::from_secs(2),
            reconfig_max_attempts: 3,
            reconfig_backoff: Duration::from_millis(500),
            session_retry: Duration::from_secs(1),
        }
    }
}

impl ReconcileParams {
    // ==================== Builder Methods ====================

    pub fn with_membership_debounce(mut self, window: Duration) -> Self {
        self.membership_debounce = window;
        self
    }

    pub fn with_ensemble_debounce(mut self, window: Duration) -> Self {
        self.ensemble_debounce = window;
        self
    }

    pub fn with_reconfig_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.reconfig_max_attempts = attempts.max(1);
        self.reconfig_backoff = backoff;
        self
    }

    pub fn with_session_retry(mut self, delay: Duration) -> Self {
        self.session_retry = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settle_window() {
        let params = ReconcileParams::default();
        assert_eq!(params.membership_debounce, Duration::from_secs(2));
        assert_eq!(params.ensemble_debounce, Duration::from_secs(2));
        assert_eq!(params.reconfig_max_attempts, 3);
    }

    #[test]
    fn test_reconfig_attempts_never_zero() {
        let params = ReconcileParams::default().with_reconfig_retry(0, Duration::ZERO);
        assert_eq!(params.reconfig_max_attempts, 1);
    }
}
