//! Reconcile use case
//!
//! Query → diff → apply. The preliminary diff is only a plan; the
//! executor recomputes it under the cluster lock before acting.

use crate::use_cases::apply_actions::{ActionExecutor, ApplyError, ApplyReport};
use crate::use_cases::query_state::StateQuery;
use blacknight_domain::diff;
use std::sync::Arc;
use tracing::{debug, info};

/// One reconciliation pass against the loaded specification
pub struct ReconcileUseCase {
    query: StateQuery,
    executor: Arc<ActionExecutor>,
}

impl ReconcileUseCase {
    pub fn new(query: StateQuery, executor: Arc<ActionExecutor>) -> Self {
        Self { query, executor }
    }

    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    pub async fn execute(&self) -> Result<ApplyReport, ApplyError> {
        let observed = self.query.query().await?;
        let planned = diff(self.executor.spec(), &observed);
        debug!(planned = planned.len(), "Computed remediation plan");

        let report = self.executor.apply(&planned).await?;
        if report.is_noop() {
            info!("Deployment matches specification");
        } else {
            info!(
                applied = report.applied.len(),
                failed = report.failed.len(),
                "Reconciliation pass complete"
            );
        }
        Ok(report)
    }
}
