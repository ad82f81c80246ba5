//! Ensemble reconfiguration monitor
//!
//! Watches `/ensemble` with the same settle discipline as the membership
//! watcher and, on a stabilized change, submits the comma-joined member
//! list as the new quorum configuration. Submission is awaited; a failed
//! submission is retried a bounded number of times, after which the next
//! stabilized change tries again.

use crate::ports::coordination::CoordinationStore;
use crate::use_cases::apply_actions::{ActionExecutor, ReconfigOutcome};
use crate::use_cases::election_role::RoleReader;
use crate::watch::{Debouncer, PersistentWatch};
use blacknight_domain::{Ensemble, StorePaths};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct EnsembleMonitor {
    store: Arc<dyn CoordinationStore>,
    paths: StorePaths,
    window: Duration,
    max_attempts: u32,
    backoff: Duration,
    role: RoleReader,
    executor: Arc<ActionExecutor>,
}

impl EnsembleMonitor {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        paths: StorePaths,
        window: Duration,
        role: RoleReader,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            store,
            paths,
            window,
            max_attempts: 1,
            backoff: Duration::ZERO,
            role,
            executor,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Monitor until cancelled or the session ends; returns the last
    /// submitted ensemble.
    pub async fn run(self, cancel: CancellationToken) -> Option<Ensemble> {
        let rx = PersistentWatch::spawn(
            Arc::clone(&self.store),
            self.paths.ensemble(),
            cancel.child_token(),
        );
        let mut debouncer = Debouncer::new(rx, self.window);
        let mut last: Option<Ensemble> = None;

        loop {
            let settled = tokio::select! {
                _ = cancel.cancelled() => break,
                settled = debouncer.next_settled() => settled,
            };
            let Some(settled) = settled else {
                debug!("Ensemble watch ended");
                break;
            };

            if !self.role.is_leader() {
                warn!(
                    coalesced = settled.coalesced,
                    "Discarding ensemble change delivered after leadership loss"
                );
                continue;
            }

            info!(
                members = settled.latest.children.len(),
                "Detected change in ensemble"
            );
            if let Some(submitted) = self.reconfigure(last.as_ref()).await {
                last = Some(submitted);
            }
        }

        last
    }

    async fn reconfigure(&self, last: Option<&Ensemble>) -> Option<Ensemble> {
        for attempt in 1..=self.max_attempts {
            match self.executor.apply_reconfiguration(last).await {
                Ok(ReconfigOutcome::Submitted(ensemble)) => {
                    info!(ensemble = %ensemble, "Submitted quorum reconfiguration");
                    return Some(ensemble);
                }
                Ok(ReconfigOutcome::Unchanged(_)) => return None,
                Err(e) if e.is_session_fault() => {
                    warn!(error = %e, "Reconfiguration interrupted by session loss");
                    return None;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "Reconfiguration failed, retrying");
                    tokio::time::sleep(self.backoff).await;
                    if !self.role.is_leader() {
                        warn!("Leadership lost between reconfiguration attempts");
                        return None;
                    }
                }
                Err(e) => {
                    warn!(
                        attempts = self.max_attempts,
                        error = %e,
                        "Reconfiguration failed, waiting for next ensemble change"
                    );
                }
            }
        }
        None
    }
}
