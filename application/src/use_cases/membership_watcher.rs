//! Membership watcher use case
//!
//! Watches the `/services` subtree and turns each settled burst of churn
//! into one reconciliation pass.

use crate::ports::coordination::CoordinationStore;
use crate::use_cases::election_role::RoleReader;
use crate::use_cases::reconcile::ReconcileUseCase;
use crate::watch::{Debouncer, SubtreeWatch};
use blacknight_domain::StorePaths;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct MembershipWatcher {
    store: Arc<dyn CoordinationStore>,
    paths: StorePaths,
    window: Duration,
    role: RoleReader,
    reconcile: Arc<ReconcileUseCase>,
}

impl MembershipWatcher {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        paths: StorePaths,
        window: Duration,
        role: RoleReader,
        reconcile: Arc<ReconcileUseCase>,
    ) -> Self {
        Self {
            store,
            paths,
            window,
            role,
            reconcile,
        }
    }

    /// Watch until cancelled or the session ends; returns the number of
    /// reconciliation passes run.
    ///
    /// Cancellation is only observed between passes: a pass that has begun
    /// runs to completion.
    pub async fn run(self, cancel: CancellationToken) -> usize {
        let rx = SubtreeWatch::spawn(
            Arc::clone(&self.store),
            self.paths.services(),
            cancel.child_token(),
        );
        let mut debouncer = Debouncer::new(rx, self.window);
        let mut passes = 0;

        loop {
            let settled = tokio::select! {
                _ = cancel.cancelled() => break,
                settled = debouncer.next_settled() => settled,
            };
            let Some(settled) = settled else {
                debug!("Membership watch ended");
                break;
            };

            if !self.role.is_leader() {
                warn!(
                    coalesced = settled.coalesced,
                    "Discarding membership change delivered after leadership loss"
                );
                continue;
            }

            info!(
                coalesced = settled.coalesced,
                path = %settled.latest.path,
                "Leader detected membership change"
            );
            passes += 1;
            match self.reconcile.execute().await {
                Ok(_) => {}
                Err(e) if e.is_session_fault() => {
                    warn!(error = %e, "Reconciliation interrupted by session loss");
                    break;
                }
                Err(e) => warn!(error = %e, "Reconciliation pass failed, waiting for next change"),
            }
        }

        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::apply_actions::ActionExecutor;
    use crate::use_cases::election_role::ElectionRole;
    use crate::use_cases::query_state::StateQuery;
    use crate::use_cases::test_support::{RecordingController, StubStore};
    use blacknight_domain::{Role, RoleSpec, Specification};
    use std::sync::atomic::Ordering;

    fn watcher(
        store: Arc<StubStore>,
        controller: Arc<RecordingController>,
        role: RoleReader,
    ) -> MembershipWatcher {
        let paths = StorePaths::new("/bk");
        let spec = Arc::new(
            Specification::new().with_role(RoleSpec::with_count(Role::parse("nc").unwrap(), 2)),
        );
        let executor = Arc::new(ActionExecutor::new(
            store.clone(),
            paths.clone(),
            spec,
            controller,
        ));
        let reconcile = Arc::new(ReconcileUseCase::new(
            StateQuery::new(store.clone(), paths.clone()),
            executor,
        ));
        MembershipWatcher::new(store, paths, Duration::from_secs(2), role, reconcile)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot_reconciles_when_leader() {
        let store = Arc::new(StubStore::new().with_node("/bk/services/nc/a:1", ""));
        let controller = Arc::new(RecordingController::default());
        let (election, reader) = ElectionRole::new();
        election.elected();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            watcher(Arc::clone(&store), controller.clone(), reader).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), 1);
        assert_eq!(controller.calls(), vec!["start nc/<new>"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_discarded_when_not_leader() {
        let store = Arc::new(StubStore::new().with_node("/bk/services/nc/a:1", ""));
        let controller = Arc::new(RecordingController::default());
        let (_election, reader) = ElectionRole::new();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            watcher(Arc::clone(&store), controller.clone(), reader).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), 0);
        assert!(controller.calls().is_empty());
        assert_eq!(store.locks_acquired.load(Ordering::SeqCst), 0);
    }
}
