//! Action executor use case
//!
//! Applies remediation under the cluster lock. Once the lock is held the
//! executor re-reads the observed state and recomputes the diff, so a
//! previous leader's late remediation is never applied twice. Actions run
//! one at a time; a failed action is logged and the pass continues, since
//! every action is idempotent and the next trigger retries what is left.

use crate::ports::action_journal::{ActionJournal, JournalEvent, NoActionJournal};
use crate::ports::coordination::{CoordinationStore, StoreError};
use crate::ports::service_controller::{ActionError, ServiceController};
use crate::use_cases::query_state::StateQuery;
use blacknight_domain::{Ensemble, RemediationAction, Specification, StorePaths, diff};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a whole pass (lock or state query failures)
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ApplyError {
    pub fn is_session_fault(&self) -> bool {
        match self {
            ApplyError::Store(e) => e.is_session_fault(),
        }
    }
}

/// Outcome of one remediation pass
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Actions that succeeded, in execution order
    pub applied: Vec<RemediationAction>,
    /// Actions that failed, with their errors
    pub failed: Vec<(RemediationAction, ActionError)>,
    /// True if the diff under the lock differed from the caller's plan
    pub plan_changed: bool,
}

impl ApplyReport {
    /// Nothing needed doing
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

/// Outcome of a reconfiguration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconfigOutcome {
    /// A new configuration was submitted
    Submitted(Ensemble),
    /// The ensemble matches the last submitted configuration
    Unchanged(Ensemble),
}

/// Lock-guarded, sequential executor of remediation actions
pub struct ActionExecutor {
    store: Arc<dyn CoordinationStore>,
    query: StateQuery,
    spec: Arc<Specification>,
    controller: Arc<dyn ServiceController>,
    journal: Arc<dyn ActionJournal>,
}

impl ActionExecutor {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        paths: StorePaths,
        spec: Arc<Specification>,
        controller: Arc<dyn ServiceController>,
    ) -> Self {
        Self {
            query: StateQuery::new(Arc::clone(&store), paths),
            store,
            spec,
            controller,
            journal: Arc::new(NoActionJournal),
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn ActionJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn spec(&self) -> &Arc<Specification> {
        &self.spec
    }

    /// Apply a remediation pass.
    ///
    /// `planned` is the caller's diff; the diff actually executed is
    /// recomputed from a read taken under the lock. The lock is released on
    /// every exit path.
    pub async fn apply(&self, planned: &[RemediationAction]) -> Result<ApplyReport, ApplyError> {
        let guard = self
            .store
            .acquire_lock(&self.query.paths().lock())
            .await?;
        debug!(path = guard.path(), "Cluster lock acquired");

        let observed = self.query.query().await?;
        let actions = diff(&self.spec, &observed);

        let mut report = ApplyReport {
            plan_changed: actions.as_slice() != planned,
            ..ApplyReport::default()
        };
        if report.plan_changed {
            info!(
                planned = planned.len(),
                fresh = actions.len(),
                "State changed before the lock was granted, applying fresh diff"
            );
        }

        for action in actions {
            match self.execute(&action, &observed.args).await {
                Ok(()) => {
                    info!(action = %action, "Applied remediation action");
                    self.journal.record(journal_event(&action, None));
                    report.applied.push(action);
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "Remediation action failed, continuing");
                    self.journal.record(journal_event(&action, Some(&e)));
                    report.failed.push((action, e));
                }
            }
        }

        if !guard.is_held() {
            warn!("Cluster lock was lost during the pass");
        }
        drop(guard);
        Ok(report)
    }

    /// Submit the current ensemble as the quorum configuration, unless it
    /// equals `last`. Reads and submission happen under the cluster lock.
    pub async fn apply_reconfiguration(
        &self,
        last: Option<&Ensemble>,
    ) -> Result<ReconfigOutcome, ActionError> {
        let guard = self
            .store
            .acquire_lock(&self.query.paths().lock())
            .await?;

        let ensemble = self.query.ensemble().await?;
        if last == Some(&ensemble) {
            debug!(ensemble = %ensemble, "Ensemble unchanged, skipping reconfiguration");
            return Ok(ReconfigOutcome::Unchanged(ensemble));
        }
        if ensemble.is_empty() {
            return Err(ActionError::Rejected("ensemble has no members".to_string()));
        }

        let action = RemediationAction::reconfigure(ensemble.clone());
        let result = self.execute(&action, &BTreeMap::new()).await;
        self.journal.record(journal_event(&action, result.as_ref().err()));
        drop(guard);

        result.map(|()| ReconfigOutcome::Submitted(ensemble))
    }

    async fn execute(
        &self,
        action: &RemediationAction,
        cluster_args: &BTreeMap<String, String>,
    ) -> Result<(), ActionError> {
        match action {
            RemediationAction::Start { role, member, args } => {
                let mut merged = cluster_args.clone();
                merged.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
                self.controller.start(role, member.as_ref(), &merged).await
            }
            RemediationAction::Stop { role, member } => self.controller.stop(role, member).await,
            RemediationAction::Reconfigure { ensemble } => self
                .store
                .reconfigure(&ensemble.to_server_list())
                .await
                .map_err(ActionError::from),
        }
    }
}

fn journal_event(action: &RemediationAction, error: Option<&ActionError>) -> JournalEvent {
    let mut payload = serde_json::to_value(action).unwrap_or(serde_json::Value::Null);
    if let serde_json::Value::Object(map) = &mut payload {
        map.insert(
            "outcome".to_string(),
            serde_json::Value::String(if error.is_some() { "failed" } else { "applied" }.to_string()),
        );
        if let Some(e) = error {
            map.insert("error".to_string(), serde_json::Value::String(e.to_string()));
        }
    }
    let event_type = if error.is_some() {
        "action_failed"
    } else {
        "action_applied"
    };
    JournalEvent::new(event_type, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{RecordingController, StubStore};
    use blacknight_domain::{MemberId, Role, RoleSpec};
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    struct CollectingJournal(Mutex<Vec<(String, serde_json::Value)>>);

    impl ActionJournal for CollectingJournal {
        fn record(&self, event: JournalEvent) {
            self.0
                .lock()
                .unwrap()
                .push((event.event_type.to_string(), event.payload));
        }
    }

    fn nc_spec(count: usize) -> Arc<Specification> {
        Arc::new(
            Specification::new()
                .with_role(RoleSpec::with_count(Role::parse("nc").unwrap(), count)),
        )
    }

    fn executor(
        store: Arc<StubStore>,
        spec: Arc<Specification>,
        controller: Arc<RecordingController>,
    ) -> ActionExecutor {
        ActionExecutor::new(store, StorePaths::new("/bk"), spec, controller)
    }

    #[tokio::test]
    async fn test_failed_action_does_not_abort_pass() {
        let store = Arc::new(
            StubStore::new()
                .with_node("/bk/services/nc/a", "")
                .with_node("/bk/services/nc/b", "")
                .with_node("/bk/services/nc/c", ""),
        );
        let controller = Arc::new(RecordingController::failing_on(&["b"]));
        let exec = executor(Arc::clone(&store), nc_spec(1), Arc::clone(&controller));

        let report = exec.apply(&[]).await.unwrap();

        assert_eq!(controller.calls(), vec!["stop nc/b", "stop nc/c"]);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.total(), 2);
    }

    #[tokio::test]
    async fn test_lock_released_after_pass() {
        let store = Arc::new(StubStore::new());
        let controller = Arc::new(RecordingController::default());
        let exec = executor(Arc::clone(&store), nc_spec(1), controller);

        exec.apply(&[]).await.unwrap();

        assert_eq!(store.locks_acquired.load(Ordering::SeqCst), 1);
        assert_eq!(store.locks_released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lock_released_when_query_fails() {
        let store = Arc::new(StubStore::new());
        *store.fail_reads.lock().unwrap() = true;
        let controller = Arc::new(RecordingController::default());
        let exec = executor(Arc::clone(&store), nc_spec(1), Arc::clone(&controller));

        let err = exec.apply(&[]).await.unwrap_err();

        assert!(err.is_session_fault());
        assert!(controller.calls().is_empty());
        assert_eq!(store.locks_released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recomputes_diff_under_lock() {
        // The caller planned against a stale read with two members missing;
        // by the time the lock is held only one is missing.
        let store = Arc::new(StubStore::new().with_node("/bk/services/nc/a", ""));
        let controller = Arc::new(RecordingController::default());
        let exec = executor(Arc::clone(&store), nc_spec(2), Arc::clone(&controller));
        let nc = Role::parse("nc").unwrap();
        let stale = vec![
            RemediationAction::start(nc.clone(), None, BTreeMap::new()),
            RemediationAction::start(nc, None, BTreeMap::new()),
        ];

        let report = exec.apply(&stale).await.unwrap();

        assert!(report.plan_changed);
        assert_eq!(controller.calls(), vec!["start nc/<new>"]);
    }

    #[tokio::test]
    async fn test_start_args_overlay_cluster_args() {
        let store = Arc::new(
            StubStore::new()
                .with_node("/bk/args/cloud", "euca")
                .with_node("/bk/args/hypervisor", "xen"),
        );
        let spec = Arc::new(Specification::new().with_role(
            RoleSpec::with_members(Role::parse("nc").unwrap(), [MemberId::parse("a").unwrap()])
                .with_arg("hypervisor", "kvm"),
        ));
        let controller = Arc::new(RecordingController::default());
        let exec = executor(store, spec, Arc::clone(&controller));

        exec.apply(&[]).await.unwrap();

        let args = controller.last_args.lock().unwrap().clone();
        assert_eq!(args.get("cloud").map(String::as_str), Some("euca"));
        assert_eq!(args.get("hypervisor").map(String::as_str), Some("kvm"));
    }

    #[tokio::test]
    async fn test_journal_records_outcomes() {
        let store = Arc::new(
            StubStore::new()
                .with_node("/bk/services/nc/a", "")
                .with_node("/bk/services/nc/b", ""),
        );
        let controller = Arc::new(RecordingController::failing_on(&["b"]));
        let journal = Arc::new(CollectingJournal(Mutex::new(Vec::new())));
        let exec = executor(store, nc_spec(0), controller).with_journal(journal.clone());

        exec.apply(&[]).await.unwrap();

        let events = journal.0.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "action_applied");
        assert_eq!(events[0].1["member"], "a");
        assert_eq!(events[1].0, "action_failed");
        assert_eq!(events[1].1["outcome"], "failed");
        assert!(events[1].1["error"].as_str().unwrap().contains("cannot stop b"));
    }

    #[tokio::test]
    async fn test_reconfiguration_submits_then_skips_unchanged() {
        let store = Arc::new(
            StubStore::new()
                .with_node("/bk/ensemble/localhost:2182", "")
                .with_node("/bk/ensemble/localhost:2181", ""),
        );
        let exec = executor(
            Arc::clone(&store),
            nc_spec(0),
            Arc::new(RecordingController::default()),
        );

        let first = exec.apply_reconfiguration(None).await.unwrap();
        let ReconfigOutcome::Submitted(ensemble) = first.clone() else {
            panic!("expected submission, got {first:?}");
        };
        assert_eq!(
            store.reconfigs.lock().unwrap().clone(),
            vec!["localhost:2181,localhost:2182"]
        );

        let second = exec.apply_reconfiguration(Some(&ensemble)).await.unwrap();
        assert!(matches!(second, ReconfigOutcome::Unchanged(_)));
        assert_eq!(store.reconfigs.lock().unwrap().len(), 1);
        assert_eq!(store.locks_released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reconfiguration_rejects_empty_ensemble() {
        let store = Arc::new(StubStore::new());
        let exec = executor(store, nc_spec(0), Arc::new(RecordingController::default()));
        assert!(matches!(
            exec.apply_reconfiguration(None).await,
            Err(ActionError::Rejected(_))
        ));
    }
}
