//! Election controller
//!
//! Drives the `Candidate → Leader → Candidate` loop. While leading, the
//! membership watcher and the ensemble monitor run as child tasks and the
//! leader body serves administrative commands. A watcher that ends while
//! leadership holds is re-armed after `session_retry`. Session loss is
//! never fatal: the controller restores a session, re-registers this node
//! and campaigns again.

use crate::config::{NodeIdentity, ReconcileParams};
use crate::ports::coordination::{CoordinationStore, Leadership, StoreError};
use crate::use_cases::admin::{self, AdminHandle, AdminRequest, AdminResponse};
use crate::use_cases::apply_actions::ActionExecutor;
use crate::use_cases::election_role::{ElectionRole, RoleReader};
use crate::use_cases::ensemble_monitor::EnsembleMonitor;
use crate::use_cases::membership_watcher::MembershipWatcher;
use crate::use_cases::query_state::StateQuery;
use crate::use_cases::reconcile::ReconcileUseCase;
use blacknight_domain::{DomainError, MemberId, StorePaths};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const ADMIN_BUFFER: usize = 8;

#[derive(Error, Debug)]
pub enum ElectionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid node identity: {0}")]
    InvalidNode(#[from] DomainError),
}

/// Why the leader body returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaderExit {
    Shutdown,
    SteppedDown,
    LeadershipLost,
    SessionLost,
}

/// Watcher tasks owned by the leader body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaderTask {
    Membership,
    Ensemble,
}

impl LeaderTask {
    const ALL: [LeaderTask; 2] = [LeaderTask::Membership, LeaderTask::Ensemble];
}

impl fmt::Display for LeaderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderTask::Membership => write!(f, "membership watcher"),
            LeaderTask::Ensemble => write!(f, "ensemble monitor"),
        }
    }
}

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Outcome of one campaign
enum Campaign {
    Elected(Box<dyn Leadership>),
    SessionLost,
    Shutdown,
}

pub struct ElectionController {
    store: Arc<dyn CoordinationStore>,
    paths: StorePaths,
    node: NodeIdentity,
    params: ReconcileParams,
    query: StateQuery,
    executor: Arc<ActionExecutor>,
    role: ElectionRole,
    admin_tx: mpsc::Sender<AdminRequest>,
    admin_rx: mpsc::Receiver<AdminRequest>,
}

impl ElectionController {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        paths: StorePaths,
        executor: Arc<ActionExecutor>,
        node: NodeIdentity,
        params: ReconcileParams,
    ) -> Self {
        let (role, _) = ElectionRole::new();
        let (admin_tx, admin_rx) = mpsc::channel(ADMIN_BUFFER);
        Self {
            query: StateQuery::new(Arc::clone(&store), paths.clone()),
            executor,
            store,
            paths,
            node,
            params,
            role,
            admin_tx,
            admin_rx,
        }
    }

    pub fn role(&self) -> RoleReader {
        self.role.reader()
    }

    pub fn admin_handle(&self) -> AdminHandle {
        AdminHandle::new(self.admin_tx.clone(), self.role.reader())
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns an error only for faults that re-candidacy cannot fix (an
    /// invalid node identity, or a store refusing registration outright).
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ElectionError> {
        match self.register().await {
            Ok(()) => {}
            Err(ElectionError::Store(e)) if e.is_session_fault() => {
                if !self.recover_session(&shutdown).await? {
                    return Ok(());
                }
            }
            Err(e) => return Err(e),
        }

        loop {
            let exit = match self.campaign(&shutdown).await {
                Ok(Campaign::Elected(leadership)) => self.lead(leadership, &shutdown).await,
                Ok(Campaign::SessionLost) => LeaderExit::SessionLost,
                Ok(Campaign::Shutdown) => LeaderExit::Shutdown,
                Err(e) if e.is_session_fault() => LeaderExit::SessionLost,
                Err(e) => return Err(e.into()),
            };

            match exit {
                LeaderExit::Shutdown => break,
                LeaderExit::SteppedDown | LeaderExit::LeadershipLost => {
                    info!(candidate = %self.node.id, "Rejoining election as candidate");
                }
                LeaderExit::SessionLost => {
                    if !self.recover_session(&shutdown).await? {
                        break;
                    }
                }
            }
        }

        self.role.deposed();
        info!("Election controller stopped");
        Ok(())
    }

    async fn campaign(&mut self, shutdown: &CancellationToken) -> Result<Campaign, StoreError> {
        let elect = self.paths.elect();
        debug!(path = %elect, candidate = %self.node.id, "Joining election");

        let campaign = self.store.campaign(&elect, &self.node.id);
        tokio::pin!(campaign);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(Campaign::Shutdown),
                _ = self.store.session_lost() => return Ok(Campaign::SessionLost),
                result = &mut campaign => return result.map(Campaign::Elected),
                Some(request) = self.admin_rx.recv() => {
                    debug!(command = %request.command, "Refusing admin command while candidate");
                    drop(request);
                }
            }
        }
    }

    async fn lead(
        &mut self,
        leadership: Box<dyn Leadership>,
        shutdown: &CancellationToken,
    ) -> LeaderExit {
        self.role.elected();
        info!(candidate = leadership.candidate(), "Elected leader");

        if let Err(e) = self.prepare_paths().await {
            warn!(error = %e, "Cannot prepare deployment paths, stepping down");
            self.role.deposed();
            drop(leadership);
            if e.is_session_fault() {
                return LeaderExit::SessionLost;
            }
            tokio::time::sleep(self.params.session_retry).await;
            return LeaderExit::SteppedDown;
        }

        let cancel = shutdown.child_token();
        let mut tasks = JoinSet::new();
        for task in LeaderTask::ALL {
            self.spawn_task(&mut tasks, task, &cancel, Duration::ZERO);
        }

        let exit = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break LeaderExit::Shutdown,
                _ = leadership.lost() => break LeaderExit::LeadershipLost,
                _ = self.store.session_lost() => break LeaderExit::SessionLost,
                Some(request) = self.admin_rx.recv() => {
                    let response = admin::answer(request.command, &self.query).await;
                    let stepping_down = response == AdminResponse::SteppingDown;
                    if request.reply.send(response).is_err() {
                        debug!("Admin client went away before the reply");
                    }
                    if stepping_down {
                        break LeaderExit::SteppedDown;
                    }
                }
                Some(joined) = tasks.join_next() => match joined {
                    Ok(task) => {
                        warn!(task = %task, "Leader task ended while leading, re-arming");
                        self.spawn_task(&mut tasks, task, &cancel, self.params.session_retry);
                    }
                    Err(e) => {
                        warn!(error = %e, "Leader task ended abnormally, stepping down");
                        break LeaderExit::SteppedDown;
                    }
                },
            }
        };

        // Watch callbacks still in flight see Candidate from here on.
        self.role.deposed();
        cancel.cancel();
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Leader task ended abnormally");
            }
        }
        drop(leadership);

        match exit {
            LeaderExit::SessionLost => warn!("Coordination session lost while leading"),
            LeaderExit::LeadershipLost => warn!("Leadership lost"),
            LeaderExit::SteppedDown => info!("Stepped down from leader role"),
            LeaderExit::Shutdown => info!("Leaving leader role for shutdown"),
        }
        exit
    }

    async fn prepare_paths(&self) -> Result<(), StoreError> {
        for path in [self.paths.args(), self.paths.services(), self.paths.ensemble()] {
            self.store.ensure_path(&path).await?;
        }
        Ok(())
    }

    /// Spawn one leader task after `delay`. The task ensures its watched
    /// path exists before arming, so a deleted subtree is recreated.
    fn spawn_task(
        &self,
        tasks: &mut JoinSet<LeaderTask>,
        task: LeaderTask,
        cancel: &CancellationToken,
        delay: Duration,
    ) {
        let store = Arc::clone(&self.store);
        let token = cancel.clone();
        let (path, body) = match task {
            LeaderTask::Membership => {
                let reconcile = Arc::new(ReconcileUseCase::new(
                    self.query.clone(),
                    Arc::clone(&self.executor),
                ));
                let watcher = MembershipWatcher::new(
                    Arc::clone(&self.store),
                    self.paths.clone(),
                    self.params.membership_debounce,
                    self.role.reader(),
                    reconcile,
                );
                let token = token.clone();
                let body: BoxedTask = Box::pin(async move {
                    let passes = watcher.run(token).await;
                    debug!(passes, "Membership watcher stopped");
                });
                (self.paths.services(), body)
            }
            LeaderTask::Ensemble => {
                let monitor = EnsembleMonitor::new(
                    Arc::clone(&self.store),
                    self.paths.clone(),
                    self.params.ensemble_debounce,
                    self.role.reader(),
                    Arc::clone(&self.executor),
                )
                .with_retry(self.params.reconfig_max_attempts, self.params.reconfig_backoff);
                let token = token.clone();
                let body: BoxedTask = Box::pin(async move {
                    let last = monitor.run(token).await;
                    debug!(last = ?last.map(|e| e.to_string()), "Ensemble monitor stopped");
                });
                (self.paths.ensemble(), body)
            }
        };

        tasks.spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return task,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if let Err(e) = store.ensure_path(&path).await {
                warn!(task = %task, path = %path, error = %e, "Cannot prepare watched path");
                return task;
            }
            body.await;
            task
        });
    }

    /// Register this node under `/ensemble` and `/services/<role>`.
    /// Existing registrations are kept.
    async fn register(&self) -> Result<(), ElectionError> {
        let member = MemberId::parse(self.node.id.as_str())?;

        self.store.ensure_path(&self.paths.ensemble()).await?;
        keep_existing(
            self.store
                .register_ephemeral(
                    &self.paths.ensemble_member(member.as_str()),
                    self.node.tags.as_bytes(),
                )
                .await,
        )?;

        for role in &self.node.services {
            self.store.ensure_path(&self.paths.service_role(role)).await?;
            keep_existing(
                self.store
                    .register_ephemeral(&self.paths.service_member(role, &member), b"")
                    .await,
            )?;
        }

        info!(
            node = %member,
            services = self.node.services.len(),
            "Registered with coordination store"
        );
        Ok(())
    }

    /// Restore a session and re-register. Returns `false` on shutdown.
    async fn recover_session(&self, shutdown: &CancellationToken) -> Result<bool, ElectionError> {
        self.role.deposed();
        warn!("Coordination session lost, restoring before rejoining the election");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = match self.store.restore_session().await {
                Ok(()) => self.register().await,
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(()) => {
                    info!(attempt, "Coordination session restored");
                    return Ok(true);
                }
                Err(ElectionError::Store(e)) if e.is_session_fault() => {
                    warn!(attempt, error = %e, "Session restore failed, retrying");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(false),
                _ = tokio::time::sleep(self.params.session_retry) => {}
            }
        }
    }
}

fn keep_existing(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NodeExists(path)) => {
            debug!(path = %path, "Registration already present");
            Ok(())
        }
        other => other,
    }
}
