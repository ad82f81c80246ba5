//! Candidate/Leader state machine.
//!
//! [`ElectionRole`] is the only mutator and is owned by the election
//! controller; every other component holds a [`RoleReader`].

use blacknight_domain::ElectionState;
use tokio::sync::watch;
use tracing::debug;

/// Writer side of the election state. Not `Clone`.
#[derive(Debug)]
pub struct ElectionRole {
    tx: watch::Sender<ElectionState>,
}

/// Read-only view of the election state
#[derive(Debug, Clone)]
pub struct RoleReader {
    rx: watch::Receiver<ElectionState>,
}

impl ElectionRole {
    /// Create the state machine in its initial `Candidate` state
    pub fn new() -> (Self, RoleReader) {
        let (tx, rx) = watch::channel(ElectionState::Candidate);
        (Self { tx }, RoleReader { rx })
    }

    pub fn reader(&self) -> RoleReader {
        RoleReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> ElectionState {
        *self.tx.borrow()
    }

    /// Election callback: this process won
    pub(crate) fn elected(&self) {
        self.transition(ElectionState::Leader);
    }

    /// Election callback: leadership ended (step-down or session loss)
    pub(crate) fn deposed(&self) {
        self.transition(ElectionState::Candidate);
    }

    fn transition(&self, next: ElectionState) {
        let previous = self.tx.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Election state changed");
        }
    }
}

impl RoleReader {
    pub fn current(&self) -> ElectionState {
        *self.rx.borrow()
    }

    pub fn is_leader(&self) -> bool {
        self.current().is_leader()
    }

    /// Wait until the state equals `state`
    pub async fn wait_for(&mut self, state: ElectionState) -> ElectionState {
        let reached = self.rx.wait_for(|s| *s == state).await.map(|s| *s);
        reached.unwrap_or_else(|_| self.current())
    }
}
