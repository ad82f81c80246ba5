//! Coordination store port
//!
//! Defines the interface to the external hierarchical coordination service:
//! path reads and writes, ephemeral registration, one-shot children watches,
//! a cluster-wide lock, a leader-election primitive and quorum
//! reconfiguration. Every operation runs against the adapter's current
//! session; when that session ends, outstanding watches, locks and
//! leadership are all void and must be re-established from scratch.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur during coordination store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No node at {0}")]
    NotFound(String),

    #[error("Node already exists at {0}")]
    NodeExists(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Connection lost")]
    ConnectionLoss,

    #[error("Reconfiguration rejected: {0}")]
    ReconfigRejected(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl StoreError {
    /// Session faults are retryable by re-establishing the session
    pub fn is_session_fault(&self) -> bool {
        matches!(self, StoreError::SessionExpired | StoreError::ConnectionLoss)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Single notification delivered by a one-shot watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The children of the watched path changed
    ChildrenChanged(String),
    /// The watched node itself was deleted
    Deleted(String),
    /// The session that registered the watch ended
    SessionExpired,
}

/// One-shot children watch: the children at registration time, plus a
/// receiver that yields at most one event.
///
/// A dropped sender is equivalent to [`WatchEvent::SessionExpired`].
#[derive(Debug)]
pub struct ChildrenWatch {
    pub children: Vec<String>,
    pub event: oneshot::Receiver<WatchEvent>,
}

/// Held cluster lock. Dropping the guard releases the lock.
pub trait LockGuard: Send + Sync {
    /// Lock path
    fn path(&self) -> &str;

    /// False once the owning session has ended
    fn is_held(&self) -> bool;
}

/// Won election. Dropping it resigns leadership.
#[async_trait]
pub trait Leadership: Send + Sync {
    /// Identifier this process campaigned with
    fn candidate(&self) -> &str;

    /// Resolves once leadership is lost through session termination
    async fn lost(&self);
}

/// Port to the coordination service
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read the value stored at `path`
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// List the children of `path`, sorted
    async fn children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Create or overwrite a persistent node, creating parents as needed
    async fn write(&self, path: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Create `path` and its parents if they do not exist
    async fn ensure_path(&self, path: &str) -> Result<(), StoreError>;

    /// Create an ephemeral node owned by the current session
    async fn register_ephemeral(&self, path: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Register a one-shot children watch on `path`
    async fn watch_children(&self, path: &str) -> Result<ChildrenWatch, StoreError>;

    /// Block until the mutual-exclusion lock at `path` is granted
    async fn acquire_lock(&self, path: &str) -> Result<Box<dyn LockGuard>, StoreError>;

    /// Block until `candidate` wins the election at `path`
    async fn campaign(&self, path: &str, candidate: &str)
    -> Result<Box<dyn Leadership>, StoreError>;

    /// Submit a new quorum configuration (comma-joined server list)
    async fn reconfigure(&self, servers: &str) -> Result<(), StoreError>;

    /// Resolves when the session current at call time ends
    async fn session_lost(&self);

    /// Replace an ended session with a fresh one
    async fn restore_session(&self) -> Result<(), StoreError>;
}
