//! In-memory coordination service
//!
//! [`InMemoryEnsemble`] is a single-process stand-in for a replicated
//! coordination service: a node tree with ephemeral ownership, one-shot
//! children watches, sequential nodes and quorum reconfiguration.
//! Each [`InMemorySession`] is one client session against it and
//! implements the [`CoordinationStore`] port. Locks and elections follow
//! the usual sequential-ephemeral recipe: the lowest sequence number under
//! the lock (or election) path holds it.

use super::tree::{SessionId, Tree};
use async_trait::async_trait;
use blacknight_application::{
    ChildrenWatch, CoordinationStore, Leadership, LockGuard, StoreError, WatchEvent,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

const LOCK_PREFIX: &str = "lock-";
const CANDIDATE_PREFIX: &str = "candidate-";

/// Shared in-memory coordination service
#[derive(Clone, Default)]
pub struct InMemoryEnsemble {
    tree: Arc<Mutex<Tree>>,
}

impl InMemoryEnsemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client session
    pub fn connect(&self) -> InMemorySession {
        let id = self.lock().open_session();
        debug!(session = id, "Opened coordination session");
        InMemorySession {
            ensemble: self.clone(),
            session: AtomicU64::new(id),
        }
    }

    /// Write a persistent node outside any session (operator seeding)
    pub fn seed(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.lock().set(path, data)
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.lock().get(path)
    }

    pub fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.lock().children(path)
    }

    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.lock().delete(path)
    }

    /// Current quorum configuration, if one was ever submitted
    pub fn servers(&self) -> Option<String> {
        self.lock().servers().map(str::to_string)
    }

    /// Every configuration submitted so far, oldest first
    pub fn reconfigurations(&self) -> Vec<String> {
        self.lock().reconfigurations().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One client session against an [`InMemoryEnsemble`]
pub struct InMemorySession {
    ensemble: InMemoryEnsemble,
    session: AtomicU64,
}

impl InMemorySession {
    pub fn session_id(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    pub fn ensemble(&self) -> &InMemoryEnsemble {
        &self.ensemble
    }

    /// Expire the current session, as the service would after a missed
    /// heartbeat. Ephemeral nodes, watches, locks and leadership are lost.
    pub fn expire(&self) {
        let session = self.session_id();
        info!(session, "Expiring coordination session");
        self.ensemble.lock().expire(session);
    }

    /// Delete a node under this session
    pub async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.with_tree(|tree, _| tree.delete(path))
    }

    fn with_tree<R>(
        &self,
        f: impl FnOnce(&mut Tree, SessionId) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let session = self.session_id();
        let mut tree = self.ensemble.lock();
        tree.check_session(session)?;
        f(&mut tree, session)
    }

    /// Queue a sequential ephemeral node under `parent` and wait until it
    /// is the lowest one there
    async fn enqueue(
        &self,
        parent: &str,
        prefix: &str,
        data: &[u8],
    ) -> Result<QueuedNode, StoreError> {
        let (path, session) = self.with_tree(|tree, session| {
            tree.ensure(parent)?;
            let path = tree.create_sequential(parent, prefix, data, Some(session))?;
            Ok((path, session))
        })?;
        // Dropped on every early exit, which removes the queue entry
        let node = QueuedNode {
            tree: Arc::clone(&self.ensemble.tree),
            path,
            session,
        };

        loop {
            let watch = self.watch_children(parent).await?;
            let ahead = match watch.children.iter().position(|c| c == node.name()) {
                Some(0) => return Ok(node),
                Some(ahead) => ahead,
                None => return Err(StoreError::SessionExpired),
            };
            debug!(path = %node.path, ahead, "Waiting in queue");
            match watch.event.await {
                Ok(WatchEvent::ChildrenChanged(_)) => continue,
                Ok(WatchEvent::Deleted(path)) => return Err(StoreError::NotFound(path)),
                Ok(WatchEvent::SessionExpired) | Err(_) => return Err(StoreError::SessionExpired),
            }
        }
    }
}

/// A sequential ephemeral node removed when dropped
struct QueuedNode {
    tree: Arc<Mutex<Tree>>,
    path: String,
    session: SessionId,
}

impl QueuedNode {
    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    fn is_present(&self) -> bool {
        let tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        tree.owner(&self.path) == Some(self.session)
    }
}

impl Drop for QueuedNode {
    fn drop(&mut self) {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        if tree.owner(&self.path) == Some(self.session) {
            let _ = tree.delete(&self.path);
        }
    }
}

struct InMemoryLock {
    node: QueuedNode,
}

impl LockGuard for InMemoryLock {
    fn path(&self) -> &str {
        &self.node.path
    }

    fn is_held(&self) -> bool {
        self.node.is_present()
    }
}

struct InMemoryLeadership {
    _node: QueuedNode,
    candidate: String,
    expiry: watch::Receiver<bool>,
}

#[async_trait]
impl Leadership for InMemoryLeadership {
    fn candidate(&self) -> &str {
        &self.candidate
    }

    async fn lost(&self) {
        let mut expiry = self.expiry.clone();
        // A closed channel means the session is gone as well
        let _ = expiry.wait_for(|expired| *expired).await;
    }
}

#[async_trait]
impl CoordinationStore for InMemorySession {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.with_tree(|tree, _| tree.get(path))
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.with_tree(|tree, _| tree.children(path))
    }

    async fn write(&self, path: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_tree(|tree, _| tree.set(path, value))
    }

    async fn ensure_path(&self, path: &str) -> Result<(), StoreError> {
        self.with_tree(|tree, _| tree.ensure(path))
    }

    async fn register_ephemeral(&self, path: &str, value: &[u8]) -> Result<(), StoreError> {
        self.with_tree(|tree, session| tree.create(path, value, Some(session)))
    }

    async fn watch_children(&self, path: &str) -> Result<ChildrenWatch, StoreError> {
        self.with_tree(|tree, session| {
            let children = tree.children(path)?;
            let (tx, event) = oneshot::channel();
            tree.add_watcher(path, session, tx);
            Ok(ChildrenWatch { children, event })
        })
    }

    async fn acquire_lock(&self, path: &str) -> Result<Box<dyn LockGuard>, StoreError> {
        let node = self.enqueue(path, LOCK_PREFIX, b"").await?;
        debug!(path = %node.path, "Lock granted");
        Ok(Box::new(InMemoryLock { node }))
    }

    async fn campaign(
        &self,
        path: &str,
        candidate: &str,
    ) -> Result<Box<dyn Leadership>, StoreError> {
        let node = self.enqueue(path, CANDIDATE_PREFIX, candidate.as_bytes()).await?;
        let expiry = self
            .ensemble
            .lock()
            .expiry(node.session)
            .ok_or(StoreError::SessionExpired)?;
        Ok(Box::new(InMemoryLeadership {
            _node: node,
            candidate: candidate.to_string(),
            expiry,
        }))
    }

    async fn reconfigure(&self, servers: &str) -> Result<(), StoreError> {
        self.with_tree(|tree, _| tree.reconfigure(servers))?;
        info!(servers = %servers, "Quorum reconfigured");
        Ok(())
    }

    async fn session_lost(&self) {
        let expiry = self.ensemble.lock().expiry(self.session_id());
        if let Some(mut expiry) = expiry {
            let _ = expiry.wait_for(|expired| *expired).await;
        }
    }

    async fn restore_session(&self) -> Result<(), StoreError> {
        let current = self.session_id();
        let mut tree = self.ensemble.lock();
        if tree.check_session(current).is_ok() {
            return Ok(());
        }
        let fresh = tree.open_session();
        self.session.store(fresh, Ordering::SeqCst);
        info!(previous = current, session = fresh, "Opened replacement session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_operations_fail_after_expiry() {
        let ensemble = InMemoryEnsemble::new();
        let session = ensemble.connect();
        session.register_ephemeral("/bk/ensemble/a:1", b"nc").await.unwrap();

        session.expire();

        assert_eq!(session.read("/bk").await, Err(StoreError::SessionExpired));
        assert_eq!(ensemble.children("/bk/ensemble").unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_restore_session_opens_fresh_session() {
        let ensemble = InMemoryEnsemble::new();
        let session = ensemble.connect();
        let first = session.session_id();
        session.expire();

        session.restore_session().await.unwrap();

        assert_ne!(session.session_id(), first);
        session.ensure_path("/bk").await.unwrap();
    }

    #[tokio::test]
    async fn test_session_lost_resolves_on_expiry() {
        let ensemble = InMemoryEnsemble::new();
        let session = Arc::new(ensemble.connect());
        let waiter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.session_lost().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        session.expire();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_and_released_on_drop() {
        let ensemble = InMemoryEnsemble::new();
        let a = ensemble.connect();
        let b = Arc::new(ensemble.connect());

        let held = a.acquire_lock("/bk/lock").await.unwrap();
        assert!(held.is_held());

        let contender = {
            let b = Arc::clone(&b);
            tokio::spawn(async move { b.acquire_lock("/bk/lock").await.map(|g| g.is_held()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        let granted = tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(granted, Ok(true));
        assert!(ensemble.children("/bk/lock").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_released_by_session_expiry() {
        let ensemble = InMemoryEnsemble::new();
        let a = ensemble.connect();
        let b = ensemble.connect();
        let held = a.acquire_lock("/bk/lock").await.unwrap();

        a.expire();

        assert!(!held.is_held());
        let granted = tokio::time::timeout(Duration::from_secs(1), b.acquire_lock("/bk/lock"))
            .await
            .unwrap()
            .unwrap();
        assert!(granted.is_held());
    }

    #[tokio::test]
    async fn test_cancelled_lock_wait_leaves_no_queue_entry() {
        let ensemble = InMemoryEnsemble::new();
        let a = ensemble.connect();
        let b = ensemble.connect();
        let _held = a.acquire_lock("/bk/lock").await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(20), b.acquire_lock("/bk/lock")).await;

        assert!(waited.is_err());
        assert_eq!(ensemble.children("/bk/lock").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_election_leadership_lost_on_expiry() {
        let ensemble = InMemoryEnsemble::new();
        let a = ensemble.connect();
        let b = ensemble.connect();

        let leader = a.campaign("/bk/elect", "a:1").await.unwrap();
        assert_eq!(leader.candidate(), "a:1");
        let follower = tokio::time::timeout(Duration::from_millis(20), b.campaign("/bk/elect", "b:1")).await;
        assert!(follower.is_err());

        a.expire();
        tokio::time::timeout(Duration::from_secs(1), leader.lost())
            .await
            .unwrap();
        let next = tokio::time::timeout(Duration::from_secs(1), b.campaign("/bk/elect", "b:1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.candidate(), "b:1");
    }

    #[tokio::test]
    async fn test_reconfigure_records_submissions() {
        let ensemble = InMemoryEnsemble::new();
        let session = ensemble.connect();

        session.reconfigure("a:1").await.unwrap();
        session.reconfigure("a:1,b:1").await.unwrap();

        assert_eq!(ensemble.servers(), Some("a:1,b:1".to_string()));
        assert_eq!(ensemble.reconfigurations(), vec!["a:1", "a:1,b:1"]);
    }
}
