//! Test doubles for the application ports.

use crate::ports::coordination::{
    ChildrenWatch, CoordinationStore, Leadership, LockGuard, StoreError, WatchEvent,
};
use crate::ports::service_controller::{ActionError, ServiceController};
use async_trait::async_trait;
use blacknight_domain::{MemberId, Role};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Flat-map store: enough of the coordination contract for use case tests.
/// Watches never fire and elections are unsupported.
#[derive(Default)]
pub(crate) struct StubStore {
    nodes: Mutex<BTreeMap<String, Vec<u8>>>,
    watchers: Mutex<Vec<oneshot::Sender<WatchEvent>>>,
    pub locks_acquired: AtomicUsize,
    pub locks_released: Arc<AtomicUsize>,
    pub reconfigs: Mutex<Vec<String>>,
    pub reconfig_failures: AtomicUsize,
    pub fail_reads: Mutex<bool>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, path: &str, value: &str) -> Self {
        self.insert(path, value.as_bytes());
        self
    }

    pub fn remove(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let prefix = format!("{}/", path);
        nodes.retain(|p, _| p != path && !p.starts_with(&prefix));
    }

    pub fn insert(&self, path: &str, value: &[u8]) {
        let mut nodes = self.nodes.lock().unwrap();
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            nodes.entry(current.clone()).or_default();
        }
        nodes.insert(path.to_string(), value.to_vec());
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::ConnectionLoss);
        }
        Ok(())
    }
}

struct StubLock {
    released: Arc<AtomicUsize>,
}

impl LockGuard for StubLock {
    fn path(&self) -> &str {
        "/stub/lock"
    }

    fn is_held(&self) -> bool {
        true
    }
}

impl Drop for StubLock {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CoordinationStore for StubStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.check_reads()?;
        self.nodes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.check_reads()?;
        let nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        Ok(nodes
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn write(&self, path: &str, value: &[u8]) -> Result<(), StoreError> {
        self.insert(path, value);
        Ok(())
    }

    async fn ensure_path(&self, path: &str) -> Result<(), StoreError> {
        if !self.nodes.lock().unwrap().contains_key(path) {
            self.insert(path, b"");
        }
        Ok(())
    }

    async fn register_ephemeral(&self, path: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.nodes.lock().unwrap().contains_key(path) {
            return Err(StoreError::NodeExists(path.to_string()));
        }
        self.insert(path, value);
        Ok(())
    }

    async fn watch_children(&self, path: &str) -> Result<ChildrenWatch, StoreError> {
        let children = self.children(path).await?;
        let (tx, rx) = oneshot::channel();
        self.watchers.lock().unwrap().push(tx);
        Ok(ChildrenWatch {
            children,
            event: rx,
        })
    }

    async fn acquire_lock(&self, _path: &str) -> Result<Box<dyn LockGuard>, StoreError> {
        self.locks_acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubLock {
            released: Arc::clone(&self.locks_released),
        }))
    }

    async fn campaign(
        &self,
        _path: &str,
        _candidate: &str,
    ) -> Result<Box<dyn Leadership>, StoreError> {
        Err(StoreError::Other("elections not supported by stub".to_string()))
    }

    async fn reconfigure(&self, servers: &str) -> Result<(), StoreError> {
        let remaining = self.reconfig_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reconfig_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::ReconfigRejected("injected".to_string()));
        }
        self.reconfigs.lock().unwrap().push(servers.to_string());
        Ok(())
    }

    async fn session_lost(&self) {
        std::future::pending::<()>().await
    }

    async fn restore_session(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Records every call; fails for configured members
#[derive(Default)]
pub(crate) struct RecordingController {
    pub calls: Mutex<Vec<String>>,
    pub last_args: Mutex<BTreeMap<String, String>>,
    pub fail_on: BTreeSet<String>,
}

impl RecordingController {
    pub fn failing_on(members: &[&str]) -> Self {
        Self {
            fail_on: members.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceController for RecordingController {
    async fn start(
        &self,
        role: &Role,
        member: Option<&MemberId>,
        args: &BTreeMap<String, String>,
    ) -> Result<(), ActionError> {
        let name = member.map_or("<new>".to_string(), MemberId::to_string);
        self.calls.lock().unwrap().push(format!("start {}/{}", role, name));
        *self.last_args.lock().unwrap() = args.clone();
        if self.fail_on.contains(&name) {
            return Err(ActionError::CommandFailed(format!("cannot start {}", name)));
        }
        Ok(())
    }

    async fn stop(&self, role: &Role, member: &MemberId) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(format!("stop {}/{}", role, member));
        if self.fail_on.contains(member.as_str()) {
            return Err(ActionError::CommandFailed(format!("cannot stop {}", member)));
        }
        Ok(())
    }
}
