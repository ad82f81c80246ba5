//! Node tree shared by every session of an in-memory ensemble.
//!
//! Only ever accessed under the ensemble mutex; nothing in here awaits.

use blacknight_application::{StoreError, WatchEvent};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{oneshot, watch};
use tracing::debug;

pub(crate) type SessionId = u64;

#[derive(Debug)]
struct Node {
    data: Vec<u8>,
    /// Owning session of an ephemeral node
    owner: Option<SessionId>,
}

#[derive(Debug)]
struct Watcher {
    session: SessionId,
    tx: oneshot::Sender<WatchEvent>,
}

#[derive(Debug, Default)]
pub(crate) struct Tree {
    nodes: BTreeMap<String, Node>,
    watchers: HashMap<String, Vec<Watcher>>,
    /// `true` once the session has expired
    sessions: HashMap<SessionId, watch::Sender<bool>>,
    next_session: SessionId,
    next_sequence: u64,
    servers: Option<String>,
    reconfigurations: Vec<String>,
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) | None => None,
        Some(i) => Some(&path[..i]),
    }
}

fn validate_path(path: &str) -> Result<(), StoreError> {
    if !path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(StoreError::Other(format!("invalid path '{}'", path)));
    }
    Ok(())
}

impl Tree {
    pub fn open_session(&mut self) -> SessionId {
        self.next_session += 1;
        let (tx, _) = watch::channel(false);
        self.sessions.insert(self.next_session, tx);
        self.next_session
    }

    pub fn check_session(&self, session: SessionId) -> Result<(), StoreError> {
        match self.sessions.get(&session) {
            Some(tx) if !*tx.borrow() => Ok(()),
            _ => Err(StoreError::SessionExpired),
        }
    }

    /// Receiver that turns `true` when the session expires
    pub fn expiry(&self, session: SessionId) -> Option<watch::Receiver<bool>> {
        self.sessions.get(&session).map(watch::Sender::subscribe)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn owner(&self, path: &str) -> Option<SessionId> {
        self.nodes.get(path).and_then(|n| n.owner)
    }

    pub fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.nodes
            .get(path)
            .map(|n| n.data.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// Direct children, sorted
    pub fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        if !self.exists(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        Ok(self
            .nodes
            .range(prefix.clone()..)
            .map(|(p, _)| p)
            .take_while(|p| p.starts_with(&prefix))
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    /// Create `path` and any missing ancestors as persistent nodes
    pub fn ensure(&mut self, path: &str) -> Result<(), StoreError> {
        validate_path(path)?;
        let mut end = 0;
        while let Some(offset) = path[end + 1..].find('/') {
            end += offset + 1;
            self.insert_if_absent(&path[..end]);
        }
        self.insert_if_absent(path);
        Ok(())
    }

    fn insert_if_absent(&mut self, path: &str) {
        if !self.exists(path) {
            self.nodes.insert(
                path.to_string(),
                Node {
                    data: Vec::new(),
                    owner: None,
                },
            );
            self.node_created(path);
        }
    }

    /// Create a node; ancestors are created as needed
    pub fn create(
        &mut self,
        path: &str,
        data: &[u8],
        owner: Option<SessionId>,
    ) -> Result<(), StoreError> {
        validate_path(path)?;
        if self.exists(path) {
            return Err(StoreError::NodeExists(path.to_string()));
        }
        if let Some(parent) = parent_of(path) {
            if self.owner(parent).is_some() {
                return Err(StoreError::Other(format!(
                    "ephemeral node {} cannot have children",
                    parent
                )));
            }
            self.ensure(parent)?;
        }
        self.nodes.insert(
            path.to_string(),
            Node {
                data: data.to_vec(),
                owner,
            },
        );
        self.node_created(path);
        Ok(())
    }

    /// Create `<parent>/<prefix><sequence>` and return its full path.
    /// Sequence numbers are zero padded, so children sort in creation order.
    pub fn create_sequential(
        &mut self,
        parent: &str,
        prefix: &str,
        data: &[u8],
        owner: Option<SessionId>,
    ) -> Result<String, StoreError> {
        self.next_sequence += 1;
        let path = format!("{}/{}{:010}", parent, prefix, self.next_sequence);
        self.create(&path, data, owner)?;
        Ok(path)
    }

    /// Create or overwrite a persistent node
    pub fn set(&mut self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        match self.nodes.get_mut(path) {
            Some(node) => {
                node.data = data.to_vec();
                Ok(())
            }
            None => self.create(path, data, None),
        }
    }

    /// Delete a node and everything below it
    pub fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        if !self.exists(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        let mut doomed = vec![path.to_string()];
        doomed.extend(
            self.nodes
                .range(prefix.clone()..)
                .map(|(p, _)| p)
                .take_while(|p| p.starts_with(&prefix))
                .cloned(),
        );
        // Deepest first, so every removal notifies a parent that still exists
        for node in doomed.iter().rev() {
            self.nodes.remove(node);
            self.fire(node, WatchEvent::Deleted(node.clone()));
            if let Some(parent) = parent_of(node) {
                self.fire(parent, WatchEvent::ChildrenChanged(parent.to_string()));
            }
        }
        Ok(())
    }

    pub fn add_watcher(&mut self, path: &str, session: SessionId, tx: oneshot::Sender<WatchEvent>) {
        self.watchers
            .entry(path.to_string())
            .or_default()
            .push(Watcher { session, tx });
    }

    /// End a session: its watches fire `SessionExpired`, then its ephemeral
    /// nodes are removed.
    pub fn expire(&mut self, session: SessionId) {
        let Some(tx) = self.sessions.get(&session) else {
            return;
        };
        if tx.send_replace(true) {
            return;
        }

        for watchers in self.watchers.values_mut() {
            let (expired, kept): (Vec<_>, Vec<_>) =
                watchers.drain(..).partition(|w| w.session == session);
            *watchers = kept;
            for watcher in expired {
                let _ = watcher.tx.send(WatchEvent::SessionExpired);
            }
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.owner == Some(session))
            .map(|(p, _)| p.clone())
            .collect();
        debug!(session, ephemerals = owned.len(), "Session expired");
        for path in owned {
            // Removal of one ephemeral never removes another
            let _ = self.delete(&path);
        }
    }

    pub fn reconfigure(&mut self, servers: &str) -> Result<(), StoreError> {
        if servers.trim().is_empty() {
            return Err(StoreError::ReconfigRejected(
                "empty server list".to_string(),
            ));
        }
        self.servers = Some(servers.to_string());
        self.reconfigurations.push(servers.to_string());
        Ok(())
    }

    pub fn servers(&self) -> Option<&str> {
        self.servers.as_deref()
    }

    pub fn reconfigurations(&self) -> &[String] {
        &self.reconfigurations
    }

    fn node_created(&mut self, path: &str) {
        if let Some(parent) = parent_of(path) {
            self.fire(parent, WatchEvent::ChildrenChanged(parent.to_string()));
        }
    }

    fn fire(&mut self, path: &str, event: WatchEvent) {
        if let Some(watchers) = self.watchers.remove(path) {
            for watcher in watchers {
                // A dropped receiver just means nobody is waiting any more
                let _ = watcher.tx.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_creates_ancestors() {
        let mut tree = Tree::default();
        tree.ensure("/bk/services/nc").unwrap();

        assert!(tree.exists("/bk"));
        assert!(tree.exists("/bk/services"));
        assert_eq!(tree.children("/bk").unwrap(), vec!["services"]);
    }

    #[test]
    fn test_children_are_direct_and_sorted() {
        let mut tree = Tree::default();
        tree.create("/bk/services/nc/b", b"", None).unwrap();
        tree.create("/bk/services/nc/a", b"", None).unwrap();
        tree.create("/bk/services/storage/x", b"", None).unwrap();
        tree.create("/bk/servicesx", b"", None).unwrap();

        assert_eq!(tree.children("/bk/services").unwrap(), vec!["nc", "storage"]);
        assert_eq!(tree.children("/bk/services/nc").unwrap(), vec!["a", "b"]);
        assert!(tree.children("/missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_fires_parent_watch_once() {
        let mut tree = Tree::default();
        let session = tree.open_session();
        tree.ensure("/bk/services").unwrap();
        let (tx, mut rx) = oneshot::channel();
        tree.add_watcher("/bk/services", session, tx);

        tree.create("/bk/services/nc", b"", None).unwrap();
        tree.create("/bk/services/storage", b"", None).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            WatchEvent::ChildrenChanged("/bk/services".to_string())
        );
        assert!(tree.watchers.get("/bk/services").is_none());
    }

    #[test]
    fn test_delete_fires_deleted_and_parent() {
        let mut tree = Tree::default();
        let session = tree.open_session();
        tree.create("/bk/services/nc/a", b"", None).unwrap();
        let (node_tx, mut node_rx) = oneshot::channel();
        let (parent_tx, mut parent_rx) = oneshot::channel();
        tree.add_watcher("/bk/services/nc", session, node_tx);
        tree.add_watcher("/bk/services", session, parent_tx);

        tree.delete("/bk/services/nc").unwrap();

        assert_eq!(
            node_rx.try_recv().unwrap(),
            WatchEvent::Deleted("/bk/services/nc".to_string())
        );
        assert_eq!(
            parent_rx.try_recv().unwrap(),
            WatchEvent::ChildrenChanged("/bk/services".to_string())
        );
        assert!(!tree.exists("/bk/services/nc/a"));
    }

    #[test]
    fn test_expire_removes_ephemerals_and_voids_watches() {
        let mut tree = Tree::default();
        let doomed = tree.open_session();
        let observer = tree.open_session();
        tree.create("/bk/ensemble/a:1", b"nc", Some(doomed)).unwrap();
        tree.create("/bk/ensemble/b:1", b"nc", Some(observer)).unwrap();
        let (own_tx, mut own_rx) = oneshot::channel();
        let (other_tx, mut other_rx) = oneshot::channel();
        tree.add_watcher("/bk/ensemble", doomed, own_tx);
        tree.add_watcher("/bk/ensemble", observer, other_tx);

        tree.expire(doomed);

        assert_eq!(own_rx.try_recv().unwrap(), WatchEvent::SessionExpired);
        assert_eq!(
            other_rx.try_recv().unwrap(),
            WatchEvent::ChildrenChanged("/bk/ensemble".to_string())
        );
        assert_eq!(tree.children("/bk/ensemble").unwrap(), vec!["b:1"]);
        assert_eq!(tree.check_session(doomed), Err(StoreError::SessionExpired));
        assert!(tree.check_session(observer).is_ok());
    }

    #[test]
    fn test_sequential_nodes_sort_in_creation_order() {
        let mut tree = Tree::default();
        let first = tree.create_sequential("/bk/lock", "lock-", b"", None).unwrap();
        let second = tree.create_sequential("/bk/lock", "lock-", b"", None).unwrap();

        let children = tree.children("/bk/lock").unwrap();
        assert_eq!(format!("/bk/lock/{}", children[0]), first);
        assert_eq!(format!("/bk/lock/{}", children[1]), second);
    }

    #[test]
    fn test_ephemeral_cannot_have_children() {
        let mut tree = Tree::default();
        let session = tree.open_session();
        tree.create("/bk/ensemble/a:1", b"", Some(session)).unwrap();

        assert!(tree.create("/bk/ensemble/a:1/x", b"", None).is_err());
    }

    #[test]
    fn test_reconfigure_rejects_empty() {
        let mut tree = Tree::default();
        assert!(matches!(
            tree.reconfigure(" "),
            Err(StoreError::ReconfigRejected(_))
        ));
        tree.reconfigure("a:1,b:1").unwrap();
        assert_eq!(tree.servers(), Some("a:1,b:1"));
    }
}
