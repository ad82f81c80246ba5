//! Watch on a path and each of its direct children.

use super::WATCH_BUFFER;
use super::persistent::{PersistentWatch, WatchNotification};
use crate::ports::coordination::CoordinationStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Persistent watch over a two-level subtree such as `/services/<role>`.
///
/// Adding or removing a role fires through the root watch; a member
/// joining or leaving a role fires through that role's watch. Both land on
/// the same notification stream.
pub struct SubtreeWatch;

impl SubtreeWatch {
    pub fn spawn(
        store: Arc<dyn CoordinationStore>,
        root: impl Into<String>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<WatchNotification> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        tokio::spawn(Self::run(store, root.into(), tx, cancel));
        rx
    }

    async fn run(
        store: Arc<dyn CoordinationStore>,
        root: String,
        tx: mpsc::Sender<WatchNotification>,
        cancel: CancellationToken,
    ) {
        let mut root_rx = PersistentWatch::spawn(Arc::clone(&store), root.clone(), cancel.clone());
        let mut children: HashMap<String, (CancellationToken, JoinHandle<()>)> = HashMap::new();

        while let Some(notification) = root_rx.recv().await {
            let current: BTreeSet<&String> = notification.children.iter().collect();

            children.retain(|name, (token, _)| {
                let keep = current.contains(name);
                if !keep {
                    token.cancel();
                }
                keep
            });

            for name in &current {
                let live = children
                    .get(*name)
                    .is_some_and(|(_, handle)| !handle.is_finished());
                if live {
                    continue;
                }
                let child_path = format!("{}/{}", root, name);
                debug!(path = %child_path, "Watching child");
                let token = cancel.child_token();
                let handle = tokio::spawn(PersistentWatch::run(
                    Arc::clone(&store),
                    child_path,
                    tx.clone(),
                    token.clone(),
                ));
                children.insert((*name).clone(), (token, handle));
            }

            if tx.send(notification).await.is_err() {
                break;
            }
        }

        for (token, _) in children.values() {
            token.cancel();
        }
    }
}
