//! Persistent children watch.

use super::WATCH_BUFFER;
use crate::ports::coordination::{CoordinationStore, WatchEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Children snapshot delivered by a persistent watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNotification {
    pub path: String,
    pub children: Vec<String>,
}

/// Children watch that stays armed.
///
/// The store delivers a single event per registration. This wrapper
/// registers a new watch after every event and only then forwards the
/// fresh children snapshot, so consumers never deal with re-arming. The
/// first snapshot is delivered as soon as the watch is armed.
///
/// The notification stream ends when the token is cancelled, the node is
/// deleted, or the session ends.
pub struct PersistentWatch;

impl PersistentWatch {
    /// Spawn a persistent watch on `path`
    pub fn spawn(
        store: Arc<dyn CoordinationStore>,
        path: impl Into<String>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<WatchNotification> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        tokio::spawn(Self::run(store, path.into(), tx, cancel));
        rx
    }

    /// Drive a persistent watch on `path`, forwarding into `tx`
    pub async fn run(
        store: Arc<dyn CoordinationStore>,
        path: String,
        tx: mpsc::Sender<WatchNotification>,
        cancel: CancellationToken,
    ) {
        loop {
            let armed = tokio::select! {
                _ = cancel.cancelled() => return,
                armed = store.watch_children(&path) => armed,
            };
            let watch = match armed {
                Ok(watch) => watch,
                Err(e) if e.is_not_found() => {
                    debug!(path = %path, "Watched node is gone, watch ended");
                    return;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Could not arm watch");
                    return;
                }
            };

            let notification = WatchNotification {
                path: path.clone(),
                children: watch.children,
            };
            if tx.send(notification).await.is_err() {
                return;
            }

            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                event = watch.event => event,
            };
            match event {
                Ok(WatchEvent::ChildrenChanged(_)) => continue,
                Ok(WatchEvent::Deleted(_)) => {
                    debug!(path = %path, "Watched node deleted, watch ended");
                    return;
                }
                Ok(WatchEvent::SessionExpired) | Err(_) => {
                    warn!(path = %path, "Session ended, watch invalidated");
                    return;
                }
            }
        }
    }
}
