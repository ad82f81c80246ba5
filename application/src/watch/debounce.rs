//! Settle-window debouncing.

use std::time::Duration;
use tokio::sync::mpsc;

/// Result of a settled burst
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<T> {
    /// Last value received in the burst
    pub latest: T,
    /// Number of values collapsed into this trigger
    pub coalesced: usize,
}

/// Collapses bursts of notifications into single triggers.
///
/// Every received value restarts the settle timer; a trigger fires only
/// once a full window passes with no new value. Ephemeral nodes of a failed
/// group disappear one by one, so firing on the first event would act on a
/// still-draining list.
pub struct Debouncer<T> {
    rx: mpsc::Receiver<T>,
    window: Duration,
}

impl<T> Debouncer<T> {
    pub fn new(rx: mpsc::Receiver<T>, window: Duration) -> Self {
        Self { rx, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for the next settled burst.
    ///
    /// Returns `None` once the source closes; a burst still settling at that
    /// point is discarded, since its source is gone.
    pub async fn next_settled(&mut self) -> Option<Settled<T>> {
        let mut latest = self.rx.recv().await?;
        let mut coalesced = 1;

        loop {
            let timer = tokio::time::sleep(self.window);
            tokio::select! {
                biased;
                next = self.rx.recv() => match next {
                    Some(value) => {
                        latest = value;
                        coalesced += 1;
                    }
                    None => return None,
                },
                () = timer => return Some(Settled { latest, coalesced }),
            }
        }
    }
}
