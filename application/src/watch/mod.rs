//! Watch plumbing on top of the one-shot watch primitive.
//!
//! - [`PersistentWatch`]: re-arms after every event before delivering it
//! - [`SubtreeWatch`]: a path plus each of its children
//! - [`Debouncer`]: collapses bursts into one settled trigger

mod debounce;
mod persistent;
mod subtree;

pub use debounce::{Debouncer, Settled};
pub use persistent::{PersistentWatch, WatchNotification};
pub use subtree::SubtreeWatch;

/// Buffer size of notification channels
pub(crate) const WATCH_BUFFER: usize = 64;
