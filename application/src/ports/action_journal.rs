//! Port for structured remediation logging.
//!
//! Defines the [`ActionJournal`] trait for recording every remediation
//! action the leader executes, together with its outcome.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures an audit
//! trail in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured journal event.
pub struct JournalEvent {
    /// Event type identifier (e.g., "action_applied", "action_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl JournalEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording journal events.
///
/// `record` is synchronous and non-fallible so that journaling can never
/// abort a remediation pass.
pub trait ActionJournal: Send + Sync {
    fn record(&self, event: JournalEvent);
}

/// No-op implementation for tests and when journaling is disabled.
pub struct NoActionJournal;

impl ActionJournal for NoActionJournal {
    fn record(&self, _event: JournalEvent) {}
}
