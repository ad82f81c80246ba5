//! Logging infrastructure: the remediation audit trail.
//!
//! Provides [`JsonlActionJournal`], an append-only JSONL writer that
//! implements the [`ActionJournal`](blacknight_application::ActionJournal) port.

mod jsonl_journal;

pub use jsonl_journal::JsonlActionJournal;
