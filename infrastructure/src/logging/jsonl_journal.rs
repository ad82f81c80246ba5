//! JSONL file writer for remediation events.
//!
//! Each [`JournalEvent`] becomes one JSON line carrying the payload fields
//! plus `type` and `timestamp`. The file is opened for append, so the
//! journal survives restarts and leadership changes.

use blacknight_application::{ActionJournal, JournalEvent};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only JSONL action journal.
///
/// Thread-safe via `Mutex<BufWriter<File>>`; every record is flushed.
pub struct JsonlActionJournal {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlActionJournal {
    /// Open (or create) the journal at `path`, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened; journaling is optional
    /// and the caller carries on without it.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create journal directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open action journal {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActionJournal for JsonlActionJournal {
    fn record(&self, event: JournalEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = match event.payload {
            serde_json::Value::Object(mut map) => {
                map.insert("type".to_string(), event.event_type.into());
                map.insert("timestamp".to_string(), timestamp.into());
                serde_json::Value::Object(map)
            }
            other => serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": other,
            }),
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Could not serialize journal record");
                return;
            }
        };

        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|()| writer.flush()) {
            warn!(path = %self.path.display(), error = %e, "Could not write journal record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_records_are_jsonl_with_type_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal/actions.jsonl");
        let journal = JsonlActionJournal::open(&path).unwrap();

        journal.record(JournalEvent::new(
            "action_applied",
            serde_json::json!({"action": "start", "role": "nc", "member": "a", "outcome": "applied"}),
        ));
        journal.record(JournalEvent::new(
            "action_failed",
            serde_json::json!({"action": "stop", "role": "nc", "member": "b", "error": "exit 1"}),
        ));
        drop(journal);

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "action_applied");
        assert_eq!(records[0]["member"], "a");
        assert!(records[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(records[1]["type"], "action_failed");
        assert_eq!(records[1]["error"], "exit 1");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");

        for member in ["a", "b"] {
            let journal = JsonlActionJournal::open(&path).unwrap();
            journal.record(JournalEvent::new(
                "action_applied",
                serde_json::json!({"member": member}),
            ));
        }

        let members: Vec<_> = read_lines(&path)
            .iter()
            .map(|r| r["member"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(members, vec!["a", "b"]);
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");
        let journal = JsonlActionJournal::open(&path).unwrap();

        journal.record(JournalEvent::new("note", serde_json::json!("leader elected")));

        let records = read_lines(&path);
        assert_eq!(records[0]["type"], "note");
        assert_eq!(records[0]["data"], "leader elected");
    }

    #[test]
    fn test_unopenable_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        assert!(JsonlActionJournal::open(blocker.join("actions.jsonl")).is_none());
    }
}
