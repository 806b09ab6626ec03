//! Append-only activity trail.
//!
//! Every mutation handler emits one timestamped, human-readable line.
//! Writes are serialized behind a mutex; a failed write is logged and
//! otherwise ignored, it never takes a session down.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;

pub struct ActivityLog {
    file: Mutex<File>,
}

impl ActivityLog {
    /// Open (or create) the log file for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one `[YYYY-MM-DD HH:MM:SS] event` line.
    pub fn record(&self, event: &str) {
        let line = format!("[{}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), event);
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(error = %e, "activity log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_appended_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.log");

        let log = ActivityLog::open(&path).unwrap();
        log.record("alice connected");
        log.record("alice disconnected");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("alice connected"));
        assert!(lines[1].ends_with("alice disconnected"));
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.log");

        ActivityLog::open(&path).unwrap().record("first");
        ActivityLog::open(&path).unwrap().record("second");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
