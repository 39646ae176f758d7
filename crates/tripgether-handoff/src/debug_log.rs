// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tiny diagnostic log kept in the shared container.
//
// The Share Extension has no console a user can reach, so the last few
// enqueue events are written to a text file both processes can see. The
// main app exposes it through `getDebugLog` for support screens.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, instrument, warn};

use tripgether_core::config::HandoffConfig;
use tripgether_core::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Newline-joined ring of at most `capacity` `[timestamp] message` lines.
#[derive(Debug, Clone)]
pub struct DebugLogRing {
    path: PathBuf,
    capacity: usize,
}

impl DebugLogRing {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    /// The configured log file inside the shared container `dir`.
    pub fn in_container(dir: &Path, config: &HandoffConfig) -> Self {
        Self::new(dir.join(&config.debug_log_file), config.debug_log_capacity)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lines, oldest first. Blank lines are skipped.
    pub fn entries(&self) -> Result<Vec<String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// The whole log as one string, empty when there is no log yet.
    pub fn read(&self) -> Result<String> {
        Ok(self.entries()?.join("\n"))
    }

    /// Append `message` stamped with the current local time.
    pub fn append(&self, message: &str) -> Result<()> {
        self.append_at(message, Local::now())
    }

    #[instrument(skip(self, message, at), fields(path = %self.path.display()))]
    pub fn append_at(&self, message: &str, at: DateTime<Local>) -> Result<()> {
        let single_line = message.replace(['\r', '\n'], " ");
        let line = format!("[{}] {}", at.format(TIMESTAMP_FORMAT), single_line);

        let mut entries = self.entries()?;
        entries.push(line);
        let excess = entries.len().saturating_sub(self.capacity);
        entries.drain(..excess);

        let mut contents = entries.join("\n");
        contents.push('\n');
        self.write_atomically(&contents)?;

        debug!(lines = entries.len(), "debug log updated");
        Ok(())
    }

    /// Delete the log. Returns whether the file is gone afterwards.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(error = %e, "failed to remove debug log");
                return Err(e.into());
            }
        }
        Ok(!self.path.exists())
    }

    /// Write via a sibling temp file and rename so a reader never sees a
    /// half-written log.
    fn write_atomically(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("txt.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ring(dir: &Path) -> DebugLogRing {
        DebugLogRing::in_container(dir, &HandoffConfig::default())
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        assert_eq!(log.read().unwrap(), "");
        assert!(log.entries().unwrap().is_empty());
    }

    #[test]
    fn keeps_only_newest_five() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        for i in 1..=7 {
            log.append(&format!("event {i}")).unwrap();
        }

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 5);
        assert!(entries[0].ends_with("] event 3"));
        assert!(entries[4].ends_with("] event 7"));
    }

    #[test]
    fn line_format_is_bracketed_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        let at = Local
            .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .expect("valid time");

        log.append_at("URL queued: https://a.example", at).unwrap();
        assert_eq!(
            log.read().unwrap(),
            "[2026-03-01 09:30:00] URL queued: https://a.example"
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        std::fs::write(log.path(), "\n[a] one\n\n   \n[b] two\n").unwrap();

        log.append("three").unwrap();
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "[a] one");
    }

    #[test]
    fn multi_line_messages_stay_on_one_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        log.append("first\nsecond").unwrap();
        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ring(dir.path());
        log.append("event").unwrap();
        assert!(log.path().exists());

        assert!(log.clear().unwrap());
        assert!(!log.path().exists());
        assert!(log.clear().unwrap());
    }
}
