// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared store backed by a SQLite key-value table.
//
// Used on desktop and CI where there is no app-group container: both the
// `tripgether-share` producer and the `tripgether` consumer open the same
// file, and SQLite's file locking serialises their read-modify-writes.
//
// Schema:
//   kv(
//     key   TEXT PRIMARY KEY,
//     value TEXT NOT NULL      -- JSON
//   )

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use tripgether_core::error::{HandoffError, Result};

use crate::traits::SharedStore;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS kv (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
"#;

/// How long a writer waits for the other process to release the file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Convert a `rusqlite::Error` into a `HandoffError::Database`.
fn db_err(e: rusqlite::Error) -> HandoffError {
    HandoffError::Database(e.to_string())
}

/// [`SharedStore`] persisted in a SQLite database.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so it sits behind a
/// mutex. Every operation is a single short statement.
pub struct SqliteStore {
    namespace: String,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` for `namespace`.
    ///
    /// Enables WAL so the consumer can read while the producer writes.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), namespace = %namespace))]
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(db_err)?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!(mode, "WAL journal mode unavailable");
        }
        // Every commit is fsynced, so a committed write is durable even
        // before it is checkpointed.
        conn.pragma_update(None, "synchronous", "FULL").map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        info!("shared store opened");
        Ok(Self {
            namespace: namespace.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory(namespace: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory shared store opened");
        Ok(Self {
            namespace: namespace.to_string(),
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HandoffError::Store("sqlite connection lock poisoned".into()))
    }
}

impl SharedStore for SqliteStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    #[instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value))]
    fn set(&self, key: &str, value: Value) -> Result<()> {
        let text = serde_json::to_string(&value)?;
        self.conn()?
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, text],
            )
            .map_err(db_err)?;

        debug!("value written");
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(db_err)?;
        Ok(())
    }

    /// Confirm the last write committed, then fold the WAL into the main
    /// database file when no other connection is in the way.
    ///
    /// Statements run in autocommit mode, so a write that returned `Ok` is
    /// already durable. A checkpoint blocked by a reader is left for later.
    fn sync(&self) -> Result<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            return Err(HandoffError::SyncFailed("transaction still open".into()));
        }

        let busy: i64 = conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |row| row.get(0))
            .map_err(|e| HandoffError::SyncFailed(e.to_string()))?;
        if busy != 0 {
            debug!("WAL checkpoint deferred, another connection is reading");
        }
        Ok(())
    }
}
