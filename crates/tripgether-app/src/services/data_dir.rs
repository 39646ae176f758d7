// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Overrides the data directory (used by CI and integration scripts).
pub const DATA_DIR_ENV: &str = "TRIPGETHER_DATA_DIR";

/// Return the application data directory, creating it if needed.
///
/// This holds app-private files such as `handoff.json`. Data shared with the
/// Share Extension lives in the app-group container instead.
pub fn data_dir() -> PathBuf {
    let dir = match std::env::var(DATA_DIR_ENV) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs_fallback().join("tripgether"),
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "cannot create data directory");
    }
    dir
}

fn dirs_fallback() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
