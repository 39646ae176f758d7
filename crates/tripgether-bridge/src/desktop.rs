// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop/CI bridge.
//
// There are no app groups off-device, so a namespace maps to a directory
// under a shared root (`$TRIPGETHER_SHARED_ROOT`, else the XDG data dir).
// The directory holds `shared.db` (the key-value store) and the debug log.
// Launching the host app and user feedback have no desktop counterpart and
// are only logged.

use std::path::PathBuf;
use std::sync::Arc;

use tripgether_core::error::{HandoffError, Result};
use tripgether_core::human_errors::HumanError;

use crate::sqlite::SqliteStore;
use crate::traits::*;

/// Environment variable overriding the shared root directory.
pub const SHARED_ROOT_ENV: &str = "TRIPGETHER_SHARED_ROOT";

/// File name of the key-value database inside a namespace directory.
const STORE_FILE: &str = "shared.db";

/// Bridge for non-mobile builds.
pub struct DesktopBridge {
    root: PathBuf,
}

impl DesktopBridge {
    /// Use `root` as the parent of every namespace directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the shared root from the environment.
    pub fn from_env() -> Self {
        Self::new(shared_root_from_env())
    }

    /// Directory backing `namespace`, created on first use.
    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf> {
        if !is_valid_namespace(namespace) {
            return Err(HandoffError::NamespaceUnavailable(namespace.to_string()));
        }
        let dir = self.root.join(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| {
            tracing::error!(path = %dir.display(), error = %e, "cannot create namespace directory");
            HandoffError::NamespaceUnavailable(format!("{namespace}: {e}"))
        })?;
        Ok(dir)
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        "Desktop"
    }
}

impl NativeSharedStorage for DesktopBridge {
    fn open_shared_store(&self, namespace: &str) -> Result<Arc<dyn SharedStore>> {
        let dir = self.namespace_dir(namespace)?;
        let store = SqliteStore::open(dir.join(STORE_FILE), namespace)?;
        Ok(Arc::new(store))
    }

    fn shared_container_dir(&self, namespace: &str) -> Result<PathBuf> {
        self.namespace_dir(namespace)
    }
}

impl AppLauncher for DesktopBridge {
    fn open(&self, url: &str) -> bool {
        tracing::warn!(url, "AppLauncher::open has no desktop handler");
        false
    }
}

impl ShareFeedback for DesktopBridge {
    fn share_saved(&self, item_count: usize) {
        tracing::info!(item_count, "share saved");
    }

    fn configuration_error(&self, error: &HumanError) {
        tracing::error!(message = %error.message, suggestion = %error.suggestion, "configuration error");
    }
}

/// App-group identifiers are `group.` followed by a reverse-DNS name.
fn is_valid_namespace(namespace: &str) -> bool {
    match namespace.strip_prefix("group.") {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
                && !rest.contains("..")
        }
        None => false,
    }
}

fn shared_root_from_env() -> PathBuf {
    if let Ok(root) = std::env::var(SHARED_ROOT_ENV) {
        return PathBuf::from(root);
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("tripgether").join("groups");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("tripgether")
            .join("groups");
    }
    std::env::temp_dir().join("tripgether").join("groups")
}
