// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process bridge used by tests and by headless tooling.
//
// `MemoryStore` behaves like a shared store whose writes are always visible
// immediately; `fail_next_sync` injects the one failure mode the hand-off
// has to tolerate. `MemoryBridge` records every launch request and feedback
// call so tests can assert on them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;
use tripgether_core::error::{HandoffError, Result};
use tripgether_core::human_errors::HumanError;

use crate::traits::*;

/// In-memory [`SharedStore`].
pub struct MemoryStore {
    namespace: String,
    values: Mutex<HashMap<String, Value>>,
    sync_count: AtomicUsize,
    fail_next_sync: AtomicBool,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            values: Mutex::new(HashMap::new()),
            sync_count: AtomicUsize::new(0),
            fail_next_sync: AtomicBool::new(false),
        }
    }

    /// Make the next `sync` report that the write did not commit.
    pub fn fail_next_sync(&self) {
        self.fail_next_sync.store(true, Ordering::SeqCst);
    }

    /// Number of successful `sync` calls so far.
    pub fn sync_count(&self) -> usize {
        self.sync_count.load(Ordering::SeqCst)
    }

    /// Whether `key` currently holds a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values().map(|v| v.contains_key(key)).unwrap_or(false)
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| HandoffError::Store("memory store lock poisoned".into()))
    }
}

impl SharedStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values()?.remove(key);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        if self.fail_next_sync.swap(false, Ordering::SeqCst) {
            return Err(HandoffError::SyncFailed("injected sync failure".into()));
        }
        self.sync_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// [`PlatformBridge`] backed by a [`MemoryStore`].
pub struct MemoryBridge {
    store: Arc<MemoryStore>,
    container: Option<PathBuf>,
    namespace_available: bool,
    launch_accepted: bool,
    launches: Mutex<Vec<String>>,
    saved: Mutex<Vec<usize>>,
    configuration_errors: AtomicUsize,
}

impl MemoryBridge {
    /// A bridge whose only provisioned namespace is `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            store: Arc::new(MemoryStore::new(namespace)),
            container: None,
            namespace_available: true,
            launch_accepted: true,
            launches: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            configuration_errors: AtomicUsize::new(0),
        }
    }

    /// A bridge where no namespace can be opened, as when the app-group
    /// entitlement is missing.
    pub fn unavailable(namespace: impl Into<String>) -> Self {
        Self {
            namespace_available: false,
            ..Self::new(namespace)
        }
    }

    /// Use `dir` as the shared container directory.
    pub fn with_container(mut self, dir: impl Into<PathBuf>) -> Self {
        self.container = Some(dir.into());
        self
    }

    /// Make `AppLauncher::open` report that the OS refused the URL.
    pub fn rejecting_launches(mut self) -> Self {
        self.launch_accepted = false;
        self
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// URLs passed to `AppLauncher::open`, in call order.
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Item counts passed to `ShareFeedback::share_saved`.
    pub fn saved_batches(&self) -> Vec<usize> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of configuration-error alerts shown.
    pub fn configuration_errors(&self) -> usize {
        self.configuration_errors.load(Ordering::SeqCst)
    }

    fn check_namespace(&self, namespace: &str) -> Result<()> {
        if self.namespace_available && namespace == self.store.namespace() {
            Ok(())
        } else {
            Err(HandoffError::NamespaceUnavailable(namespace.to_string()))
        }
    }
}

impl PlatformBridge for MemoryBridge {
    fn platform_name(&self) -> &str {
        "Memory"
    }
}

impl NativeSharedStorage for MemoryBridge {
    fn open_shared_store(&self, namespace: &str) -> Result<Arc<dyn SharedStore>> {
        self.check_namespace(namespace)?;
        Ok(self.store.clone())
    }

    fn shared_container_dir(&self, namespace: &str) -> Result<PathBuf> {
        self.check_namespace(namespace)?;
        self.container
            .clone()
            .ok_or_else(|| HandoffError::NamespaceUnavailable(format!("{namespace} (no container)")))
    }
}

impl AppLauncher for MemoryBridge {
    fn open(&self, url: &str) -> bool {
        if let Ok(mut launches) = self.launches.lock() {
            launches.push(url.to_string());
        }
        debug!(url, accepted = self.launch_accepted, "memory bridge: launch requested");
        self.launch_accepted
    }
}

impl ShareFeedback for MemoryBridge {
    fn share_saved(&self, item_count: usize) {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(item_count);
        }
    }

    fn configuration_error(&self, _error: &HumanError) {
        self.configuration_errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new("group.test");
        assert!(store.get("k").unwrap().is_none());

        store.set("k", json!(["a"])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(["a"])));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(!store.contains_key("k"));
    }

    #[test]
    fn injected_sync_failure_fires_once() {
        let store = MemoryStore::new("group.test");
        store.fail_next_sync();
        assert!(matches!(store.sync(), Err(HandoffError::SyncFailed(_))));
        assert!(store.sync().is_ok());
        assert_eq!(store.sync_count(), 1);
    }

    #[test]
    fn wrong_namespace_is_unavailable() {
        let bridge = MemoryBridge::new("group.test");
        assert!(bridge.open_shared_store("group.test").is_ok());
        assert!(matches!(
            bridge.open_shared_store("group.other"),
            Err(HandoffError::NamespaceUnavailable(_))
        ));

        let bridge = MemoryBridge::unavailable("group.test");
        assert!(bridge.open_shared_store("group.test").is_err());
    }

    #[test]
    fn launches_are_recorded() {
        let bridge = MemoryBridge::new("group.test").rejecting_launches();
        assert!(!bridge.open("ShareMedia://x"));
        assert_eq!(bridge.launches(), vec!["ShareMedia://x".to_string()]);
    }
}
