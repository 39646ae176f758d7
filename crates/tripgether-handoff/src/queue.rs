// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent share queue stored in the shared key-value store.
//
// The whole queue lives under a single key as an array of arrays of strings
// (`[["https://a", "https://b"], ["https://c"]]`), oldest batch first. Every
// mutation rewrites the whole value and syncs before returning, so a process
// killed mid-share leaves either the old queue or the new one.
//
// There is no cross-process lock. The producer and the consumer are never
// expected to run at the same moment; if they do, the last writer wins.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use tripgether_core::config::HandoffConfig;
use tripgether_core::error::Result;
use tripgether_core::types::ShareBatch;
use tripgether_bridge::SharedStore;

/// Parse a stored queue value. `None` when the value is not an array of
/// string arrays. Empty inner arrays are dropped.
fn parse_queue(value: Value) -> Option<Vec<ShareBatch>> {
    serde_json::from_value::<Vec<Vec<String>>>(value)
        .ok()
        .map(|raw| raw.into_iter().filter_map(ShareBatch::new).collect())
}

/// Drop the oldest batches until at most `max` remain.
fn evict_oldest(batches: &mut Vec<ShareBatch>, max: usize) -> usize {
    let excess = batches.len().saturating_sub(max);
    if excess > 0 {
        batches.drain(..excess);
    }
    excess
}

/// Bounded FIFO of [`ShareBatch`]es in a [`SharedStore`].
pub struct ShareQueue {
    store: Arc<dyn SharedStore>,
    queue_key: String,
    legacy_key: String,
    max_batches: usize,
}

impl ShareQueue {
    pub fn new(store: Arc<dyn SharedStore>, config: &HandoffConfig) -> Self {
        Self {
            store,
            queue_key: config.queue_key.clone(),
            legacy_key: config.legacy_key.clone(),
            max_batches: config.max_queue_batches.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn SharedStore> {
        &self.store
    }

    /// Strict read: `None` when the key is absent or holds an unexpected
    /// shape.
    fn read(&self) -> Result<Option<Vec<ShareBatch>>> {
        let Some(value) = self.store.get(&self.queue_key)? else {
            return Ok(None);
        };
        let parsed = parse_queue(value);
        if parsed.is_none() {
            warn!(key = %self.queue_key, "stored queue has an unexpected shape");
        }
        Ok(parsed)
    }

    /// Read for a read-modify-write. A malformed value is replaced by a
    /// fresh queue.
    fn read_for_update(&self) -> Result<Vec<ShareBatch>> {
        Ok(self.read()?.unwrap_or_default())
    }

    fn write(&self, batches: &[ShareBatch]) -> Result<()> {
        let value = serde_json::to_value(batches)?;
        self.store.set(&self.queue_key, value)?;
        self.store.sync()
    }

    /// Append `batch` at the tail, evicting from the head past the bound.
    ///
    /// Returns the queue length after the append. `Err(SyncFailed)` means the
    /// batch may not have reached durable storage.
    #[instrument(skip(self, batch), fields(items = batch.len()))]
    pub fn append(&self, batch: ShareBatch) -> Result<usize> {
        let mut batches = self.read_for_update()?;
        batches.push(batch);

        let evicted = evict_oldest(&mut batches, self.max_batches);
        if evicted > 0 {
            info!(evicted, max = self.max_batches, "queue full, oldest batches evicted");
        }

        self.write(&batches)?;

        let stored = self.load()?.len();
        if stored != batches.len() {
            warn!(expected = batches.len(), stored, "queue length mismatch after write");
        }
        debug!(queue_len = batches.len(), "batch appended");
        Ok(batches.len())
    }

    /// Current batches, oldest first, without mutating anything.
    pub fn load(&self) -> Result<Vec<ShareBatch>> {
        Ok(self.read()?.unwrap_or_default())
    }

    /// Number of batches waiting to be drained.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Read and clear the queue, returning every item flattened in insertion
    /// order.
    ///
    /// An absent or malformed queue yields an empty list and the stored value
    /// is left alone.
    #[instrument(skip(self))]
    pub fn drain(&self) -> Result<Vec<String>> {
        let Some(value) = self.store.get(&self.queue_key)? else {
            return Ok(Vec::new());
        };
        let Some(batches) = parse_queue(value.clone()) else {
            warn!(key = %self.queue_key, "stored queue has an unexpected shape");
            return Ok(Vec::new());
        };

        let cleared = self
            .store
            .remove(&self.queue_key)
            .and_then(|()| self.store.sync());
        if let Err(e) = cleared {
            // Put the batches back so the next drain can deliver them.
            if let Err(restore) = self.store.set(&self.queue_key, value) {
                warn!(error = %restore, "failed to restore queue after aborted drain");
            }
            return Err(e);
        }

        let items: Vec<String> = batches
            .into_iter()
            .flat_map(ShareBatch::into_items)
            .collect();
        info!(items = items.len(), "queue drained");
        Ok(items)
    }

    /// Remove the queue without reading it.
    ///
    /// Returns whether the key is absent afterwards, checked by reading it
    /// back.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<bool> {
        let existed = self.store.get(&self.queue_key)?.is_some();
        self.store.remove(&self.queue_key)?;
        self.store.sync()?;

        let cleared = self.store.get(&self.queue_key)?.is_none();
        if cleared {
            debug!(existed, "queue cleared");
        } else {
            warn!("queue key still present after clear");
        }
        Ok(cleared)
    }

    /// Fold the deprecated single-slot value into the queue.
    ///
    /// A `[String]` under the legacy key becomes one batch appended at the
    /// tail, then the legacy key is removed. An empty legacy array is just
    /// removed. Any other shape is left untouched. Returns whether the legacy
    /// key was consumed.
    #[instrument(skip(self))]
    pub fn migrate_legacy(&self) -> Result<bool> {
        let Some(value) = self.store.get(&self.legacy_key)? else {
            return Ok(false);
        };

        let items = match serde_json::from_value::<Vec<String>>(value) {
            Ok(items) => items,
            Err(_) => {
                warn!(key = %self.legacy_key, "legacy value has an unexpected shape, leaving it");
                return Ok(false);
            }
        };

        match ShareBatch::new(items) {
            Some(batch) => {
                let items = batch.len();
                let mut batches = self.read_for_update()?;
                batches.push(batch);
                evict_oldest(&mut batches, self.max_batches);
                let value = serde_json::to_value(&batches)?;
                self.store.set(&self.queue_key, value)?;
                info!(items, "legacy share data migrated");
            }
            None => debug!("legacy share data was empty"),
        }

        self.store.remove(&self.legacy_key)?;
        self.store.sync()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tripgether_bridge::MemoryStore;
    use tripgether_core::error::HandoffError;

    fn batch(items: &[&str]) -> ShareBatch {
        ShareBatch::new(items.iter().map(|s| s.to_string()).collect()).expect("non-empty")
    }

    fn queue_with(max: usize) -> (Arc<MemoryStore>, ShareQueue) {
        let store = Arc::new(MemoryStore::new("group.test"));
        let config = HandoffConfig {
            max_queue_batches: max,
            ..Default::default()
        };
        let queue = ShareQueue::new(store.clone(), &config);
        (store, queue)
    }

    #[test]
    fn append_then_drain_is_fifo() {
        let (_, queue) = queue_with(100);
        queue.append(batch(&["u1"])).unwrap();
        queue.append(batch(&["u2", "u3"])).unwrap();
        assert_eq!(queue.pending_count().unwrap(), 2);

        assert_eq!(queue.drain().unwrap(), vec!["u1", "u2", "u3"]);
        assert!(queue.drain().unwrap().is_empty());
    }

    #[test]
    fn bound_keeps_only_the_newest() {
        let (_, queue) = queue_with(100);
        for i in 0..105 {
            let len = queue.append(batch(&[&format!("https://x.example/{i}")])).unwrap();
            assert_eq!(len, (i + 1).min(100));
            assert!(queue.pending_count().unwrap() <= 100);
        }

        let batches = queue.load().unwrap();
        assert_eq!(batches.len(), 100);
        assert_eq!(batches[0].items(), ["https://x.example/5"]);
        assert_eq!(batches[99].items(), ["https://x.example/104"]);
    }

    #[test]
    fn append_reports_queue_length() {
        let (_, queue) = queue_with(2);
        assert_eq!(queue.append(batch(&["a"])).unwrap(), 1);
        assert_eq!(queue.append(batch(&["b"])).unwrap(), 2);
        assert_eq!(queue.append(batch(&["c"])).unwrap(), 2);
        assert_eq!(queue.drain().unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn append_persists_as_nested_arrays() {
        let (store, queue) = queue_with(100);
        queue.append(batch(&["u1", "u2"])).unwrap();
        assert_eq!(store.get("ShareQueue").unwrap(), Some(json!([["u1", "u2"]])));
        assert_eq!(store.sync_count(), 1);
    }

    #[test]
    fn malformed_queue_is_replaced_on_append() {
        let (store, queue) = queue_with(100);
        store.set("ShareQueue", json!("garbage")).unwrap();

        queue.append(batch(&["u1"])).unwrap();
        assert_eq!(store.get("ShareQueue").unwrap(), Some(json!([["u1"]])));
    }

    #[test]
    fn malformed_queue_drains_empty_and_is_kept() {
        let (store, queue) = queue_with(100);
        store.set("ShareQueue", json!({"not": "a queue"})).unwrap();

        assert!(queue.drain().unwrap().is_empty());
        assert!(store.contains_key("ShareQueue"));
    }

    #[test]
    fn empty_inner_batches_are_ignored() {
        let (store, queue) = queue_with(100);
        store.set("ShareQueue", json!([[], ["u1"], []])).unwrap();
        assert_eq!(queue.pending_count().unwrap(), 1);
        assert_eq!(queue.drain().unwrap(), vec!["u1"]);
    }

    #[test]
    fn sync_failure_surfaces_from_append() {
        let (store, queue) = queue_with(100);
        store.fail_next_sync();
        assert!(matches!(
            queue.append(batch(&["u1"])),
            Err(HandoffError::SyncFailed(_))
        ));
    }

    #[test]
    fn failed_drain_keeps_the_items() {
        let (store, queue) = queue_with(100);
        queue.append(batch(&["u1"])).unwrap();
        store.fail_next_sync();

        assert!(matches!(queue.drain(), Err(HandoffError::SyncFailed(_))));
        assert_eq!(queue.drain().unwrap(), vec!["u1"]);
    }

    #[test]
    fn clear_verifies_removal() {
        let (store, queue) = queue_with(100);
        queue.append(batch(&["u1"])).unwrap();
        assert!(queue.clear().unwrap());
        assert!(!store.contains_key("ShareQueue"));
        // Clearing an absent queue still reports success.
        assert!(queue.clear().unwrap());
    }

    #[test]
    fn migration_wraps_legacy_array() {
        let (store, queue) = queue_with(100);
        store.set("ShareKey", json!(["t1", "t2"])).unwrap();

        assert!(queue.migrate_legacy().unwrap());
        assert_eq!(store.get("ShareQueue").unwrap(), Some(json!([["t1", "t2"]])));
        assert!(!store.contains_key("ShareKey"));

        assert!(!queue.migrate_legacy().unwrap());
        assert_eq!(queue.pending_count().unwrap(), 1);
    }

    #[test]
    fn migration_appends_after_existing_batches() {
        let (store, queue) = queue_with(100);
        queue.append(batch(&["u1"])).unwrap();
        store.set("ShareKey", json!(["t1"])).unwrap();

        queue.migrate_legacy().unwrap();
        assert_eq!(queue.drain().unwrap(), vec!["u1", "t1"]);
    }

    #[test]
    fn empty_legacy_array_is_removed_without_appending() {
        let (store, queue) = queue_with(100);
        store.set("ShareKey", json!([])).unwrap();

        assert!(queue.migrate_legacy().unwrap());
        assert!(!store.contains_key("ShareKey"));
        assert!(!store.contains_key("ShareQueue"));
    }

    #[test]
    fn foreign_legacy_value_is_left_alone() {
        let (store, queue) = queue_with(100);
        store.set("ShareKey", json!({"files": []})).unwrap();

        assert!(!queue.migrate_legacy().unwrap());
        assert!(store.contains_key("ShareKey"));
    }
}
