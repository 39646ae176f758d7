// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Main-app side of the hand-off: legacy migration and queue draining.

use tracing::{info, instrument, warn};

use tripgether_bridge::PlatformBridge;
use tripgether_core::config::HandoffConfig;
use tripgether_core::error::Result;

use crate::debug_log::DebugLogRing;
use crate::queue::ShareQueue;

/// Lifecycle of a [`Consumer`].
///
/// `Cold -> MigrationChecked -> Idle <-> Draining`. Nothing is drained
/// before the legacy slot has been folded into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Cold,
    MigrationChecked,
    Idle,
    Draining,
}

/// Reads shared items on behalf of the main application.
pub struct Consumer {
    queue: ShareQueue,
    debug_log: Option<DebugLogRing>,
    state: ConsumerState,
}

impl Consumer {
    pub fn new(queue: ShareQueue, debug_log: Option<DebugLogRing>) -> Self {
        Self {
            queue,
            debug_log,
            state: ConsumerState::Cold,
        }
    }

    /// Open the shared namespace through `bridge`.
    ///
    /// A missing container only disables the debug log; a missing store is
    /// an error.
    #[instrument(skip_all, fields(platform = bridge.platform_name()))]
    pub fn open(bridge: &dyn PlatformBridge, config: &HandoffConfig) -> Result<Self> {
        let namespace = config.app_group_identifier();
        let store = bridge.open_shared_store(&namespace)?;

        let debug_log = match bridge.shared_container_dir(&namespace) {
            Ok(dir) => Some(DebugLogRing::in_container(&dir, config)),
            Err(e) => {
                warn!(error = %e, "shared container unavailable, debug log disabled");
                None
            }
        };

        info!(%namespace, "consumer opened");
        Ok(Self::new(ShareQueue::new(store, config), debug_log))
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn queue(&self) -> &ShareQueue {
        &self.queue
    }

    /// Fold the legacy single-slot value into the queue.
    pub fn migrate_legacy(&mut self) -> Result<bool> {
        let migrated = self.queue.migrate_legacy()?;
        if self.state == ConsumerState::Cold {
            self.state = ConsumerState::MigrationChecked;
        }
        Ok(migrated)
    }

    fn ensure_migrated(&mut self) -> Result<()> {
        if self.state == ConsumerState::Cold {
            self.migrate_legacy()?;
        }
        Ok(())
    }

    /// Take every pending item, oldest first.
    pub fn drain(&mut self) -> Result<Vec<String>> {
        self.ensure_migrated()?;
        self.state = ConsumerState::Draining;
        let result = self.queue.drain();
        self.state = ConsumerState::Idle;
        result
    }

    /// Discard every pending item. Returns whether the queue is gone.
    pub fn clear(&mut self) -> Result<bool> {
        self.ensure_migrated()?;
        self.queue.clear()
    }

    /// Number of batches waiting, without draining.
    pub fn pending_count(&mut self) -> Result<usize> {
        self.ensure_migrated()?;
        self.queue.pending_count()
    }

    /// Contents of the extension's debug log; empty when unavailable.
    pub fn debug_log(&self) -> Result<String> {
        match &self.debug_log {
            Some(ring) => ring.read(),
            None => Ok(String::new()),
        }
    }

    pub fn clear_debug_log(&self) -> Result<bool> {
        match &self.debug_log {
            Some(ring) => ring.clear(),
            None => Ok(false),
        }
    }
}
