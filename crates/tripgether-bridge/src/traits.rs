// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the capabilities the hand-off
// needs from the OS.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tripgether_core::error::Result;
use tripgether_core::human_errors::HumanError;
use tripgether_core::types::ContentKind;

/// Unified bridge that groups every native capability the share hand-off
/// uses.
pub trait PlatformBridge: NativeSharedStorage + AppLauncher + ShareFeedback + Send + Sync {
    /// Human-readable platform name (e.g. "iOS", "Android").
    fn platform_name(&self) -> &str;
}

/// Key-value storage visible to both the Share Extension and the host app.
///
/// There is no locking. Each key is a single register mutated by whole-value
/// read-modify-write; callers `sync` after every mutation before acting on
/// the result.
pub trait SharedStore: Send + Sync {
    /// Namespace (app group) this store was opened for.
    fn namespace(&self) -> &str;

    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete `key`. Succeeds when the key is already absent.
    fn remove(&self, key: &str) -> Result<()>;

    /// Force pending writes to durable storage.
    ///
    /// Returns `HandoffError::SyncFailed` if the platform reports that the
    /// write did not commit.
    fn sync(&self) -> Result<()>;
}

/// Resolution of the shared namespace into concrete storage.
pub trait NativeSharedStorage {
    /// Open the key-value store for `namespace`.
    ///
    /// Fails with `HandoffError::NamespaceUnavailable` when the namespace is
    /// not provisioned for this process (e.g. missing app-group entitlement).
    fn open_shared_store(&self, namespace: &str) -> Result<Arc<dyn SharedStore>>;

    /// Directory shared by both processes, used for the debug log.
    fn shared_container_dir(&self, namespace: &str) -> Result<PathBuf>;
}

/// Ask the OS to bring the host app to the foreground.
pub trait AppLauncher {
    /// Open `url` (a custom-scheme URL registered by the host app).
    /// Returns whether the OS accepted the request. Called at most once per
    /// share.
    fn open(&self, url: &str) -> bool;
}

/// Transient user feedback from the Share Extension, which has no durable
/// UI after it exits.
pub trait ShareFeedback {
    /// A batch of `item_count` items reached the queue.
    fn share_saved(&self, item_count: usize);

    /// The install is misconfigured. The producer calls this at most once per
    /// process lifetime.
    fn configuration_error(&self, error: &HumanError);
}

/// One attachment of an inbound share request, as handed over by the OS
/// (an `NSItemProvider` on iOS, an intent extra on Android).
#[async_trait]
pub trait Attachment: Send + Sync {
    /// Content kinds this attachment can provide.
    fn kinds(&self) -> Vec<ContentKind>;

    /// Materialise the attachment as `kind`.
    async fn load(&self, kind: ContentKind) -> Result<String>;
}
