// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tripgether native platform bridges.
//
// The share hand-off never talks to the OS directly. It goes through the
// traits in `traits`, implemented here once per platform:
//
// - iOS: NSUserDefaults app-group suite + app-group container directory.
// - Android: a SharedPreferences file named after the namespace; share
//   intents become attachments through `share_intent`.
// - Desktop/CI: a SQLite key-value file per namespace.
// - Tests: `MemoryBridge`, an in-process fake with failure injection.

pub mod memory;
pub mod share_intent;
pub mod sqlite;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod desktop;

pub use memory::{MemoryBridge, MemoryStore};
pub use sqlite::SqliteStore;
pub use share_intent::ShareIntent;
pub use traits::{
    AppLauncher, Attachment, NativeSharedStorage, PlatformBridge, ShareFeedback, SharedStore,
};

/// Retrieves the bridge implementation for the target operating system.
pub fn platform_bridge() -> Box<dyn PlatformBridge> {
    #[cfg(target_os = "ios")]
    {
        Box::new(ios::IosBridge::new())
    }
    #[cfg(target_os = "android")]
    {
        Box::new(android::AndroidBridge::new())
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Box::new(desktop::DesktopBridge::from_env())
    }
}
