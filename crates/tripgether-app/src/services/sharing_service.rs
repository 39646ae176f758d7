// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `sharing_service` method channel.
//
// The UI layer calls these methods by name when the app comes to the
// foreground. Older UI builds still call `getSharedData` / `clearSharedData`,
// which map onto the queue operations.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use tripgether_core::HandoffConfig;
use tripgether_core::error::{HandoffError, Result};
use tripgether_handoff::Consumer;

/// Channel name shared with the UI layer.
pub const CHANNEL: &str = "sharing_service";

/// Result of a method-channel call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MethodResult {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResult {
    fn from_result<T: Into<Value>>(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value.into()),
            Err(e) => {
                warn!(error = %e, "sharing_service call failed");
                Self::Error {
                    code: format!("{:?}", e.class()),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Main-app facade over the share [`Consumer`].
pub struct SharingService {
    consumer: Mutex<Consumer>,
    launch_scheme: String,
}

impl SharingService {
    pub fn new(consumer: Consumer, config: &HandoffConfig) -> Self {
        Self {
            consumer: Mutex::new(consumer),
            launch_scheme: config.launch_scheme.clone(),
        }
    }

    fn consumer(&self) -> Result<MutexGuard<'_, Consumer>> {
        self.consumer
            .lock()
            .map_err(|_| HandoffError::Store("consumer lock poisoned".into()))
    }

    /// Drain every pending shared item, oldest first.
    pub fn get_pending_items(&self) -> Result<Vec<String>> {
        let items = self.consumer()?.drain()?;
        info!(items = items.len(), "pending shared items delivered");
        Ok(items)
    }

    /// Drop pending items without delivering them.
    pub fn clear_pending_items(&self) -> Result<bool> {
        self.consumer()?.clear()
    }

    pub fn get_debug_log(&self) -> Result<String> {
        self.consumer()?.debug_log()
    }

    pub fn clear_debug_log(&self) -> Result<bool> {
        self.consumer()?.clear_debug_log()
    }

    /// Dispatch a call on the [`CHANNEL`] by method name.
    pub fn handle_method_call(&self, method: &str) -> MethodResult {
        debug!(method, "sharing_service call");
        match method {
            "getPendingItems" => MethodResult::from_result(self.get_pending_items()),
            "clearPendingItems" => MethodResult::from_result(self.clear_pending_items()),
            "getDebugLog" => MethodResult::from_result(self.get_debug_log()),
            "clearDebugLog" => MethodResult::from_result(self.clear_debug_log()),
            // Older UI builds expect `{"texts": [...]}` or null.
            "getSharedData" => MethodResult::from_result(self.get_pending_items().map(|items| {
                if items.is_empty() {
                    Value::Null
                } else {
                    json!({ "texts": items })
                }
            })),
            "clearSharedData" => MethodResult::from_result(self.clear_pending_items()),
            other => {
                warn!(method = other, "unknown sharing_service method");
                MethodResult::NotImplemented
            }
        }
    }

    /// Handle a URL the OS delivered to the main app.
    ///
    /// Returns `true` for the Share Extension's launch URL. The URL carries
    /// no payload; the UI drains the queue on its next foreground check.
    pub fn handle_open_url(&self, url: &str) -> bool {
        let Some((scheme, _)) = url.split_once("://") else {
            return false;
        };
        let ours = scheme.eq_ignore_ascii_case(&self.launch_scheme);
        if ours {
            info!(url, "opened from Share Extension");
        }
        ours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripgether_bridge::{MemoryBridge, SharedStore};

    const NS: &str = "group.com.tripgether.alom";

    fn service(bridge: &MemoryBridge) -> SharingService {
        let config = HandoffConfig::default();
        let consumer = Consumer::open(bridge, &config).expect("open");
        SharingService::new(consumer, &config)
    }

    #[test]
    fn get_pending_items_drains() {
        let bridge = MemoryBridge::new(NS);
        bridge
            .store()
            .set("ShareQueue", json!([["https://a.example"], ["https://b.example"]]))
            .unwrap();
        let svc = service(&bridge);

        assert_eq!(
            svc.handle_method_call("getPendingItems"),
            MethodResult::Success(json!(["https://a.example", "https://b.example"]))
        );
        assert_eq!(
            svc.handle_method_call("getPendingItems"),
            MethodResult::Success(json!([]))
        );
    }

    #[test]
    fn legacy_get_shared_data_shape() {
        let bridge = MemoryBridge::new(NS);
        bridge.store().set("ShareKey", json!(["t1"])).unwrap();
        let svc = service(&bridge);

        assert_eq!(
            svc.handle_method_call("getSharedData"),
            MethodResult::Success(json!({ "texts": ["t1"] }))
        );
        assert_eq!(
            svc.handle_method_call("getSharedData"),
            MethodResult::Success(Value::Null)
        );
    }

    #[test]
    fn clear_methods_report_success() {
        let bridge = MemoryBridge::new(NS);
        bridge.store().set("ShareQueue", json!([["u1"]])).unwrap();
        let svc = service(&bridge);

        assert_eq!(
            svc.handle_method_call("clearSharedData"),
            MethodResult::Success(json!(true))
        );
        assert!(!bridge.store().contains_key("ShareQueue"));
        assert_eq!(
            svc.handle_method_call("clearPendingItems"),
            MethodResult::Success(json!(true))
        );
    }

    #[test]
    fn debug_log_methods() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bridge = MemoryBridge::new(NS).with_container(dir.path());
        let svc = service(&bridge);

        assert_eq!(svc.handle_method_call("getDebugLog"), MethodResult::Success(json!("")));
        assert_eq!(
            svc.handle_method_call("clearDebugLog"),
            MethodResult::Success(json!(true))
        );
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let bridge = MemoryBridge::new(NS);
        let svc = service(&bridge);
        assert_eq!(svc.handle_method_call("shareImage"), MethodResult::NotImplemented);
    }

    #[test]
    fn store_errors_become_method_errors() {
        let bridge = MemoryBridge::new(NS);
        bridge.store().set("ShareQueue", json!([["u1"]])).unwrap();
        bridge.store().fail_next_sync();
        let svc = service(&bridge);

        match svc.handle_method_call("getPendingItems") {
            MethodResult::Error { code, .. } => assert_eq!(code, "SyncFailure"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn recognises_launch_url() {
        let bridge = MemoryBridge::new(NS);
        let svc = service(&bridge);
        assert!(svc.handle_open_url("ShareMedia://dataUrl=ShareQueue#text"));
        assert!(svc.handle_open_url("sharemedia://dataUrl=ShareQueue#text"));
        assert!(!svc.handle_open_url("https://tripgether.example"));
        assert!(!svc.handle_open_url("not a url"));
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let json = serde_json::to_value(MethodResult::Success(json!(true))).unwrap();
        assert_eq!(json, json!({ "status": "success", "value": true }));
        let json = serde_json::to_value(MethodResult::NotImplemented).unwrap();
        assert_eq!(json, json!({ "status": "not_implemented" }));
    }
}
