// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-off configuration shared by both processes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HandoffError, Result};

/// Settings both the Share Extension and the main app must agree on.
///
/// Missing fields in a persisted file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Bundle identifier of the host app. The shared namespace is derived
    /// from it unless `app_group_id` is set.
    pub host_bundle_id: String,
    /// Explicit shared namespace, overriding `group.<host_bundle_id>`.
    pub app_group_id: Option<String>,
    /// Store key holding the batch queue.
    pub queue_key: String,
    /// Deprecated single-slot key, read only by the legacy migration.
    pub legacy_key: String,
    /// File name of the debug log inside the shared container.
    pub debug_log_file: String,
    /// Maximum number of batches kept; older batches are evicted first.
    pub max_queue_batches: usize,
    /// Maximum number of lines kept in the debug log.
    pub debug_log_capacity: usize,
    /// Prefixes that make an extracted string count as a URL.
    pub url_prefixes: Vec<String>,
    /// Keep non-URL text in the batch instead of discarding it.
    pub retain_plain_text: bool,
    /// Upper bound on attachment extraction, in milliseconds.
    pub extraction_timeout_ms: u64,
    /// Include (masked) shared content in diagnostic logs.
    pub debug_logging_enabled: bool,
    /// Ask the OS to foreground the host app after a successful share.
    pub launch_host_app: bool,
    /// Custom URL scheme registered by the host app.
    pub launch_scheme: String,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            host_bundle_id: "com.tripgether.alom".into(),
            app_group_id: None,
            queue_key: "ShareQueue".into(),
            legacy_key: "ShareKey".into(),
            debug_log_file: "share_extension_log.txt".into(),
            max_queue_batches: 100,
            debug_log_capacity: 5,
            url_prefixes: vec!["http://".into(), "https://".into()],
            retain_plain_text: false,
            extraction_timeout_ms: 5_000,
            debug_logging_enabled: cfg!(debug_assertions),
            launch_host_app: false,
            launch_scheme: "ShareMedia".into(),
        }
    }
}

impl HandoffConfig {
    /// The cross-process namespace both processes open.
    pub fn app_group_identifier(&self) -> String {
        match &self.app_group_id {
            Some(id) => id.clone(),
            None => format!("group.{}", self.host_bundle_id),
        }
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    /// URL the producer opens to bring the host app to the foreground.
    /// Carries no payload; the data travels through the shared store.
    pub fn launch_url(&self) -> String {
        format!("{}://dataUrl={}#text", self.launch_scheme, self.queue_key)
    }

    /// Whether `item` passes the URL filter.
    pub fn is_url(&self, item: &str) -> bool {
        self.url_prefixes.iter().any(|p| item.starts_with(p.as_str()))
    }

    /// Reject settings that would break the queue invariants.
    pub fn validate(&self) -> Result<()> {
        if self.host_bundle_id.trim().is_empty() && self.app_group_id.is_none() {
            return Err(HandoffError::NamespaceUnavailable(
                "no host bundle identifier or app group configured".into(),
            ));
        }
        if self.max_queue_batches == 0 {
            return Err(HandoffError::Store("max_queue_batches must be at least 1".into()));
        }
        if self.debug_log_capacity == 0 {
            return Err(HandoffError::Store("debug_log_capacity must be at least 1".into()));
        }
        if self.queue_key == self.legacy_key {
            return Err(HandoffError::Store("queue and legacy keys must differ".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_derives_from_bundle() {
        let config = HandoffConfig::default();
        assert_eq!(config.app_group_identifier(), "group.com.tripgether.alom");

        let config = HandoffConfig {
            app_group_id: Some("group.custom".into()),
            ..Default::default()
        };
        assert_eq!(config.app_group_identifier(), "group.custom");
    }

    #[test]
    fn url_filter_uses_prefixes() {
        let config = HandoffConfig::default();
        assert!(config.is_url("https://a.example/x"));
        assert!(config.is_url("http://b.example"));
        assert!(!config.is_url("look at this!"));
        assert!(!config.is_url("ftp://c.example"));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: HandoffConfig =
            serde_json::from_str(r#"{ "max_queue_batches": 7 }"#).expect("parse");
        assert_eq!(config.max_queue_batches, 7);
        assert_eq!(config.queue_key, "ShareQueue");
        assert_eq!(config.debug_log_capacity, 5);
    }

    #[test]
    fn launch_url_has_no_payload() {
        let config = HandoffConfig::default();
        assert_eq!(config.launch_url(), "ShareMedia://dataUrl=ShareQueue#text");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = HandoffConfig {
            max_queue_batches: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(HandoffConfig::default().validate().is_ok());
    }
}
