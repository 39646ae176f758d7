// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer. Resolves the data directory, loads the hand-off
// configuration and hands out the producer / consumer services built on the
// platform bridge.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tripgether_bridge::{PlatformBridge, platform_bridge};
use tripgether_core::HandoffConfig;
use tripgether_core::error::{HandoffError, Result};
use tripgether_handoff::{Consumer, ShareProducer};

use super::data_dir;
use super::sharing_service::SharingService;

const CONFIG_FILE: &str = "handoff.json";

/// Shared application services. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    bridge: Arc<dyn PlatformBridge>,
    data_dir: PathBuf,
    config: Arc<Mutex<HandoffConfig>>,
}

impl AppServices {
    /// Initialise with the platform bridge and the default data directory.
    pub fn init() -> Self {
        let dir = data_dir::data_dir();
        let bridge: Arc<dyn PlatformBridge> = Arc::from(platform_bridge());
        Self::with_bridge(bridge, dir)
    }

    /// Initialise with an explicit bridge and data directory.
    ///
    /// A missing or invalid `handoff.json` falls back to defaults.
    pub fn with_bridge(bridge: Arc<dyn PlatformBridge>, data_dir: PathBuf) -> Self {
        info!(
            path = %data_dir.display(),
            platform = bridge.platform_name(),
            "initialising app services"
        );

        let config = match load_config(&data_dir) {
            Some(config) => match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    warn!(error = %e, "invalid {CONFIG_FILE}, using defaults");
                    HandoffConfig::default()
                }
            },
            None => HandoffConfig::default(),
        };

        Self {
            bridge,
            data_dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn bridge(&self) -> Arc<dyn PlatformBridge> {
        Arc::clone(&self.bridge)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Result<HandoffConfig> {
        self.config
            .lock()
            .map(|c| c.clone())
            .map_err(|_| HandoffError::Store("config lock poisoned".into()))
    }

    /// Validate, apply and persist a new configuration.
    pub fn save_config(&self, config: &HandoffConfig) -> Result<()> {
        config.validate()?;
        persist_config(&self.data_dir, config)?;
        *self
            .config
            .lock()
            .map_err(|_| HandoffError::Store("config lock poisoned".into()))? = config.clone();
        Ok(())
    }

    /// Producer for the Share Extension entry point.
    pub fn share_producer(&self) -> Result<ShareProducer> {
        Ok(ShareProducer::new(self.bridge(), self.config()?))
    }

    /// Method-channel service for the main app.
    pub fn sharing_service(&self) -> Result<SharingService> {
        let config = self.config()?;
        let consumer = Consumer::open(self.bridge.as_ref(), &config)?;
        Ok(SharingService::new(consumer, &config))
    }
}

fn load_config(data_dir: &Path) -> Option<HandoffConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unparseable config, using defaults");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &HandoffConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripgether_bridge::MemoryBridge;

    const NS: &str = "group.com.tripgether.alom";

    fn services(dir: &Path) -> AppServices {
        AppServices::with_bridge(Arc::new(MemoryBridge::new(NS)), dir.to_path_buf())
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        assert_eq!(svc.config().unwrap(), HandoffConfig::default());
    }

    #[test]
    fn saved_config_is_reloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = HandoffConfig {
            max_queue_batches: 10,
            launch_host_app: true,
            ..Default::default()
        };
        services(dir.path()).save_config(&config).expect("save");

        let reloaded = services(dir.path());
        assert_eq!(reloaded.config().unwrap(), config);
    }

    #[test]
    fn invalid_config_is_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = services(dir.path());
        let bad = HandoffConfig {
            max_queue_batches: 0,
            ..Default::default()
        };
        assert!(svc.save_config(&bad).is_err());
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn garbage_config_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(services(dir.path()).config().unwrap(), HandoffConfig::default());
    }

    #[test]
    fn unavailable_namespace_fails_sharing_service() {
        let dir = tempfile::tempdir().expect("tempdir");
        let svc = AppServices::with_bridge(
            Arc::new(MemoryBridge::unavailable(NS)),
            dir.path().to_path_buf(),
        );
        assert!(svc.sharing_service().is_err());
        assert!(svc.share_producer().is_ok());
    }
}
