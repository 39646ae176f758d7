// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Share Extension side of the hand-off.
//
// One call to `ShareProducer::handle` per share action: extract the
// attachments, keep the queueable items, append them as one batch, then tell
// the OS the request is finished. The OS keeps the extension alive until
// that last step, so every path ends in exactly one `ShareCompletion`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use tripgether_bridge::PlatformBridge;
use tripgether_core::config::HandoffConfig;
use tripgether_core::error::HandoffError;
use tripgether_core::human_errors::humanize_error;
use tripgether_core::types::{ErrorClass, ShareBatch, ShareInvocationId, ShareOutcome};

use crate::debug_log::DebugLogRing;
use crate::extract::{Attachment, extract_all, filter_batch, mask};
use crate::queue::ShareQueue;

type CompletionHandler = Box<dyn FnOnce(ShareOutcome) + Send>;

/// Slack past the per-attachment deadline before the whole join is abandoned.
const EXTRACTION_GRACE: Duration = Duration::from_millis(250);

/// The OS completion callback for one share request.
///
/// `complete` consumes the value, so a request cannot be completed twice.
/// Dropping it un-completed reports [`ShareOutcome::Abandoned`].
pub struct ShareCompletion {
    invocation: ShareInvocationId,
    handler: Option<CompletionHandler>,
}

impl ShareCompletion {
    pub fn new(handler: impl FnOnce(ShareOutcome) + Send + 'static) -> Self {
        Self {
            invocation: ShareInvocationId::new(),
            handler: Some(Box::new(handler)),
        }
    }

    /// A completion whose outcome is delivered on a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<ShareOutcome>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move |outcome| {
            // The receiver may have gone away; the outcome is already logged.
            let _ = tx.send(outcome);
        });
        (completion, rx)
    }

    pub fn invocation(&self) -> ShareInvocationId {
        self.invocation
    }

    pub fn complete(mut self, outcome: ShareOutcome) {
        if let Some(handler) = self.handler.take() {
            debug!(invocation = %self.invocation, ?outcome, "share request completed");
            handler(outcome);
        }
    }
}

impl Drop for ShareCompletion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            error!(invocation = %self.invocation, "share request dropped without completion");
            handler(ShareOutcome::Abandoned);
        }
    }
}

/// Extracts share requests into the shared queue.
pub struct ShareProducer {
    bridge: Arc<dyn PlatformBridge>,
    config: HandoffConfig,
    configuration_error_shown: AtomicBool,
}

impl ShareProducer {
    pub fn new(bridge: Arc<dyn PlatformBridge>, config: HandoffConfig) -> Self {
        Self {
            bridge,
            config,
            configuration_error_shown: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Process one share request and complete it.
    #[instrument(skip_all, fields(invocation = %completion.invocation(), attachments = attachments.len()))]
    pub async fn handle(
        &self,
        attachments: Vec<Box<dyn Attachment>>,
        completion: ShareCompletion,
    ) -> ShareOutcome {
        let outcome = self.process(&attachments).await;
        completion.complete(outcome.clone());
        outcome
    }

    async fn process(&self, attachments: &[Box<dyn Attachment>]) -> ShareOutcome {
        let timeout = self.config.extraction_timeout();
        let started = Instant::now();
        let extracted =
            match tokio::time::timeout(timeout + EXTRACTION_GRACE, extract_all(attachments, timeout))
                .await
            {
                // Nothing loaded and the deadline passed: at least one
                // attachment was still pending when it expired.
                Ok(items) if items.is_empty() && started.elapsed() >= timeout => {
                    return self.timed_out();
                }
                Ok(items) => items,
                Err(_) => return self.timed_out(),
            };

        let extracted_count = extracted.len();
        let items = filter_batch(extracted, &self.config);
        debug!(extracted = extracted_count, kept = items.len(), "attachments filtered");

        let Some(batch) = ShareBatch::new(items) else {
            info!("nothing queueable in share request");
            return ShareOutcome::Empty;
        };

        let namespace = self.config.app_group_identifier();
        let store = match self.bridge.open_shared_store(&namespace) {
            Ok(store) => store,
            Err(e) => {
                self.report_configuration_error(&e);
                return ShareOutcome::ConfigurationError;
            }
        };

        self.log_secure("queueing share", &batch.items().join(", "));
        let item_count = batch.len();
        let log_line = self.debug_log_line(&batch);

        let queue = ShareQueue::new(store, &self.config);
        let queue_len = match queue.append(batch) {
            Ok(len) => len,
            Err(e) => {
                if e.class() == ErrorClass::SyncFailure {
                    error!(error = %e, "shared store did not commit the batch");
                } else {
                    error!(error = %e, class = ?e.class(), "failed to append batch");
                }
                return ShareOutcome::SyncFailed;
            }
        };
        info!(items = item_count, queue_len, "share queued");

        self.write_debug_log(&namespace, &log_line);
        self.bridge.share_saved(item_count);

        if self.config.launch_host_app {
            let url = self.config.launch_url();
            let accepted = self.bridge.open(&url);
            debug!(%url, accepted, "host app launch requested");
        }

        ShareOutcome::Queued {
            items: item_count,
            queue_len,
        }
    }

    fn timed_out(&self) -> ShareOutcome {
        let err = HandoffError::ExtractionTimedOut(self.config.extraction_timeout_ms);
        warn!(error = %err, "giving up on share request");
        ShareOutcome::TimedOut
    }

    /// Show the configuration alert at most once for this producer.
    fn report_configuration_error(&self, err: &HandoffError) {
        error!(error = %err, "shared namespace unavailable");
        if self.configuration_error_shown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bridge.configuration_error(&humanize_error(err));
    }

    fn log_secure(&self, message: &str, data: &str) {
        if self.config.debug_logging_enabled {
            debug!(data = %mask(data), "{message}");
        } else {
            debug!("{message}");
        }
    }

    fn debug_log_line(&self, batch: &ShareBatch) -> String {
        let urls: Vec<&str> = batch
            .items()
            .iter()
            .map(String::as_str)
            .filter(|item| self.config.is_url(item))
            .collect();
        format!("URL queued: {}", urls.join(" | "))
    }

    fn write_debug_log(&self, namespace: &str, line: &str) {
        let dir = match self.bridge.shared_container_dir(namespace) {
            Ok(dir) => dir,
            Err(e) => {
                self.report_configuration_error(&e);
                return;
            }
        };
        let ring = DebugLogRing::in_container(&dir, &self.config);
        if let Err(e) = ring.append(line) {
            warn!(error = %e, "failed to write debug log");
        }
    }
}
