// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tripgether Share Extension entry point.
//
// Each command-line argument is one shared attachment (a URL or a piece of
// text). The process exits 0 when the share was queued or had nothing to
// queue, and 1 otherwise.

use std::process::ExitCode;

use tripgether_app::init_tracing;
use tripgether_app::services::app_services::AppServices;
use tripgether_core::types::ShareOutcome;
use tripgether_handoff::{Attachment, ShareCompletion, StaticAttachment};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let svc = AppServices::init();
    let producer = match svc.share_producer() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "cannot start share producer");
            return ExitCode::FAILURE;
        }
    };

    let attachments: Vec<Box<dyn Attachment>> = std::env::args()
        .skip(1)
        .map(|arg| {
            Box::new(StaticAttachment::from_text(&arg, producer.config())) as Box<dyn Attachment>
        })
        .collect();

    let (completion, completed) = ShareCompletion::channel();
    let invocation = completion.invocation();
    producer.handle(attachments, completion).await;

    let outcome = completed.await.unwrap_or(ShareOutcome::Abandoned);
    tracing::info!(%invocation, ?outcome, "share extension finished");

    match outcome {
        ShareOutcome::Queued { .. } | ShareOutcome::Empty => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
