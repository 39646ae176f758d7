// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tripgether main application entry point.
//
// Stands in for the UI layer on desktop: each argument is a `sharing_service`
// method name (default `getPendingItems`) and each result is printed as one
// JSON line. An argument containing `://` is treated as a URL opened by the
// OS instead.

use std::process::ExitCode;

use tripgether_app::init_tracing;
use tripgether_app::services::app_services::AppServices;
use tripgether_app::services::sharing_service::{CHANNEL, MethodResult};

fn main() -> ExitCode {
    init_tracing();
    tracing::info!("Tripgether starting");

    let svc = AppServices::init();
    let sharing = match svc.sharing_service() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "shared storage unavailable, sharing disabled");
            return ExitCode::FAILURE;
        }
    };

    let mut calls: Vec<String> = std::env::args().skip(1).collect();
    if calls.is_empty() {
        calls.push("getPendingItems".into());
    }

    let mut failed = false;
    for call in &calls {
        let result = if call.contains("://") {
            MethodResult::Success(sharing.handle_open_url(call).into())
        } else {
            sharing.handle_method_call(call)
        };
        failed |= !matches!(result, MethodResult::Success(_));

        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, channel = CHANNEL, "cannot encode result"),
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
