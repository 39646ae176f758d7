// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Share actions must never visibly fail, so only configuration errors are
// ever shown to the user. Everything else maps to a silent message that the
// presentation layer logs but does not display.

use crate::error::HandoffError;
use crate::types::ErrorClass;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged only. The user never sees it.
    Silent,
    /// Shown once per process: the install is misconfigured.
    ConfigurationError,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as the alert title).
    pub message: String,
    /// What to check (shown as the alert body).
    pub suggestion: String,
    /// Drives whether the presentation layer shows anything at all.
    pub severity: Severity,
}

impl HumanError {
    fn silent(message: &str) -> Self {
        Self {
            message: message.into(),
            suggestion: String::new(),
            severity: Severity::Silent,
        }
    }
}

/// Convert a `HandoffError` into a `HumanError`.
pub fn humanize_error(err: &HandoffError) -> HumanError {
    match err {
        HandoffError::NamespaceUnavailable(namespace) => HumanError {
            message: "Sharing isn't set up for this app.".into(),
            suggestion: format!(
                "The app group {namespace} is not available. Enable the same App Group \
                 for the app and its Share Extension under Signing & Capabilities."
            ),
            severity: Severity::ConfigurationError,
        },
        HandoffError::PlatformUnavailable => HumanError {
            message: "Sharing isn't available on this device.".into(),
            suggestion: "This build has no shared storage for the Share Extension.".into(),
            severity: Severity::ConfigurationError,
        },
        other => match other.class() {
            ErrorClass::Extraction => HumanError::silent("An attachment could not be read."),
            ErrorClass::SyncFailure => HumanError::silent("The shared item was not saved."),
            _ => HumanError::silent("Shared storage reported a problem."),
        },
    }
}
