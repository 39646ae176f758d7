// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tripgether core: types and error definitions shared by the Share Extension
// (producer) and the main application (consumer).

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::HandoffConfig;
pub use error::HandoffError;
pub use types::*;
