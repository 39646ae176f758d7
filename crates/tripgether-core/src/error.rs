// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the share hand-off.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all hand-off operations.
#[derive(Debug, Error)]
pub enum HandoffError {
    // -- Configuration --
    #[error("shared namespace unavailable: {0}")]
    NamespaceUnavailable(String),

    // -- Extraction --
    #[error("attachment could not be loaded: {0}")]
    Extraction(String),

    #[error("attachment delivered {actual}, expected {expected}")]
    UnexpectedItemType { expected: String, actual: String },

    #[error("share extraction exceeded {0} ms")]
    ExtractionTimedOut(u64),

    // -- Storage / persistence --
    #[error("shared store write did not commit: {0}")]
    SyncFailed(String),

    #[error("shared store error: {0}")]
    Store(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl HandoffError {
    /// Which branch of the error taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NamespaceUnavailable(_) | Self::PlatformUnavailable => ErrorClass::Configuration,
            Self::Extraction(_) | Self::UnexpectedItemType { .. } | Self::ExtractionTimedOut(_) => {
                ErrorClass::Extraction
            }
            Self::SyncFailed(_) => ErrorClass::SyncFailure,
            Self::Store(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Bridge(_) => ErrorClass::Storage,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HandoffError>;
