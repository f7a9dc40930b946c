// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolview.
//
// The job store and its views never surface these to observers.  Missing
// jobs and bad row indices are represented as absence instead.  Errors only
// cross the configuration, event-decoding and service-channel boundaries.

use thiserror::Error;

/// Top-level error type for all Spoolview operations.
#[derive(Debug, Error)]
pub enum SpoolviewError {
    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Inbound backend events --
    #[error("invalid backend event: {0}")]
    InvalidEvent(String),

    // -- Service plumbing --
    #[error("job service is no longer running")]
    ServiceClosed,

    // -- Storage / decoding --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpoolviewError>;
