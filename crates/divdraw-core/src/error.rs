// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Divide & Draw.

use thiserror::Error;

/// Top-level error type for all Divide & Draw operations.
#[derive(Debug, Error)]
pub enum DivDrawError {
    // -- Image errors --
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("failed to encode image to PNG: {0}")]
    Encode(String),

    // -- Request errors --
    #[error("{0}")]
    MissingInput(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    // -- Generative backend --
    #[error("remote service error: {0}")]
    RemoteService(String),

    // -- Startup / lifecycle --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DivDrawError {
    /// Whether the failure was caused by the caller's request rather than by
    /// processing. Client errors map to HTTP 400, everything else to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DivDrawError::MissingInput(_) | DivDrawError::MalformedInput(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DivDrawError>;
