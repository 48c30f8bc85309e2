// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Retouch.

use thiserror::Error;

/// Top-level error type for all Retouch operations.
///
/// Filter and transform errors abort only the operation in flight; the edit
/// history is never modified by a failed operation.
#[derive(Debug, Error)]
pub enum RetouchError {
    // -- Pixel buffer adapter --
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not encode image: {0}")]
    Encode(String),

    #[error("drawing surface unavailable: {0}")]
    ContextUnavailable(String),

    // -- Geometry / history bounds --
    #[error("out of range: {0}")]
    Range(String),

    // -- Remote enhancement --
    #[error("remote provider failed: {0}")]
    Remote(String),

    #[error("all {attempts} remote providers failed (last error: {last_error})")]
    RemoteUnavailable { attempts: usize, last_error: String },

    // -- Edit settings --
    #[error("invalid edit settings: {0}")]
    Settings(String),

    // -- Runtime --
    #[error("background task failed: {0}")]
    Task(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RetouchError>;
