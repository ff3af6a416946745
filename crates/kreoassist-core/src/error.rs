// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for KreoAssist.

use thiserror::Error;

use crate::types::Capability;

/// Wire code reported for missing or null request arguments.
pub const CODE_INVALID_ARGS: &str = "INVALID_ARGS";
/// Wire code reported when the OS has not granted the needed permission.
pub const CODE_PERMISSION_DENIED: &str = "PERMISSION_DENIED";
/// Wire code reported when the OS call itself threw.
pub const CODE_NATIVE_FAILURE: &str = "NATIVE_FAILURE";
/// Wire code reported when the request envelope could not be decoded.
pub const CODE_INVALID_REQUEST: &str = "INVALID_REQUEST";
/// Wire code for anything else (bridge plumbing, unavailable platform).
pub const CODE_INTERNAL: &str = "INTERNAL";

/// Top-level error type for all KreoAssist operations.
#[derive(Debug, Error)]
pub enum KreoError {
    // -- Request errors (reported to the shell) --
    #[error("{0}")]
    InvalidArgs(String),

    #[error("{} permission not granted", .0.label())]
    PermissionDenied(Capability),

    #[error("method not implemented: {0}")]
    NotImplemented(String),

    #[error("native {action} failed: {detail}")]
    NativeFailure { action: &'static str, detail: String },

    #[error("invalid request envelope: {0}")]
    InvalidRequest(String),

    // -- Configuration --
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

impl KreoError {
    /// Stable error code sent back across the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            KreoError::InvalidArgs(_) => CODE_INVALID_ARGS,
            KreoError::PermissionDenied(_) => CODE_PERMISSION_DENIED,
            KreoError::NativeFailure { .. } => CODE_NATIVE_FAILURE,
            KreoError::InvalidRequest(_) | KreoError::Serialization(_) => CODE_INVALID_REQUEST,
            KreoError::NotImplemented(_)
            | KreoError::Io(_)
            | KreoError::Bridge(_)
            | KreoError::PlatformUnavailable => CODE_INTERNAL,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KreoError>;
