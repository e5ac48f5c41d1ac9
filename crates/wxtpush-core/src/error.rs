// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for wxtpush.

use thiserror::Error;

use crate::types::Vendor;

/// Top-level error type for all wxtpush operations.
#[derive(Debug, Error)]
pub enum PushError {
    // -- Input errors --
    #[error("unknown push vendor: {0:?}")]
    InvalidVendor(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    // -- Configuration --
    #[error("{vendor} configuration error: {reason}")]
    Configuration { vendor: Vendor, reason: String },

    #[error("{operation} is not supported by {vendor}")]
    Unsupported {
        vendor: Vendor,
        operation: &'static str,
    },

    // -- Registration --
    #[error("{0} SDK is not linked into this app")]
    SdkUnavailable(Vendor),

    #[error("{vendor} registration timed out after {elapsed_ms} ms")]
    RegistrationTimeout { vendor: Vendor, elapsed_ms: u64 },

    #[error("{vendor} returned status {code}: {reason}")]
    VendorProtocol {
        vendor: Vendor,
        code: i64,
        reason: String,
    },

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl PushError {
    /// Stable code used in method-channel error replies.
    pub fn reply_code(&self) -> &'static str {
        match self {
            PushError::InvalidVendor(_) | PushError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            PushError::Configuration { .. } => "CONFIG_ERROR",
            PushError::Unsupported { .. } => "UNSUPPORTED",
            PushError::SdkUnavailable(_) | PushError::PlatformUnavailable => "SDK_UNAVAILABLE",
            PushError::RegistrationTimeout { .. } => "TIMEOUT",
            PushError::VendorProtocol { .. } => "VENDOR_ERROR",
            PushError::Bridge(_) => "BRIDGE_ERROR",
            PushError::Io(_) | PushError::Serialization(_) | PushError::Unknown(_) => {
                "UNKNOWN_ERROR"
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PushError>;
