// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failure reason taxonomy and vendor status-code tables.
//
// Every vendor reports registration failures with its own numeric codes.
// They are folded into one small set of reasons with plain-language text.
// The tables are best-effort: any code not listed maps to `Unknown`.

use std::fmt;

use crate::error::PushError;
use crate::types::Vendor;

/// Why a registration (or other vendor operation) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// No token arrived within the registration window.
    Timeout,
    /// Missing or malformed credentials in the app's configuration.
    Configuration,
    /// The vendor push service is missing, disabled or not connected.
    ServiceUnavailable,
    /// Network failure talking to the vendor.
    Network,
    /// App id, key or secret rejected by the vendor.
    InvalidCredentials,
    /// Package name or signing certificate does not match the console.
    SignatureMismatch,
    /// The user or system has switched push off for this app.
    PermissionDenied,
    /// The device cannot run this vendor's push service.
    DeviceUnsupported,
    /// The app has not been approved for push on the vendor console.
    NotWhitelisted,
    /// The installed push service is too old.
    ServiceOutdated,
    /// Vendor server side failure.
    ServerError,
    /// The SDK reported success but returned no token.
    EmptyToken,
    /// Malformed request or client state.
    Rejected,
    /// Unrecognised status code, or a failure we could not classify.
    Unknown { code: Option<i64> },
}

impl FailureReason {
    /// Short machine-readable key carried in `tokenError` events.
    pub fn key(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Configuration => "configuration",
            FailureReason::ServiceUnavailable => "serviceUnavailable",
            FailureReason::Network => "network",
            FailureReason::InvalidCredentials => "invalidCredentials",
            FailureReason::SignatureMismatch => "signatureMismatch",
            FailureReason::PermissionDenied => "permissionDenied",
            FailureReason::DeviceUnsupported => "deviceUnsupported",
            FailureReason::NotWhitelisted => "notWhitelisted",
            FailureReason::ServiceOutdated => "serviceOutdated",
            FailureReason::ServerError => "serverError",
            FailureReason::EmptyToken => "emptyToken",
            FailureReason::Rejected => "rejected",
            FailureReason::Unknown { .. } => "unknown",
        }
    }

    /// What the app developer should check.
    pub fn suggestion(&self) -> &'static str {
        match self {
            FailureReason::Timeout => {
                "Check that the vendor push service is running and the device is online."
            }
            FailureReason::Configuration | FailureReason::InvalidCredentials => {
                "Check the app id, app key and app secret against the vendor console."
            }
            FailureReason::SignatureMismatch => {
                "Check that the signing certificate fingerprint matches the vendor console."
            }
            FailureReason::NotWhitelisted => {
                "Apply for push permission on the vendor console, or add this app to the test list."
            }
            FailureReason::ServiceUnavailable | FailureReason::ServiceOutdated => {
                "Install or update the vendor push service on the device."
            }
            FailureReason::Network => "Check the network connection, then initialize again.",
            FailureReason::PermissionDenied => "Ask the user to allow notifications for this app.",
            FailureReason::DeviceUnsupported => "This vendor's push is not available on this device.",
            FailureReason::ServerError | FailureReason::EmptyToken => "Initialize again later.",
            FailureReason::Rejected | FailureReason::Unknown { .. } => {
                "Check the device log for vendor SDK output."
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Unknown { code: Some(code) } => write!(f, "unknown (code={code})"),
            other => f.write_str(other.key()),
        }
    }
}

/// A vendor status code resolved against its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: i64,
    pub reason: FailureReason,
    pub detail: String,
}

impl StatusInfo {
    /// Message used in `tokenError` events.
    pub fn message(&self) -> String {
        format!("{} (code={})", self.detail, self.code)
    }
}

/// Resolve a vendor status code. Success codes are not special-cased here;
/// callers check success before asking for a reason.
pub fn describe_status(vendor: Vendor, code: i64) -> StatusInfo {
    let known = match vendor {
        Vendor::Oppo => heytap_status(code),
        Vendor::Honor => honor_status(code),
        Vendor::Huawei => hms_status(code),
        Vendor::Xiaomi => mipush_status(code),
        Vendor::Vivo => vivo_status(code),
        Vendor::Apple => None,
    };
    match known {
        Some((reason, detail)) => StatusInfo {
            code,
            reason,
            detail: detail.to_owned(),
        },
        None => StatusInfo {
            code,
            reason: FailureReason::Unknown { code: Some(code) },
            detail: format!("unknown error (code={code})"),
        },
    }
}

/// Map an internal error onto the reason taxonomy.
pub fn classify(err: &PushError) -> FailureReason {
    match err {
        PushError::RegistrationTimeout { .. } => FailureReason::Timeout,
        PushError::Configuration { .. } | PushError::InvalidArguments(_) => {
            FailureReason::Configuration
        }
        PushError::SdkUnavailable(_) | PushError::PlatformUnavailable => {
            FailureReason::ServiceUnavailable
        }
        PushError::VendorProtocol { vendor, code, .. } => describe_status(*vendor, *code).reason,
        PushError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::TimedOut => FailureReason::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => FailureReason::Network,
            _ => FailureReason::Unknown { code: None },
        },
        PushError::Unsupported { .. } => FailureReason::DeviceUnsupported,
        PushError::InvalidVendor(_)
        | PushError::Bridge(_)
        | PushError::Serialization(_)
        | PushError::Unknown(_) => FailureReason::Unknown { code: None },
    }
}

fn heytap_status(code: i64) -> Option<(FailureReason, &'static str)> {
    use FailureReason::*;
    let entry = match code {
        -1 => (ServerError, "system error"),
        -2 => (Rejected, "client error"),
        -3 => (InvalidCredentials, "app info error"),
        -4 => (Rejected, "token info error"),
        -5 => (InvalidCredentials, "app key error"),
        -6 => (InvalidCredentials, "app secret error"),
        -7 => (SignatureMismatch, "package name error"),
        -8 => (SignatureMismatch, "app signature error"),
        -9 => (Rejected, "registration info error"),
        -10 => (PermissionDenied, "push permission switched off"),
        -11 => (DeviceUnsupported, "device does not support push"),
        -12 => (ServiceUnavailable, "push service disabled"),
        -13 => (Network, "network connection failed"),
        -14 => (ServerError, "server error"),
        -15 => (Rejected, "parameter error"),
        -16 => (SignatureMismatch, "signature verification failed"),
        -17 => (ServiceUnavailable, "push service init failed"),
        -18 => (EmptyToken, "failed to get push token"),
        -19 => (ServerError, "push message send failed"),
        -20 => (ServerError, "push message receive failed"),
        -100 => (NotWhitelisted, "app not whitelisted"),
        -200 => (ServiceUnavailable, "device not connected to push service"),
        -300 => (ServiceOutdated, "push service version too low"),
        _ => return None,
    };
    Some(entry)
}

fn honor_status(code: i64) -> Option<(FailureReason, &'static str)> {
    match code {
        8002008 => Some((
            FailureReason::ServiceUnavailable,
            "Honor push service missing or incompatible",
        )),
        6003 => Some((FailureReason::Network, "network connection error")),
        907135701 => Some((
            FailureReason::Configuration,
            "app id misconfigured, check mcs-services.json",
        )),
        _ => None,
    }
}

fn hms_status(code: i64) -> Option<(FailureReason, &'static str)> {
    match code {
        907135000 => Some((FailureReason::Rejected, "argument error")),
        907135001 => Some((FailureReason::ServiceUnavailable, "HMS core service disconnected")),
        907135700 => Some((FailureReason::ServiceUnavailable, "HMS core not installed or outdated")),
        907135701 => Some((
            FailureReason::Configuration,
            "scope or app id misconfigured, check agconnect-services.json",
        )),
        907135702 => Some((FailureReason::SignatureMismatch, "certificate fingerprint mismatch")),
        907135703 => Some((FailureReason::PermissionDenied, "push kit not enabled for this app")),
        _ => None,
    }
}

fn mipush_status(code: i64) -> Option<(FailureReason, &'static str)> {
    match code {
        70000001 => Some((FailureReason::ServiceUnavailable, "MiPush service unavailable")),
        70000002 => Some((FailureReason::Rejected, "invalid request payload")),
        70000003 => Some((FailureReason::ServerError, "MiPush internal error")),
        70000004 => Some((FailureReason::InvalidCredentials, "app id or app key rejected")),
        _ => None,
    }
}

fn vivo_status(code: i64) -> Option<(FailureReason, &'static str)> {
    match code {
        101 => Some((FailureReason::DeviceUnsupported, "device does not support VIVO push")),
        102 => Some((FailureReason::ServiceUnavailable, "VIVO push init failed")),
        1003 => Some((FailureReason::Network, "network unavailable")),
        10000 => Some((FailureReason::InvalidCredentials, "app id or app key invalid")),
        _ => None,
    }
}
