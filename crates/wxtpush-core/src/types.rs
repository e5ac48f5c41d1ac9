// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: the vendor catalog, tokens, registration phases, raw
// vendor callbacks and the normalized event model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PushError, Result};
use crate::reasons::FailureReason;

// ---------------------------------------------------------------------------
// Vendor catalog
// ---------------------------------------------------------------------------

/// Push ecosystems the plugin can register with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// Huawei Mobile Services push kit.
    Huawei,
    /// Honor push (post-split Huawei devices).
    Honor,
    /// Xiaomi MiPush.
    Xiaomi,
    /// OPPO / OnePlus / realme via the Heytap push SDK.
    Oppo,
    /// VIVO push.
    Vivo,
    /// Apple Push Notification service.
    Apple,
}

impl Vendor {
    /// Every vendor, in catalog order.
    pub const ALL: [Vendor; 6] = [
        Vendor::Huawei,
        Vendor::Honor,
        Vendor::Xiaomi,
        Vendor::Oppo,
        Vendor::Vivo,
        Vendor::Apple,
    ];

    /// Stable lowercase identifier used on the method channel.
    pub fn id(self) -> &'static str {
        match self {
            Vendor::Huawei => "huawei",
            Vendor::Honor => "honor",
            Vendor::Xiaomi => "xiaomi",
            Vendor::Oppo => "oppo",
            Vendor::Vivo => "vivo",
            Vendor::Apple => "apple",
        }
    }

    /// Parse a channel identifier. Matching is exact; ids are lowercase.
    pub fn parse(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(PushError::InvalidVendor(String::new()));
        }
        Vendor::ALL
            .into_iter()
            .find(|v| v.id() == id)
            .ok_or_else(|| PushError::InvalidVendor(id.to_owned()))
    }

    /// Entry-point types whose presence means the vendor SDK is linked.
    /// Any one resolving is enough.
    pub fn sdk_entry_points(self) -> &'static [&'static str] {
        match self {
            Vendor::Huawei => &["com.huawei.hms.aaid.HmsInstanceId"],
            Vendor::Honor => &["com.hihonor.push.sdk.HonorPushClient"],
            Vendor::Xiaomi => &["com.xiaomi.mipush.sdk.MiPushClient"],
            Vendor::Oppo => &[
                "com.heytap.msp.push.HeytapPushManager",
                "com.coloros.mcssdk.PushManager",
            ],
            Vendor::Vivo => &["com.vivo.push.PushClient"],
            Vendor::Apple => &["UIApplication"],
        }
    }

    /// Name shown in logs and diagnostic messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Vendor::Huawei => "Huawei HMS",
            Vendor::Honor => "Honor Push",
            Vendor::Xiaomi => "Xiaomi MiPush",
            Vendor::Oppo => "OPPO Heytap",
            Vendor::Vivo => "VIVO Push",
            Vendor::Apple => "Apple APNs",
        }
    }
}

impl FromStr for Vendor {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self> {
        Vendor::parse(s)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A registration token issued by a vendor.
///
/// Tokens are never mutated; a newer token supersedes an older one in the
/// store. Two tokens are equal when vendor and token string match, whatever
/// their issue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushToken {
    pub token: String,
    pub vendor: Vendor,
    pub issued_at: DateTime<Utc>,
}

impl PushToken {
    pub fn new(vendor: Vendor, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            vendor,
            issued_at: Utc::now(),
        }
    }

    /// Boundary representation handed to application code.
    pub fn to_record(&self) -> TokenRecord {
        TokenRecord {
            token: self.token.clone(),
            vendor: self.vendor.id().to_owned(),
            timestamp: self.issued_at.timestamp_millis(),
        }
    }
}

impl PartialEq for PushToken {
    fn eq(&self, other: &Self) -> bool {
        self.vendor == other.vendor && self.token == other.token
    }
}

impl Eq for PushToken {}

/// `{token, vendor, timestamp}` record, timestamp in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub vendor: String,
    pub timestamp: i64,
}

/// Shorten a token for log output.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{prefix}…")
    } else {
        prefix
    }
}

// ---------------------------------------------------------------------------
// Registration lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of one vendor's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationPhase {
    /// No initialize has been requested yet.
    Uninitialized,
    /// SDK init, credential binding and the register call are running.
    Initializing,
    /// Register call issued; waiting for the token under a timeout.
    AwaitingToken,
    /// A token has been received and stored.
    Registered,
    /// Terminal until the next initialize.
    Failed,
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationPhase::Uninitialized => "uninitialized",
            RegistrationPhase::Initializing => "initializing",
            RegistrationPhase::AwaitingToken => "awaiting-token",
            RegistrationPhase::Registered => "registered",
            RegistrationPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Raw vendor callbacks
// ---------------------------------------------------------------------------

/// One positional argument of an intercepted or decoded callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Str(Option<String>),
    Json(Value),
}

impl ArgValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(v) => Some(*v),
            ArgValue::Str(Some(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(Some(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            ArgValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }
}

/// Kind of vendor message callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Pass-through / data message delivered to the app.
    Received,
    /// Notification displayed by the system tray.
    Arrived,
    /// User tapped a notification.
    Clicked,
}

/// A vendor callback as it arrives from native code, before normalization.
///
/// Each variant is one transport shape a vendor SDK uses to report results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "camelCase")]
pub enum RawCallback {
    /// Value returned directly by a synchronous SDK call, or pushed by a
    /// token-refresh hook such as `onNewToken`.
    #[serde(rename_all = "camelCase")]
    Direct { vendor: Vendor, token: Option<String> },
    /// Typed listener success callback.
    #[serde(rename_all = "camelCase")]
    Success { vendor: Vendor, value: Option<String> },
    /// Typed listener failure callback.
    #[serde(rename_all = "camelCase")]
    Failure {
        vendor: Vendor,
        code: i64,
        message: String,
    },
    /// Method intercepted on a listener interface only known at runtime.
    #[serde(rename_all = "camelCase")]
    Invocation {
        vendor: Vendor,
        method: String,
        args: Vec<ArgValue>,
    },
    /// Broadcast intent with key/value extras. The vendor may be implied by
    /// the action or carried in the extras.
    #[serde(rename_all = "camelCase")]
    Broadcast {
        vendor: Option<Vendor>,
        action: String,
        extras: Map<String, Value>,
    },
    /// Cross-process call: transaction ordinal plus marshalled arguments.
    #[serde(rename_all = "camelCase")]
    Transaction {
        vendor: Vendor,
        code: u32,
        parcel: Vec<u8>,
    },
    /// Vendor message service callback.
    #[serde(rename_all = "camelCase")]
    Message {
        vendor: Vendor,
        kind: MessageKind,
        payload: Map<String, Value>,
    },
    /// Notification permission result.
    #[serde(rename_all = "camelCase")]
    Permission { vendor: Vendor, granted: bool },
}

impl RawCallback {
    /// The vendor this callback belongs to, when it is known up front.
    pub fn vendor(&self) -> Option<Vendor> {
        match self {
            RawCallback::Direct { vendor, .. }
            | RawCallback::Success { vendor, .. }
            | RawCallback::Failure { vendor, .. }
            | RawCallback::Invocation { vendor, .. }
            | RawCallback::Transaction { vendor, .. }
            | RawCallback::Message { vendor, .. }
            | RawCallback::Permission { vendor, .. } => Some(*vendor),
            RawCallback::Broadcast { vendor, .. } => *vendor,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized events
// ---------------------------------------------------------------------------

/// Canonical event emitted to application code.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    TokenReceived {
        vendor: Vendor,
        token: String,
    },
    TokenError {
        vendor: Vendor,
        reason: FailureReason,
        message: String,
    },
    MessageReceived {
        vendor: Vendor,
        payload: Map<String, Value>,
    },
    MessageClicked {
        vendor: Vendor,
        payload: Map<String, Value>,
    },
    PermissionChanged {
        vendor: Vendor,
        granted: bool,
    },
    /// SDK failure outside the registration flow.
    VendorError {
        vendor: Vendor,
        message: String,
    },
}

impl NormalizedEvent {
    pub fn vendor(&self) -> Vendor {
        match self {
            NormalizedEvent::TokenReceived { vendor, .. }
            | NormalizedEvent::TokenError { vendor, .. }
            | NormalizedEvent::MessageReceived { vendor, .. }
            | NormalizedEvent::MessageClicked { vendor, .. }
            | NormalizedEvent::PermissionChanged { vendor, .. }
            | NormalizedEvent::VendorError { vendor, .. } => *vendor,
        }
    }

    /// Event name on the event stream.
    pub fn name(&self) -> &'static str {
        match self {
            NormalizedEvent::TokenReceived { .. } => "tokenReceived",
            NormalizedEvent::TokenError { .. } => "tokenError",
            NormalizedEvent::MessageReceived { .. } => "messageReceived",
            NormalizedEvent::MessageClicked { .. } => "messageClicked",
            NormalizedEvent::PermissionChanged { granted: true, .. } => "permissionGranted",
            NormalizedEvent::PermissionChanged { granted: false, .. } => "permissionDenied",
            NormalizedEvent::VendorError { .. } => "error",
        }
    }

    /// Render as the `{event, data}` envelope. `data.vendor` is always set.
    pub fn to_envelope(&self) -> EventEnvelope {
        let mut data = Map::new();
        match self {
            NormalizedEvent::TokenReceived { token, .. } => {
                data.insert("token".into(), Value::String(token.clone()));
            }
            NormalizedEvent::TokenError {
                reason, message, ..
            } => {
                data.insert("error".into(), Value::String(message.clone()));
                data.insert("reason".into(), Value::String(reason.key().into()));
            }
            NormalizedEvent::MessageReceived { payload, .. }
            | NormalizedEvent::MessageClicked { payload, .. } => {
                data.extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            NormalizedEvent::PermissionChanged { granted, .. } => {
                data.insert("granted".into(), Value::Bool(*granted));
            }
            NormalizedEvent::VendorError { message, .. } => {
                data.insert("error".into(), Value::String(message.clone()));
            }
        }
        data.insert("vendor".into(), Value::String(self.vendor().id().into()));
        EventEnvelope {
            event: self.name().to_owned(),
            data,
        }
    }
}

/// `{event, data}` as delivered on the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    pub data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vendor_id_parses_back() {
        for v in Vendor::ALL {
            assert_eq!(Vendor::parse(v.id()).unwrap(), v);
            assert_eq!(v.to_string().parse::<Vendor>().unwrap(), v);
        }
    }

    #[test]
    fn empty_and_unknown_ids_are_rejected() {
        assert!(matches!(Vendor::parse(""), Err(PushError::InvalidVendor(_))));
        assert!(matches!(Vendor::parse("nokia"), Err(PushError::InvalidVendor(_))));
        assert!(Vendor::parse("Huawei").is_err());
    }

    #[test]
    fn vendor_serializes_as_lowercase_id() {
        let json = serde_json::to_string(&Vendor::Oppo).unwrap();
        assert_eq!(json, "\"oppo\"");
    }

    #[test]
    fn token_equality_ignores_issue_time() {
        let a = PushToken::new(Vendor::Xiaomi, "abc");
        let mut b = a.clone();
        b.issued_at += chrono::Duration::seconds(30);
        assert_eq!(a, b);
        assert_ne!(a, PushToken::new(Vendor::Vivo, "abc"));
    }

    #[test]
    fn token_record_carries_millis() {
        let t = PushToken::new(Vendor::Honor, "tok");
        let rec = t.to_record();
        assert_eq!(rec.vendor, "honor");
        assert_eq!(rec.timestamp, t.issued_at.timestamp_millis());
    }

    #[test]
    fn envelope_always_has_vendor() {
        let ev = NormalizedEvent::TokenError {
            vendor: Vendor::Oppo,
            reason: FailureReason::Timeout,
            message: "registration timed out".into(),
        };
        let env = ev.to_envelope();
        assert_eq!(env.event, "tokenError");
        assert_eq!(env.data["vendor"], "oppo");
        assert_eq!(env.data["reason"], "timeout");
        assert!(env.data.contains_key("error"));
    }

    #[test]
    fn permission_event_names() {
        let granted = NormalizedEvent::PermissionChanged {
            vendor: Vendor::Apple,
            granted: true,
        };
        let denied = NormalizedEvent::PermissionChanged {
            vendor: Vendor::Apple,
            granted: false,
        };
        assert_eq!(granted.name(), "permissionGranted");
        assert_eq!(denied.to_envelope().data["granted"], false);
    }

    #[test]
    fn message_payload_cannot_override_vendor() {
        let mut payload = Map::new();
        payload.insert("vendor".into(), Value::String("spoofed".into()));
        payload.insert("title".into(), Value::String("hi".into()));
        let env = NormalizedEvent::MessageReceived {
            vendor: Vendor::Huawei,
            payload,
        }
        .to_envelope();
        assert_eq!(env.data["vendor"], "huawei");
        assert_eq!(env.data["title"], "hi");
    }

    #[test]
    fn raw_callback_json_shape() {
        let cb: RawCallback = serde_json::from_str(
            r#"{"transport":"failure","vendor":"honor","code":6003,"message":"net"}"#,
        )
        .unwrap();
        assert_eq!(cb.vendor(), Some(Vendor::Honor));
    }

    #[test]
    fn redact_keeps_short_prefix() {
        assert_eq!(redact("abcdefghijkl"), "abcdefgh…");
        assert_eq!(redact("abc"), "abc");
    }
}
