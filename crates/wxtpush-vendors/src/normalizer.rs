// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Callback normalization.
//
// Vendor SDKs report results through very different transports: a direct
// return value, typed listener callbacks, methods intercepted on an
// interface only known at runtime, broadcast intents, binder transactions
// and message services. Every transport is first reduced to one canonical
// `(vendor, method, args)` triple and then interpreted into a `Signal` the
// orchestrator acts on. Adding a transport means adding a reduction; the
// interpretation stays shared.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use wxtpush_core::error::{PushError, Result};
use wxtpush_core::reasons::describe_status;
use wxtpush_core::{ArgValue, FailureReason, MessageKind, RawCallback, Vendor};

use crate::parcel::MethodTable;

/// MiPush command result broadcast.
pub const MIPUSH_RECEIVE_MESSAGE: &str = "com.xiaomi.mipush.RECEIVE_MESSAGE";
/// MiPush notification-arrived broadcast.
pub const MIPUSH_MESSAGE_ARRIVED: &str = "com.xiaomi.mipush.MESSAGE_ARRIVED";
/// MiPush error broadcast.
pub const MIPUSH_ERROR: &str = "com.xiaomi.mipush.ERROR";

/// Actions the native receivers use to relay results to the plugin.
pub const RELAY_TOKEN_RECEIVED: &str = "com.wxtpush.client.TOKEN_RECEIVED";
pub const RELAY_MESSAGE_RECEIVED: &str = "com.wxtpush.client.MESSAGE_RECEIVED";
pub const RELAY_NOTIFICATION_RECEIVED: &str = "com.wxtpush.client.NOTIFICATION_RECEIVED";
pub const RELAY_NOTIFICATION_CLICKED: &str = "com.wxtpush.client.NOTIFICATION_CLICKED";
pub const RELAY_PUSH_ERROR: &str = "com.wxtpush.client.PUSH_ERROR";

/// Keys a Heytap broadcast may carry the registration id under.
const REGISTER_ID_KEYS: &[&str] = &[
    "registerID",
    "registerId",
    "register_id",
    "rid",
    "token",
    "registration_id",
];

/// Extras that may hold an embedded JSON document.
const EMBEDDED_JSON_KEYS: &[&str] = &["message", "content", "data"];

/// A callback reduced to its canonical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Canonical {
    pub vendor: Vendor,
    pub method: String,
    pub args: Vec<ArgValue>,
}

impl Canonical {
    fn new(vendor: Vendor, method: &str, args: Vec<ArgValue>) -> Self {
        Self {
            vendor,
            method: method.to_owned(),
            args,
        }
    }

    fn int(&self, i: usize) -> Option<i64> {
        self.args.get(i).and_then(ArgValue::as_int)
    }

    fn str(&self, i: usize) -> Option<&str> {
        self.args.get(i).and_then(ArgValue::as_str)
    }
}

/// What a callback means for the registration flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// A registration token.
    Token(String),
    /// The SDK reported failure.
    Failure {
        code: Option<i64>,
        reason: FailureReason,
        message: String,
    },
    /// The vendor push service finished starting.
    ServiceReady,
    Message {
        kind: MessageKind,
        payload: Map<String, Value>,
    },
    Permission(bool),
    /// Result of a non-registration command; `code` 0 is success.
    Status { operation: String, code: i64 },
    /// Recognised transport, nothing to act on.
    Ignored(String),
}

/// Folds every callback transport into `Signal`s.
#[derive(Debug, Clone)]
pub struct CallbackNormalizer {
    heytap: MethodTable,
}

impl Default for CallbackNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackNormalizer {
    pub fn new() -> Self {
        Self {
            heytap: MethodTable::heytap(),
        }
    }

    /// Use a transaction table with ordinals read from the linked SDK.
    pub fn with_heytap_table(table: MethodTable) -> Self {
        Self { heytap: table }
    }

    /// Canonicalize and interpret in one step.
    pub fn normalize(&self, raw: RawCallback) -> Result<(Vendor, Signal)> {
        let canonical = self.canonicalize(raw)?;
        let vendor = canonical.vendor;
        let signal = interpret(&canonical);
        trace!(%vendor, method = %canonical.method, ?signal, "callback normalized");
        Ok((vendor, signal))
    }

    /// Reduce any transport to `(vendor, method, args)`.
    pub fn canonicalize(&self, raw: RawCallback) -> Result<Canonical> {
        let c = match raw {
            RawCallback::Direct { vendor, token } => {
                Canonical::new(vendor, "onToken", vec![ArgValue::Str(token)])
            }
            RawCallback::Success { vendor, value } => {
                Canonical::new(vendor, "onSuccess", vec![ArgValue::Str(value)])
            }
            RawCallback::Failure {
                vendor,
                code,
                message,
            } => Canonical::new(
                vendor,
                "onFailure",
                vec![ArgValue::Int(code), ArgValue::Str(Some(message))],
            ),
            RawCallback::Invocation {
                vendor,
                method,
                args,
            } => Canonical {
                vendor,
                method,
                args,
            },
            RawCallback::Broadcast {
                vendor,
                action,
                extras,
            } => canonicalize_broadcast(vendor, &action, &extras)?,
            RawCallback::Transaction {
                vendor,
                code,
                parcel,
            } => {
                if vendor != Vendor::Oppo {
                    return Err(PushError::InvalidArguments(format!(
                        "no transaction table for {vendor}"
                    )));
                }
                let (method, args) = self.heytap.decode(code, &parcel)?;
                Canonical {
                    vendor,
                    method,
                    args,
                }
            }
            RawCallback::Message {
                vendor,
                kind,
                payload,
            } => message(vendor, kind, payload),
            RawCallback::Permission { vendor, granted } => {
                Canonical::new(vendor, "onPermission", vec![ArgValue::Bool(granted)])
            }
        };
        Ok(c)
    }
}

fn message(vendor: Vendor, kind: MessageKind, payload: Map<String, Value>) -> Canonical {
    let kind = match kind {
        MessageKind::Received => "received",
        MessageKind::Arrived => "arrived",
        MessageKind::Clicked => "clicked",
    };
    Canonical::new(
        vendor,
        "onMessage",
        vec![
            ArgValue::Str(Some(kind.to_owned())),
            ArgValue::Json(Value::Object(payload)),
        ],
    )
}

fn extra_str<'a>(extras: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    extras.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn extra_int(extras: &Map<String, Value>, key: &str) -> Option<i64> {
    match extras.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn canonicalize_broadcast(
    vendor: Option<Vendor>,
    action: &str,
    extras: &Map<String, Value>,
) -> Result<Canonical> {
    // Relay broadcasts name the vendor in the extras.
    let vendor = match vendor {
        Some(v) => v,
        None => match extra_str(extras, "vendor") {
            Some(id) => Vendor::parse(id)?,
            None if action.starts_with("com.xiaomi.mipush.") => Vendor::Xiaomi,
            None => {
                return Err(PushError::InvalidArguments(format!(
                    "broadcast {action} carries no vendor"
                )));
            }
        },
    };

    let c = match action {
        MIPUSH_RECEIVE_MESSAGE => {
            let command = extra_str(extras, "key_command").unwrap_or_default();
            let code = extra_int(extras, "key_result_code").unwrap_or(-1);
            if command == "register" {
                Canonical::new(
                    vendor,
                    "onRegister",
                    vec![
                        ArgValue::Int(code),
                        ArgValue::Str(extra_str(extras, "key_reg_id").map(str::to_owned)),
                    ],
                )
            } else {
                Canonical::new(
                    vendor,
                    "onCommandResult",
                    vec![
                        ArgValue::Str(Some(command.to_owned())),
                        ArgValue::Int(code),
                        ArgValue::Str(extra_str(extras, "key_reason").map(str::to_owned)),
                    ],
                )
            }
        }
        MIPUSH_MESSAGE_ARRIVED => message(vendor, MessageKind::Arrived, message_fields(extras)),
        MIPUSH_ERROR | RELAY_PUSH_ERROR => {
            let error = extra_str(extras, "key_error")
                .or_else(|| extra_str(extras, "error"))
                .unwrap_or("unknown error");
            Canonical::new(vendor, "onError", vec![ArgValue::Str(Some(error.to_owned()))])
        }
        RELAY_TOKEN_RECEIVED => Canonical::new(
            vendor,
            "onToken",
            vec![ArgValue::Str(extra_str(extras, "token").map(str::to_owned))],
        ),
        RELAY_MESSAGE_RECEIVED => message(vendor, MessageKind::Received, message_fields(extras)),
        RELAY_NOTIFICATION_RECEIVED => {
            message(vendor, MessageKind::Arrived, message_fields(extras))
        }
        RELAY_NOTIFICATION_CLICKED => message(vendor, MessageKind::Clicked, message_fields(extras)),
        _ => match find_register_id(extras) {
            Some(rid) => Canonical::new(
                vendor,
                "onRegister",
                vec![ArgValue::Int(0), ArgValue::Str(Some(rid))],
            ),
            None => {
                debug!(%vendor, action, "broadcast without registration id");
                Canonical::new(vendor, "onBroadcast", vec![ArgValue::Str(Some(action.to_owned()))])
            }
        },
    };
    Ok(c)
}

/// Title, content and `extra_*` fields of a message broadcast.
fn message_fields(extras: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for key in ["title", "content", "description"] {
        if let Some(v) = extras.get(key) {
            out.insert(key.to_owned(), v.clone());
        }
    }
    let custom: Map<String, Value> = extras
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("extra_").map(|k| (k.to_owned(), v.clone())))
        .collect();
    if !custom.is_empty() {
        out.insert("data".into(), Value::Object(custom));
    }
    out
}

/// Registration id from a generic SDK broadcast: under one of the known
/// keys, or inside an embedded JSON document.
fn find_register_id(extras: &Map<String, Value>) -> Option<String> {
    if let Some(rid) = REGISTER_ID_KEYS.iter().find_map(|k| extra_str(extras, k)) {
        return Some(rid.to_owned());
    }
    EMBEDDED_JSON_KEYS
        .iter()
        .filter_map(|k| extra_str(extras, k))
        .filter_map(|s| serde_json::from_str::<Map<String, Value>>(s).ok())
        .find_map(|doc| {
            REGISTER_ID_KEYS
                .iter()
                .find_map(|k| extra_str(&doc, k).map(str::to_owned))
        })
}

/// Interpret a canonical callback.
pub fn interpret(c: &Canonical) -> Signal {
    match c.method.as_str() {
        "onToken" | "onNewToken" | "onReceiveRegId" | "onSuccess" => token_or_empty(c.vendor, c.str(0)),
        "onRegister" => {
            let code = c.int(0).unwrap_or(-1);
            match (code, c.str(1)) {
                (0, Some(rid)) if !rid.is_empty() => Signal::Token(rid.to_owned()),
                (0, _) => empty_token(c.vendor),
                (code, _) => status_failure(c.vendor, code, None),
            }
        }
        "onFailure" => {
            let code = c.int(0).unwrap_or(-1);
            status_failure(c.vendor, code, c.str(1))
        }
        "onStateChanged" => match c.int(0) {
            Some(0) => Signal::ServiceReady,
            Some(code) => status_failure(c.vendor, code, None),
            None => Signal::Ignored("onStateChanged without state".into()),
        },
        "onUnRegister" | "onSetPushTime" | "onGetPushStatus" => Signal::Status {
            operation: c.method.clone(),
            code: c.int(0).unwrap_or(-1),
        },
        "onGetNotificationStatus" => match (c.int(0), c.int(1)) {
            (Some(0), Some(status)) => Signal::Permission(status == 0),
            (code, _) => Signal::Status {
                operation: c.method.clone(),
                code: code.unwrap_or(-1),
            },
        },
        "onCommandResult" => Signal::Status {
            operation: c.str(0).unwrap_or("command").to_owned(),
            code: c.int(1).unwrap_or(-1),
        },
        "onError" => Signal::Failure {
            code: None,
            reason: FailureReason::Unknown { code: None },
            message: c.str(0).unwrap_or("unknown error").to_owned(),
        },
        "onPermission" => match c.args.first().and_then(ArgValue::as_bool) {
            Some(granted) => Signal::Permission(granted),
            None => Signal::Ignored("onPermission without result".into()),
        },
        "onMessage" => {
            let kind = match c.str(0) {
                Some("clicked") => MessageKind::Clicked,
                Some("arrived") => MessageKind::Arrived,
                _ => MessageKind::Received,
            };
            let payload = match c.args.get(1) {
                Some(ArgValue::Json(Value::Object(m))) => m.clone(),
                _ => Map::new(),
            };
            Signal::Message {
                kind,
                payload: enrich(kind, payload),
            }
        }
        other => Signal::Ignored(other.to_owned()),
    }
}

fn token_or_empty(vendor: Vendor, token: Option<&str>) -> Signal {
    match token.map(str::trim) {
        Some(t) if !t.is_empty() => Signal::Token(t.to_owned()),
        _ => empty_token(vendor),
    }
}

fn empty_token(vendor: Vendor) -> Signal {
    Signal::Failure {
        code: None,
        reason: FailureReason::EmptyToken,
        message: format!("{} returned an empty token", vendor.display_name()),
    }
}

fn status_failure(vendor: Vendor, code: i64, vendor_message: Option<&str>) -> Signal {
    let info = describe_status(vendor, code);
    let message = match vendor_message.filter(|m| !m.is_empty()) {
        Some(m) => format!("{}: {m}", info.message()),
        None => info.message(),
    };
    Signal::Failure {
        code: Some(code),
        reason: info.reason,
        message,
    }
}

/// Add `channel` and `receivedAt` when the vendor did not supply them.
fn enrich(kind: MessageKind, mut payload: Map<String, Value>) -> Map<String, Value> {
    if !payload.contains_key("channel") {
        let has_data = ["data", "extras"]
            .iter()
            .any(|k| payload.get(*k).is_some_and(|v| !v.is_null()));
        let has_notification = ["title", "body", "content"]
            .iter()
            .any(|k| payload.contains_key(*k));
        let channel = match (has_data, has_notification, kind) {
            (true, true, _) => "hybrid",
            (true, false, _) => "data",
            (false, _, MessageKind::Received) if !has_notification => "data",
            _ => "notification",
        };
        payload.insert("channel".into(), Value::String(channel.into()));
    }
    payload
        .entry("receivedAt")
        .or_insert_with(|| Value::from(Utc::now().timestamp_millis()));
    payload
}
