// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Method-channel dispatcher.
//
// A framework channel hands over `{method, arguments}` and expects either a
// JSON value or an error `{code, message}`. Argument names follow the Dart
// side of the plugin (`vendor`, `config`, `alias`, `tags`, `count`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use wxtpush_core::error::PushError;
use wxtpush_core::Vendor;

use crate::manager::PushManager;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    fn args(&self) -> Option<&Map<String, Value>> {
        self.arguments.as_object()
    }

    fn arg(&self, key: &str) -> Option<&Value> {
        self.args().and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }
}

/// Error reply on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

impl MethodError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_ARGUMENTS".into(),
            message: message.into(),
        }
    }

    fn not_implemented(method: &str) -> Self {
        Self {
            code: "NOT_IMPLEMENTED".into(),
            message: format!("method {method:?} is not implemented"),
        }
    }
}

impl From<PushError> for MethodError {
    fn from(e: PushError) -> Self {
        Self {
            code: e.reply_code().into(),
            message: e.to_string(),
        }
    }
}

type Reply = Result<Value, MethodError>;

/// Handle one channel call against `manager`.
#[instrument(skip_all, fields(method = %call.method))]
pub async fn handle_method_call(manager: &PushManager, call: &MethodCall) -> Reply {
    debug!("method call");
    match call.method.as_str() {
        "initializePush" => {
            let vendor = required_vendor(call)?;
            let Some(config) = call.arg("config").and_then(Value::as_object) else {
                return Err(MethodError::invalid("config is required"));
            };
            manager.initialize_push(vendor, config).await?;
            Ok(Value::Null)
        }
        "getToken" => {
            let vendor = required_vendor(call)?;
            match manager.get_token(vendor) {
                Some(record) => to_reply(record),
                None => Ok(Value::Null),
            }
        }
        "getAllTokens" => to_reply(manager.get_all_tokens()),
        "enableNotification" => {
            manager.enable_notification(optional_vendor(call)?).await?;
            Ok(Value::Null)
        }
        "disableNotification" => {
            manager.disable_notification(optional_vendor(call)?).await?;
            Ok(Value::Null)
        }
        "setAlias" => {
            let Some(alias) = call.arg("alias").and_then(Value::as_str) else {
                return Err(MethodError::invalid("alias is required"));
            };
            manager.set_alias(alias).await?;
            Ok(Value::Null)
        }
        "setTags" => {
            let Some(tags) = call.arg("tags").and_then(Value::as_array) else {
                return Err(MethodError::invalid("tags must be a list"));
            };
            let tags: Vec<String> = tags
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            manager.set_tags(&tags).await?;
            Ok(Value::Null)
        }
        "refreshToken" => {
            manager.refresh_token(required_vendor(call)?)?;
            Ok(Value::Null)
        }
        "deleteToken" => {
            manager.delete_token(required_vendor(call)?)?;
            Ok(Value::Null)
        }
        "setBadge" => {
            let Some(count) = call.arg("count").and_then(Value::as_i64) else {
                return Err(MethodError::invalid("count must be an integer"));
            };
            let count = u32::try_from(count.clamp(0, i64::from(u32::MAX))).unwrap_or(u32::MAX);
            Ok(Value::Bool(manager.set_badge(count, optional_vendor(call)?)))
        }
        "getBadge" => Ok(Value::from(manager.get_badge(optional_vendor(call)?))),
        "getManifestConfig" => to_reply(manager.get_manifest_config()?),
        other => Err(MethodError::not_implemented(other)),
    }
}

fn to_reply<T: Serialize>(value: T) -> Reply {
    serde_json::to_value(value).map_err(|e| PushError::from(e).into())
}

fn required_vendor(call: &MethodCall) -> Result<Vendor, MethodError> {
    optional_vendor(call)?.ok_or_else(|| MethodError::invalid("vendor is required"))
}

fn optional_vendor(call: &MethodCall) -> Result<Option<Vendor>, MethodError> {
    match call.arg("vendor") {
        None => Ok(None),
        Some(Value::String(id)) => Ok(Some(Vendor::parse(id)?)),
        Some(other) => Err(MethodError::invalid(format!("vendor must be a string, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wxtpush_bridge::stub::StubBridge;
    use serde_json::json;
    use wxtpush_core::PushConfig;

    use super::*;

    fn manager() -> PushManager {
        PushManager::new(Arc::new(StubBridge::default()), PushConfig::default())
    }

    async fn call(m: &PushManager, method: &str, args: Value) -> Reply {
        handle_method_call(m, &MethodCall::new(method, args)).await
    }

    #[tokio::test]
    async fn unknown_method_is_not_implemented() {
        let err = call(&manager(), "getPlatformVersion", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, "NOT_IMPLEMENTED");
    }

    #[tokio::test]
    async fn initialize_requires_vendor_and_config() {
        let m = manager();
        let err = call(&m, "initializePush", json!({"config": {}})).await.unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENTS");
        let err = call(&m, "initializePush", json!({"vendor": "xiaomi"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENTS");
    }

    #[tokio::test]
    async fn unparseable_vendor_is_invalid_arguments() {
        let err = call(&manager(), "getToken", json!({"vendor": "nokia"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENTS");
        assert!(err.message.contains("nokia"));
    }

    #[tokio::test]
    async fn token_getters_before_registration() {
        let m = manager();
        assert_eq!(
            call(&m, "getToken", json!({"vendor": "vivo"})).await.unwrap(),
            Value::Null
        );
        assert_eq!(call(&m, "getAllTokens", Value::Null).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn refresh_and_delete_report_unsupported() {
        let m = manager();
        for method in ["refreshToken", "deleteToken"] {
            let err = call(&m, method, json!({"vendor": "huawei"})).await.unwrap_err();
            assert_eq!(err.code, "UNSUPPORTED");
            assert!(err.message.contains(method));
        }
    }

    #[tokio::test]
    async fn badge_round_trips_through_cache() {
        let m = manager();
        let ok = call(&m, "setBadge", json!({"count": 4, "vendor": "oppo"}))
            .await
            .unwrap();
        // The stub launcher refuses, but the count is still cached.
        assert_eq!(ok, Value::Bool(false));
        assert_eq!(call(&m, "getBadge", json!({})).await.unwrap(), json!(4));
    }

    #[tokio::test]
    async fn negative_badge_count_clamps_to_zero() {
        let m = manager();
        call(&m, "setBadge", json!({"count": -3})).await.unwrap();
        assert_eq!(call(&m, "getBadge", Value::Null).await.unwrap(), json!(0));
    }

    #[tokio::test]
    async fn badge_count_is_required() {
        let m = manager();
        call(&m, "setBadge", json!({"count": 7})).await.unwrap();
        for args in [json!({}), json!({"count": "3"}), json!({"count": null}), Value::Null] {
            let err = call(&m, "setBadge", args).await.unwrap_err();
            assert_eq!(err.code, "INVALID_ARGUMENTS");
        }
        // A rejected call leaves the cached count alone.
        assert_eq!(call(&m, "getBadge", Value::Null).await.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn tags_must_be_a_list() {
        let err = call(&manager(), "setTags", json!({"tags": "a,b"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENTS");
    }

    #[test]
    fn method_call_deserializes_without_arguments() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"getAllTokens"}"#).unwrap();
        assert_eq!(call.arguments, Value::Null);
    }
}
