// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugin settings and per-vendor credential configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PushError, Result};
use crate::types::Vendor;

/// Process-wide plugin settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Registration window when the vendor config does not set one.
    pub registration_timeout_ms: u64,
    /// Lower clamp for a requested registration window.
    pub min_timeout_ms: u64,
    /// Upper clamp for a requested registration window.
    pub max_timeout_ms: u64,
    /// Delay before a simulated token is issued.
    pub simulated_delay_ms: u64,
    /// Pause between SDK init and the first token query for vendors whose
    /// service needs to come up first.
    pub service_warmup_ms: u64,
    /// Run the bounded nudge plan while waiting for a token.
    pub nudges_enabled: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            registration_timeout_ms: 8_000,
            min_timeout_ms: 1_000,
            max_timeout_ms: 20_000,
            simulated_delay_ms: 2_000,
            service_warmup_ms: 2_000,
            nudges_enabled: true,
        }
    }
}

impl PushConfig {
    /// Registration window for a vendor, clamped into the configured range.
    pub fn registration_timeout(&self, requested_ms: Option<u64>) -> Duration {
        let lo = self.min_timeout_ms.min(self.max_timeout_ms);
        let hi = self.max_timeout_ms.max(lo);
        let ms = requested_ms
            .unwrap_or(self.registration_timeout_ms)
            .clamp(lo, hi);
        Duration::from_millis(ms)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn service_warmup(&self) -> Duration {
        Duration::from_millis(self.service_warmup_ms)
    }
}

/// Credentials and flags for one vendor, parsed from the flat config map
/// passed to `initializePush`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VendorConfig {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    /// Requested registration window; clamped by [`PushConfig`].
    pub register_timeout_ms: Option<u64>,
    /// Minimal Heytap sequence: a single nudge instead of the full plan.
    pub demo_compat: bool,
    /// Any other keys, stringified.
    pub extras: BTreeMap<String, String>,
}

impl VendorConfig {
    /// Parse the channel's config map. Strings are trimmed and empty strings
    /// count as absent; numbers are accepted for credential fields.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut cfg = VendorConfig::default();
        for (key, value) in map {
            match key.as_str() {
                "appId" => cfg.app_id = credential(key, value)?,
                "appKey" => cfg.app_key = credential(key, value)?,
                "appSecret" => cfg.app_secret = credential(key, value)?,
                "registerTimeoutMs" => cfg.register_timeout_ms = millis(value),
                "demoCompat" => cfg.demo_compat = flag(value),
                _ => {
                    if let Some(s) = scalar(value) {
                        cfg.extras.insert(key.clone(), s);
                    }
                }
            }
        }
        Ok(cfg)
    }

    /// Build from manifest-style flat keys such as `xiaomi_app_id`.
    pub fn from_manifest(vendor: Vendor, flat: &BTreeMap<String, String>) -> Self {
        let get = |suffix: &str| {
            flat.get(&format!("{}_{suffix}", vendor.id()))
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        VendorConfig {
            app_id: get("app_id"),
            app_key: get("app_key"),
            app_secret: get("app_secret"),
            ..VendorConfig::default()
        }
    }

    /// Check the credentials this vendor needs before any SDK call.
    pub fn validate(&self, vendor: Vendor) -> Result<()> {
        let required: Vec<(&str, &Option<String>)> = match vendor {
            Vendor::Huawei | Vendor::Honor => vec![("appId", &self.app_id)],
            Vendor::Xiaomi | Vendor::Vivo => {
                vec![("appId", &self.app_id), ("appKey", &self.app_key)]
            }
            Vendor::Oppo => vec![("appKey", &self.app_key), ("appSecret", &self.app_secret)],
            Vendor::Apple => Vec::new(),
        };
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PushError::Configuration {
                vendor,
                reason: format!("{} is required", missing.join(" and ")),
            })
        }
    }
}

fn credential(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_owned()))
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(PushError::InvalidArguments(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

fn millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Resolve raw manifest meta-data entries into the flat `vendor_field` keys.
///
/// Each field accepts the plugin's own placeholder name first and then the
/// vendor SDK's native meta-data key.
pub fn resolve_manifest(meta: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    const SOURCES: &[(&str, &[&str])] = &[
        ("huawei_app_id", &["HUAWEI_APP_ID", "com.huawei.hms.client.appid"]),
        ("huawei_app_secret", &["HUAWEI_APP_SECRET"]),
        ("honor_app_id", &["HONOR_APP_ID", "com.hihonor.push.app_id"]),
        ("honor_app_secret", &["HONOR_APP_SECRET"]),
        ("xiaomi_app_id", &["XIAOMI_APP_ID", "MIPUSH_APPID"]),
        ("xiaomi_app_key", &["XIAOMI_APP_KEY", "MIPUSH_APPKEY"]),
        (
            "oppo_app_key",
            &["OPPO_APP_KEY", "com.heytap.mcs.appkey", "com.coloros.mcs.appkey"],
        ),
        (
            "oppo_app_secret",
            &["OPPO_APP_SECRET", "com.heytap.mcs.appsecret", "com.coloros.mcs.appsecret"],
        ),
        ("vivo_app_id", &["VIVO_APP_ID", "com.vivo.push.app_id"]),
        ("vivo_app_key", &["VIVO_APP_KEY", "com.vivo.push.api_key"]),
    ];

    let mut out = BTreeMap::new();
    for (flat_key, candidates) in SOURCES {
        let found = candidates
            .iter()
            .filter_map(|k| meta.get(*k))
            .map(|v| v.trim())
            // HMS writes its id as `appid=123`.
            .map(|v| v.strip_prefix("appid=").unwrap_or(v))
            .find(|v| !v.is_empty());
        if let Some(v) = found {
            out.insert((*flat_key).to_owned(), v.to_owned());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults() {
        let cfg = PushConfig::default();
        assert_eq!(cfg.registration_timeout(None), Duration::from_secs(8));
        assert!(cfg.simulated_delay() < Duration::from_secs(3));
    }

    #[test]
    fn timeout_is_clamped() {
        let cfg = PushConfig::default();
        assert_eq!(cfg.registration_timeout(Some(50)), Duration::from_secs(1));
        assert_eq!(cfg.registration_timeout(Some(60_000)), Duration::from_secs(20));
        assert_eq!(cfg.registration_timeout(Some(5_000)), Duration::from_secs(5));
    }

    #[test]
    fn parses_known_keys_and_keeps_extras() {
        let cfg = VendorConfig::from_map(&map(json!({
            "appId": " 100 ",
            "appKey": "abc",
            "registerTimeoutMs": "12000",
            "demoCompat": true,
            "channel": "beta",
        })))
        .unwrap();
        assert_eq!(cfg.app_id.as_deref(), Some("100"));
        assert_eq!(cfg.app_key.as_deref(), Some("abc"));
        assert_eq!(cfg.register_timeout_ms, Some(12_000));
        assert!(cfg.demo_compat);
        assert_eq!(cfg.extras["channel"], "beta");
    }

    #[test]
    fn numeric_app_id_is_accepted() {
        let cfg = VendorConfig::from_map(&map(json!({ "appId": 104421 }))).unwrap();
        assert_eq!(cfg.app_id.as_deref(), Some("104421"));
    }

    #[test]
    fn non_scalar_credential_is_rejected() {
        let err = VendorConfig::from_map(&map(json!({ "appKey": ["a"] }))).unwrap_err();
        assert!(matches!(err, PushError::InvalidArguments(_)));
    }

    #[test]
    fn required_fields_per_vendor() {
        let empty = VendorConfig::default();
        assert!(empty.validate(Vendor::Apple).is_ok());
        for v in [Vendor::Huawei, Vendor::Honor, Vendor::Xiaomi, Vendor::Oppo, Vendor::Vivo] {
            assert!(
                matches!(empty.validate(v), Err(PushError::Configuration { .. })),
                "{v} accepted an empty config"
            );
        }

        let oppo = VendorConfig::from_map(&map(json!({ "appKey": "k" }))).unwrap();
        let err = oppo.validate(Vendor::Oppo).unwrap_err();
        assert!(err.to_string().contains("appSecret"));

        let xiaomi =
            VendorConfig::from_map(&map(json!({ "appId": "100", "appKey": "abc" }))).unwrap();
        assert!(xiaomi.validate(Vendor::Xiaomi).is_ok());
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let cfg = VendorConfig::from_map(&map(json!({ "appId": "   " }))).unwrap();
        assert!(cfg.validate(Vendor::Huawei).is_err());
    }

    #[test]
    fn manifest_resolution_prefers_plugin_keys() {
        let meta: BTreeMap<String, String> = [
            ("com.huawei.hms.client.appid", "appid=998877"),
            ("MIPUSH_APPID", "2882"),
            ("XIAOMI_APP_ID", "100"),
            ("com.coloros.mcs.appkey", "ck"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        let flat = resolve_manifest(&meta);
        assert_eq!(flat["huawei_app_id"], "998877");
        assert_eq!(flat["xiaomi_app_id"], "100");
        assert_eq!(flat["oppo_app_key"], "ck");

        let cfg = VendorConfig::from_manifest(Vendor::Huawei, &flat);
        assert_eq!(cfg.app_id.as_deref(), Some("998877"));
    }

    #[test]
    fn push_config_json_defaults_missing_fields() {
        let cfg: PushConfig = serde_json::from_str(r#"{"simulated_delay_ms": 500}"#).unwrap();
        assert_eq!(cfg.simulated_delay_ms, 500);
        assert_eq!(cfg.registration_timeout_ms, 8_000);
    }
}
