// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// No vendor SDK resolves unless explicitly listed, so every vendor takes the
// simulated token path. Device facts are fixed values that tests can set.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wxtpush_core::error::{PushError, Result};
use wxtpush_core::Vendor;

use crate::traits::*;

/// Configurable stand-in bridge.
#[derive(Clone)]
pub struct StubBridge {
    device_id: String,
    brand: String,
    manufacturer: String,
    linked_types: BTreeSet<String>,
    manifest: BTreeMap<String, String>,
    static_ints: BTreeMap<(String, String), i32>,
    sdks: Vec<Arc<dyn VendorSdk>>,
    resolves: Arc<AtomicUsize>,
}

impl Default for StubBridge {
    fn default() -> Self {
        Self {
            device_id: "desktop-stub".into(),
            brand: "generic".into(),
            manufacturer: "generic".into(),
            linked_types: BTreeSet::new(),
            manifest: BTreeMap::new(),
            static_ints: BTreeMap::new(),
            sdks: Vec::new(),
            resolves: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StubBridge {
    pub fn with_device_id(mut self, id: impl Into<String>) -> Self {
        self.device_id = id.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = brand.into();
        self.manufacturer = brand.clone();
        self.brand = brand;
        self
    }

    /// Mark a type name as resolvable.
    pub fn with_linked_type(mut self, name: impl Into<String>) -> Self {
        self.linked_types.insert(name.into());
        self
    }

    pub fn with_manifest_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.manifest.insert(key.into(), value.into());
        self
    }

    /// Expose `class.field` as a static int constant.
    pub fn with_static_int(
        mut self,
        class: impl Into<String>,
        field: impl Into<String>,
        value: i32,
    ) -> Self {
        self.static_ints.insert((class.into(), field.into()), value);
        self
    }

    /// Number of type lookups made so far, across clones.
    pub fn resolve_calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Add an adapter and mark its entry points as resolvable.
    pub fn with_sdk(mut self, sdk: Arc<dyn VendorSdk>) -> Self {
        for ty in sdk.entry_points() {
            self.linked_types.insert((*ty).to_owned());
        }
        self.sdks.push(sdk);
        self
    }
}

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn vendor_sdks(&self) -> Vec<Arc<dyn VendorSdk>> {
        self.sdks.clone()
    }
}

impl SdkRuntime for StubBridge {
    fn resolve_type(&self, qualified_name: &str) -> Result<bool> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(self.linked_types.contains(qualified_name))
    }

    fn static_int(&self, qualified_name: &str, field: &str) -> Result<Option<i32>> {
        Ok(self
            .static_ints
            .get(&(qualified_name.to_owned(), field.to_owned()))
            .copied())
    }
}

impl DeviceIdentity for StubBridge {
    fn brand(&self) -> Result<String> {
        Ok(self.brand.clone())
    }

    fn manufacturer(&self) -> Result<String> {
        Ok(self.manufacturer.clone())
    }

    fn device_id(&self) -> Result<String> {
        Ok(self.device_id.clone())
    }
}

impl NativeBadge for StubBridge {
    fn set_badge(&self, _count: u32, _vendor: Option<Vendor>) -> Result<()> {
        tracing::warn!("NativeBadge::set_badge called on stub bridge");
        Err(PushError::PlatformUnavailable)
    }

    fn read_badge(&self) -> Result<Option<u32>> {
        Err(PushError::PlatformUnavailable)
    }
}

impl NativeManifest for StubBridge {
    fn manifest_meta(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.manifest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_resolves_by_default() {
        let bridge = StubBridge::default();
        assert!(!bridge.resolve_type("com.xiaomi.mipush.sdk.MiPushClient").unwrap());
        assert!(bridge.vendor_sdks().is_empty());
    }

    #[test]
    fn builder_sets_device_facts() {
        let bridge = StubBridge::default()
            .with_device_id("dev-1")
            .with_brand("OPPO")
            .with_linked_type("com.heytap.msp.push.HeytapPushManager");
        assert_eq!(bridge.device_id().unwrap(), "dev-1");
        assert_eq!(bridge.manufacturer().unwrap(), "OPPO");
        assert!(bridge.resolve_type("com.heytap.msp.push.HeytapPushManager").unwrap());
        assert_eq!(bridge.clone().resolve_calls(), 1);
    }

    #[test]
    fn static_ints_are_looked_up_by_class_and_field() {
        let bridge = StubBridge::default().with_static_int("a.B$Stub", "TRANSACTION_x", 9);
        assert_eq!(bridge.static_int("a.B$Stub", "TRANSACTION_x").unwrap(), Some(9));
        assert_eq!(bridge.static_int("a.B$Stub", "TRANSACTION_y").unwrap(), None);
    }

    #[test]
    fn badge_is_unavailable() {
        let bridge = StubBridge::default();
        assert!(matches!(
            bridge.set_badge(3, None),
            Err(PushError::PlatformUnavailable)
        ));
    }
}
