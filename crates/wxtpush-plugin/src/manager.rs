// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PushManager: the method surface an application (or a framework channel)
// talks to. Thin over the engine; it adds token records at the boundary,
// the badge cache and manifest lookup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, instrument};

use wxtpush_bridge::traits::PlatformBridge;
use wxtpush_core::config::resolve_manifest;
use wxtpush_core::error::{PushError, Result};
use wxtpush_core::{EventEnvelope, NormalizedEvent, PushConfig, TokenRecord, Vendor, VendorConfig};
use wxtpush_vendors::PushEngine;

use crate::badge::Badge;
use crate::settings;

/// Subscription to the `{event, data}` stream.
pub struct EventStream {
    rx: UnboundedReceiver<NormalizedEvent>,
}

impl EventStream {
    /// Next envelope; `None` once the subscription was replaced or the
    /// manager cleaned up.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await.map(|e| e.to_envelope())
    }

    /// Next envelope if one is already queued.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        self.rx.try_recv().ok().map(|e| e.to_envelope())
    }
}

/// Shared handle to the push engine. Cheap to clone.
#[derive(Clone)]
pub struct PushManager {
    engine: Arc<PushEngine>,
    badge: Arc<Badge>,
}

impl PushManager {
    pub fn new(bridge: Arc<dyn PlatformBridge>, settings: PushConfig) -> Self {
        let badge = Arc::new(Badge::new(Arc::clone(&bridge)));
        Self {
            engine: Arc::new(PushEngine::new(bridge, settings)),
            badge,
        }
    }

    /// Build with the settings file found in `data_dir`.
    pub fn from_data_dir(bridge: Arc<dyn PlatformBridge>, data_dir: &Path) -> Self {
        let settings = settings::load_settings(data_dir);
        info!(data_dir = %data_dir.display(), "push manager settings loaded");
        Self::new(bridge, settings)
    }

    pub fn engine(&self) -> &PushEngine {
        &self.engine
    }

    /// Route the process-wide callback ingress into this manager.
    pub fn install_ingress(&self) {
        self.engine.install_ingress();
    }

    // -- registration --------------------------------------------------------

    /// Start registration. Returns once the attempt is accepted; the
    /// outcome arrives on the event stream.
    #[instrument(skip_all, fields(%vendor))]
    pub async fn initialize_push(&self, vendor: Vendor, config: &Map<String, Value>) -> Result<()> {
        self.engine.initialize(vendor, config).await
    }

    /// Start registration with credentials read from the app manifest.
    pub async fn initialize_from_manifest(&self, vendor: Vendor) -> Result<()> {
        let flat = self.get_manifest_config()?;
        let config = VendorConfig::from_manifest(vendor, &flat);
        self.engine.initialize_with(vendor, config).await
    }

    pub fn get_token(&self, vendor: Vendor) -> Option<TokenRecord> {
        self.engine.token(vendor).map(|t| t.to_record())
    }

    /// Tokens of every registered vendor, in the order they registered.
    pub fn get_all_tokens(&self) -> Vec<TokenRecord> {
        self.engine
            .all_tokens()
            .iter()
            .map(|t| t.to_record())
            .collect()
    }

    pub fn refresh_token(&self, vendor: Vendor) -> Result<()> {
        Err(PushError::Unsupported {
            vendor,
            operation: "refreshToken",
        })
    }

    pub fn delete_token(&self, vendor: Vendor) -> Result<()> {
        Err(PushError::Unsupported {
            vendor,
            operation: "deleteToken",
        })
    }

    // -- vendor operations -----------------------------------------------------

    pub async fn enable_notification(&self, vendor: Option<Vendor>) -> Result<()> {
        self.engine.set_notifications_enabled(vendor, true).await
    }

    pub async fn disable_notification(&self, vendor: Option<Vendor>) -> Result<()> {
        self.engine.set_notifications_enabled(vendor, false).await
    }

    pub async fn set_alias(&self, alias: &str) -> Result<()> {
        self.engine.set_alias(alias).await
    }

    pub async fn set_tags(&self, tags: &[String]) -> Result<()> {
        self.engine.set_tags(tags).await
    }

    // -- badge -------------------------------------------------------------------

    pub fn set_badge(&self, count: u32, vendor: Option<Vendor>) -> bool {
        self.badge.set(count, vendor)
    }

    pub fn get_badge(&self, vendor: Option<Vendor>) -> u32 {
        self.badge.get(vendor)
    }

    // -- manifest ----------------------------------------------------------------

    /// Vendor credentials declared in the app manifest, as flat keys such
    /// as `xiaomi_app_id`.
    pub fn get_manifest_config(&self) -> Result<BTreeMap<String, String>> {
        let meta = self.engine.bridge().manifest_meta()?;
        Ok(resolve_manifest(&meta))
    }

    // -- events ------------------------------------------------------------------

    /// Subscribe to events, replacing any previous subscriber.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.engine.subscribe(),
        }
    }

    /// Stop all registrations and release the event stream and ingress.
    /// Tokens already received stay readable.
    pub fn cleanup(&self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use wxtpush_bridge::stub::StubBridge;

    use super::*;

    fn manager(bridge: StubBridge) -> PushManager {
        PushManager::new(Arc::new(bridge), PushConfig::default())
    }

    #[test]
    fn refresh_and_delete_are_unsupported() {
        let m = manager(StubBridge::default());
        assert!(matches!(
            m.refresh_token(Vendor::Oppo),
            Err(PushError::Unsupported {
                operation: "refreshToken",
                ..
            })
        ));
        assert!(matches!(
            m.delete_token(Vendor::Apple),
            Err(PushError::Unsupported {
                operation: "deleteToken",
                ..
            })
        ));
    }

    #[test]
    fn manifest_config_resolves_native_keys() {
        let m = manager(
            StubBridge::default()
                .with_manifest_entry("com.vivo.push.app_id", "105")
                .with_manifest_entry("com.vivo.push.api_key", "vk"),
        );
        let flat = m.get_manifest_config().unwrap();
        assert_eq!(flat["vivo_app_id"], "105");
        assert_eq!(flat["vivo_app_key"], "vk");
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_from_manifest_registers() {
        let m = manager(
            StubBridge::default()
                .with_manifest_entry("XIAOMI_APP_ID", "100")
                .with_manifest_entry("XIAOMI_APP_KEY", "abc"),
        );
        let mut events = m.subscribe();
        m.initialize_from_manifest(Vendor::Xiaomi).await.unwrap();
        let env = events.next().await.unwrap();
        assert_eq!(env.event, "tokenReceived");
        assert_eq!(m.get_token(Vendor::Xiaomi).unwrap().vendor, "xiaomi");
    }

    #[tokio::test(start_paused = true)]
    async fn manifest_without_credentials_is_rejected() {
        let m = manager(StubBridge::default());
        let err = m.initialize_from_manifest(Vendor::Oppo).await.unwrap_err();
        assert!(matches!(err, PushError::Configuration { .. }));
    }
}
