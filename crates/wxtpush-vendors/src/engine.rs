// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Push engine: owns the SDK registry, token store, event router and one
// orchestrator per initialized vendor, and routes raw callbacks to them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, instrument, warn};

use wxtpush_bridge::ingress;
use wxtpush_bridge::traits::{CallbackSink, PlatformBridge, VendorSdk};
use wxtpush_core::error::{PushError, Result};
use wxtpush_core::{
    NormalizedEvent, PushConfig, PushToken, RawCallback, RegistrationPhase, Vendor, VendorConfig,
};

use crate::normalizer::CallbackNormalizer;
use crate::orchestrator::{ambient_event, Mailbox, Shared, Worker};
use crate::parcel::MethodTable;
use crate::probe::SdkRegistry;
use crate::profiles::profile;
use crate::router::EventRouter;
use crate::token_store::TokenStore;

type Workers = Arc<RwLock<HashMap<Vendor, Worker>>>;

/// Routes normalized callbacks to the orchestrator of their vendor.
#[derive(Clone)]
struct Dispatcher {
    normalizer: Arc<CallbackNormalizer>,
    workers: Workers,
    router: EventRouter,
}

impl Dispatcher {
    fn mailbox(&self, vendor: Vendor) -> Option<Mailbox> {
        self.workers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&vendor)
            .map(|w| w.mailbox().clone())
    }

    fn dispatch(&self, raw: RawCallback) {
        let (vendor, signal) = match self.normalizer.normalize(raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(error = %e, "callback could not be normalized");
                return;
            }
        };
        let signal = match self.mailbox(vendor) {
            Some(mailbox) => match mailbox.signal(signal) {
                None => return,
                Some(returned) => returned,
            },
            None => signal,
        };
        // No orchestrator: messages and permission reports still reach the
        // application.
        if let Some(event) = ambient_event(vendor, signal) {
            self.router.publish(event);
        }
    }
}

/// The registration engine behind the plugin's method surface.
pub struct PushEngine {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    sink: CallbackSink,
}

impl PushEngine {
    pub fn new(bridge: Arc<dyn PlatformBridge>, settings: PushConfig) -> Self {
        let normalizer =
            CallbackNormalizer::with_heytap_table(MethodTable::heytap_from_stub(&*bridge));
        info!(platform = bridge.platform_name(), "push engine created");
        let shared = Arc::new(Shared {
            settings,
            registry: Arc::new(SdkRegistry::new(bridge)),
            store: TokenStore::new(),
            router: EventRouter::new(),
        });
        let dispatcher = Dispatcher {
            normalizer: Arc::new(normalizer),
            workers: Arc::new(RwLock::new(HashMap::new())),
            router: shared.router.clone(),
        };
        let d = dispatcher.clone();
        let sink = CallbackSink::new(move |raw| d.dispatch(raw));
        Self {
            shared,
            dispatcher,
            sink,
        }
    }

    pub fn settings(&self) -> &PushConfig {
        &self.shared.settings
    }

    pub fn bridge(&self) -> &Arc<dyn PlatformBridge> {
        self.shared.registry.bridge()
    }

    pub fn is_available(&self, vendor: Vendor) -> bool {
        self.shared.registry.is_available(vendor)
    }

    /// Sink that routes raw callbacks into this engine.
    pub fn sink(&self) -> CallbackSink {
        self.sink.clone()
    }

    /// Normalize and route one raw callback.
    pub fn dispatch(&self, raw: RawCallback) {
        self.dispatcher.dispatch(raw);
    }

    /// Make this engine the receiver of the process-wide callback ingress.
    pub fn install_ingress(&self) {
        ingress::install(self.sink());
    }

    fn mailbox_or_spawn(&self, vendor: Vendor) -> Mailbox {
        let mut workers = self
            .dispatcher
            .workers
            .write()
            .unwrap_or_else(|e| e.into_inner());
        workers
            .entry(vendor)
            .or_insert_with(|| Worker::spawn(vendor, Arc::clone(&self.shared), self.sink()))
            .mailbox()
            .clone()
    }

    /// Start registration for `vendor` with the channel's config map.
    ///
    /// Fails straight away on a malformed or incomplete configuration, in
    /// which case no event follows. Otherwise it resolves once the attempt
    /// is accepted; the outcome arrives as `tokenReceived` or `tokenError`.
    #[instrument(skip_all, fields(%vendor))]
    pub async fn initialize(&self, vendor: Vendor, config: &Map<String, Value>) -> Result<()> {
        match VendorConfig::from_map(config) {
            Ok(config) => self.initialize_with(vendor, config).await,
            Err(e) => Err(self.reject(vendor, e)),
        }
    }

    /// Start registration from an already parsed configuration.
    pub async fn initialize_with(&self, vendor: Vendor, config: VendorConfig) -> Result<()> {
        if let Err(e) = config.validate(vendor) {
            return Err(self.reject(vendor, e));
        }
        self.mailbox_or_spawn(vendor).initialize(config).await
    }

    /// A rejected configuration still ends the vendor's previous attempt.
    fn reject(&self, vendor: Vendor, err: PushError) -> PushError {
        warn!(%vendor, error = %err, "initialize rejected");
        self.mailbox_or_spawn(vendor).reject();
        err
    }

    pub fn token(&self, vendor: Vendor) -> Option<PushToken> {
        self.shared.store.get(vendor)
    }

    pub fn all_tokens(&self) -> Vec<PushToken> {
        self.shared.store.all()
    }

    pub fn initialized_vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<Vendor> = self
            .dispatcher
            .workers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        vendors.sort();
        vendors
    }

    pub async fn phase(&self, vendor: Vendor) -> RegistrationPhase {
        match self.dispatcher.mailbox(vendor) {
            Some(mailbox) => mailbox
                .snapshot()
                .await
                .map(|s| s.phase)
                .unwrap_or(RegistrationPhase::Uninitialized),
            None => RegistrationPhase::Uninitialized,
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<NormalizedEvent> {
        self.shared.router.subscribe()
    }

    pub fn unsubscribe(&self) {
        self.shared.router.unsubscribe();
    }

    // -- vendor operations ------------------------------------------------------

    /// Run `op` against the vendor's SDK off the async runtime. Vendors on
    /// the simulated path have nothing to call and succeed.
    async fn with_sdk<F>(&self, vendor: Vendor, operation: &'static str, op: F) -> Result<()>
    where
        F: FnOnce(&dyn VendorSdk) -> Result<()> + Send + 'static,
    {
        let Some(sdk) = self.shared.registry.adapter(vendor) else {
            debug!(%vendor, operation, "simulated path, nothing to do");
            return Ok(());
        };
        if let Some(mailbox) = self.dispatcher.mailbox(vendor) {
            if mailbox.snapshot().await.is_ok_and(|s| s.simulated) {
                debug!(%vendor, operation, "simulated path, nothing to do");
                return Ok(());
            }
        }
        tokio::task::spawn_blocking(move || op(&*sdk))
            .await
            .map_err(|e| PushError::Unknown(format!("{operation} panicked: {e}")))?
    }

    /// Run `operation` on each target vendor, logging failures. The first
    /// failure is returned after every vendor has been tried.
    async fn for_each<F>(&self, targets: Vec<Vendor>, operation: &'static str, op: F) -> Result<()>
    where
        F: Fn(&dyn VendorSdk) -> Result<()> + Clone + Send + 'static,
    {
        let mut first_err = None;
        for vendor in targets {
            match self.with_sdk(vendor, operation, op.clone()).await {
                Ok(()) => debug!(%vendor, operation, "done"),
                Err(e @ PushError::Unsupported { .. }) => {
                    warn!(%vendor, operation, error = %e, "operation not supported, skipped");
                }
                Err(e) => {
                    warn!(%vendor, operation, error = %e, "operation failed");
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Toggle notifications for one vendor, or every initialized vendor.
    pub async fn set_notifications_enabled(&self, vendor: Option<Vendor>, enabled: bool) -> Result<()> {
        let targets = vendor.map_or_else(|| self.initialized_vendors(), |v| vec![v]);
        let operation = if enabled {
            "enableNotification"
        } else {
            "disableNotification"
        };
        self.for_each(targets, operation, move |sdk| {
            sdk.set_notifications_enabled(enabled)
        })
        .await
    }

    /// Set the alias on every initialized vendor that supports aliases.
    pub async fn set_alias(&self, alias: &str) -> Result<()> {
        let alias = alias.trim().to_owned();
        if alias.is_empty() {
            return Err(PushError::InvalidArguments("alias must not be empty".into()));
        }
        let targets = self.supporting("setAlias", |v| profile(v).supports_alias);
        self.for_each(targets, "setAlias", move |sdk| sdk.set_alias(&alias))
            .await
    }

    /// Replace the tags on every initialized vendor that supports tags.
    pub async fn set_tags(&self, tags: &[String]) -> Result<()> {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        let targets = self.supporting("setTags", |v| profile(v).supports_tags);
        self.for_each(targets, "setTags", move |sdk| sdk.set_tags(&tags))
            .await
    }

    /// Initialized vendors with the capability; the rest are warned about.
    fn supporting(&self, operation: &'static str, supports: impl Fn(Vendor) -> bool) -> Vec<Vendor> {
        self.initialized_vendors()
            .into_iter()
            .filter(|v| {
                let ok = supports(*v);
                if !ok {
                    let e = PushError::Unsupported {
                        vendor: *v,
                        operation,
                    };
                    warn!(vendor = %v, error = %e, "skipped");
                }
                ok
            })
            .collect()
    }

    /// Stop every orchestrator, drop the subscriber and release the ingress.
    /// Stored tokens are kept.
    pub fn shutdown(&self) {
        let workers: Vec<Worker> = self
            .dispatcher
            .workers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, w)| w)
            .collect();
        let stopped = workers.len();
        for w in workers {
            w.stop();
        }
        self.shared.router.unsubscribe();
        ingress::uninstall(&self.sink);
        info!(stopped, "push engine shut down");
    }
}

impl Drop for PushEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wxtpush_bridge::stub::StubBridge;
    use wxtpush_bridge::traits::{NudgeAction, RegisterOutcome};
    use wxtpush_core::{FailureReason, MessageKind};

    use super::*;
    use crate::parcel::ParcelWriter;
    use crate::testing::ScriptedSdk;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    fn engine_with(sdk: ScriptedSdk, brand: &str) -> (PushEngine, Arc<ScriptedSdk>) {
        let sdk = Arc::new(sdk);
        let bridge = StubBridge::default()
            .with_brand(brand)
            .with_sdk(Arc::clone(&sdk) as Arc<dyn VendorSdk>);
        (PushEngine::new(Arc::new(bridge), PushConfig::default()), sdk)
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_path_emits_token() {
        let engine = PushEngine::new(Arc::new(StubBridge::default()), PushConfig::default());
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Vivo, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        match rx.recv().await {
            Some(NormalizedEvent::TokenReceived { vendor, token }) => {
                assert_eq!(vendor, Vendor::Vivo);
                assert!(token.starts_with("vivo_sim_"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(engine.phase(Vendor::Vivo).await, RegistrationPhase::Registered);
        assert!(engine.token(Vendor::Vivo).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn synchronous_token_from_sdk() {
        let sdk = ScriptedSdk::new(Vendor::Huawei)
            .on_register(|_, _| Ok(RegisterOutcome::Token("HMS_TOKEN".into())));
        let (engine, sdk) = engine_with(sdk, "HUAWEI");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Huawei, &map(json!({"appId": "10"})))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived {
                vendor: Vendor::Huawei,
                token: "HMS_TOKEN".into()
            })
        );
        assert_eq!(sdk.register_scopes(), vec![Some("HCM".to_owned())]);
    }

    #[tokio::test(start_paused = true)]
    async fn hms_scope_fallback() {
        let sdk = ScriptedSdk::new(Vendor::Huawei).on_register(|scope, _| match scope {
            Some("") => Ok(RegisterOutcome::Token("EMPTY_SCOPE_TOKEN".into())),
            _ => Err(PushError::VendorProtocol {
                vendor: Vendor::Huawei,
                code: 907_135_701,
                reason: "scope".into(),
            }),
        });
        let (engine, sdk) = engine_with(sdk, "HUAWEI");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Huawei, &map(json!({"appId": "10"})))
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token == "EMPTY_SCOPE_TOKEN"
        ));
        assert_eq!(
            sdk.register_scopes(),
            vec![Some("HCM".to_owned()), Some(String::new())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn vendor_failure_code_becomes_token_error() {
        let sdk = ScriptedSdk::new(Vendor::Honor).on_register(|_, sink| {
            sink.deliver(RawCallback::Failure {
                vendor: Vendor::Honor,
                code: 8_002_008,
                message: "cert".into(),
            });
            Ok(RegisterOutcome::Pending)
        });
        let (engine, _) = engine_with(sdk, "HONOR");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Honor, &map(json!({"appId": "1"})))
            .await
            .unwrap();
        match rx.recv().await {
            Some(NormalizedEvent::TokenError { vendor, message, .. }) => {
                assert_eq!(vendor, Vendor::Honor);
                assert!(message.contains("8002008"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(engine.phase(Vendor::Honor).await, RegistrationPhase::Failed);
        assert!(engine.token(Vendor::Honor).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sdk_unavailable_falls_back_to_simulated() {
        let sdk = ScriptedSdk::new(Vendor::Xiaomi)
            .on_register(|_, _| Err(PushError::SdkUnavailable(Vendor::Xiaomi)));
        let (engine, _) = engine_with(sdk, "Xiaomi");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Xiaomi, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token.starts_with("xiaomi_sim_")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn heytap_nudge_recovers_stalled_registration() {
        let sdk = ScriptedSdk::new(Vendor::Oppo).on_nudge(|action| match action {
            NudgeAction::QueryToken => Ok(Some("LATE_RID".into())),
            NudgeAction::Register => Ok(None),
        });
        let (engine, sdk) = engine_with(sdk, "OPPO");
        let mut rx = engine.subscribe();
        engine
            .initialize(
                Vendor::Oppo,
                &map(json!({"appKey": "k", "appSecret": "s"})),
            )
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token == "LATE_RID"
        ));
        // Register nudge at 600 ms, query at 1600 ms; nothing after.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sdk.nudges(), vec![NudgeAction::Register, NudgeAction::QueryToken]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn heytap_ordinals_follow_the_linked_stub() {
        let descriptor = "com.heytap.msp.push.callback.ICallBackResultService";
        let mut w = ParcelWriter::new();
        w.write_interface_token(descriptor)
            .write_i32(0)
            .write_string16(Some("OPPO_RID"))
            .write_string16(Some("com.example"));
        let parcel = w.into_bytes();
        let sdk = Arc::new(ScriptedSdk::new(Vendor::Oppo).on_register(move |_, sink| {
            sink.deliver(RawCallback::Transaction {
                vendor: Vendor::Oppo,
                code: 21,
                parcel: parcel.clone(),
            });
            Ok(RegisterOutcome::Pending)
        }));
        let bridge = StubBridge::default()
            .with_brand("OPPO")
            .with_static_int(format!("{descriptor}$Stub"), "TRANSACTION_onRegister", 21)
            .with_sdk(Arc::clone(&sdk) as Arc<dyn VendorSdk>);
        let engine = PushEngine::new(Arc::new(bridge), PushConfig::default());
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Oppo, &map(json!({"appKey": "k", "appSecret": "s"})))
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token == "OPPO_RID"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn vivo_queries_after_service_ready() {
        let sdk = ScriptedSdk::new(Vendor::Vivo)
            .on_register(|_, sink| {
                sink.deliver(RawCallback::Invocation {
                    vendor: Vendor::Vivo,
                    method: "onStateChanged".into(),
                    args: vec![wxtpush_core::ArgValue::Int(0)],
                });
                Ok(RegisterOutcome::Pending)
            })
            .on_current_token(|| Ok(Some("VIVO_REG".into())));
        let (engine, _) = engine_with(sdk, "vivo");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Vivo, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token == "VIVO_REG"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn messages_without_orchestrator_still_published() {
        let engine = PushEngine::new(Arc::new(StubBridge::default()), PushConfig::default());
        let mut rx = engine.subscribe();
        engine.dispatch(RawCallback::Message {
            vendor: Vendor::Apple,
            kind: MessageKind::Clicked,
            payload: map(json!({"title": "t"})),
        });
        engine.dispatch(RawCallback::Direct {
            vendor: Vendor::Apple,
            token: Some("stray".into()),
        });
        engine.dispatch(RawCallback::Permission {
            vendor: Vendor::Apple,
            granted: false,
        });
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::MessageClicked { .. })
        ));
        assert_eq!(
            rx.recv().await,
            Some(NormalizedEvent::PermissionChanged {
                vendor: Vendor::Apple,
                granted: false
            })
        );
        assert!(engine.token(Vendor::Apple).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn token_refresh_after_registration() {
        let sdk = ScriptedSdk::new(Vendor::Huawei)
            .on_register(|_, _| Ok(RegisterOutcome::Token("T1".into())));
        let (engine, _) = engine_with(sdk, "HUAWEI");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Huawei, &map(json!({"appId": "10"})))
            .await
            .unwrap();
        rx.recv().await;
        engine.dispatch(RawCallback::Invocation {
            vendor: Vendor::Huawei,
            method: "onNewToken".into(),
            args: vec![wxtpush_core::ArgValue::Str(Some("T2".into()))],
        });
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenReceived { ref token, .. }) if token == "T2"
        ));
        assert_eq!(engine.token(Vendor::Huawei).map(|t| t.token), Some("T2".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_registration_is_vendor_error() {
        let sdk = ScriptedSdk::new(Vendor::Xiaomi)
            .on_register(|_, _| Ok(RegisterOutcome::Token("MI".into())));
        let (engine, _) = engine_with(sdk, "Xiaomi");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Xiaomi, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        rx.recv().await;
        engine.dispatch(RawCallback::Broadcast {
            vendor: Some(Vendor::Xiaomi),
            action: crate::normalizer::MIPUSH_RECEIVE_MESSAGE.into(),
            extras: map(json!({"key_command": "subscribe-topic", "key_result_code": 70000002})),
        });
        match rx.recv().await {
            Some(NormalizedEvent::VendorError { vendor, message }) => {
                assert_eq!(vendor, Vendor::Xiaomi);
                assert!(message.starts_with("subscribe-topic failed"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(engine.phase(Vendor::Xiaomi).await, RegistrationPhase::Registered);
    }

    #[tokio::test(start_paused = true)]
    async fn alias_and_tags_only_reach_mipush() {
        let sdk = ScriptedSdk::new(Vendor::Xiaomi)
            .on_register(|_, _| Ok(RegisterOutcome::Token("MI".into())));
        let (engine, sdk) = engine_with(sdk, "Xiaomi");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Xiaomi, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        engine
            .initialize(Vendor::Vivo, &map(json!({"appId": "1", "appKey": "k"})))
            .await
            .unwrap();
        rx.recv().await;
        engine.set_alias("user-1").await.unwrap();
        engine
            .set_tags(&["a".to_owned(), " ".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        assert!(sdk.calls().contains(&"setAlias(user-1)".to_owned()));
        assert!(sdk.calls().contains(&"setTags(a,b)".to_owned()));
        assert!(engine.set_alias("  ").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_token_is_a_failure() {
        let sdk = ScriptedSdk::new(Vendor::Honor)
            .on_register(|_, _| Ok(RegisterOutcome::Token(" ".into())));
        let (engine, _) = engine_with(sdk, "HONOR");
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Honor, &map(json!({"appId": "1"})))
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TokenError {
                reason: FailureReason::EmptyToken,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_keeps_tokens() {
        let engine = PushEngine::new(Arc::new(StubBridge::default()), PushConfig::default());
        let mut rx = engine.subscribe();
        engine
            .initialize(Vendor::Apple, &Map::new())
            .await
            .unwrap();
        rx.recv().await;
        engine.shutdown();
        assert!(engine.initialized_vendors().is_empty());
        assert!(engine.token(Vendor::Apple).is_some());
        assert_eq!(engine.phase(Vendor::Apple).await, RegistrationPhase::Uninitialized);
        assert_eq!(rx.recv().await, None);
    }
}
