// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-vendor registration orchestrator.
//
// Each vendor gets one actor task that owns its registration state. Every
// transition happens inside that task, so no two transitions of the same
// vendor ever overlap, while different vendors run fully in parallel.
//
// Blocking SDK calls run on the blocking pool, one at a time per vendor;
// a call requested while another is still running waits for it. Their
// results, timers and vendor callbacks all come back as commands tagged with
// the epoch that issued them. Re-initializing bumps the epoch, so anything
// still in flight from an earlier attempt is ignored when it lands.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

use wxtpush_bridge::traits::{CallbackSink, NudgeAction, RegisterOutcome, VendorSdk};
use wxtpush_core::error::{PushError, Result};
use wxtpush_core::reasons::{classify, describe_status};
use wxtpush_core::{
    redact, FailureReason, MessageKind, NormalizedEvent, PushConfig, PushToken, RegistrationPhase,
    Vendor, VendorConfig,
};

use crate::normalizer::Signal;
use crate::nudge::NudgePlan;
use crate::probe::SdkRegistry;
use crate::profiles::{profile, ExistingTokenCheck, VendorProfile};
use crate::router::EventRouter;
use crate::simulated::{simulated_token, UNKNOWN_DEVICE};
use crate::token_store::TokenStore;

/// State shared by every orchestrator of one engine.
pub struct Shared {
    pub settings: PushConfig,
    pub registry: Arc<SdkRegistry>,
    pub store: TokenStore,
    pub router: EventRouter,
}

/// Timer purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Warmup,
    Nudge(NudgeAction),
    ReadyQuery,
}

/// One blocking SDK call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Init,
    ExistingToken,
    Register { scope: Option<&'static str> },
    Nudge(NudgeAction),
    QueryToken,
}

/// Result of a blocking SDK call.
#[derive(Debug)]
pub enum StepResult {
    Init(Result<()>),
    ExistingToken(Result<Option<String>>),
    Register(Result<RegisterOutcome>),
    Nudge(Result<Option<String>>),
    QueryToken(Result<Option<String>>),
}

impl Step {
    fn run(self, sdk: &dyn VendorSdk, config: &VendorConfig, sink: CallbackSink) -> StepResult {
        match self {
            Step::Init => StepResult::Init(sdk.init(config)),
            Step::ExistingToken => StepResult::ExistingToken(sdk.current_token()),
            Step::Register { scope } => StepResult::Register(sdk.register(config, scope, sink)),
            Step::Nudge(action) => StepResult::Nudge(sdk.nudge(action)),
            Step::QueryToken => StepResult::QueryToken(sdk.current_token()),
        }
    }

    fn failed(self, err: PushError) -> StepResult {
        match self {
            Step::Init => StepResult::Init(Err(err)),
            Step::ExistingToken => StepResult::ExistingToken(Err(err)),
            Step::Register { .. } => StepResult::Register(Err(err)),
            Step::Nudge(_) => StepResult::Nudge(Err(err)),
            Step::QueryToken => StepResult::QueryToken(Err(err)),
        }
    }
}

/// Point-in-time view of one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: RegistrationPhase,
    /// The current attempt runs on the simulated path.
    pub simulated: bool,
    pub epoch: u64,
}

/// Messages handled by an orchestrator.
#[derive(Debug)]
pub enum Command {
    /// Start a registration with an already validated configuration.
    Initialize {
        config: VendorConfig,
        reply: oneshot::Sender<()>,
    },
    /// The configuration for a new attempt failed validation.
    Reject,
    Signal(Signal),
    Timer {
        epoch: u64,
        kind: TimerKind,
    },
    StepDone {
        epoch: u64,
        result: StepResult,
    },
    SimulatedToken {
        epoch: u64,
        token: std::result::Result<String, String>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown,
}

/// Event for a signal that arrives outside any registration attempt.
pub fn ambient_event(vendor: Vendor, signal: Signal) -> Option<NormalizedEvent> {
    match signal {
        Signal::Message { kind, payload } => Some(match kind {
            MessageKind::Clicked => NormalizedEvent::MessageClicked { vendor, payload },
            MessageKind::Received | MessageKind::Arrived => {
                NormalizedEvent::MessageReceived { vendor, payload }
            }
        }),
        Signal::Permission(granted) => Some(NormalizedEvent::PermissionChanged { vendor, granted }),
        Signal::Failure { message, .. } => Some(NormalizedEvent::VendorError { vendor, message }),
        Signal::Status { operation, code } if code != 0 => Some(NormalizedEvent::VendorError {
            vendor,
            message: format!(
                "{operation} failed: {}",
                describe_status(vendor, code).message()
            ),
        }),
        Signal::Status { operation, .. } => {
            debug!(%vendor, %operation, "vendor command succeeded");
            None
        }
        Signal::Token(token) => {
            debug!(%vendor, token = %redact(&token), "token with no registration in progress dropped");
            None
        }
        Signal::ServiceReady => None,
        Signal::Ignored(method) => {
            trace!(%vendor, %method, "callback ignored");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable address of an orchestrator.
#[derive(Debug, Clone)]
pub struct Mailbox {
    vendor: Vendor,
    tx: UnboundedSender<Command>,
}

impl Mailbox {
    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn stopped(&self) -> PushError {
        PushError::Unknown(format!("{} orchestrator is not running", self.vendor))
    }

    pub fn send(&self, cmd: Command) -> bool {
        self.tx.send(cmd).is_ok()
    }

    /// Hand a validated configuration over. Resolves once the orchestrator
    /// has accepted it; the outcome arrives as an event.
    pub async fn initialize(&self, config: VendorConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Initialize { config, reply }) {
            return Err(self.stopped());
        }
        rx.await.map_err(|_| self.stopped())
    }

    pub fn reject(&self) {
        self.send(Command::Reject);
    }

    /// Queue a signal. Hands it back when the orchestrator has stopped.
    pub fn signal(&self, signal: Signal) -> Option<Signal> {
        match self.tx.send(Command::Signal(signal)) {
            Ok(()) => None,
            Err(mpsc::error::SendError(Command::Signal(signal))) => Some(signal),
            Err(_) => None,
        }
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Snapshot { reply }) {
            return Err(self.stopped());
        }
        rx.await.map_err(|_| self.stopped())
    }
}

/// A running orchestrator task.
#[derive(Debug)]
pub struct Worker {
    mailbox: Mailbox,
    task: JoinHandle<()>,
}

impl Worker {
    /// Spawn the orchestrator for `vendor`. `sink` is handed to the SDK on
    /// every registration call.
    pub fn spawn(vendor: Vendor, shared: Arc<Shared>, sink: CallbackSink) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(vendor, shared, sink, tx.downgrade());
        let task = tokio::spawn(orchestrator.run(rx));
        Self {
            mailbox: Mailbox { vendor, tx },
            task,
        }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Stop the task. Pending timers are cancelled when the actor drops;
    /// SDK calls already on the blocking pool run to completion and are
    /// discarded.
    pub fn stop(self) {
        self.mailbox.send(Command::Shutdown);
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Path {
    Idle,
    Simulated,
    Sdk(Arc<dyn VendorSdk>),
}

struct Orchestrator {
    vendor: Vendor,
    profile: &'static VendorProfile,
    shared: Arc<Shared>,
    sink: CallbackSink,
    tx: WeakUnboundedSender<Command>,

    phase: RegistrationPhase,
    config: Option<VendorConfig>,
    last_token: Option<String>,
    epoch: u64,
    path: Path,
    scope_index: usize,
    timeout: Duration,
    started: Instant,
    timers: Vec<JoinHandle<()>>,

    busy: bool,
    queued: VecDeque<Step>,
}

impl Orchestrator {
    fn new(
        vendor: Vendor,
        shared: Arc<Shared>,
        sink: CallbackSink,
        tx: WeakUnboundedSender<Command>,
    ) -> Self {
        let timeout = shared.settings.registration_timeout(None);
        Self {
            vendor,
            profile: profile(vendor),
            shared,
            sink,
            tx,
            phase: RegistrationPhase::Uninitialized,
            config: None,
            last_token: None,
            epoch: 0,
            path: Path::Idle,
            scope_index: 0,
            timeout,
            started: Instant::now(),
            timers: Vec::new(),
            busy: false,
            queued: VecDeque::new(),
        }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        debug!(vendor = %self.vendor, "orchestrator started");
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Initialize { config, reply } => {
                    // Acceptance is acknowledged before any work starts.
                    let _ = reply.send(());
                    self.initialize(config);
                }
                Command::Reject => self.reject(),
                Command::Signal(signal) => self.on_signal(signal),
                Command::Timer { epoch, kind } if epoch == self.epoch => self.on_timer(kind),
                Command::Timer { .. } => {}
                Command::StepDone { epoch, result } => {
                    self.busy = false;
                    if epoch == self.epoch {
                        self.on_step(result);
                    }
                    self.pump();
                }
                Command::SimulatedToken { epoch, token } if epoch == self.epoch => match token {
                    Ok(token) => self.accept_token(token),
                    Err(e) => self.fail(
                        FailureReason::Unknown { code: None },
                        format!("simulated token derivation failed: {e}"),
                    ),
                },
                Command::SimulatedToken { .. } => {}
                Command::Snapshot { reply } => {
                    let _ = reply.send(Snapshot {
                        phase: self.phase,
                        simulated: matches!(self.path, Path::Simulated),
                        epoch: self.epoch,
                    });
                }
                Command::Shutdown => break,
            }
        }
        debug!(vendor = %self.vendor, "orchestrator stopped");
    }

    // -- lifecycle ----------------------------------------------------------

    #[instrument(skip_all, fields(vendor = %self.vendor))]
    fn initialize(&mut self, config: VendorConfig) {
        if self.phase == RegistrationPhase::Registered && self.config.as_ref() == Some(&config) {
            if let Some(token) = self.cached_token() {
                info!(token = %redact(&token), "already registered, re-emitting cached token");
                self.publish(NormalizedEvent::TokenReceived {
                    vendor: self.vendor,
                    token,
                });
                return;
            }
        }

        self.restart();
        self.timeout = self
            .shared
            .settings
            .registration_timeout(config.register_timeout_ms);
        self.config = Some(config);
        self.phase = RegistrationPhase::Initializing;
        self.started = Instant::now();
        self.schedule(self.timeout, TimerKind::Timeout);
        info!(
            epoch = self.epoch,
            timeout_ms = self.timeout.as_millis() as u64,
            "registration started"
        );

        match self.shared.registry.adapter(self.vendor) {
            Some(sdk) => {
                self.path = Path::Sdk(sdk);
                self.run_step(Step::Init);
            }
            None => self.start_simulated(),
        }
    }

    fn cached_token(&self) -> Option<String> {
        let stored = self.shared.store.get(self.vendor)?;
        (self.last_token.as_deref() == Some(stored.token.as_str())).then_some(stored.token)
    }

    /// Tear down the previous attempt and open a new epoch.
    fn restart(&mut self) {
        self.cancel_timers();
        self.queued.clear();
        self.epoch += 1;
        self.scope_index = 0;
        self.path = Path::Idle;
        self.last_token = None;
        self.shared.store.clear(self.vendor);
    }

    fn reject(&mut self) {
        self.restart();
        self.config = None;
        self.phase = RegistrationPhase::Failed;
        debug!(vendor = %self.vendor, "configuration rejected");
    }

    fn start_simulated(&mut self) {
        self.path = Path::Simulated;
        self.phase = RegistrationPhase::AwaitingToken;
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let vendor = self.vendor;
        let epoch = self.epoch;
        // The token must land well inside the attempt's timeout.
        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        let delay = self.shared.settings.simulated_delay().min(remaining / 2);
        let config = self.config.clone().unwrap_or_default();
        let bridge = Arc::clone(self.shared.registry.bridge());
        info!(%vendor, delay_ms = delay.as_millis() as u64, "using simulated token path");

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let derived = tokio::task::spawn_blocking(move || {
                let device = match bridge.device_id() {
                    Ok(id) if !id.is_empty() => id,
                    Ok(_) => UNKNOWN_DEVICE.to_owned(),
                    Err(e) => {
                        warn!(%vendor, error = %e, "device id unavailable");
                        UNKNOWN_DEVICE.to_owned()
                    }
                };
                simulated_token(vendor, &device, &config)
            })
            .await
            .map_err(|e| e.to_string());
            let _ = tx.send(Command::SimulatedToken {
                epoch,
                token: derived,
            });
        });
        self.timers.push(handle);
    }

    // -- timers ---------------------------------------------------------------

    fn schedule(&mut self, after: Duration, kind: TimerKind) {
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(Command::Timer { epoch, kind });
        });
        self.timers.push(handle);
    }

    fn cancel_timers(&mut self) {
        for t in self.timers.drain(..) {
            t.abort();
        }
    }

    fn in_registration(&self) -> bool {
        matches!(
            self.phase,
            RegistrationPhase::Initializing | RegistrationPhase::AwaitingToken
        )
    }

    fn on_timer(&mut self, kind: TimerKind) {
        if !self.in_registration() {
            return;
        }
        match kind {
            TimerKind::Timeout => {
                let elapsed_ms = self.started.elapsed().as_millis() as u64;
                let err = PushError::RegistrationTimeout {
                    vendor: self.vendor,
                    elapsed_ms,
                };
                self.fail(FailureReason::Timeout, err.to_string());
            }
            TimerKind::Warmup => self.register(),
            TimerKind::Nudge(action) => {
                if self.phase == RegistrationPhase::AwaitingToken {
                    debug!(vendor = %self.vendor, ?action, "nudging stalled registration");
                    self.run_step(Step::Nudge(action));
                }
            }
            TimerKind::ReadyQuery => self.run_step(Step::QueryToken),
        }
    }

    // -- SDK steps ------------------------------------------------------------

    fn run_step(&mut self, step: Step) {
        if self.busy {
            trace!(vendor = %self.vendor, ?step, "SDK busy, step queued");
            self.queued.push_back(step);
        } else {
            self.spawn_step(step);
        }
    }

    fn pump(&mut self) {
        if !self.busy {
            if let Some(step) = self.queued.pop_front() {
                self.spawn_step(step);
            }
        }
    }

    fn spawn_step(&mut self, step: Step) {
        let Path::Sdk(sdk) = &self.path else {
            return;
        };
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let sdk = Arc::clone(sdk);
        let config = self.config.clone().unwrap_or_default();
        let sink = self.sink.clone();
        let epoch = self.epoch;
        let vendor = self.vendor;
        self.busy = true;
        trace!(%vendor, ?step, epoch, "SDK call");

        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(move || step.run(&*sdk, &config, sink))
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(%vendor, ?step, error = %e, "SDK call panicked");
                    step.failed(PushError::Unknown(format!("SDK call panicked: {e}")))
                }
            };
            let _ = tx.send(Command::StepDone { epoch, result });
        });
    }

    fn on_step(&mut self, result: StepResult) {
        if !self.in_registration() {
            trace!(vendor = %self.vendor, ?result, "SDK result after registration ended");
            if let StepResult::Register(Ok(RegisterOutcome::Token(t)))
            | StepResult::Nudge(Ok(Some(t)))
            | StepResult::QueryToken(Ok(Some(t))) = result
            {
                self.accept_token(t);
            }
            return;
        }
        match result {
            StepResult::Init(Ok(())) => {
                if self.profile.existing_token == ExistingTokenCheck::BeforeRegister {
                    self.run_step(Step::ExistingToken);
                } else {
                    self.prepare_register();
                }
            }
            StepResult::Init(Err(e)) => self.sdk_error(e),
            StepResult::ExistingToken(Ok(Some(token))) if !token.trim().is_empty() => {
                info!(vendor = %self.vendor, "SDK already holds a token");
                self.accept_token(token);
            }
            StepResult::ExistingToken(other) => {
                if let Err(e) = other {
                    debug!(vendor = %self.vendor, error = %e, "existing token check failed");
                }
                self.prepare_register();
            }
            StepResult::Register(Ok(RegisterOutcome::Token(token))) => self.accept_token(token),
            StepResult::Register(Ok(RegisterOutcome::Pending)) => self.awaiting(),
            StepResult::Register(Err(e)) => {
                if let PushError::VendorProtocol { code, .. } = &e {
                    if self.profile.retries_scope(*code, self.scope_index) {
                        self.scope_index += 1;
                        debug!(
                            vendor = %self.vendor,
                            code,
                            scope = ?self.profile.scope(self.scope_index),
                            "scope rejected, retrying"
                        );
                        self.register();
                        return;
                    }
                }
                self.sdk_error(e);
            }
            StepResult::Nudge(r) | StepResult::QueryToken(r) => match r {
                Ok(Some(token)) if !token.trim().is_empty() => self.accept_token(token),
                Ok(_) => {}
                Err(e) => debug!(vendor = %self.vendor, error = %e, "token query failed"),
            },
        }
    }

    fn prepare_register(&mut self) {
        let warmup = self.shared.settings.service_warmup();
        if self.profile.warmup_before_register && !warmup.is_zero() {
            debug!(vendor = %self.vendor, warmup_ms = warmup.as_millis() as u64, "waiting for service warm-up");
            self.schedule(warmup, TimerKind::Warmup);
        } else {
            self.register();
        }
    }

    fn register(&mut self) {
        let scope = self.profile.scope(self.scope_index);
        self.run_step(Step::Register { scope });
    }

    /// The registration call returned without a token.
    fn awaiting(&mut self) {
        if self.phase != RegistrationPhase::Initializing {
            // A scope retry or a token that raced the call already moved on.
            return;
        }
        self.phase = RegistrationPhase::AwaitingToken;
        debug!(vendor = %self.vendor, "registration pending");

        if self.shared.settings.nudges_enabled {
            let config = self.config.clone().unwrap_or_default();
            let remaining = self.timeout.saturating_sub(self.started.elapsed());
            let plan = NudgePlan::for_vendor(self.vendor, &config, remaining);
            for step in plan.steps() {
                self.schedule(step.at, TimerKind::Nudge(step.action));
            }
        }
        if self.profile.existing_token == ExistingTokenCheck::AfterRegister {
            self.run_step(Step::QueryToken);
        }
    }

    fn sdk_error(&mut self, err: PushError) {
        match err {
            PushError::SdkUnavailable(_) | PushError::PlatformUnavailable => {
                warn!(vendor = %self.vendor, error = %err, "SDK unusable, falling back to simulated token");
                self.queued.clear();
                self.start_simulated();
            }
            other => {
                let reason = classify(&other);
                self.fail(reason, other.to_string());
            }
        }
    }

    // -- outcomes ---------------------------------------------------------------

    fn accept_token(&mut self, token: String) {
        let token = token.trim().to_owned();
        let vendor = self.vendor;
        match self.phase {
            RegistrationPhase::Initializing | RegistrationPhase::AwaitingToken => {
                if token.is_empty() {
                    self.fail(
                        FailureReason::EmptyToken,
                        format!("{} returned an empty token", vendor.display_name()),
                    );
                    return;
                }
                self.cancel_timers();
                self.queued.clear();
                self.phase = RegistrationPhase::Registered;
                self.store_and_emit(token);
                info!(
                    %vendor,
                    elapsed_ms = self.started.elapsed().as_millis() as u64,
                    "registered"
                );
            }
            RegistrationPhase::Registered => {
                if token.is_empty() || self.last_token.as_deref() == Some(token.as_str()) {
                    debug!(%vendor, "duplicate token dropped");
                    return;
                }
                info!(%vendor, token = %redact(&token), "token refreshed");
                self.store_and_emit(token);
            }
            RegistrationPhase::Failed | RegistrationPhase::Uninitialized => {
                debug!(%vendor, phase = %self.phase, "token outside registration dropped");
            }
        }
    }

    fn store_and_emit(&mut self, token: String) {
        self.shared.store.set(PushToken::new(self.vendor, token.clone()));
        self.last_token = Some(token.clone());
        self.publish(NormalizedEvent::TokenReceived {
            vendor: self.vendor,
            token,
        });
    }

    fn fail(&mut self, reason: FailureReason, message: String) {
        if self.phase == RegistrationPhase::Failed {
            return;
        }
        self.cancel_timers();
        self.queued.clear();
        self.phase = RegistrationPhase::Failed;
        self.last_token = None;
        self.shared.store.clear(self.vendor);
        warn!(vendor = %self.vendor, %reason, %message, hint = reason.suggestion(), "registration failed");
        self.publish(NormalizedEvent::TokenError {
            vendor: self.vendor,
            reason,
            message,
        });
    }

    fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Token(token) => self.accept_token(token),
            Signal::Failure {
                code,
                reason,
                message,
            } if self.in_registration() => {
                if let (Some(code), Path::Sdk(_)) = (code, &self.path) {
                    if self.profile.retries_scope(code, self.scope_index) {
                        self.scope_index += 1;
                        self.register();
                        return;
                    }
                }
                self.fail(reason, message);
            }
            Signal::Failure { message, .. } if self.phase == RegistrationPhase::Failed => {
                debug!(vendor = %self.vendor, %message, "failure after registration ended");
            }
            Signal::ServiceReady => {
                if self.profile.query_after_ready && self.in_registration() {
                    let warmup = self.shared.settings.service_warmup();
                    debug!(vendor = %self.vendor, "service ready, querying token after warm-up");
                    self.schedule(warmup, TimerKind::ReadyQuery);
                }
            }
            other => {
                if let Some(event) = ambient_event(self.vendor, other) {
                    self.publish(event);
                }
            }
        }
    }

    fn publish(&self, event: NormalizedEvent) {
        self.shared.router.publish(event);
    }
}

impl Drop for Orchestrator {
    // Runs on a clean shutdown and when the task is aborted mid-await.
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wxtpush_bridge::stub::StubBridge;
    use wxtpush_bridge::traits::PlatformBridge;

    use super::*;
    use crate::testing::ScriptedSdk;

    fn start(
        vendor: Vendor,
        bridge: Arc<dyn PlatformBridge>,
    ) -> (Worker, UnboundedReceiver<NormalizedEvent>) {
        let shared = Arc::new(Shared {
            settings: PushConfig::default(),
            registry: Arc::new(SdkRegistry::new(bridge)),
            store: TokenStore::new(),
            router: EventRouter::new(),
        });
        let events = shared.router.subscribe();
        let worker = Worker::spawn(vendor, shared, CallbackSink::new(|_| {}));
        (worker, events)
    }

    fn huawei(sdk: &Arc<ScriptedSdk>) -> Arc<dyn PlatformBridge> {
        Arc::new(
            StubBridge::default()
                .with_brand("HUAWEI")
                .with_sdk(Arc::clone(sdk) as Arc<dyn VendorSdk>),
        )
    }

    fn config(app_id: &str) -> VendorConfig {
        VendorConfig {
            app_id: Some(app_id.into()),
            register_timeout_ms: Some(5_000),
            ..VendorConfig::default()
        }
    }

    fn token_of(event: Option<NormalizedEvent>) -> Option<String> {
        match event {
            Some(NormalizedEvent::TokenReceived { token, .. }) => Some(token),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn same_config_reemits_cached_token_without_registering() {
        let sdk = Arc::new(
            ScriptedSdk::new(Vendor::Huawei)
                .on_register(|_, _| Ok(RegisterOutcome::Token("HMS_TOKEN".into()))),
        );
        let (worker, mut events) = start(Vendor::Huawei, huawei(&sdk));
        let mailbox = worker.mailbox().clone();

        mailbox.initialize(config("10")).await.unwrap();
        assert_eq!(token_of(events.recv().await).as_deref(), Some("HMS_TOKEN"));

        mailbox.initialize(config("10")).await.unwrap();
        assert_eq!(token_of(events.recv().await).as_deref(), Some("HMS_TOKEN"));
        assert_eq!(sdk.register_calls(), 1);

        let snap = mailbox.snapshot().await.unwrap();
        assert_eq!(snap.phase, RegistrationPhase::Registered);
        assert_eq!(snap.epoch, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reinitialize_after_timeout_starts_clean() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);
        let sdk = Arc::new(ScriptedSdk::new(Vendor::Huawei).on_register(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(RegisterOutcome::Pending)
            } else {
                Ok(RegisterOutcome::Token("SECOND".into()))
            }
        }));
        let (worker, mut events) = start(Vendor::Huawei, huawei(&sdk));
        let mailbox = worker.mailbox().clone();

        mailbox.initialize(config("10")).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(NormalizedEvent::TokenError {
                reason: FailureReason::Timeout,
                ..
            })
        ));
        assert_eq!(
            mailbox.snapshot().await.unwrap().phase,
            RegistrationPhase::Failed
        );

        // Same configuration, but a failed attempt is never short-circuited.
        mailbox.initialize(config("10")).await.unwrap();
        assert_eq!(token_of(events.recv().await).as_deref(), Some("SECOND"));
        assert_eq!(sdk.register_calls(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(events.try_recv().is_err());
        let snap = mailbox.snapshot().await.unwrap();
        assert_eq!(snap.phase, RegistrationPhase::Registered);
        assert_eq!(snap.epoch, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn replaced_attempt_never_times_out() {
        let sdk = Arc::new(ScriptedSdk::new(Vendor::Huawei));
        let (worker, mut events) = start(Vendor::Huawei, huawei(&sdk));
        let mailbox = worker.mailbox().clone();

        mailbox.initialize(config("10")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        mailbox.initialize(config("11")).await.unwrap();

        // Past the first attempt's deadline, short of the second's.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(
            mailbox.snapshot().await.unwrap().phase,
            RegistrationPhase::AwaitingToken
        );

        assert!(mailbox.signal(Signal::Token("LATE_OK".into())).is_none());
        assert_eq!(token_of(events.recv().await).as_deref(), Some("LATE_OK"));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(sdk.register_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_token_beats_a_short_timeout() {
        let bridge: Arc<dyn PlatformBridge> = Arc::new(StubBridge::default());
        let (worker, mut events) = start(Vendor::Xiaomi, bridge);
        let cfg = VendorConfig {
            register_timeout_ms: Some(1_000),
            ..config("100")
        };
        worker.mailbox().initialize(cfg).await.unwrap();
        assert!(token_of(events.recv().await).is_some_and(|t| t.starts_with("xiaomi_sim_")));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_timers() {
        let bridge: Arc<dyn PlatformBridge> = Arc::new(StubBridge::default());
        let (worker, _events) = start(Vendor::Xiaomi, Arc::clone(&bridge));
        let idle = Arc::strong_count(&bridge);

        worker.mailbox().initialize(config("100")).await.unwrap();
        assert!(worker.mailbox().snapshot().await.unwrap().simulated);
        // The pending simulated-token task holds the bridge.
        assert_eq!(Arc::strong_count(&bridge), idle + 1);

        worker.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&bridge), idle);
    }
}
