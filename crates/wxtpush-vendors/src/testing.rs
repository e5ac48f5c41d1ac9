// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted vendor SDK for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use wxtpush_bridge::traits::{CallbackSink, NudgeAction, RegisterOutcome, VendorSdk};
use wxtpush_core::error::Result;
use wxtpush_core::{Vendor, VendorConfig};

type RegisterFn = Box<dyn FnMut(Option<&str>, &CallbackSink) -> Result<RegisterOutcome> + Send>;
type TokenFn = Box<dyn FnMut() -> Result<Option<String>> + Send>;
type NudgeFn = Box<dyn FnMut(NudgeAction) -> Result<Option<String>> + Send>;

/// A `VendorSdk` whose answers come from closures. Defaults: init succeeds,
/// register is pending, no token is held, nudges find nothing.
pub struct ScriptedSdk {
    vendor: Vendor,
    register: Mutex<RegisterFn>,
    current: Mutex<TokenFn>,
    nudge: Mutex<NudgeFn>,
    /// Real time spent inside every register call.
    register_delay: Duration,
    calls: Mutex<Vec<String>>,
    scopes: Mutex<Vec<Option<String>>>,
    nudges: Mutex<Vec<NudgeAction>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSdk {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            register: Mutex::new(Box::new(|_, _| Ok(RegisterOutcome::Pending))),
            current: Mutex::new(Box::new(|| Ok(None))),
            nudge: Mutex::new(Box::new(|_| Ok(None))),
            register_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            scopes: Mutex::new(Vec::new()),
            nudges: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn on_register(
        self,
        f: impl FnMut(Option<&str>, &CallbackSink) -> Result<RegisterOutcome> + Send + 'static,
    ) -> Self {
        Self {
            register: Mutex::new(Box::new(f)),
            ..self
        }
    }

    pub fn on_current_token(self, f: impl FnMut() -> Result<Option<String>> + Send + 'static) -> Self {
        Self {
            current: Mutex::new(Box::new(f)),
            ..self
        }
    }

    pub fn on_nudge(
        self,
        f: impl FnMut(NudgeAction) -> Result<Option<String>> + Send + 'static,
    ) -> Self {
        Self {
            nudge: Mutex::new(Box::new(f)),
            ..self
        }
    }

    pub fn with_register_delay(self, delay: Duration) -> Self {
        Self {
            register_delay: delay,
            ..self
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    /// Every call made, in order, e.g. `init`, `register(HCM)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn register_calls(&self) -> usize {
        self.scopes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn register_scopes(&self) -> Vec<Option<String>> {
        self.scopes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn nudges(&self) -> Vec<NudgeAction> {
        self.nudges.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Highest number of register calls that overlapped.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl VendorSdk for ScriptedSdk {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn init(&self, _config: &VendorConfig) -> Result<()> {
        self.record("init".into());
        Ok(())
    }

    fn register(
        &self,
        _config: &VendorConfig,
        scope: Option<&str>,
        sink: CallbackSink,
    ) -> Result<RegisterOutcome> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.record(format!("register({})", scope.unwrap_or("-")));
        self.scopes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(scope.map(str::to_owned));
        if !self.register_delay.is_zero() {
            std::thread::sleep(self.register_delay);
        }
        let out = {
            let mut register = self.register.lock().unwrap_or_else(|e| e.into_inner());
            (*register)(scope, &sink)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    fn current_token(&self) -> Result<Option<String>> {
        self.record("currentToken".into());
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        (*current)()
    }

    fn nudge(&self, action: NudgeAction) -> Result<Option<String>> {
        self.record(format!("nudge({action:?})"));
        self.nudges.lock().unwrap_or_else(|e| e.into_inner()).push(action);
        let mut nudge = self.nudge.lock().unwrap_or_else(|e| e.into_inner());
        (*nudge)(action)
    }

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.record(format!("setNotificationsEnabled({enabled})"));
        Ok(())
    }

    fn set_alias(&self, alias: &str) -> Result<()> {
        self.record(format!("setAlias({alias})"));
        Ok(())
    }

    fn set_tags(&self, tags: &[String]) -> Result<()> {
        self.record(format!("setTags({})", tags.join(",")));
        Ok(())
    }
}
