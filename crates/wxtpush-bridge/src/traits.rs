// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities and vendor
// SDK adapters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use wxtpush_core::error::{PushError, Result};
use wxtpush_core::{RawCallback, Vendor, VendorConfig};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge:
    SdkRuntime + DeviceIdentity + NativeBadge + NativeManifest + Send + Sync
{
    /// Human-readable platform name (e.g. "Android", "iOS").
    fn platform_name(&self) -> &str;

    /// Adapters for the vendor SDK bindings compiled into this build.
    ///
    /// An adapter being listed does not mean its SDK is linked into the host
    /// app; the availability probe still resolves the entry-point types.
    fn vendor_sdks(&self) -> Vec<Arc<dyn VendorSdk>>;
}

/// Runtime type lookup in the host process.
pub trait SdkRuntime {
    /// Whether a type with this fully qualified name can be resolved.
    fn resolve_type(&self, qualified_name: &str) -> Result<bool>;

    /// Value of a `static final int` field, `Ok(None)` when the type or
    /// field does not exist.
    fn static_int(&self, _qualified_name: &str, _field: &str) -> Result<Option<i32>> {
        Ok(None)
    }
}

/// Device facts used for vendor classification and token derivation.
pub trait DeviceIdentity {
    /// `Build.BRAND` on Android, `"apple"` on iOS.
    fn brand(&self) -> Result<String>;

    /// `Build.MANUFACTURER` on Android.
    fn manufacturer(&self) -> Result<String>;

    /// A stable per-install device identifier.
    fn device_id(&self) -> Result<String>;
}

/// Launcher badge count.
pub trait NativeBadge {
    /// Set the badge, using the OEM mechanism for `vendor` when given.
    fn set_badge(&self, count: u32, vendor: Option<Vendor>) -> Result<()>;

    /// Read the badge back. `Ok(None)` when the launcher offers no read.
    fn read_badge(&self) -> Result<Option<u32>>;
}

/// Application manifest meta-data (raw keys, e.g. `com.heytap.mcs.appkey`).
pub trait NativeManifest {
    fn manifest_meta(&self) -> Result<BTreeMap<String, String>>;
}

// ---------------------------------------------------------------------------
// Vendor SDK adapters
// ---------------------------------------------------------------------------

/// Receives raw callbacks from a vendor SDK, on any thread.
#[derive(Clone)]
pub struct CallbackSink(Arc<dyn Fn(RawCallback) + Send + Sync>);

impl CallbackSink {
    pub fn new(f: impl Fn(RawCallback) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn deliver(&self, callback: RawCallback) {
        (self.0)(callback)
    }

    /// Whether both handles point at the same sink.
    pub fn same(&self, other: &CallbackSink) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackSink")
    }
}

/// What a registration call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The SDK returned the token synchronously.
    Token(String),
    /// The token will arrive later through the callback sink.
    Pending,
}

/// Bounded poke at a stalled registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeAction {
    /// Ask the SDK to register again; the result arrives through the sink.
    Register,
    /// Ask the SDK for the registration id it currently holds.
    QueryToken,
}

/// Binding to one vendor's native push SDK.
///
/// Every method may block; the engine calls them off the async runtime.
pub trait VendorSdk: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Entry-point types whose presence means the SDK is linked.
    fn entry_points(&self) -> &'static [&'static str] {
        self.vendor().sdk_entry_points()
    }

    /// Initialise the SDK and bind credentials.
    fn init(&self, config: &VendorConfig) -> Result<()>;

    /// Issue the registration call. The sink is bound before the call is
    /// made, so a callback fired during the call is not lost.
    fn register(
        &self,
        config: &VendorConfig,
        scope: Option<&str>,
        sink: CallbackSink,
    ) -> Result<RegisterOutcome>;

    /// Token the SDK already holds, without triggering a registration.
    fn current_token(&self) -> Result<Option<String>>;

    /// Run one nudge step. A token returned here counts as a direct result.
    fn nudge(&self, action: NudgeAction) -> Result<Option<String>>;

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()>;

    fn set_alias(&self, _alias: &str) -> Result<()> {
        Err(PushError::Unsupported {
            vendor: self.vendor(),
            operation: "setAlias",
        })
    }

    fn set_tags(&self, _tags: &[String]) -> Result<()> {
        Err(PushError::Unsupported {
            vendor: self.vendor(),
            operation: "setTags",
        })
    }
}
