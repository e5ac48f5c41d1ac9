// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS platform bridge via objc2.
//
// Requires compilation with the iOS SDK (Xcode). APNs registration results
// reach Rust through the `wxtpush_apns_*` C entry points, which the host
// AppDelegate calls from `didRegisterForRemoteNotificationsWithDeviceToken`,
// `didFailToRegisterForRemoteNotificationsWithError` and the notification
// center delegate methods.
//
// UIKit calls that must run on the main thread are either guarded by
// `MainThreadMarker` or scheduled with `performSelectorOnMainThread`.

#![cfg(target_os = "ios")]

use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char};
use std::sync::Arc;

use objc2::runtime::{AnyClass, AnyObject};
use objc2::{MainThreadMarker, class, msg_send, sel};
use objc2_ui_kit::UIDevice;
use serde_json::{Map, Value};

use wxtpush_core::error::{PushError, Result};
use wxtpush_core::{MessageKind, RawCallback, Vendor, VendorConfig};

use crate::ingress;
use crate::traits::*;

/// Assert that we are on the main thread and return the marker.
fn require_main_thread() -> Result<MainThreadMarker> {
    MainThreadMarker::new()
        .ok_or_else(|| PushError::Bridge("must be called from the main thread".into()))
}

/// `[UIApplication sharedApplication]` without a main-thread marker. Only
/// used to schedule selectors onto the main thread.
fn shared_application() -> Result<*mut AnyObject> {
    // SAFETY: `sharedApplication` is a class method returning the singleton;
    // reading the pointer is thread-safe, messaging it is deferred to main.
    let app: *mut AnyObject = unsafe { msg_send![class!(UIApplication), sharedApplication] };
    if app.is_null() {
        Err(PushError::Bridge("UIApplication not initialised".into()))
    } else {
        Ok(app)
    }
}

/// Schedule a zero-argument UIApplication selector on the main thread.
fn perform_on_main(selector: objc2::runtime::Sel) -> Result<()> {
    let app = shared_application()?;
    // SAFETY: `app` is the live UIApplication singleton and `selector` is one
    // of its zero-argument instance methods.
    unsafe {
        let _: () = msg_send![
            app,
            performSelectorOnMainThread: selector,
            withObject: std::ptr::null::<AnyObject>(),
            waitUntilDone: false
        ];
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// iOS implementation of the wxtpush platform bridge.
pub struct IosBridge;

impl IosBridge {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IosBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for IosBridge {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    fn vendor_sdks(&self) -> Vec<Arc<dyn VendorSdk>> {
        vec![Arc::new(ApnsSdk)]
    }
}

impl SdkRuntime for IosBridge {
    fn resolve_type(&self, qualified_name: &str) -> Result<bool> {
        // The simulator cannot obtain an APNs device token.
        if cfg!(target_abi = "sim") && qualified_name == "UIApplication" {
            return Ok(false);
        }
        let name = CString::new(qualified_name)
            .map_err(|e| PushError::Bridge(format!("invalid class name: {e}")))?;
        Ok(AnyClass::get(&name).is_some())
    }
}

impl DeviceIdentity for IosBridge {
    fn brand(&self) -> Result<String> {
        Ok("apple".into())
    }

    fn manufacturer(&self) -> Result<String> {
        Ok("Apple".into())
    }

    /// `identifierForVendor`, stable until every app from this vendor is
    /// removed from the device.
    fn device_id(&self) -> Result<String> {
        let mtm = require_main_thread()?;
        let device = UIDevice::currentDevice(mtm);
        device
            .identifierForVendor()
            .map(|uuid| uuid.UUIDString().to_string())
            .ok_or_else(|| PushError::Bridge("identifierForVendor unavailable".into()))
    }
}

impl NativeBadge for IosBridge {
    fn set_badge(&self, count: u32, _vendor: Option<Vendor>) -> Result<()> {
        let mtm = require_main_thread()?;
        let app = objc2_ui_kit::UIApplication::sharedApplication(mtm);
        let n = isize::try_from(count).unwrap_or(isize::MAX);
        // SAFETY: main thread guaranteed by `mtm`; setter takes an NSInteger.
        unsafe {
            let _: () = msg_send![&app, setApplicationIconBadgeNumber: n];
        }
        tracing::info!(count, "iOS: badge set");
        Ok(())
    }

    fn read_badge(&self) -> Result<Option<u32>> {
        let mtm = require_main_thread()?;
        let app = objc2_ui_kit::UIApplication::sharedApplication(mtm);
        // SAFETY: main thread guaranteed by `mtm`; getter returns NSInteger.
        let n: isize = unsafe { msg_send![&app, applicationIconBadgeNumber] };
        Ok(u32::try_from(n).ok())
    }
}

impl NativeManifest for IosBridge {
    /// APNs needs no app credentials, so there is nothing to read.
    fn manifest_meta(&self) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }
}

// ---------------------------------------------------------------------------
// APNs adapter
// ---------------------------------------------------------------------------

struct ApnsSdk;

impl VendorSdk for ApnsSdk {
    fn vendor(&self) -> Vendor {
        Vendor::Apple
    }

    fn init(&self, _config: &VendorConfig) -> Result<()> {
        Ok(())
    }

    fn register(
        &self,
        _config: &VendorConfig,
        _scope: Option<&str>,
        sink: CallbackSink,
    ) -> Result<RegisterOutcome> {
        // The AppDelegate hooks deliver through the ingress.
        if !ingress::is_installed() {
            ingress::install(sink);
        }
        perform_on_main(sel!(registerForRemoteNotifications))?;
        Ok(RegisterOutcome::Pending)
    }

    /// APNs offers no way to read the current device token back.
    fn current_token(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn nudge(&self, action: NudgeAction) -> Result<Option<String>> {
        if action == NudgeAction::Register {
            perform_on_main(sel!(registerForRemoteNotifications))?;
        }
        Ok(None)
    }

    fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        if enabled {
            perform_on_main(sel!(registerForRemoteNotifications))
        } else {
            perform_on_main(sel!(unregisterForRemoteNotifications))
        }
    }
}

// ---------------------------------------------------------------------------
// C entry points for the host AppDelegate
// ---------------------------------------------------------------------------

/// # Safety
/// `c` must be null or a valid NUL-terminated string.
unsafe fn c_string(c: *const c_char) -> Option<String> {
    if c.is_null() {
        return None;
    }
    // SAFETY: caller contract.
    Some(unsafe { CStr::from_ptr(c) }.to_string_lossy().into_owned())
}

/// Device token bytes from `didRegisterForRemoteNotificationsWithDeviceToken`.
///
/// # Safety
/// `bytes` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wxtpush_apns_did_register(bytes: *const u8, len: usize) {
    if bytes.is_null() || len == 0 {
        ingress::deliver(RawCallback::Direct {
            vendor: Vendor::Apple,
            token: None,
        });
        return;
    }
    // SAFETY: caller contract.
    let slice = unsafe { std::slice::from_raw_parts(bytes, len) };
    ingress::deliver(RawCallback::Direct {
        vendor: Vendor::Apple,
        token: Some(hex::encode(slice)),
    });
}

/// `didFailToRegisterForRemoteNotificationsWithError`.
///
/// # Safety
/// `message` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wxtpush_apns_did_fail(code: i64, message: *const c_char) {
    // SAFETY: caller contract.
    let message = unsafe { c_string(message) }.unwrap_or_else(|| "APNs registration failed".into());
    ingress::deliver(RawCallback::Failure {
        vendor: Vendor::Apple,
        code,
        message,
    });
}

/// Result of `requestAuthorizationWithOptions:completionHandler:`.
#[unsafe(no_mangle)]
pub extern "C" fn wxtpush_apns_authorization(granted: bool) {
    ingress::deliver(RawCallback::Permission {
        vendor: Vendor::Apple,
        granted,
    });
}

/// Notification payload (`userInfo` serialised as JSON). `clicked` is true
/// for `didReceiveNotificationResponse`.
///
/// # Safety
/// `json` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wxtpush_apns_message(json: *const c_char, clicked: bool) {
    // SAFETY: caller contract.
    let payload = unsafe { c_string(json) }
        .and_then(|s| serde_json::from_str::<Map<String, Value>>(&s).ok())
        .unwrap_or_default();
    ingress::deliver(RawCallback::Message {
        vendor: Vendor::Apple,
        kind: if clicked {
            MessageKind::Clicked
        } else {
            MessageKind::Received
        },
        payload,
    });
}
