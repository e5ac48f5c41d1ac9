// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wxtpush-bridge: native platform bridge abstractions.
//
// Defines the capability traits the engine needs from the host OS (runtime
// type resolution, device identity, badge, manifest meta-data), the adapter
// trait every vendor SDK binding implements, and the process-wide ingress
// slot that native callback entry points deliver into.

pub mod ingress;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

pub mod stub;

use std::sync::Arc;

/// Bridge implementation for the target operating system.
pub fn platform_bridge() -> Arc<dyn traits::PlatformBridge> {
    #[cfg(target_os = "ios")]
    {
        Arc::new(ios::IosBridge::new())
    }
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidBridge::new())
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        // Desktop/CI: no vendor SDK is linked, every vendor takes the
        // simulated path.
        Arc::new(stub::StubBridge::default())
    }
}
