// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Launcher badge with a local cache.
//
// Most launchers accept a badge count but cannot report it back, so the
// last count set through this process is kept and returned when no live
// read is available.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use wxtpush_bridge::traits::PlatformBridge;
use wxtpush_core::Vendor;

pub struct Badge {
    bridge: Arc<dyn PlatformBridge>,
    cached: AtomicU32,
}

impl Badge {
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Self {
        Self {
            bridge,
            cached: AtomicU32::new(0),
        }
    }

    /// Cache `count` and ask the launcher to show it. Returns `false` when
    /// the launcher refused; the cache is updated either way.
    pub fn set(&self, count: u32, vendor: Option<Vendor>) -> bool {
        self.cached.store(count, Ordering::SeqCst);
        match self.bridge.set_badge(count, vendor) {
            Ok(()) => {
                debug!(count, vendor = ?vendor, "badge set");
                true
            }
            Err(e) => {
                warn!(count, vendor = ?vendor, error = %e, "badge could not be set");
                false
            }
        }
    }

    /// Live badge count when the launcher reports one, else the cached value.
    pub fn get(&self, vendor: Option<Vendor>) -> u32 {
        match self.bridge.read_badge() {
            Ok(Some(count)) => {
                self.cached.store(count, Ordering::SeqCst);
                count
            }
            Ok(None) => self.cached(),
            Err(e) => {
                debug!(vendor = ?vendor, error = %e, "live badge read unavailable, using cache");
                self.cached()
            }
        }
    }

    pub fn cached(&self) -> u32 {
        self.cached.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use wxtpush_bridge::stub::StubBridge;

    use super::*;

    #[test]
    fn cache_survives_a_refusing_launcher() {
        let badge = Badge::new(Arc::new(StubBridge::default()));
        assert_eq!(badge.get(None), 0);
        assert!(!badge.set(7, Some(Vendor::Xiaomi)));
        assert_eq!(badge.get(Some(Vendor::Xiaomi)), 7);
        assert!(!badge.set(0, None));
        assert_eq!(badge.cached(), 0);
    }
}
