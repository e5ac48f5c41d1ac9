// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SDK availability probe and adapter registry.
//
// A vendor is available when an adapter for it is compiled in, one of its
// entry-point types resolves in the host process, and the device is not
// known to be incompatible. The answer is computed on first use and cached
// for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};
use wxtpush_bridge::traits::{PlatformBridge, VendorSdk};
use wxtpush_core::Vendor;

use crate::profiles::{profile, BrandGate};

/// Why a vendor takes the simulated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// No adapter compiled into this build.
    NoAdapter,
    /// None of the SDK's entry-point types resolve.
    NotLinked,
    /// SDK present but the device cannot run the vendor's service.
    IncompatibleDevice { brand: String },
    /// The probe itself failed.
    ProbeFailed(String),
}

/// Cached probe result for one vendor.
#[derive(Clone)]
pub enum Availability {
    Available(Arc<dyn VendorSdk>),
    Unavailable(UnavailableReason),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

impl fmt::Debug for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available(sdk) => write!(f, "Available({})", sdk.vendor()),
            Availability::Unavailable(reason) => write!(f, "Unavailable({reason:?})"),
        }
    }
}

fn slot(vendor: Vendor) -> usize {
    match vendor {
        Vendor::Huawei => 0,
        Vendor::Honor => 1,
        Vendor::Xiaomi => 2,
        Vendor::Oppo => 3,
        Vendor::Vivo => 4,
        Vendor::Apple => 5,
    }
}

/// Registry of vendor adapters with a per-vendor availability cache.
pub struct SdkRegistry {
    bridge: Arc<dyn PlatformBridge>,
    adapters: HashMap<Vendor, Arc<dyn VendorSdk>>,
    cache: [OnceLock<Availability>; 6],
}

impl SdkRegistry {
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Self {
        let adapters = bridge
            .vendor_sdks()
            .into_iter()
            .map(|sdk| (sdk.vendor(), sdk))
            .collect();
        Self {
            bridge,
            adapters,
            cache: Default::default(),
        }
    }

    pub fn bridge(&self) -> &Arc<dyn PlatformBridge> {
        &self.bridge
    }

    /// Probe result for `vendor`, evaluated once.
    pub fn availability(&self, vendor: Vendor) -> Availability {
        self.cache[slot(vendor)]
            .get_or_init(|| self.probe(vendor))
            .clone()
    }

    pub fn is_available(&self, vendor: Vendor) -> bool {
        self.availability(vendor).is_available()
    }

    /// Adapter for `vendor`, only when it is available.
    pub fn adapter(&self, vendor: Vendor) -> Option<Arc<dyn VendorSdk>> {
        match self.availability(vendor) {
            Availability::Available(sdk) => Some(sdk),
            Availability::Unavailable(_) => None,
        }
    }

    fn probe(&self, vendor: Vendor) -> Availability {
        let Some(sdk) = self.adapters.get(&vendor) else {
            debug!(%vendor, "no adapter compiled in");
            return Availability::Unavailable(UnavailableReason::NoAdapter);
        };

        let mut linked = false;
        for ty in sdk.entry_points() {
            match self.bridge.resolve_type(ty) {
                Ok(true) => {
                    linked = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(%vendor, class = ty, error = %e, "SDK probe failed");
                    return Availability::Unavailable(UnavailableReason::ProbeFailed(
                        e.to_string(),
                    ));
                }
            }
        }
        if !linked {
            info!(%vendor, "SDK not linked, using simulated tokens");
            return Availability::Unavailable(UnavailableReason::NotLinked);
        }

        let gate = profile(vendor).brands;
        if gate != BrandGate::Any {
            let brand = self.bridge.brand().unwrap_or_default();
            let manufacturer = self.bridge.manufacturer().unwrap_or_default();
            if !gate.matches(&brand, &manufacturer) {
                match gate {
                    BrandGate::Required(_) => {
                        warn!(%vendor, %brand, "device cannot run this push service, using simulated tokens");
                        return Availability::Unavailable(UnavailableReason::IncompatibleDevice {
                            brand,
                        });
                    }
                    _ => warn!(%vendor, %brand, "device brand is unusual for this push service"),
                }
            }
        }

        info!(%vendor, platform = self.bridge.platform_name(), "SDK available");
        Availability::Available(Arc::clone(sdk))
    }
}

#[cfg(test)]
mod tests {
    use wxtpush_bridge::stub::StubBridge;

    use super::*;
    use crate::testing::ScriptedSdk;

    #[test]
    fn no_adapter_means_unavailable() {
        let registry = SdkRegistry::new(Arc::new(StubBridge::default()));
        for v in Vendor::ALL {
            assert!(!registry.is_available(v));
        }
        assert!(matches!(
            registry.availability(Vendor::Xiaomi),
            Availability::Unavailable(UnavailableReason::NoAdapter)
        ));
    }

    #[test]
    fn linked_adapter_is_available() {
        let bridge = StubBridge::default().with_sdk(Arc::new(ScriptedSdk::new(Vendor::Xiaomi)));
        let registry = SdkRegistry::new(Arc::new(bridge));
        assert!(registry.is_available(Vendor::Xiaomi));
        assert!(registry.adapter(Vendor::Xiaomi).is_some());
        assert!(!registry.is_available(Vendor::Vivo));
    }

    #[test]
    fn required_brand_mismatch_takes_simulated_path() {
        let bridge = StubBridge::default()
            .with_brand("samsung")
            .with_sdk(Arc::new(ScriptedSdk::new(Vendor::Oppo)))
            .with_sdk(Arc::new(ScriptedSdk::new(Vendor::Vivo)));
        let registry = SdkRegistry::new(Arc::new(bridge));
        assert!(matches!(
            registry.availability(Vendor::Oppo),
            Availability::Unavailable(UnavailableReason::IncompatibleDevice { .. })
        ));
        // Advisory only.
        assert!(registry.is_available(Vendor::Vivo));
    }

    #[test]
    fn result_is_cached() {
        let sdk = Arc::new(ScriptedSdk::new(Vendor::Huawei));
        let bridge = Arc::new(StubBridge::default().with_brand("HUAWEI").with_sdk(sdk));
        let registry = SdkRegistry::new(Arc::clone(&bridge) as Arc<dyn PlatformBridge>);
        let first = registry.availability(Vendor::Huawei);
        let second = registry.availability(Vendor::Huawei);
        assert!(first.is_available() && second.is_available());
        assert!(registry.adapter(Vendor::Huawei).is_some());
        assert_eq!(bridge.resolve_calls(), 1);

        // Unavailable results are cached too.
        assert!(!registry.is_available(Vendor::Xiaomi));
        assert!(!registry.is_available(Vendor::Xiaomi));
        assert_eq!(bridge.resolve_calls(), 1);
    }
}
