// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-vendor registration profiles.
//
// The registration state machine is the same for every vendor; what differs
// is captured here as data: which devices the SDK can work on, whether the
// service needs time to come up, where an already-issued token can be read,
// and which optional operations exist.

use wxtpush_core::Vendor;

/// Which devices a vendor's push service runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandGate {
    /// Any device.
    Any,
    /// Works best on these brands; other devices only get a warning.
    Advisory(&'static [&'static str]),
    /// Needs the vendor's system service; other devices take the simulated
    /// path instead of a registration call that cannot succeed.
    Required(&'static [&'static str]),
}

impl BrandGate {
    /// Case-insensitive substring match against brand or manufacturer.
    pub fn matches(&self, brand: &str, manufacturer: &str) -> bool {
        let families = match self {
            BrandGate::Any => return true,
            BrandGate::Advisory(f) | BrandGate::Required(f) => *f,
        };
        let brand = brand.to_ascii_lowercase();
        let manufacturer = manufacturer.to_ascii_lowercase();
        families
            .iter()
            .any(|f| brand.contains(f) || manufacturer.contains(f))
    }
}

/// When to look for a token the SDK already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingTokenCheck {
    Never,
    /// Before registering; a hit skips the registration call.
    BeforeRegister,
    /// Right after a pending registration call.
    AfterRegister,
}

/// Static registration traits of one vendor.
#[derive(Debug, Clone, Copy)]
pub struct VendorProfile {
    pub vendor: Vendor,
    pub brands: BrandGate,
    /// Wait for the service warm-up between SDK init and registration.
    pub warmup_before_register: bool,
    /// On a service-ready callback, wait for the warm-up and then read the
    /// registration id.
    pub query_after_ready: bool,
    pub existing_token: ExistingTokenCheck,
    /// Token scopes tried in order; the first is the normal one.
    pub scopes: &'static [&'static str],
    /// Status code that moves on to the next scope.
    pub scope_retry_code: Option<i64>,
    pub supports_alias: bool,
    pub supports_tags: bool,
}

const HUAWEI: VendorProfile = VendorProfile {
    vendor: Vendor::Huawei,
    brands: BrandGate::Advisory(&["huawei", "honor"]),
    warmup_before_register: false,
    query_after_ready: false,
    existing_token: ExistingTokenCheck::Never,
    scopes: &["HCM", "", "DEFAULT_SCOPE"],
    scope_retry_code: Some(907_135_701),
    supports_alias: false,
    supports_tags: false,
};

const HONOR: VendorProfile = VendorProfile {
    vendor: Vendor::Honor,
    brands: BrandGate::Required(&["honor", "huawei"]),
    warmup_before_register: true,
    query_after_ready: false,
    existing_token: ExistingTokenCheck::Never,
    scopes: &[],
    scope_retry_code: None,
    supports_alias: false,
    supports_tags: false,
};

const XIAOMI: VendorProfile = VendorProfile {
    vendor: Vendor::Xiaomi,
    brands: BrandGate::Advisory(&["xiaomi", "redmi", "poco"]),
    warmup_before_register: false,
    query_after_ready: false,
    existing_token: ExistingTokenCheck::AfterRegister,
    scopes: &[],
    scope_retry_code: None,
    supports_alias: true,
    supports_tags: true,
};

const OPPO: VendorProfile = VendorProfile {
    vendor: Vendor::Oppo,
    brands: BrandGate::Required(&["oppo", "oneplus", "realme"]),
    warmup_before_register: false,
    query_after_ready: false,
    existing_token: ExistingTokenCheck::BeforeRegister,
    scopes: &[],
    scope_retry_code: None,
    supports_alias: false,
    supports_tags: false,
};

const VIVO: VendorProfile = VendorProfile {
    vendor: Vendor::Vivo,
    brands: BrandGate::Advisory(&["vivo", "iqoo"]),
    warmup_before_register: false,
    query_after_ready: true,
    existing_token: ExistingTokenCheck::Never,
    scopes: &[],
    scope_retry_code: None,
    supports_alias: false,
    supports_tags: false,
};

const APPLE: VendorProfile = VendorProfile {
    vendor: Vendor::Apple,
    brands: BrandGate::Any,
    warmup_before_register: false,
    query_after_ready: false,
    existing_token: ExistingTokenCheck::Never,
    scopes: &[],
    scope_retry_code: None,
    supports_alias: false,
    supports_tags: false,
};

/// Profile for a vendor.
pub fn profile(vendor: Vendor) -> &'static VendorProfile {
    match vendor {
        Vendor::Huawei => &HUAWEI,
        Vendor::Honor => &HONOR,
        Vendor::Xiaomi => &XIAOMI,
        Vendor::Oppo => &OPPO,
        Vendor::Vivo => &VIVO,
        Vendor::Apple => &APPLE,
    }
}

impl VendorProfile {
    /// Scope for the given attempt, or `None` when the vendor has no scopes
    /// or they are exhausted.
    pub fn scope(&self, attempt: usize) -> Option<&'static str> {
        self.scopes.get(attempt).copied()
    }

    /// Whether a failure with `code` should move on to the next scope.
    pub fn retries_scope(&self, code: i64, attempt: usize) -> bool {
        self.scope_retry_code == Some(code) && attempt + 1 < self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vendor_has_a_profile() {
        for v in Vendor::ALL {
            assert_eq!(profile(v).vendor, v);
        }
    }

    #[test]
    fn brand_matching_is_case_insensitive() {
        let gate = profile(Vendor::Oppo).brands;
        assert!(gate.matches("OnePlus", "OnePlus"));
        assert!(gate.matches("generic", "OPPO"));
        assert!(!gate.matches("samsung", "samsung"));
        assert!(BrandGate::Any.matches("", ""));
    }

    #[test]
    fn hms_scope_chain() {
        let p = profile(Vendor::Huawei);
        assert_eq!(p.scope(0), Some("HCM"));
        assert_eq!(p.scope(1), Some(""));
        assert!(p.retries_scope(907_135_701, 0));
        assert!(p.retries_scope(907_135_701, 1));
        assert!(!p.retries_scope(907_135_701, 2));
        assert!(!p.retries_scope(6003, 0));
        assert_eq!(profile(Vendor::Vivo).scope(0), None);
    }

    #[test]
    fn only_mipush_has_alias_and_tags() {
        for v in Vendor::ALL {
            let p = profile(v);
            assert_eq!(p.supports_alias, v == Vendor::Xiaomi);
            assert_eq!(p.supports_tags, v == Vendor::Xiaomi);
        }
    }
}
