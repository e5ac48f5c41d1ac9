// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic tokens for vendors whose SDK is not linked.
//
// The same device and credentials always yield the same token, across
// process restarts, so an app can be developed end to end without vendor
// accounts.

use sha2::{Digest, Sha256};
use wxtpush_core::{Vendor, VendorConfig};

/// Device id used when the platform cannot provide one.
pub const UNKNOWN_DEVICE: &str = "unknown-device";

/// SHA-256 hex digest of `data`.
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Derive the simulated token for `vendor` on `device_id` with `config`.
///
/// Apple tokens are the full 64-hex digest, the shape of a real APNs device
/// token. Android vendors get `{vendor}_sim_` plus 32 hex chars, which is
/// recognisable in logs and never collides with a real registration id.
pub fn simulated_token(vendor: Vendor, device_id: &str, config: &VendorConfig) -> String {
    let material = format!(
        "wxtpush-sim|{}|{}|{}|{}|{}",
        vendor.id(),
        device_id,
        config.app_id.as_deref().unwrap_or_default(),
        config.app_key.as_deref().unwrap_or_default(),
        config.app_secret.as_deref().unwrap_or_default(),
    );
    let digest = hash_bytes(material.as_bytes());
    match vendor {
        Vendor::Apple => digest,
        _ => format!("{}_sim_{}", vendor.id(), &digest[..32]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xiaomi() -> VendorConfig {
        VendorConfig {
            app_id: Some("100".into()),
            app_key: Some("abc".into()),
            ..VendorConfig::default()
        }
    }

    #[test]
    fn same_inputs_same_token() {
        let a = simulated_token(Vendor::Xiaomi, "dev-1", &xiaomi());
        let b = simulated_token(Vendor::Xiaomi, "dev-1", &xiaomi());
        assert_eq!(a, b);
        assert!(a.starts_with("xiaomi_sim_"));
        assert_eq!(a.len(), "xiaomi_sim_".len() + 32);
    }

    #[test]
    fn device_and_config_change_the_token() {
        let base = simulated_token(Vendor::Xiaomi, "dev-1", &xiaomi());
        assert_ne!(base, simulated_token(Vendor::Xiaomi, "dev-2", &xiaomi()));

        let mut other = xiaomi();
        other.app_key = Some("abd".into());
        assert_ne!(base, simulated_token(Vendor::Xiaomi, "dev-1", &other));
    }

    #[test]
    fn vendors_do_not_share_tokens() {
        let cfg = xiaomi();
        let tokens: std::collections::BTreeSet<String> = Vendor::ALL
            .iter()
            .map(|v| simulated_token(*v, "dev-1", &cfg))
            .collect();
        assert_eq!(tokens.len(), Vendor::ALL.len());
    }

    #[test]
    fn apple_token_is_hex_digest() {
        let t = simulated_token(Vendor::Apple, "dev-1", &VendorConfig::default());
        assert_eq!(t.len(), 64);
        assert!(t.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
