// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Last-known token per vendor.
//
// Reads never block on an SDK or on the network; they see whatever the
// orchestrators have written so far. Vendors are listed in the order their
// registration completed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use wxtpush_core::{PushToken, Vendor};

#[derive(Debug, Default)]
struct Inner {
    tokens: HashMap<Vendor, PushToken>,
    order: Vec<Vendor>,
}

/// Thread-safe token store shared by the engine and the orchestrators.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Inner>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A writer that panicked left the maps consistent (every mutation is a
    // single insert or remove), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, vendor: Vendor) -> Option<PushToken> {
        self.read().tokens.get(&vendor).cloned()
    }

    /// All stored tokens, in registration completion order.
    pub fn all(&self) -> Vec<PushToken> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|v| inner.tokens.get(v).cloned())
            .collect()
    }

    /// Store `token`, superseding any earlier token for its vendor. A
    /// replaced vendor keeps its original position.
    pub fn set(&self, token: PushToken) {
        let mut inner = self.write();
        let vendor = token.vendor;
        if inner.tokens.insert(vendor, token).is_none() {
            inner.order.push(vendor);
        }
    }

    pub fn clear(&self, vendor: Vendor) -> Option<PushToken> {
        let mut inner = self.write();
        let removed = inner.tokens.remove(&vendor);
        if removed.is_some() {
            inner.order.retain(|v| *v != vendor);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let store = TokenStore::new();
        assert!(store.get(Vendor::Vivo).is_none());
        store.set(PushToken::new(Vendor::Vivo, "v1"));
        assert_eq!(store.get(Vendor::Vivo).map(|t| t.token), Some("v1".into()));
        store.set(PushToken::new(Vendor::Vivo, "v2"));
        assert_eq!(store.get(Vendor::Vivo).map(|t| t.token), Some("v2".into()));
        assert_eq!(store.len(), 1);
        assert!(store.clear(Vendor::Vivo).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn all_follows_completion_order() {
        let store = TokenStore::new();
        store.set(PushToken::new(Vendor::Oppo, "o"));
        store.set(PushToken::new(Vendor::Huawei, "h"));
        store.set(PushToken::new(Vendor::Oppo, "o2"));
        let vendors: Vec<Vendor> = store.all().iter().map(|t| t.vendor).collect();
        assert_eq!(vendors, vec![Vendor::Oppo, Vendor::Huawei]);

        store.clear(Vendor::Oppo);
        store.set(PushToken::new(Vendor::Oppo, "o3"));
        let vendors: Vec<Vendor> = store.all().iter().map(|t| t.vendor).collect();
        assert_eq!(vendors, vec![Vendor::Huawei, Vendor::Oppo]);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let store = TokenStore::new();
        let handles: Vec<_> = Vendor::ALL
            .into_iter()
            .map(|v| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.set(PushToken::new(v, format!("{v}-{i}")));
                        let _ = store.all();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), Vendor::ALL.len());
        for v in Vendor::ALL {
            assert_eq!(store.get(v).map(|t| t.token), Some(format!("{v}-99")));
        }
    }
}
