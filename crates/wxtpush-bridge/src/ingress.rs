// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide callback ingress.
//
// OS-instantiated components (message services, broadcast receivers, app
// delegate hooks) have no handle to the engine. They deliver raw callbacks
// here, and the engine installs the one sink that receives them.

use std::sync::RwLock;

use wxtpush_core::RawCallback;

use crate::traits::CallbackSink;

static INGRESS: RwLock<Option<CallbackSink>> = RwLock::new(None);

/// Install the sink, replacing any previous one.
pub fn install(sink: CallbackSink) {
    let mut slot = INGRESS.write().unwrap_or_else(|e| e.into_inner());
    if slot.replace(sink).is_some() {
        tracing::debug!("ingress sink replaced");
    }
}

/// Remove the sink only if it is `sink`. Returns whether it was removed.
pub fn uninstall(sink: &CallbackSink) -> bool {
    let mut slot = INGRESS.write().unwrap_or_else(|e| e.into_inner());
    if slot.as_ref().is_some_and(|s| s.same(sink)) {
        *slot = None;
        true
    } else {
        false
    }
}

/// Whether a sink is installed.
pub fn is_installed() -> bool {
    INGRESS.read().map(|s| s.is_some()).unwrap_or(false)
}

/// Hand a callback to the installed sink. Returns `false` when none is
/// installed and the callback was dropped.
pub fn deliver(callback: RawCallback) -> bool {
    // Clone out of the lock so the sink never runs under it.
    let sink = INGRESS.read().ok().and_then(|s| s.clone());
    match sink {
        Some(sink) => {
            sink.deliver(callback);
            true
        }
        None => {
            tracing::debug!(vendor = ?callback.vendor(), "no ingress sink, callback dropped");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wxtpush_core::Vendor;

    use super::*;

    // The slot is process-global, so the whole lifecycle runs in one test.
    #[test]
    fn install_deliver_uninstall() {
        let cb = RawCallback::Permission {
            vendor: Vendor::Apple,
            granted: true,
        };
        assert!(!deliver(cb.clone()));

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sink = CallbackSink::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        install(sink.clone());
        assert!(is_installed());
        assert!(deliver(cb.clone()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(!uninstall(&CallbackSink::new(|_| {})));
        assert!(is_installed());
        assert!(uninstall(&sink));
        assert!(!deliver(cb));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
