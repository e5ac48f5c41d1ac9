// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event router.
//
// One subscriber at a time. Subscribing again replaces the previous
// subscriber, whose receiver then sees the stream end. Events published
// with no subscriber are dropped, never buffered: a late subscriber reads
// current state through the token getters instead.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use wxtpush_core::NormalizedEvent;

type Slot = Option<UnboundedSender<NormalizedEvent>>;

#[derive(Debug, Clone, Default)]
pub struct EventRouter {
    slot: Arc<Mutex<Slot>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new subscription, replacing any existing one.
    pub fn subscribe(&self) -> UnboundedReceiver<NormalizedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.lock().replace(tx).is_some() {
            debug!("event subscriber replaced");
        }
        rx
    }

    pub fn unsubscribe(&self) {
        self.lock().take();
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver `event` to the current subscriber. Returns `false` when it
    /// was dropped.
    pub fn publish(&self, event: NormalizedEvent) -> bool {
        let mut slot = self.lock();
        let Some(tx) = slot.as_ref() else {
            debug!(event = event.name(), vendor = %event.vendor(), "no subscriber, event dropped");
            return false;
        };
        match tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(event = event.name(), "subscriber gone, event dropped");
                slot.take();
                false
            }
        }
    }
}
