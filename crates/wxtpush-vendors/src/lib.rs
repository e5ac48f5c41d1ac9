// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wxtpush-vendors: registration engine.
//
// Probes which vendor SDKs are linked, drives one registration state machine
// per vendor, folds every callback transport into one event model, and
// keeps the last-known token per vendor.

pub mod engine;
pub mod normalizer;
pub mod nudge;
pub mod orchestrator;
pub mod parcel;
pub mod probe;
pub mod profiles;
pub mod router;
pub mod simulated;
pub mod token_store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use engine::PushEngine;
pub use normalizer::{CallbackNormalizer, Signal};
pub use probe::{Availability, SdkRegistry};
pub use router::EventRouter;
pub use simulated::simulated_token;
pub use token_store::TokenStore;
