// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wxtpush-core: core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod reasons;
pub mod types;

pub use config::{PushConfig, VendorConfig};
pub use error::PushError;
pub use reasons::FailureReason;
pub use types::*;
