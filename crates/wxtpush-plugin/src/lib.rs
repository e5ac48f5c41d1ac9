// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application-facing surface of wxtpush: the push manager, the method-call
// dispatcher used by framework channels, badge handling and settings.

pub mod badge;
pub mod channel;
pub mod manager;
pub mod settings;

pub use channel::{handle_method_call, MethodCall, MethodError};
pub use manager::{EventStream, PushManager};
