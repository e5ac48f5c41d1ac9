// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded nudge plans for stalled registrations.
//
// Some SDKs accept the registration call and then stay silent. A nudge
// re-issues the request or re-reads the registration id at fixed offsets
// from the registration call. Nudges never extend or reset the
// registration timeout; a step at or past the timeout is dropped.

use std::time::Duration;

use tracing::debug;
use wxtpush_bridge::traits::NudgeAction;
use wxtpush_core::{Vendor, VendorConfig};

/// One scheduled nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NudgeStep {
    /// Offset from the registration call.
    pub at: Duration,
    pub action: NudgeAction,
}

const fn step(ms: u64, action: NudgeAction) -> NudgeStep {
    NudgeStep {
        at: Duration::from_millis(ms),
        action,
    }
}

/// Full Heytap plan: re-register, re-read, then once more each.
const HEYTAP_PLAN: [NudgeStep; 4] = [
    step(600, NudgeAction::Register),
    step(1_600, NudgeAction::QueryToken),
    step(3_500, NudgeAction::Register),
    step(3_800, NudgeAction::QueryToken),
];

/// `demoCompat`: the vendor sample's single delayed re-register.
const HEYTAP_COMPAT_PLAN: [NudgeStep; 1] = [step(500, NudgeAction::Register)];

/// Nudge plan for one registration attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NudgePlan {
    steps: Vec<NudgeStep>,
}

impl NudgePlan {
    /// Build the plan for `vendor`, dropping steps that would land at or
    /// after `timeout`.
    pub fn for_vendor(vendor: Vendor, config: &VendorConfig, timeout: Duration) -> Self {
        let base: &[NudgeStep] = match vendor {
            Vendor::Oppo if config.demo_compat => &HEYTAP_COMPAT_PLAN,
            Vendor::Oppo => &HEYTAP_PLAN,
            _ => &[],
        };
        let steps: Vec<NudgeStep> = base.iter().copied().filter(|s| s.at < timeout).collect();
        if steps.len() < base.len() {
            debug!(
                %vendor,
                kept = steps.len(),
                planned = base.len(),
                timeout_ms = timeout.as_millis() as u64,
                "nudge steps past the timeout dropped"
            );
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[NudgeStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(demo_compat: bool) -> VendorConfig {
        VendorConfig {
            demo_compat,
            ..VendorConfig::default()
        }
    }

    #[test]
    fn heytap_full_plan() {
        let plan = NudgePlan::for_vendor(Vendor::Oppo, &cfg(false), Duration::from_secs(8));
        let offsets: Vec<u64> = plan.steps().iter().map(|s| s.at.as_millis() as u64).collect();
        assert_eq!(offsets, vec![600, 1_600, 3_500, 3_800]);
        assert_eq!(plan.steps()[1].action, NudgeAction::QueryToken);
    }

    #[test]
    fn demo_compat_is_single_nudge() {
        let plan = NudgePlan::for_vendor(Vendor::Oppo, &cfg(true), Duration::from_secs(8));
        assert_eq!(plan.steps(), &[step(500, NudgeAction::Register)]);
    }

    #[test]
    fn steps_past_timeout_are_dropped() {
        let plan = NudgePlan::for_vendor(Vendor::Oppo, &cfg(false), Duration::from_millis(1_600));
        assert_eq!(plan.steps().len(), 1);
    }

    #[test]
    fn other_vendors_have_no_plan() {
        for v in [Vendor::Huawei, Vendor::Honor, Vendor::Xiaomi, Vendor::Vivo, Vendor::Apple] {
            assert!(NudgePlan::for_vendor(v, &cfg(false), Duration::from_secs(8)).is_empty());
        }
    }
}
