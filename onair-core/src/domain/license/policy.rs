use chrono::{DateTime, Duration, Utc};
use onair_model::LicenseState;

use crate::domain::jobs::downgrade::DEFAULT_CASCADE_ATTEMPTS;

/// Timing knobs of the license lifecycle.
///
/// `lease` is the client-facing validity window handed out on activation and
/// renewal. `check_in_window` and `grace_tolerance` are the server-side
/// tolerance for an installation that stops checking in: grace begins
/// `check_in_window` after the last check, and a downgrade is forced once
/// grace has lasted longer than `grace_tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicensePolicy {
    pub lease: Duration,
    pub check_in_window: Duration,
    pub grace_tolerance: Duration,
    pub cascade_attempts: u32,
}

impl Default for LicensePolicy {
    fn default() -> Self {
        Self {
            lease: Duration::hours(1),
            check_in_window: Duration::minutes(30),
            grace_tolerance: Duration::hours(6),
            cascade_attempts: DEFAULT_CASCADE_ATTEMPTS,
        }
    }
}

/// What outage enforcement should do to a state at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutageDecision {
    /// Grace should begin, backdated to this instant.
    pub start_grace_at: Option<DateTime<Utc>>,
    /// The tolerance is exhausted and the installation must drop to Basic.
    pub downgrade: bool,
}

impl OutageDecision {
    pub fn is_noop(&self) -> bool {
        self.start_grace_at.is_none() && !self.downgrade
    }
}

/// Pure outage evaluation.
///
/// Grace is backdated to `last_check_at + check_in_window`, not to the moment
/// the outage is noticed, so one late check can both start grace and find it
/// already exhausted.
pub fn evaluate_outage(
    state: &LicenseState,
    now: DateTime<Utc>,
    policy: &LicensePolicy,
) -> OutageDecision {
    let mut decision = OutageDecision::default();
    let mut grace_started_at = state.grace_started_at;

    if grace_started_at.is_none()
        && let Some(last_check_at) = state.last_check_at
        && now - last_check_at > policy.check_in_window
    {
        let backdated = last_check_at + policy.check_in_window;
        decision.start_grace_at = Some(backdated);
        grace_started_at = Some(backdated);
    }

    if let Some(grace_started_at) = grace_started_at
        && now - grace_started_at > policy.grace_tolerance
        && !state.activated_tier.is_basic()
    {
        decision.downgrade = true;
    }

    decision
}
