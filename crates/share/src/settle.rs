//! Bounded visibility polling for freshly created remote entries.
//!
//! Some share backends acknowledge a create before the entry shows up in
//! subsequent queries. [`await_visible`] polls a caller-supplied probe a
//! bounded number of times with growing delays, replacing the fixed
//! one-second sleep such systems traditionally hide behind.

use std::thread;
use std::time::Duration;

use logging::{DebugFlag, debug_gte, emit_debug};

/// Retry budget and pacing for [`await_visible`].
#[derive(Clone, Copy, Debug)]
pub struct SettlePolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: u32,
}

impl SettlePolicy {
    /// Builds a policy with an explicit attempt budget and pacing.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
        }
    }

    /// Number of probe attempts before giving up.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(50), 2)
    }
}

/// Polls `probe` until it reports `true` or the attempt budget runs out.
///
/// Returns `Ok(true)` once the probe succeeds, `Ok(false)` when all
/// attempts are exhausted, and the probe's error unchanged if any probe
/// fails. No delay is taken after the final attempt.
pub fn await_visible<E, F>(policy: &SettlePolicy, mut probe: F) -> Result<bool, E>
where
    F: FnMut() -> Result<bool, E>,
{
    let mut delay = policy.initial_delay;
    for attempt in 1..=policy.max_attempts {
        if probe()? {
            return Ok(true);
        }
        if attempt < policy.max_attempts {
            if debug_gte(DebugFlag::Settle, 2) {
                emit_debug(
                    DebugFlag::Settle,
                    2,
                    format!("not visible after attempt {attempt}, waiting {delay:?}"),
                );
            }
            thread::sleep(delay);
            delay = delay.saturating_mul(policy.backoff_factor);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_policy(attempts: u32) -> SettlePolicy {
        SettlePolicy::new(attempts, Duration::ZERO, 1)
    }

    #[test]
    fn immediate_visibility_needs_one_probe() {
        let mut calls = 0;
        let visible = await_visible::<(), _>(&instant_policy(5), || {
            calls += 1;
            Ok(true)
        })
        .expect("probe");
        assert!(visible);
        assert_eq!(calls, 1);
    }

    #[test]
    fn late_visibility_is_found_within_budget() {
        let mut calls = 0;
        let visible = await_visible::<(), _>(&instant_policy(5), || {
            calls += 1;
            Ok(calls == 3)
        })
        .expect("probe");
        assert!(visible);
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhausted_budget_reports_not_visible() {
        let mut calls = 0;
        let visible = await_visible::<(), _>(&instant_policy(4), || {
            calls += 1;
            Ok(false)
        })
        .expect("probe");
        assert!(!visible);
        assert_eq!(calls, 4);
    }

    #[test]
    fn probe_errors_propagate_immediately() {
        let mut calls = 0;
        let result = await_visible(&instant_policy(5), || {
            calls += 1;
            if calls == 2 { Err("probe failed") } else { Ok(false) }
        });
        assert_eq!(result, Err("probe failed"));
        assert_eq!(calls, 2);
    }
}
