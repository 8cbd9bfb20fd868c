/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Precision wait primitive for the dead time after the XVS edge.
//!
//! `thread::sleep` wakes tens to hundreds of microseconds late depending on
//! the kernel timer slack and scheduler load, which is a large fraction of a
//! typical global window.  This module spins on the monotonic clock instead,
//! so wake-up error is bounded by the clock read cost.
//!
//! Kept as free functions so the hot loop stays allocation-free and can be
//! replaced by a platform-specific primitive without touching the trigger
//! loop.

use std::hint;
use std::time::{Duration, Instant};

/// Spin until at least `delay` has elapsed since `start`.
///
/// Returns the first clock reading at or past the deadline, so the caller can
/// measure how late the wake-up actually was.  Never returns early.
///
/// If `start + delay` is not representable the wait degenerates to returning
/// immediately after the current reading; [`TimingProfile`] rules that out
/// for real delays.
///
/// [`TimingProfile`]: super::TimingProfile
#[inline]
pub fn spin_until(start: Instant, delay: Duration) -> Instant {
    let Some(deadline) = start.checked_add(delay) else {
        return Instant::now();
    };
    loop {
        let now = Instant::now();
        if now >= deadline {
            return now;
        }
        hint::spin_loop();
    }
}

/// Time past the deadline at which `spin_until` returned.
///
/// Saturates at zero.
#[inline]
pub fn lateness(start: Instant, delay: Duration, reached: Instant) -> Duration {
    reached.saturating_duration_since(start).saturating_sub(delay)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_never_returns_early() {
        for delay_us in [0u64, 1, 50, 500, 2_000] {
            let delay = Duration::from_micros(delay_us);
            let start = Instant::now();
            let reached = spin_until(start, delay);
            assert!(
                reached.duration_since(start) >= delay,
                "returned after {:?}, wanted at least {:?}",
                reached.duration_since(start),
                delay
            );
        }
    }

    #[test]
    fn spin_with_past_start_returns_immediately() {
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        let before = Instant::now();
        let reached = spin_until(start, Duration::from_millis(1));
        // deadline already passed: only one clock read should happen
        assert!(reached.duration_since(before) < Duration::from_millis(50));
    }

    #[test]
    fn lateness_is_elapsed_minus_delay() {
        let start = Instant::now();
        let reached = start + Duration::from_micros(130);
        assert_eq!(
            lateness(start, Duration::from_micros(100), reached),
            Duration::from_micros(30)
        );
    }

    #[test]
    fn lateness_saturates_at_zero() {
        let start = Instant::now();
        let reached = start + Duration::from_micros(10);
        assert_eq!(
            lateness(start, Duration::from_micros(100), reached),
            Duration::ZERO
        );
    }
}
