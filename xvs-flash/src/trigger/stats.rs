/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Measured timing of fired cycles.
//!
//! The trigger schedule is open-loop, so these numbers are diagnostics only:
//! they never feed back into the delay.  What they answer is whether the
//! host kept up, i.e. whether every flash actually ended inside the global
//! window.
//!
//! A cycle **overruns** when
//!
//! ```text
//! lateness + measured_pulse > window
//! ```
//!
//! where `lateness` is how long after `t0 + trigger_delay` the LED went high.
//! The profile guarantees `pulse < window`, so an overrun is always caused by
//! host latency (a late spin exit or an oversleeping pulse), never by
//! configuration.

use std::fmt;
use std::time::{Duration, Instant};

use crate::timing::TimingProfile;

/// Timestamps and derived figures of one fired cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleTiming {
    /// Edge drained; T = 0 for the cycle.
    pub t0: Instant,
    /// Clock reading at which the dead-time spin ended.
    pub fire_at: Instant,
    /// Clock reading right after the LED was driven low.
    pub off_at: Instant,
    /// `fire_at − (t0 + trigger_delay)`.
    pub lateness: Duration,
    /// `off_at − fire_at`.
    pub pulse_width: Duration,
    /// The flash ended after the window closed.
    pub overran: bool,
}

impl CycleTiming {
    pub fn measure(profile: &TimingProfile, t0: Instant, fire_at: Instant, off_at: Instant) -> Self {
        let lateness = fire_at
            .saturating_duration_since(t0)
            .saturating_sub(profile.trigger_delay());
        let pulse_width = off_at.saturating_duration_since(fire_at);
        let overran = lateness.saturating_add(pulse_width) > profile.window();
        Self {
            t0,
            fire_at,
            off_at,
            lateness,
            pulse_width,
            overran,
        }
    }
}

/// Running counters owned by the trigger loop.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    cycles: u64,
    timeouts: u64,
    overruns: u64,
    lateness_min: Option<Duration>,
    lateness_max: Duration,
    lateness_total: Duration,
    pulse_max: Duration,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, cycle: &CycleTiming) {
        self.cycles += 1;
        if cycle.overran {
            self.overruns += 1;
        }
        self.lateness_min = Some(match self.lateness_min {
            Some(m) => m.min(cycle.lateness),
            None => cycle.lateness,
        });
        self.lateness_max = self.lateness_max.max(cycle.lateness);
        self.lateness_total = self.lateness_total.saturating_add(cycle.lateness);
        self.pulse_max = self.pulse_max.max(cycle.pulse_width);
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    /// Fired cycles so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn summary(&self) -> RunSummary {
        let lateness_mean = if self.cycles == 0 {
            Duration::ZERO
        } else {
            // u32 cap only matters after ~4 billion frames
            self.lateness_total / u32::try_from(self.cycles).unwrap_or(u32::MAX)
        };
        RunSummary {
            cycles: self.cycles,
            timeouts: self.timeouts,
            window_overruns: self.overruns,
            lateness_min: self.lateness_min.unwrap_or(Duration::ZERO),
            lateness_max: self.lateness_max,
            lateness_mean,
            pulse_max: self.pulse_max,
        }
    }
}

/// Snapshot returned by [`TriggerLoop::run`](super::TriggerLoop::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub cycles: u64,
    pub timeouts: u64,
    pub window_overruns: u64,
    pub lateness_min: Duration,
    pub lateness_max: Duration,
    pub lateness_mean: Duration,
    pub pulse_max: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let us = |d: Duration| d.as_nanos() as f64 / 1_000.0;
        write!(
            f,
            "{} flashes, {} edge timeouts, {} window overruns; \
             trigger lateness min/mean/max {:.1}/{:.1}/{:.1} µs; longest flash {:.1} µs",
            self.cycles,
            self.timeouts,
            self.window_overruns,
            us(self.lateness_min),
            us(self.lateness_mean),
            us(self.lateness_max),
            us(self.pulse_max),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> TimingProfile {
        // delay 100 µs, window 1 000 µs, pulse 200 µs
        TimingProfile::from_nanos(40_000, 60_000, 1_060_000, 200_000).unwrap()
    }

    fn cycle(lateness_us: u64, pulse_us: u64) -> CycleTiming {
        let p = profile();
        let t0 = Instant::now();
        let fire_at = t0 + p.trigger_delay() + Duration::from_micros(lateness_us);
        let off_at = fire_at + Duration::from_micros(pulse_us);
        CycleTiming::measure(&p, t0, fire_at, off_at)
    }

    #[test]
    fn measure_derives_lateness_and_width() {
        let c = cycle(15, 230);
        assert_eq!(c.lateness, Duration::from_micros(15));
        assert_eq!(c.pulse_width, Duration::from_micros(230));
        assert!(!c.overran);
    }

    #[test]
    fn flash_ending_exactly_at_window_close_is_not_an_overrun() {
        let c = cycle(800, 200);
        assert!(!c.overran);
    }

    #[test]
    fn flash_ending_after_window_close_is_an_overrun() {
        assert!(cycle(801, 200).overran);
        // on-time start but the pulse sleep overslept badly
        assert!(cycle(0, 1_200).overran);
    }

    #[test]
    fn summary_of_empty_run_is_zero() {
        let s = RunStats::new().summary();
        assert_eq!(s, RunSummary::default());
    }

    #[test]
    fn summary_aggregates_cycles_and_timeouts() {
        let mut stats = RunStats::new();
        stats.record(&cycle(10, 200));
        stats.record(&cycle(30, 250));
        stats.record(&cycle(900, 200));
        stats.record_timeout();
        stats.record_timeout();

        let s = stats.summary();
        assert_eq!(s.cycles, 3);
        assert_eq!(s.timeouts, 2);
        assert_eq!(s.window_overruns, 1);
        assert_eq!(s.lateness_min, Duration::from_micros(10));
        assert_eq!(s.lateness_max, Duration::from_micros(900));
        assert_eq!(s.lateness_mean, Duration::from_micros(313) + Duration::from_nanos(333));
        assert_eq!(s.pulse_max, Duration::from_micros(250));
    }

    #[test]
    fn summary_display_mentions_overruns() {
        let mut stats = RunStats::new();
        stats.record(&cycle(900, 200));
        let text = stats.summary().to_string();
        assert!(text.contains("1 flashes"));
        assert!(text.contains("1 window overruns"));
    }
}
