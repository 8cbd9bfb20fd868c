/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Sensor timing profile: when the global-exposure window opens and how long
//! it stays open.
//!
//! Timeline of one frame, relative to the XVS rising edge (T = 0):
//!
//! ```text
//!  XVS ─┐
//!       │<─ T1 blanking ─>│<──── T2 roll-up ────>│<── T3 window ──>│
//!       │                 row 1 starts           last row starts    row 1 ends
//!       │                                        │<- FT ->│
//!       │<──────────── trigger delay ───────────>│ flash  │
//! ```
//!
//! * `T3 = T-exp − T2` — every row is exposing during this interval.
//! * `trigger delay = T1 + T2` — busy-waited after the edge.
//! * `FT < T3` — the flash must be over before row 1 stops exposing.
//!
//! All arithmetic is checked: an impossible profile is a
//! [`ConfigurationError`], never a wrapped or saturated value.

pub mod spin;

use std::fmt;
use std::time::Duration;

use crate::error::ConfigurationError;

// ── Reference constants (Sony IMX415, all-pixel mode) ─────────────────────────

/// T1: 58 overhead lines × 4 900 ns/line before the recording pixel area.
pub const IMX415_BLANKING_NS: u64 = 284_200;

/// T2: 2 159 line times from row 1 to row 2 160.
pub const IMX415_ROLL_UP_NS: u64 = 10_579_100;

/// T-exp: 15 ms exposure (set through the SHR0 register).
pub const IMX415_TOTAL_EXPOSURE_NS: u64 = 15_000_000;

/// FT: 50 µs flash.
pub const IMX415_PULSE_NS: u64 = 50_000;

// ── TimingProfile ─────────────────────────────────────────────────────────────

/// Validated, immutable set of frame timing durations.
///
/// The only way to obtain one is [`TimingProfile::new`], so holding a
/// `TimingProfile` proves `pulse < window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    blanking: Duration,
    roll_up: Duration,
    total_exposure: Duration,
    pulse: Duration,
    window: Duration,
    trigger_delay: Duration,
}

impl TimingProfile {
    /// Compute the window and trigger delay and validate the flash fits.
    ///
    /// # Errors
    /// * [`ConfigurationError::EmptyWindow`] – `total_exposure <= roll_up`.
    /// * [`ConfigurationError::PulseExceedsWindow`] – `pulse >= window`.
    /// * [`ConfigurationError::DelayOverflow`] – `blanking + roll_up` overflows.
    pub fn new(
        blanking: Duration,
        roll_up: Duration,
        total_exposure: Duration,
        pulse: Duration,
    ) -> Result<Self, ConfigurationError> {
        let window = match total_exposure.checked_sub(roll_up) {
            Some(w) if !w.is_zero() => w,
            _ => {
                return Err(ConfigurationError::EmptyWindow {
                    total_exposure,
                    roll_up,
                })
            }
        };

        if pulse >= window {
            return Err(ConfigurationError::PulseExceedsWindow { pulse, window });
        }

        let trigger_delay = blanking
            .checked_add(roll_up)
            .ok_or(ConfigurationError::DelayOverflow { blanking, roll_up })?;

        Ok(Self {
            blanking,
            roll_up,
            total_exposure,
            pulse,
            window,
            trigger_delay,
        })
    }

    /// Same as [`new`](Self::new) with every input in nanoseconds.
    pub fn from_nanos(
        blanking_ns: u64,
        roll_up_ns: u64,
        total_exposure_ns: u64,
        pulse_ns: u64,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            Duration::from_nanos(blanking_ns),
            Duration::from_nanos(roll_up_ns),
            Duration::from_nanos(total_exposure_ns),
            Duration::from_nanos(pulse_ns),
        )
    }

    /// The IMX415 reference profile (15 ms exposure, 50 µs flash).
    pub fn imx415_default() -> Result<Self, ConfigurationError> {
        Self::from_nanos(
            IMX415_BLANKING_NS,
            IMX415_ROLL_UP_NS,
            IMX415_TOTAL_EXPOSURE_NS,
            IMX415_PULSE_NS,
        )
    }

    pub fn blanking(&self) -> Duration {
        self.blanking
    }

    pub fn roll_up(&self) -> Duration {
        self.roll_up
    }

    pub fn total_exposure(&self) -> Duration {
        self.total_exposure
    }

    /// Flash duration (FT).
    pub fn pulse(&self) -> Duration {
        self.pulse
    }

    /// Global-exposure window length (T3).
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Busy-wait after the XVS edge before the window opens (T1 + T2).
    pub fn trigger_delay(&self) -> Duration {
        self.trigger_delay
    }

    /// How late the flash may start and still end inside the window.
    ///
    /// Always non-zero, since `pulse < window`.
    pub fn slack(&self) -> Duration {
        self.window - self.pulse
    }
}

/// Startup banner, microsecond units.
impl fmt::Display for TimingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let us = |d: Duration| d.as_nanos() as f64 / 1_000.0;
        writeln!(f, "  T1 (Blanking): {:.1} µs", us(self.blanking))?;
        writeln!(f, "  T2 (Roll-Up):  {:.1} µs", us(self.roll_up))?;
        writeln!(f, "  T3 (Window):   {:.1} µs (set by T-exp)", us(self.window))?;
        writeln!(f, "  FT (Flash):    {:.1} µs", us(self.pulse))?;
        write!(f, "  TRIGGER WAIT:  {:.1} µs", us(self.trigger_delay))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imx415_reference_profile_is_valid() {
        let p = TimingProfile::from_nanos(284_200, 10_579_100, 15_000_000, 50_000).unwrap();
        assert_eq!(p.window(), Duration::from_nanos(4_420_900));
        assert_eq!(p.trigger_delay(), Duration::from_nanos(10_863_300));
        assert_eq!(p.pulse(), Duration::from_nanos(50_000));
        assert_eq!(p, TimingProfile::imx415_default().unwrap());
    }

    #[test]
    fn short_exposure_rejects_50us_flash() {
        // window = 10.6 ms − 10.5791 ms = 20.9 µs < 50 µs
        let err =
            TimingProfile::from_nanos(284_200, 10_579_100, 10_600_000, 50_000).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::PulseExceedsWindow {
                pulse: Duration::from_nanos(50_000),
                window: Duration::from_nanos(20_900),
            }
        );
    }

    #[test]
    fn trigger_delay_is_exact_sum_for_many_inputs() {
        for blanking in [0u64, 1, 284_200, 999_999_999] {
            for roll_up in [0u64, 7, 10_579_100] {
                let total = roll_up + 1_000_000;
                let p = TimingProfile::from_nanos(blanking, roll_up, total, 1).unwrap();
                assert_eq!(p.trigger_delay(), Duration::from_nanos(blanking + roll_up));
                assert_eq!(p.window(), Duration::from_nanos(1_000_000));
            }
        }
    }

    #[test]
    fn pulse_equal_to_window_is_rejected() {
        // strict inequality: FT == T3 leaves no margin at all
        let err = TimingProfile::from_nanos(0, 1_000, 2_000, 1_000).unwrap_err();
        assert!(matches!(err, ConfigurationError::PulseExceedsWindow { .. }));
    }

    #[test]
    fn pulse_one_ns_below_window_is_accepted() {
        let p = TimingProfile::from_nanos(0, 1_000, 2_000, 999).unwrap();
        assert_eq!(p.slack(), Duration::from_nanos(1));
    }

    #[test]
    fn exposure_not_exceeding_roll_up_is_empty_window() {
        let equal = TimingProfile::from_nanos(0, 5_000, 5_000, 1).unwrap_err();
        assert!(matches!(equal, ConfigurationError::EmptyWindow { .. }));

        let shorter = TimingProfile::from_nanos(0, 5_000, 4_000, 1).unwrap_err();
        assert!(matches!(shorter, ConfigurationError::EmptyWindow { .. }));
    }

    #[test]
    fn zero_pulse_fits_any_window() {
        // 0 < window holds, so the reference geometry accepts a zero-length flash
        let p = TimingProfile::from_nanos(284_200, 10_579_100, 15_000_000, 0).unwrap();
        assert_eq!(p.pulse(), Duration::ZERO);
        assert_eq!(p.slack(), p.window());
        assert_eq!(p.trigger_delay(), Duration::from_nanos(10_863_300));
    }

    #[test]
    fn delay_overflow_is_reported() {
        let err = TimingProfile::new(
            Duration::MAX,
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_millis(1),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::DelayOverflow { .. }));
    }

    #[test]
    fn banner_lists_every_constant_in_microseconds() {
        let banner = TimingProfile::imx415_default().unwrap().to_string();
        assert!(banner.contains("284.2 µs"));
        assert!(banner.contains("10579.1 µs"));
        assert!(banner.contains("4420.9 µs"));
        assert!(banner.contains("50.0 µs"));
        assert!(banner.contains("10863.3 µs"));
    }
}
