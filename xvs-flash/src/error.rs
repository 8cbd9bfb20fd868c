/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the XVS flash controller.
//!
//! Two error enums model the two fatal failure layers:
//!
//! * [`ConfigurationError`] — the timing constants or loop settings can never
//!   work (e.g. the flash is longer than the global window).  Detected before
//!   any GPIO line is touched.
//! * [`PortError`] — a GPIO line could not be requested, or failed while the
//!   trigger loop was running.
//!
//! [`FlashError`] is the union surfaced to the entry point, which turns it
//! into exactly one diagnostic and a non-zero exit status.
//!
//! Scheduling failures are deliberately **not** part of this taxonomy: they
//! are recovered inside [`crate::sched`] with a warning.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed source error carried by [`PortError`].
///
/// Boxed so that the simulated port and test doubles can report failures
/// without depending on `gpiocdev`'s error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Configuration ─────────────────────────────────────────────────────────────

/// A fixed misconfiguration of the timing profile or trigger loop.
///
/// No retry can fix any of these, so they are reported once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `total_exposure <= roll_up`: there is no instant at which every row is
    /// exposing, so there is no global window at all.
    #[error(
        "total exposure {}µs does not exceed roll-up time {}µs — the global window is empty",
        micros(.total_exposure),
        micros(.roll_up)
    )]
    EmptyWindow {
        total_exposure: Duration,
        roll_up: Duration,
    },

    /// `pulse >= window`: the flash cannot complete before the window closes.
    #[error(
        "flash duration {}µs is not shorter than the global window {}µs",
        micros(.pulse),
        micros(.window)
    )]
    PulseExceedsWindow { pulse: Duration, window: Duration },

    /// `blanking + roll_up` does not fit in a `Duration`.
    #[error("trigger delay overflow computing blanking {blanking:?} + roll-up {roll_up:?}")]
    DelayOverflow { blanking: Duration, roll_up: Duration },

    /// The edge-wait timeout is zero, which would turn the wait into a busy
    /// poll of the GPIO file descriptor.
    #[error("edge wait timeout must be greater than zero")]
    ZeroEdgeTimeout,
}

fn micros(d: &Duration) -> String {
    format!("{:.1}", d.as_nanos() as f64 / 1_000.0)
}

// ── GPIO port ─────────────────────────────────────────────────────────────────

/// Which of the two GPIO lines an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Input line carrying the sensor's XVS sync pulse.
    Sync,
    /// Output line driving the LED.
    Actuator,
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRole::Sync => write!(f, "sync (XVS)"),
            LineRole::Actuator => write!(f, "actuator (LED)"),
        }
    }
}

/// Failure of a GPIO line, at acquisition time or while running.
#[derive(Debug, Error)]
pub enum PortError {
    /// The line could not be requested: wrong chip name or line number,
    /// missing permission, or the line is held by another consumer.
    #[error("cannot request {role} line {line} on chip '{chip}': {source}")]
    Unavailable {
        chip: String,
        line: u32,
        role: LineRole,
        #[source]
        source: BoxError,
    },

    /// An already-requested line failed during the trigger loop.
    #[error("I/O failure on {role} line: {source}")]
    Io {
        role: LineRole,
        #[source]
        source: BoxError,
    },
}

// ── Top level ─────────────────────────────────────────────────────────────────

/// Every fatal condition the entry point can receive.
#[derive(Debug, Error)]
pub enum FlashError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("GPIO error: {0}")]
    Port(#[from] PortError),
}

impl FlashError {
    /// Operator hint printed after the error itself.
    pub fn hint(&self) -> &'static str {
        match self {
            FlashError::Configuration(_) => {
                "Check the timing constants: the flash must end before the global window closes."
            }
            FlashError::Port(_) => "Please check GPIO chip name and line numbers.",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_exceeds_window_message_is_in_microseconds() {
        let err = ConfigurationError::PulseExceedsWindow {
            pulse: Duration::from_nanos(50_000),
            window: Duration::from_nanos(20_900),
        };
        let msg = err.to_string();
        assert!(msg.contains("50.0µs"), "got: {msg}");
        assert!(msg.contains("20.9µs"), "got: {msg}");
    }

    #[test]
    fn port_error_names_chip_line_and_role() {
        let err = PortError::Unavailable {
            chip: "/dev/gpiochip9".into(),
            line: 17,
            role: LineRole::Sync,
            source: "No such file or directory".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/gpiochip9"));
        assert!(msg.contains("17"));
        assert!(msg.contains("XVS"));
    }

    #[test]
    fn flash_error_wraps_both_layers() {
        let cfg: FlashError = ConfigurationError::ZeroEdgeTimeout.into();
        assert!(matches!(cfg, FlashError::Configuration(_)));
        assert!(cfg.hint().contains("timing"));

        let port: FlashError = PortError::Io {
            role: LineRole::Actuator,
            source: "device removed".into(),
        }
        .into();
        assert!(matches!(port, FlashError::Port(_)));
        assert!(port.hint().contains("GPIO"));
    }
}
