/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The XVS → flash trigger loop.
//!
//! [`TriggerLoop`] is a four-phase state machine driven by one sync edge per
//! cycle:
//!
//! ```text
//!           ┌──────────────── timeout ───────────────┐
//!           ▼                                        │
//!   ┌─► WaitingForEdge ──edge──► DeadTimeWait ──► Actuating ──┐
//!   │        │                   (busy-wait)      (LED high,  │
//!   │   stop requested                            sleep, low) │
//!   │        ▼                                                │
//!   │     Stopped                                             │
//!   └──────────────────────── CoolDown ◄──────────────────────┘
//! ```
//!
//! The schedule is open-loop: `t0` is captured when the edge is drained and
//! the LED goes high once `trigger_delay` has elapsed since then.  Nothing is
//! calibrated or adapted at runtime.
//!
//! # Cancellation
//! The stop flag is read only at the top of each cycle.  A cycle that has
//! already seen its edge always finishes, so the LED is never left high by a
//! shutdown request.
//!
//! # Edge collapsing
//! Edges are processed strictly one at a time.  An edge that arrives while a
//! cycle is in progress stays queued (one deep) and starts the next cycle;
//! further edges in that interval are overwritten rather than queued.

pub mod stats;

pub use stats::{CycleTiming, RunStats, RunSummary};

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::error::PortError;
use crate::port::{EdgeWait, SignalPort};
use crate::shutdown::ShutdownSignal;
use crate::timing::{spin, TimingProfile};

/// Result of a single [`TriggerLoop::run_cycle`].
#[derive(Debug, Clone, Copy)]
pub enum CycleOutcome {
    /// An edge was processed and the LED flashed.
    Fired(CycleTiming),
    /// No edge within the wait timeout.
    TimedOut,
}

// ── TriggerLoop ───────────────────────────────────────────────────────────────

pub struct TriggerLoop<P: SignalPort> {
    port: P,
    profile: TimingProfile,
    shutdown: ShutdownSignal,
    edge_timeout: Duration,
    max_cycles: Option<u64>,
    stats: RunStats,
}

impl<P: SignalPort> TriggerLoop<P> {
    /// `edge_timeout` only bounds how long a stop request can go unnoticed
    /// when no edges arrive.
    pub fn new(
        port: P,
        profile: TimingProfile,
        shutdown: ShutdownSignal,
        edge_timeout: Duration,
    ) -> Self {
        Self {
            port,
            profile,
            shutdown,
            edge_timeout,
            max_cycles: None,
            stats: RunStats::new(),
        }
    }

    /// Stop on its own after `cycles` flashes.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Give the port back, e.g. to inspect a simulated one after a run.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Run cycles until a stop is requested (or the cycle limit is reached).
    ///
    /// # Errors
    /// Any [`PortError`] from the lines.  The loop does not retry: a GPIO line
    /// that fails mid-run will not recover on its own.
    pub fn run(&mut self) -> Result<RunSummary, PortError> {
        info!(
            edge_timeout_ms = self.edge_timeout.as_millis() as u64,
            "Waiting for the first XVS pulse... (Press Ctrl+C to stop)"
        );

        while !self.shutdown.is_requested() {
            if let Some(max) = self.max_cycles {
                if self.stats.cycles() >= max {
                    info!(cycles = max, "Cycle limit reached");
                    break;
                }
            }

            match self.run_cycle()? {
                CycleOutcome::Fired(c) => {
                    trace!(
                        lateness_ns = c.lateness.as_nanos() as u64,
                        pulse_ns = c.pulse_width.as_nanos() as u64,
                        "Flash fired"
                    );
                    if c.overran {
                        warn!(
                            lateness_us = c.lateness.as_micros() as u64,
                            pulse_us = c.pulse_width.as_micros() as u64,
                            window_us = self.profile.window().as_micros() as u64,
                            "Flash ended after the global window closed"
                        );
                    }
                }
                CycleOutcome::TimedOut => trace!("No XVS edge within timeout"),
            }
        }

        let summary = self.stats.summary();
        info!("Trigger loop stopped: {summary}");
        Ok(summary)
    }

    /// Execute exactly one cycle: wait → dead time → flash.
    ///
    /// Does not look at the stop flag; [`run`](Self::run) does that between
    /// cycles.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, PortError> {
        // ── WaitingForEdge ────────────────────────────────────────────────────
        match self.port.wait_for_edge(self.edge_timeout)? {
            EdgeWait::TimedOut => {
                self.stats.record_timeout();
                return Ok(CycleOutcome::TimedOut);
            }
            EdgeWait::Edge => {}
        }
        // Consume the event first, or the next wait returns on it again.
        self.port.drain_event()?;
        let t0 = Instant::now();

        // ── DeadTimeWait ──────────────────────────────────────────────────────
        let fire_at = spin::spin_until(t0, self.profile.trigger_delay());

        // ── Actuating ─────────────────────────────────────────────────────────
        self.port.set_level(true)?;
        // The window is already open; sleep precision is good enough here.
        thread::sleep(self.profile.pulse());
        self.port.set_level(false)?;
        let off_at = Instant::now();

        // ── CoolDown ──────────────────────────────────────────────────────────
        let timing = CycleTiming::measure(&self.profile, t0, fire_at, off_at);
        self.stats.record(&timing);
        Ok(CycleOutcome::Fired(timing))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
