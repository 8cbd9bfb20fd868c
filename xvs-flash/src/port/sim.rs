/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Free-running simulated sensor for bench runs without hardware.
//!
//! Emits one XVS edge per `frame_period` on a fixed monotonic schedule and
//! reproduces the kernel's edge-queue behaviour that matters to the trigger
//! loop:
//!
//! * an edge that has not been drained is returned again immediately;
//! * frames that elapsed while the loop was busy collapse into the latest
//!   one instead of queueing up.
//!
//! The actuator line is only tracked as a level plus a transition counter.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{EdgeWait, SignalPort};
use crate::error::PortError;

/// Convert a frame rate to a frame period.
///
/// Returns `None` for rates that are not finite and strictly positive.
pub fn frame_period_from_fps(fps: f64) -> Option<Duration> {
    if fps.is_finite() && fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).ok()
    } else {
        None
    }
}

#[derive(Debug)]
pub struct SimulatedPort {
    frame_period: Duration,
    next_edge: Instant,
    pending: bool,
    level: bool,
    edges: u64,
    collapsed: u64,
    transitions: u64,
}

impl SimulatedPort {
    /// First edge fires one `frame_period` from now.
    pub fn new(frame_period: Duration) -> Self {
        Self {
            frame_period,
            next_edge: Instant::now() + frame_period,
            pending: false,
            level: false,
            edges: 0,
            collapsed: 0,
            transitions: 0,
        }
    }

    /// Edges delivered to the loop.
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Frames that were overwritten by a later frame before being read.
    pub fn collapsed(&self) -> u64 {
        self.collapsed
    }

    /// Actuator level changes.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn level(&self) -> bool {
        self.level
    }

    /// Latch every frame boundary at or before `now`.
    fn latch(&mut self, now: Instant) {
        if self.frame_period.is_zero() {
            // degenerate clock: an edge is always available
            self.pending = true;
            return;
        }
        let mut frames = 0u64;
        while self.next_edge <= now {
            self.next_edge += self.frame_period;
            frames += 1;
        }
        if frames == 0 {
            return;
        }
        // one surviving edge, plus the one already unread (if any) is overwritten
        let overwritten = frames - 1 + u64::from(self.pending);
        if overwritten > 0 {
            debug!(overwritten, "Simulated XVS frames collapsed");
        }
        self.collapsed += overwritten;
        self.edges += 1;
        self.pending = true;
    }
}

impl SignalPort for SimulatedPort {
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<EdgeWait, PortError> {
        let now = Instant::now();
        self.latch(now);
        if self.pending {
            return Ok(EdgeWait::Edge);
        }

        let until_edge = self.next_edge.saturating_duration_since(now);
        if until_edge > timeout {
            thread::sleep(timeout);
            return Ok(EdgeWait::TimedOut);
        }

        thread::sleep(until_edge);
        self.latch(Instant::now().max(self.next_edge));
        Ok(EdgeWait::Edge)
    }

    fn drain_event(&mut self) -> Result<(), PortError> {
        self.pending = false;
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), PortError> {
        if self.level != high {
            self.transitions += 1;
        }
        self.level = high;
        Ok(())
    }
}
