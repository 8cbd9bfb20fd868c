/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The two hardware lines the trigger loop needs, behind one trait.
//!
//! ```text
//! sensor XVS ──► sync line (rising-edge events) ──► TriggerLoop ──► actuator line ──► LED
//! ```
//!
//! * [`gpio::GpioPort`] — the real Linux GPIO character device.
//! * [`sim::SimulatedPort`] — a free-running frame clock for bench runs
//!   without a sensor attached.
//!
//! The edge-wait timeout only bounds how long the loop goes without looking
//! at the shutdown flag.  It is not a timing-critical value.

pub mod gpio;
pub mod sim;

use std::time::Duration;

use crate::error::PortError;

/// Outcome of waiting on the sync line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWait {
    /// A rising edge is queued; call [`SignalPort::drain_event`] next.
    Edge,
    /// Nothing arrived within the timeout.  Not an error.
    TimedOut,
}

/// One edge-triggered input and one level output.
///
/// Implementations own their lines for their whole lifetime and release them
/// on drop.
pub trait SignalPort {
    /// Block until a rising edge is queued on the sync line or `timeout`
    /// elapses.
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<EdgeWait, PortError>;

    /// Consume every queued edge event.
    ///
    /// Must follow every [`EdgeWait::Edge`]; otherwise the next wait returns
    /// immediately on the same stale event.  After a drain nothing is pending,
    /// so the next [`EdgeWait::Edge`] is an edge newer than the drain.
    fn drain_event(&mut self) -> Result<(), PortError>;

    /// Drive the actuator line.  Non-blocking.
    fn set_level(&mut self, high: bool) -> Result<(), PortError>;
}

impl<P: SignalPort + ?Sized> SignalPort for Box<P> {
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<EdgeWait, PortError> {
        (**self).wait_for_edge(timeout)
    }

    fn drain_event(&mut self) -> Result<(), PortError> {
        (**self).drain_event()
    }

    fn set_level(&mut self, high: bool) -> Result<(), PortError> {
        (**self).set_level(high)
    }
}
