/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Linux GPIO character-device implementation of [`SignalPort`].
//!
//! Each line is a separate `gpiocdev::Request`, so the kernel releases it when
//! the request's file descriptor is closed.  That happens in `Drop` on every
//! exit path: clean shutdown, a runtime error, or an early return from
//! `main`.

use std::path::PathBuf;
use std::time::Duration;

use gpiocdev::line::{EdgeDetection, Value};
use gpiocdev::Request;
use tracing::{debug, info, warn};

use super::{EdgeWait, SignalPort};
use crate::config::HardwareConfig;
use crate::error::{LineRole, PortError};

/// Resolve a chip identifier to a device path.
///
/// A bare name such as `gpiochip0` maps to `/dev/gpiochip0`; anything
/// containing a `/` is used as-is.
pub fn chip_path(chip: &str) -> PathBuf {
    if chip.contains('/') {
        PathBuf::from(chip)
    } else {
        PathBuf::from("/dev").join(chip)
    }
}

/// Exclusively held XVS input and LED output lines.
pub struct GpioPort {
    sync: Request,
    actuator: Request,
    actuator_line: u32,
}

impl GpioPort {
    /// Request both lines.
    ///
    /// The sync line is configured for rising-edge events (0 V → 3.3 V at the
    /// start of each XVS pulse); the actuator line as an output, initially
    /// low.
    ///
    /// # Errors
    /// [`PortError::Unavailable`] for the first line that cannot be
    /// requested.  If the actuator fails, the already-acquired sync line is
    /// released before returning.
    pub fn open(hw: &HardwareConfig) -> Result<Self, PortError> {
        let path = chip_path(&hw.chip);

        let sync = Request::builder()
            .on_chip(path.clone())
            .with_consumer(hw.consumer.as_str())
            .with_line(hw.sync_line)
            .as_input()
            .with_edge_detection(EdgeDetection::RisingEdge)
            .request()
            .map_err(|e| PortError::Unavailable {
                chip: path.display().to_string(),
                line: hw.sync_line,
                role: LineRole::Sync,
                source: Box::new(e),
            })?;

        info!(
            chip = %path.display(),
            line = hw.sync_line,
            "XVS line requested (rising edge)"
        );

        let actuator = Request::builder()
            .on_chip(path.clone())
            .with_consumer(hw.consumer.as_str())
            .with_line(hw.actuator_line)
            .as_output(Value::Inactive)
            .request()
            .map_err(|e| PortError::Unavailable {
                chip: path.display().to_string(),
                line: hw.actuator_line,
                role: LineRole::Actuator,
                source: Box::new(e),
            })?;

        info!(
            chip = %path.display(),
            line = hw.actuator_line,
            "LED line requested (output, initially low)"
        );

        Ok(Self {
            sync,
            actuator,
            actuator_line: hw.actuator_line,
        })
    }
}

impl SignalPort for GpioPort {
    fn wait_for_edge(&mut self, timeout: Duration) -> Result<EdgeWait, PortError> {
        let ready = self
            .sync
            .wait_edge_event(timeout)
            .map_err(|e| PortError::Io {
                role: LineRole::Sync,
                source: Box::new(e),
            })?;
        Ok(if ready {
            EdgeWait::Edge
        } else {
            EdgeWait::TimedOut
        })
    }

    fn drain_event(&mut self) -> Result<(), PortError> {
        let sync_io = |e: gpiocdev::Error| PortError::Io {
            role: LineRole::Sync,
            source: Box::new(e),
        };
        // the kernel buffers several edges; a frame that landed during the
        // previous cycle must not satisfy the next wait
        self.sync.read_edge_event().map_err(sync_io)?;
        while self.sync.has_edge_event().map_err(sync_io)? {
            self.sync.read_edge_event().map_err(sync_io)?;
        }
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), PortError> {
        let value = if high { Value::Active } else { Value::Inactive };
        self.actuator
            .set_value(self.actuator_line, value)
            .map_err(|e| PortError::Io {
                role: LineRole::Actuator,
                source: Box::new(e),
            })
    }
}

impl Drop for GpioPort {
    fn drop(&mut self) {
        // Leave the LED dark even if the loop died mid-pulse.
        if let Err(e) = self.set_level(false) {
            warn!("Failed to drive LED low on release: {e}");
        }
        debug!("Releasing GPIO lines");
    }
}
