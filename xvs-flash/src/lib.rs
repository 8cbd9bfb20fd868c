/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! xvs-flash – fires an LED inside the global-exposure window of a
//! rolling-shutter sensor, keyed to the sensor's XVS sync edge.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/     – YAML launch configuration + defaults
//! ├── error       – ConfigurationError / PortError / FlashError
//! ├── timing/     – validated TimingProfile, busy-wait primitive
//! ├── port/       – SignalPort trait, GPIO cdev and simulated ports
//! ├── sched       – best-effort SCHED_FIFO / CPU pinning
//! ├── shutdown    – cooperative stop flag
//! └── trigger/    – the trigger loop and its run statistics
//! ```

pub mod config;
pub mod error;
pub mod port;
pub mod sched;
pub mod shutdown;
pub mod timing;
pub mod trigger;
