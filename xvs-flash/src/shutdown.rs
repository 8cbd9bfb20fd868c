/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cooperative cancellation of the trigger loop.
//!
//! One writer (the signal listener in `main`) and one reader (the trigger
//! thread) share a single flag.  The flag moves from "running" to
//! "stop requested" exactly once and never back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to the process-wide stop request.
///
/// Cloning shares the same flag; there is no global state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the trigger loop to stop after its current cycle.
    ///
    /// Returns `true` only for the call that performed the transition, so the
    /// caller can log the first request and ignore repeats.
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::AcqRel)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
