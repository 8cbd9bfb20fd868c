/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Best-effort real-time scheduling for the trigger thread.
//!
//! The trigger loop's correctness does not depend on anything in this
//! module: the flash is timed from measured elapsed time, never from the
//! scheduling class.  A higher class only shrinks the jitter between the XVS
//! edge and the loop noticing it.  Every failure here is therefore logged as
//! a warning and otherwise ignored.
//!
//! All requests apply to the **calling thread** only (`pid = 0` on Linux
//! addresses the caller's TID), so call them from inside the trigger thread.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RealtimeConfig;

// ── Scheduling policy ─────────────────────────────────────────────────────────

/// Linux scheduling policy for the trigger thread.
///
/// Carrying the typed enum (instead of a raw `int`) makes it impossible to
/// request an invalid policy.  The conversion to the kernel constant only
/// happens at the syscall boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedPolicy {
    /// `SCHED_OTHER` – standard CFS scheduling.
    Normal,
    /// `SCHED_FIFO` – real-time FIFO.
    #[default]
    Fifo,
    /// `SCHED_RR` – real-time round-robin.
    RoundRobin,
}

impl SchedPolicy {
    /// Convert to the integer value expected by the Linux kernel.
    pub fn to_linux_int(self) -> i32 {
        match self {
            SchedPolicy::Normal => 0,
            SchedPolicy::Fifo => 1,
            SchedPolicy::RoundRobin => 2,
        }
    }

    /// `true` for the fixed-priority preemptive classes.
    pub fn is_realtime(self) -> bool {
        !matches!(self, SchedPolicy::Normal)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SchedError {
    /// The host has no `sched_setscheduler` / `sched_setaffinity`.
    #[error("real-time scheduling is not supported on this platform")]
    Unsupported,

    /// Requested priority is outside `[min, max]` for the policy.
    #[error("priority {requested} outside {min}..={max} for {policy:?}")]
    PriorityRange {
        policy: SchedPolicy,
        requested: i32,
        min: i32,
        max: i32,
    },

    /// CPU index does not fit in a `cpu_set_t`.
    #[error("CPU {cpu} is beyond the supported CPU set size")]
    CpuOutOfRange { cpu: usize },

    /// The kernel refused (typically `EPERM` without `CAP_SYS_NICE`).
    #[error("{call} failed: {source}")]
    Denied {
        call: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// What the kernel granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeGrant {
    pub policy: SchedPolicy,
    pub priority: i32,
}

// ── Syscall wrappers ──────────────────────────────────────────────────────────

/// Put the calling thread into `policy` at `priority`.
///
/// `priority == None` selects the highest priority the policy allows.
#[cfg(target_os = "linux")]
pub fn request_realtime_priority(
    policy: SchedPolicy,
    priority: Option<i32>,
) -> Result<RealtimeGrant, SchedError> {
    let raw = policy.to_linux_int();
    // SAFETY: plain syscalls on integer arguments.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(raw),
            libc::sched_get_priority_max(raw),
        )
    };
    if min < 0 || max < 0 {
        return Err(SchedError::Denied {
            call: "sched_get_priority_max",
            source: std::io::Error::last_os_error(),
        });
    }

    let prio = priority.unwrap_or(max);
    if !(min..=max).contains(&prio) {
        return Err(SchedError::PriorityRange {
            policy,
            requested: prio,
            min,
            max,
        });
    }

    // SAFETY: sched_param is plain data (musl carries extra sporadic-server
    // fields, so zero everything and set only the priority); it outlives the
    // call.
    let rc = unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = prio;
        libc::sched_setscheduler(0, raw, &param)
    };
    if rc == -1 {
        return Err(SchedError::Denied {
            call: "sched_setscheduler",
            source: std::io::Error::last_os_error(),
        });
    }

    Ok(RealtimeGrant {
        policy,
        priority: prio,
    })
}

#[cfg(not(target_os = "linux"))]
pub fn request_realtime_priority(
    _policy: SchedPolicy,
    _priority: Option<i32>,
) -> Result<RealtimeGrant, SchedError> {
    Err(SchedError::Unsupported)
}

/// Restrict the calling thread to a single CPU.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), SchedError> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(SchedError::CpuOutOfRange { cpu });
    }
    // SAFETY: cpu_set_t is plain data; all-zero is the empty set.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(SchedError::Denied {
            call: "sched_setaffinity",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), SchedError> {
    Err(SchedError::Unsupported)
}

// ── Hint ──────────────────────────────────────────────────────────────────────

/// Apply the configured scheduling hint to the calling thread.
///
/// Never fails: each refusal is logged and the thread keeps default
/// scheduling.  Returns the grant, if any, for the startup summary.
pub fn apply_hint(cfg: &RealtimeConfig) -> Option<RealtimeGrant> {
    if let Some(cpu) = cfg.cpu {
        match pin_to_cpu(cpu) {
            Ok(()) => info!(cpu, "Trigger thread pinned"),
            Err(e) => warn!("Failed to pin trigger thread to CPU {cpu}: {e}"),
        }
    }

    if !cfg.enabled || !cfg.policy.is_realtime() {
        info!("Real-time priority disabled; using default scheduling");
        return None;
    }

    match request_realtime_priority(cfg.policy, cfg.priority) {
        Ok(grant) => {
            info!(
                policy = ?grant.policy,
                priority = grant.priority,
                "Real-time priority set"
            );
            Some(grant)
        }
        Err(e) => {
            warn!("Failed to set real-time priority: {e}. Timing may be imprecise.");
            warn!("Run with 'sudo' (or grant CAP_SYS_NICE) to enable real-time.");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
