/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Flash controller configuration loading.
//!
//! Everything is fixed at launch: a YAML file (optional) supplies the values,
//! CLI flags override individual fields, and the result never changes while
//! the trigger loop runs.  Every key is optional; the defaults are the IMX415
//! reference setup on a Radxa board.
//!
//! The expected YAML structure is:
//! ```yaml
//! hardware:
//!   chip: "gpiochip0"
//!   sync_line: 17
//!   actuator_line: 18
//! timing:
//!   blanking_ns: 284200
//!   roll_up_ns: 10579100
//!   total_exposure_ns: 15000000
//!   pulse_ns: 50000
//! trigger:
//!   edge_timeout_ms: 500
//! realtime:
//!   enabled: true
//!   policy: fifo
//!   priority: ~        # highest available
//!   cpu: 3
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigurationError;
use crate::sched::SchedPolicy;
use crate::timing::{
    TimingProfile, IMX415_BLANKING_NS, IMX415_PULSE_NS, IMX415_ROLL_UP_NS,
    IMX415_TOTAL_EXPOSURE_NS,
};

/// Default edge-wait timeout.  Only bounds shutdown latency.
pub const DEFAULT_EDGE_TIMEOUT_MS: u64 = 500;

// ── Sections ──────────────────────────────────────────────────────────────────

/// GPIO chip and line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareConfig {
    /// Chip name (`gpiochip0`) or device path (`/dev/gpiochip0`).
    pub chip: String,
    /// Line offset of the XVS input within the chip.
    pub sync_line: u32,
    /// Line offset of the LED output within the chip.
    pub actuator_line: u32,
    /// Consumer label shown by `gpioinfo`.
    pub consumer: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            chip: String::from("gpiochip0"),
            sync_line: 17,
            actuator_line: 18,
            consumer: String::from("xvs-flash"),
        }
    }
}

/// Raw timing constants in nanoseconds, validated by [`TimingProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub blanking_ns: u64,
    pub roll_up_ns: u64,
    pub total_exposure_ns: u64,
    pub pulse_ns: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            blanking_ns: IMX415_BLANKING_NS,
            roll_up_ns: IMX415_ROLL_UP_NS,
            total_exposure_ns: IMX415_TOTAL_EXPOSURE_NS,
            pulse_ns: IMX415_PULSE_NS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    pub edge_timeout_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            edge_timeout_ms: DEFAULT_EDGE_TIMEOUT_MS,
        }
    }
}

/// Scheduling hint for the trigger thread.  See [`crate::sched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub policy: SchedPolicy,
    /// `None` = highest priority the policy allows.
    pub priority: Option<i32>,
    /// Pin the trigger thread to this CPU.
    pub cpu: Option<usize>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: SchedPolicy::Fifo,
            priority: None,
            cpu: None,
        }
    }
}

// ── FlashConfig ───────────────────────────────────────────────────────────────

/// Complete launch-time configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlashConfig {
    pub hardware: HardwareConfig,
    pub timing: TimingConfig,
    pub trigger: TriggerConfig,
    pub realtime: RealtimeConfig,
}

impl FlashConfig {
    /// Parse `path`.  Missing sections and keys keep their defaults; an empty
    /// file yields the default configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed, or
    /// it contains an unknown key.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading flash configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        if content.trim().is_empty() {
            warn!("Configuration file is empty, using defaults");
            return Ok(Self::default());
        }

        let cfg: FlashConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        debug!(?cfg, "Parsed configuration");
        Ok(cfg)
    }

    /// Build and validate the timing profile.
    pub fn timing_profile(&self) -> Result<TimingProfile, ConfigurationError> {
        let t = &self.timing;
        TimingProfile::from_nanos(t.blanking_ns, t.roll_up_ns, t.total_exposure_ns, t.pulse_ns)
    }

    /// Edge-wait timeout; must be non-zero.
    pub fn edge_timeout(&self) -> Result<Duration, ConfigurationError> {
        match self.trigger.edge_timeout_ms {
            0 => Err(ConfigurationError::ZeroEdgeTimeout),
            ms => Ok(Duration::from_millis(ms)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = FlashConfig::default();
        assert_eq!(cfg.hardware.chip, "gpiochip0");
        assert_eq!(cfg.hardware.sync_line, 17);
        assert_eq!(cfg.hardware.actuator_line, 18);
        assert_eq!(cfg.trigger.edge_timeout_ms, 500);
        assert!(cfg.realtime.enabled);
        assert_eq!(cfg.realtime.policy, SchedPolicy::Fifo);
        assert_eq!(
            cfg.timing_profile().unwrap(),
            TimingProfile::imx415_default().unwrap()
        );
    }

    #[test]
    fn shipped_imx415_file_equals_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/imx415.yaml");
        let cfg = FlashConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg, FlashConfig::default());
    }

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
hardware:
  chip: "/dev/gpiochip4"
  sync_line: 5
  actuator_line: 6
  consumer: "bench"
timing:
  blanking_ns: 100000
  roll_up_ns: 8000000
  total_exposure_ns: 10000000
  pulse_ns: 200000
trigger:
  edge_timeout_ms: 250
realtime:
  enabled: true
  policy: round_robin
  priority: 80
  cpu: 3
"#;
        let f = yaml_tempfile(yaml);
        let cfg = FlashConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.hardware.chip, "/dev/gpiochip4");
        assert_eq!(cfg.hardware.sync_line, 5);
        assert_eq!(cfg.hardware.actuator_line, 6);
        assert_eq!(cfg.hardware.consumer, "bench");
        assert_eq!(cfg.edge_timeout().unwrap(), Duration::from_millis(250));
        assert_eq!(cfg.realtime.policy, SchedPolicy::RoundRobin);
        assert_eq!(cfg.realtime.priority, Some(80));
        assert_eq!(cfg.realtime.cpu, Some(3));

        let p = cfg.timing_profile().unwrap();
        assert_eq!(p.window(), Duration::from_millis(2));
        assert_eq!(p.trigger_delay(), Duration::from_micros(8_100));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let f = yaml_tempfile("timing:\n  pulse_ns: 20000\n");
        let cfg = FlashConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.timing.pulse_ns, 20_000);
        assert_eq!(cfg.timing.roll_up_ns, IMX415_ROLL_UP_NS);
        assert_eq!(cfg.hardware, HardwareConfig::default());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let f = yaml_tempfile("\n");
        let cfg = FlashConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg, FlashConfig::default());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = FlashConfig::load_from_file(Path::new("/nonexistent/path/flash.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(FlashConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_key_returns_error() {
        // a typo must not silently fall back to the default pulse width
        let f = yaml_tempfile("timing:\n  pulse_nss: 20000\n");
        assert!(FlashConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn window_violation_surfaces_as_configuration_error() {
        let f = yaml_tempfile("timing:\n  total_exposure_ns: 10600000\n");
        let cfg = FlashConfig::load_from_file(f.path()).unwrap();
        assert!(matches!(
            cfg.timing_profile(),
            Err(ConfigurationError::PulseExceedsWindow { .. })
        ));
    }

    #[test]
    fn zero_edge_timeout_is_rejected() {
        let mut cfg = FlashConfig::default();
        cfg.trigger.edge_timeout_ms = 0;
        assert_eq!(cfg.edge_timeout(), Err(ConfigurationError::ZeroEdgeTimeout));
    }
}
