/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use xvs_flash::config::FlashConfig;
use xvs_flash::error::FlashError;
use xvs_flash::port::gpio::GpioPort;
use xvs_flash::port::sim::{frame_period_from_fps, SimulatedPort};
use xvs_flash::port::SignalPort;
use xvs_flash::sched;
use xvs_flash::shutdown::ShutdownSignal;
use xvs_flash::trigger::TriggerLoop;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Rolling-shutter flash controller.
///
/// Waits for the sensor's XVS edge, busy-waits the dead time (blanking +
/// roll-up) and fires the LED inside the global-exposure window.
///
/// Example:
///   sudo xvs-flash --config configs/imx415.yaml
#[derive(Debug, Parser)]
#[command(
    name = "xvs-flash",
    about = "Rolling-shutter flash controller – fires an LED inside the global-exposure window",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML flash configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// GPIO chip name or device path (overrides the config file).
    #[arg(long = "chip")]
    chip: Option<String>,

    /// Line offset of the XVS input.
    #[arg(long = "sync-line")]
    sync_line: Option<u32>,

    /// Line offset of the LED output.
    #[arg(long = "actuator-line")]
    actuator_line: Option<u32>,

    /// Flash duration in nanoseconds.
    #[arg(long = "pulse-ns")]
    pulse_ns: Option<u64>,

    /// Total exposure time in nanoseconds.
    #[arg(long = "exposure-ns")]
    exposure_ns: Option<u64>,

    /// How long to wait for an edge before re-checking for shutdown.
    #[arg(long = "edge-timeout-ms")]
    edge_timeout_ms: Option<u64>,

    /// Skip the real-time scheduling request.
    #[arg(long = "no-realtime", default_value_t = false)]
    no_realtime: bool,

    /// Real-time priority (default: highest available).
    #[arg(long = "priority")]
    priority: Option<i32>,

    /// Pin the trigger thread to this CPU.
    #[arg(long = "cpu")]
    cpu: Option<usize>,

    /// Stop after this many flashes.
    #[arg(long = "cycles")]
    cycles: Option<u64>,

    /// Use a simulated sensor at this frame rate instead of GPIO.
    #[arg(long = "simulate-fps", value_parser = parse_fps)]
    simulate_fps: Option<Duration>,

    /// Validate the configuration, print the timing profile and exit.
    #[arg(long = "check", default_value_t = false)]
    check: bool,
}

fn parse_fps(s: &str) -> Result<Duration, String> {
    let fps: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    frame_period_from_fps(fps).ok_or_else(|| format!("frame rate must be > 0, got {fps}"))
}

impl Cli {
    /// Command-line values win over the file.
    fn apply_overrides(&self, cfg: &mut FlashConfig) {
        if let Some(chip) = &self.chip {
            cfg.hardware.chip = chip.clone();
        }
        if let Some(line) = self.sync_line {
            cfg.hardware.sync_line = line;
        }
        if let Some(line) = self.actuator_line {
            cfg.hardware.actuator_line = line;
        }
        if let Some(ns) = self.pulse_ns {
            cfg.timing.pulse_ns = ns;
        }
        if let Some(ns) = self.exposure_ns {
            cfg.timing.total_exposure_ns = ns;
        }
        if let Some(ms) = self.edge_timeout_ms {
            cfg.trigger.edge_timeout_ms = ms;
        }
        if self.no_realtime {
            cfg.realtime.enabled = false;
        }
        if self.priority.is_some() {
            cfg.realtime.priority = self.priority;
        }
        if self.cpu.is_some() {
            cfg.realtime.cpu = self.cpu;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=trace).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ── Load configuration ────────────────────────────────────────────────────
    let mut cfg = match &cli.config {
        Some(path) => match FlashConfig::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("Failed to load flash configuration: {:#}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("No configuration file provided, using IMX415 defaults");
            FlashConfig::default()
        }
    };
    cli.apply_overrides(&mut cfg);

    info!(
        chip          = %cfg.hardware.chip,
        sync_line     = cfg.hardware.sync_line,
        actuator_line = cfg.hardware.actuator_line,
        edge_timeout  = cfg.trigger.edge_timeout_ms,
        realtime      = cfg.realtime.enabled,
        simulate      = cli.simulate_fps.is_some(),
        "Configuration"
    );

    match run(cfg, &cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            if let Some(flash) = e.downcast_ref::<FlashError>() {
                error!("{}", flash.hint());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: FlashConfig, cli: &Cli) -> anyhow::Result<()> {
    run_until(cfg, cli, wait_for_signal()).await
}

/// Validate, acquire the lines and drive the trigger thread until it ends on
/// its own or `stop` resolves.  A stop lets the current cycle finish.
async fn run_until(
    cfg: FlashConfig,
    cli: &Cli,
    stop: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    // ── Validate before any hardware is touched ───────────────────────────────
    let profile = cfg.timing_profile().map_err(FlashError::from)?;
    let edge_timeout = cfg.edge_timeout().map_err(FlashError::from)?;

    info!("--- Rolling Shutter Flash Controller ---");
    for line in profile.to_string().lines() {
        info!("{line}");
    }

    if cli.check {
        info!("Configuration is valid; no hardware touched");
        return Ok(());
    }

    // ── Acquire lines ─────────────────────────────────────────────────────────
    let port: Box<dyn SignalPort + Send> = match cli.simulate_fps {
        Some(period) => {
            info!(frame_period = ?period, "Using simulated XVS source");
            Box::new(SimulatedPort::new(period))
        }
        None => Box::new(GpioPort::open(&cfg.hardware).map_err(FlashError::from)?),
    };

    // ── Trigger thread ────────────────────────────────────────────────────────
    let shutdown = ShutdownSignal::new();
    let mut trigger = TriggerLoop::new(port, profile, shutdown.clone(), edge_timeout);
    if let Some(n) = cli.cycles {
        trigger = trigger.with_max_cycles(n);
    }

    let realtime = cfg.realtime;
    let (done_tx, mut done_rx) = oneshot::channel();
    let handle = thread::Builder::new()
        .name("xvs-trigger".into())
        .spawn(move || {
            sched::apply_hint(&realtime);
            let result = trigger.run();
            // release the lines before main logs the outcome
            drop(trigger);
            let _ = done_tx.send(result);
        })
        .context("Failed to spawn trigger thread")?;

    let outcome = tokio::select! {
        res = &mut done_rx => res,
        _ = stop => {
            if shutdown.request() {
                info!("Caught signal. Finishing current cycle and exiting.");
            }
            done_rx.await
        }
    };

    if handle.join().is_err() {
        return Err(anyhow!("trigger thread panicked"));
    }

    let summary = outcome
        .map_err(|_| anyhow!("trigger thread exited without reporting"))?
        .map_err(FlashError::from)?;

    info!(
        cycles = summary.cycles,
        window_overruns = summary.window_overruns,
        "Clean shutdown"
    );
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
