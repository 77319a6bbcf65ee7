//! SmartFarm controller entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  JsonConfigFile   SimulatedFarm        LogTelemetrySink      │
//! │  (ConfigPort)     (Sensor/Actuator)    LogAlertSink          │
//! │  SystemClock      PresetBoard          (Telemetry/Alert)     │
//! │  (Clock)          (PresetSource)                             │
//! │                                                              │
//! │  ─────────────────── Port Trait Boundary ─────────────────── │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            ControlLoop (domain orchestration)          │  │
//! │  │  WaterTankMonitor · EnvironmentalController × slots    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use smartfarm::adapters::config_file::JsonConfigFile;
use smartfarm::adapters::hardware::{SimPresetServer, SimulatedFarm};
use smartfarm::adapters::log_sink::{LogAlertSink, LogTelemetrySink};
use smartfarm::adapters::time::SystemClock;
use smartfarm::app::ports::ConfigPort;
use smartfarm::preset::{PresetBoard, await_presets};
use smartfarm::shutdown::Shutdown;
use smartfarm::telemetry::{farm_uid, preset_topic};

#[derive(Parser, Debug)]
#[command(name = "smartfarm", version, about = "Multi-slot greenhouse controller")]
struct Args {
    /// JSON configuration file (defaults are used if it does not exist).
    #[arg(short, long, env = "SMARTFARM_CONFIG", default_value = "smartfarm.json")]
    config: PathBuf,

    /// Device serial; its prefix selects the model (A4, A1, B4, B1).
    #[arg(long, env = "SMARTFARM_DEVICE_SERIAL")]
    device_serial: Option<String>,

    /// Control loop interval in seconds.
    #[arg(long)]
    interval: Option<u32>,

    /// Write the effective configuration back to the config file.
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    info!("SmartFarm v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let store = JsonConfigFile::new(&args.config);
    let mut config = store
        .load()
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(serial) = args.device_serial {
        config.device_serial = serial;
    }
    if let Some(secs) = args.interval {
        config.control_interval_secs = secs;
    }
    config.validate().context("invalid configuration")?;

    if args.save_config {
        store.save(&config).context("saving configuration")?;
    }

    info!(
        "device {} ({:?}), slots {:?}, interval {}s",
        config.device_serial,
        config.model(),
        config.slot_ids(),
        config.control_interval_secs
    );

    // ── 3. Shutdown signal ────────────────────────────────────
    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone())?;

    // ── 4. Presets ────────────────────────────────────────────
    let slots = config.slot_ids();
    let presets = PresetBoard::new();
    let mut preset_server = SimPresetServer::new(&config, presets.clone());
    await_presets(
        &presets,
        &slots,
        &mut preset_server,
        &shutdown,
        Duration::from_secs(u64::from(config.preset_wait_secs)),
    );
    for &slot in &slots {
        debug!(
            "PRESET | slot {slot}: live updates on {}",
            preset_topic(&farm_uid(&config.device_serial, slot))
        );
    }

    // ── 5. Hardware + loop ────────────────────────────────────
    let mut farm = SimulatedFarm::new(&config);
    let mut control = farm.build_loop(&config).context("building slots")?;

    // ── 6. Run ────────────────────────────────────────────────
    let mut telemetry = LogTelemetrySink::new(config.device_serial.clone());
    let mut alerts = LogAlertSink::new(&config.device_serial);
    control.run(&SystemClock::new(), &shutdown, &mut telemetry, &presets, &mut alerts);

    info!(
        "stopped after {} cycle(s), {} telemetry frame(s)",
        control.cycles(),
        telemetry.frames()
    );
    Ok(())
}

/// Ctrl-C on a small current-thread runtime, off the control thread.
fn spawn_signal_listener(shutdown: Shutdown) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("signal runtime")?;

    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            match rt.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    warn!("Ctrl-C received, shutting down");
                    shutdown.trigger();
                }
                Err(e) => error!("signal listener failed: {e}"),
            }
        })
        .context("spawning signal thread")?;
    Ok(())
}
