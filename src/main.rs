//! HomeNode: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                   │
//! │   JsonConfigFile      SimBoard (GPIO)     SimEnvironment   │
//! │                                                            │
//! │  ─────────────────── Port Trait Boundary ───────────────   │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  NodeRuntime: CommandServer · Telemetry · Alarm      │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use homenode::adapters::config_file::JsonConfigFile;
use homenode::adapters::hardware::{SimBoard, build_registry};
use homenode::app::ports::ConfigPort;
use homenode::diagnostics;
use homenode::node::{NodeRuntime, RuntimeHandle};
use homenode::sensors::environment::SimEnvironment;

const CONFIG_ENV: &str = "HOMENODE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "homenode.json";

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    diagnostics::install_panic_handler();
    info!("HomeNode v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let store = JsonConfigFile::new(path);
    let config = store
        .load()
        .with_context(|| format!("loading config from {}", store.path().display()))?;
    info!("config: {} device(s) from {}", config.devices.len(), store.path().display());

    // ── 3. Hardware ───────────────────────────────────────────
    let mut board = SimBoard::new();
    let registry = build_registry(&config.devices, &mut board).context("building device registry")?;
    for device in registry.iter() {
        info!("  {} '{}'", device.key(), device.name());
    }
    let environment = Arc::new(SimEnvironment::new(config.environment.into()));

    // ── 4. Runtime ────────────────────────────────────────────
    let runtime = NodeRuntime::start(&config, registry, environment).context("starting node")?;
    let handle = runtime.handle();
    install_signal_handler(handle.clone())?;

    // ── 5. Supervise ──────────────────────────────────────────
    let stats_every = Duration::from_secs(u64::from(config.stats_interval_secs));
    let mut last_stats = Instant::now();
    while handle.is_running() {
        thread::sleep(Duration::from_millis(100));
        if !stats_every.is_zero() && last_stats.elapsed() >= stats_every {
            log_stats(&handle);
            last_stats = Instant::now();
        }
    }

    runtime.join();
    log_stats(&handle);
    Ok(())
}

/// SIGINT / SIGTERM → `stop()`.
fn install_signal_handler(handle: RuntimeHandle) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("registering signal handlers")?;
    thread::Builder::new()
        .name("signal-handler".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, shutting down", sig);
                handle.stop();
            }
        })
        .context("spawning signal handler thread")?;
    Ok(())
}

fn log_stats(handle: &RuntimeHandle) {
    match serde_json::to_string(&handle.stats()) {
        Ok(json) => info!("STATS | {}", json),
        Err(e) => error!("STATS | encode failed: {}", e),
    }
}
