//! Node runtime: owns the three worker threads and their shared state.
//!
//! ```text
//!   ┌──────────────┐  apply   ┌─────────────┐  sample  ┌──────────────┐
//!   │ CommandServer│────────▶│ StateSampler │◀────────│ Telemetry /  │
//!   └──────────────┘          └─────────────┘          │ AlarmMonitor │
//!                                                       └──────┬───────┘
//!                                                              ▼ send
//!                                                          Uplink (hub)
//! ```
//!
//! Lifecycle: [`NodeRuntime::start`] binds, connects and spawns; any
//! [`RuntimeHandle`] clone can call `stop()`; [`NodeRuntime::join`] waits
//! for the threads to wind down.

pub mod alarm;
pub mod server;
pub mod telemetry;

use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::app::ports::EnvironmentPort;
use crate::config::NodeConfig;
use crate::device::{DeviceCategory, DeviceRegistry, StateMask, StateSampler};
use crate::diagnostics::{NodeStats, StatsSnapshot};
use crate::error::Error;
use crate::link::Uplink;

pub use alarm::{ALARM_CATEGORIES, AlarmDebouncer, AlarmMonitor};
pub use server::{CommandServer, Dispatch, dispatch};
pub use telemetry::{TELEMETRY_CATEGORIES, TelemetryClient};

/// State shared by all worker threads.
#[derive(Debug)]
pub(crate) struct NodeShared {
    pub(crate) running: AtomicBool,
    /// Set once the command listener accepts connections.
    pub(crate) server_up: AtomicBool,
    stopped: AtomicBool,
    /// Second handle on the connection being served, so `stop` can
    /// unblock a pending read.
    pub(crate) active_conn: Mutex<Option<TcpStream>>,
    /// Held for the whole of every command apply and of the shutdown
    /// sweep, so no command lands after the sweep.
    pub(crate) apply_gate: Mutex<()>,
    pub(crate) stats: NodeStats,
}

impl NodeShared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            server_up: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            active_conn: Mutex::new(None),
            apply_gate: Mutex::new(()),
            stats: NodeStats::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable control handle for a running node.
#[derive(Clone)]
pub struct RuntimeHandle {
    shared: Arc<NodeShared>,
    sampler: StateSampler,
    uplink: Arc<Uplink>,
}

impl RuntimeHandle {
    /// Stop the node.
    ///
    /// Clears the running flag, drives every actuator off, then closes the
    /// active command connection and the uplink.  Only the first call does
    /// anything.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("node: stopping");
        self.shared.running.store(false, Ordering::Release);

        // Waits out a command already being applied; later ones see the
        // cleared flag and are dropped.
        let gate = self.shared.apply_gate.lock();
        for category in DeviceCategory::ALL.into_iter().filter(|c| !c.is_auto()) {
            let report = self.sampler.apply(category, StateMask::EMPTY);
            if report.failed > 0 {
                error!("node: {} {} device(s) failed to switch off", report.failed, category);
            }
        }
        drop(gate);

        if let Some(conn) = self.shared.active_conn.lock().take() {
            let _ = conn.shutdown(Shutdown::Both);
        }
        self.uplink.close();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// `true` while the command listener is accepting.
    pub fn is_listening(&self) -> bool {
        self.shared.server_up.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

pub struct NodeRuntime {
    handle: RuntimeHandle,
    local_addr: SocketAddr,
    threads: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Bind the command port, connect to the hub and spawn the workers.
    pub fn start(
        config: &NodeConfig,
        registry: DeviceRegistry,
        environment: Arc<dyn EnvironmentPort>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let shared = Arc::new(NodeShared::new());
        let sampler = StateSampler::new(Arc::new(registry));

        // Bind before connecting so a busy port fails without touching the hub.
        let server = CommandServer::bind(
            config.listen_addr,
            sampler.clone(),
            shared.clone(),
            config.recv_timeout(),
            config.accept_poll(),
        )?;
        let uplink = Uplink::connect(config.hub_addr, config.send_timeout())?;

        Self::spawn(config, server, sampler, shared, Arc::new(uplink), environment)
    }

    /// Like [`start`](Self::start) but with a caller-supplied uplink.
    pub fn start_with_uplink(
        config: &NodeConfig,
        registry: DeviceRegistry,
        environment: Arc<dyn EnvironmentPort>,
        uplink: Uplink,
    ) -> Result<Self, Error> {
        config.validate()?;
        let shared = Arc::new(NodeShared::new());
        let sampler = StateSampler::new(Arc::new(registry));
        let server = CommandServer::bind(
            config.listen_addr,
            sampler.clone(),
            shared.clone(),
            config.recv_timeout(),
            config.accept_poll(),
        )?;

        Self::spawn(config, server, sampler, shared, Arc::new(uplink), environment)
    }

    fn spawn(
        config: &NodeConfig,
        server: CommandServer,
        sampler: StateSampler,
        shared: Arc<NodeShared>,
        uplink: Arc<Uplink>,
        environment: Arc<dyn EnvironmentPort>,
    ) -> Result<Self, Error> {
        let local_addr = server
            .local_addr()
            .map_err(|e| crate::error::CommsError::Bind(e.kind()))?;
        let handle = RuntimeHandle {
            shared: shared.clone(),
            sampler: sampler.clone(),
            uplink: uplink.clone(),
        };

        let telemetry = TelemetryClient::new(
            sampler.clone(),
            environment,
            uplink.clone(),
            shared.clone(),
        );
        let alarm = AlarmMonitor::new(sampler, uplink, shared, config.alarm_cooldown_ticks);
        let telemetry_interval = config.telemetry_interval();
        let alarm_interval = config.alarm_poll_interval();

        let mut runtime = Self {
            handle,
            local_addr,
            threads: Vec::with_capacity(3),
        };

        let spawned = runtime
            .spawn_worker("cmd-server", move || server.run())
            .and_then(|rt| rt.spawn_worker("telemetry", move || telemetry.run(telemetry_interval)))
            .and_then(|rt| rt.spawn_worker("alarm", move || alarm.run(alarm_interval)))
            .map(|_| ());
        if let Err(e) = spawned {
            runtime.handle.stop();
            runtime.join();
            return Err(e);
        }

        info!("node: running, commands on {}", runtime.local_addr);
        Ok(runtime)
    }

    fn spawn_worker<F>(&mut self, name: &str, body: F) -> Result<&mut Self, Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(body)
            .map_err(|_| Error::Init("thread spawn failed"))?;
        self.threads.push(handle);
        Ok(self)
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Address the command server actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for every worker to exit.  Call `stop()` first.
    pub fn join(self) {
        for t in self.threads {
            let name = t.thread().name().unwrap_or("worker").to_owned();
            if t.join().is_err() {
                warn!("node: {} thread panicked", name);
            }
        }
        info!("node: stopped");
    }
}
