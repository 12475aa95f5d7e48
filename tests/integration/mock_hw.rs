//! Mock hardware and a fake hub for integration tests.
//!
//! `FakeHub` stands in for the home-automation hub: it accepts the
//! node's telemetry connection, collects every 17-byte frame, and can
//! open a command connection back to the node.  `RecordingDevice` logs
//! every driver call so tests can assert on the full command history.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use homenode::app::ports::DevicePort;
use homenode::config::NodeConfig;
use homenode::error::{ActuatorError, SensorError};
use homenode::link::codec::decode_telemetry;
use homenode::link::{CommandMessage, TELEMETRY_MSG_LEN, TelemetryMessage};

// ── Recording device ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    On,
    Off,
}

#[derive(Clone, Default)]
pub struct RecordingDevice {
    pub calls: Arc<Mutex<Vec<DeviceCall>>>,
    level: Arc<Mutex<bool>>,
    /// Consumed by the first `turn_off`, which then blocks for that long.
    first_off_delay: Arc<Mutex<Option<Duration>>>,
}

#[allow(dead_code)]
impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose first switch-off stalls, like a slow relay driver.
    pub fn with_slow_first_off(delay: Duration) -> Self {
        let device = Self::default();
        *device.first_off_delay.lock() = Some(delay);
        device
    }

    pub fn history(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn is_on(&self) -> bool {
        *self.level.lock()
    }
}

impl DevicePort for RecordingDevice {
    fn turn_on(&self) -> Result<(), ActuatorError> {
        self.calls.lock().push(DeviceCall::On);
        *self.level.lock() = true;
        Ok(())
    }

    fn turn_off(&self) -> Result<(), ActuatorError> {
        self.calls.lock().push(DeviceCall::Off);
        let delay = self.first_off_delay.lock().take();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        *self.level.lock() = false;
        Ok(())
    }

    fn read(&self) -> Result<bool, SensorError> {
        Ok(self.is_on())
    }
}

// ── Fake hub ──────────────────────────────────────────────────

pub struct FakeHub {
    addr: SocketAddr,
    frames: Arc<Mutex<Vec<TelemetryMessage>>>,
    _reader: JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeHub {
    /// Listen on an ephemeral loopback port and collect frames from the
    /// first connection.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = frames.clone();

        let reader = thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut frame = [0u8; TELEMETRY_MSG_LEN];
            while stream.read_exact(&mut frame).is_ok() {
                sink.lock().push(decode_telemetry(&frame));
            }
        });

        Self {
            addr,
            frames,
            _reader: reader,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn frames(&self) -> Vec<TelemetryMessage> {
        self.frames.lock().clone()
    }

    /// Frames whose category and temperature match.
    pub fn count(&self, pred: impl Fn(&TelemetryMessage) -> bool) -> usize {
        self.frames.lock().iter().filter(|m| pred(m)).count()
    }

    /// Open a command connection to the node.
    pub fn connect_commands(node: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(node).unwrap();
        stream.set_nodelay(true).unwrap();
        stream
    }

    pub fn send_command(stream: &mut TcpStream, msg: CommandMessage) {
        stream.write_all(&msg.encode()).unwrap();
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Fast timings on loopback; the caller fills in the inventory.
pub fn test_config(hub: SocketAddr) -> NodeConfig {
    NodeConfig {
        hub_addr: hub,
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        telemetry_interval_ms: 20,
        recv_timeout_ms: 50,
        accept_poll_ms: 5,
        alarm_poll_interval_us: 200,
        devices: Vec::new(),
        ..NodeConfig::default()
    }
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}
