//! Outbound transport to the hub.
//!
//! The node keeps a single long-lived connection to the hub.  The
//! telemetry and alarm threads both write to it, so every frame goes
//! through [`Uplink::send`], which serializes writers on one mutex and
//! writes the whole frame while holding it.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::codec::{self, TELEMETRY_MSG_LEN, TelemetryMessage};
use crate::error::CommsError;

/// Byte sink for encoded frames.
pub trait Transport: Send {
    /// Write the entire buffer or fail.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Release the channel.  Later sends may fail.
    fn close(&mut self) {}
}

impl Transport for TcpStream {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)
    }

    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

/// A transport that discards all writes.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory transport that records every frame.  Clones share the log.
#[derive(Clone, Default)]
pub struct CaptureTransport {
    frames: Arc<Mutex<Vec<[u8; TELEMETRY_MSG_LEN]>>>,
    fail: Arc<Mutex<bool>>,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `BrokenPipe`.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn messages(&self) -> Vec<TelemetryMessage> {
        self.frames.lock().iter().map(codec::decode_telemetry).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for CaptureTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        if *self.fail.lock() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let frame: [u8; TELEMETRY_MSG_LEN] = data
            .try_into()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.frames.lock().push(frame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Uplink
// ---------------------------------------------------------------------------

/// Shared, mutex-guarded connection to the hub.
pub struct Uplink {
    transport: Mutex<Box<dyn Transport>>,
    /// Second handle on the TCP socket so `close` can unblock a writer
    /// stuck in the kernel without waiting for the mutex.
    shutdown_handle: Option<TcpStream>,
}

impl Uplink {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Mutex::new(Box::new(transport)),
            shutdown_handle: None,
        }
    }

    /// Connect to the hub once.  Failure is fatal for the caller; the
    /// node does not retry.
    pub fn connect(addr: SocketAddr, send_timeout: Duration) -> Result<Self, CommsError> {
        let stream = TcpStream::connect(addr).map_err(|e| CommsError::Connect(e.kind()))?;
        stream
            .set_write_timeout(Some(send_timeout))
            .map_err(|e| CommsError::SocketOption(e.kind()))?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("uplink: {}", CommsError::SocketOption(e.kind()));
        }
        let shutdown_handle = stream
            .try_clone()
            .map_err(|e| warn!("uplink: no shutdown handle, close may wait on a send: {}", e))
            .ok();
        info!("uplink: connected to hub at {}", addr);

        Ok(Self {
            transport: Mutex::new(Box::new(stream)),
            shutdown_handle,
        })
    }

    /// Encode and write one message as a single frame.
    pub fn send(&self, msg: &TelemetryMessage) -> Result<(), CommsError> {
        let frame = codec::encode(msg);
        self.transport
            .lock()
            .send(&frame)
            .map_err(|e| CommsError::Send(e.kind()))
    }

    pub fn close(&self) {
        debug!("uplink: closing");
        if let Some(stream) = &self.shutdown_handle {
            let _ = stream.shutdown(Shutdown::Both);
        } else {
            self.transport.lock().close();
        }
    }
}
