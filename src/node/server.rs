//! Command server: accepts hub connections and applies state commands.
//!
//! ```text
//!   LISTEN ──▶ ACCEPT ──▶ (DECODE ──▶ DISPATCH)* ──▶ CLOSE ──▶ ACCEPT
//! ```
//!
//! One connection is served at a time.  The listener is non-blocking and
//! polled so the thread notices a stop request; accepted connections use
//! a bounded read timeout for the same reason.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::{debug, info, trace, warn};

use super::NodeShared;
use crate::device::{ApplyReport, StateSampler};
use crate::error::CommsError;
use crate::link::{CommandDecoder, CommandMessage};

const READ_BUF_LEN: usize = 256;

/// What a single command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied(ApplyReport),
    /// Auto-mode command: decoded and discarded.
    AutoIgnored(u8),
    /// Category code with no registered meaning.
    Unknown(u8),
}

/// Route one decoded command to the sampler.
pub fn dispatch(sampler: &StateSampler, msg: &CommandMessage) -> Dispatch {
    match (msg.category(), msg.mask) {
        (Some(category), _) if category.is_auto() => Dispatch::AutoIgnored(msg.category),
        (Some(category), Some(mask)) => Dispatch::Applied(sampler.apply(category, mask)),
        _ => Dispatch::Unknown(msg.category),
    }
}

pub struct CommandServer {
    listener: TcpListener,
    sampler: StateSampler,
    shared: Arc<NodeShared>,
    recv_timeout: Duration,
    accept_poll: Duration,
}

/// Why a connection ended.
enum Close {
    PeerClosed,
    Stopping,
}

impl CommandServer {
    /// Bind the command port.  Failure is fatal for the node.
    pub(crate) fn bind(
        addr: SocketAddr,
        sampler: StateSampler,
        shared: Arc<NodeShared>,
        recv_timeout: Duration,
        accept_poll: Duration,
    ) -> Result<Self, CommsError> {
        let listener = TcpListener::bind(addr).map_err(|e| CommsError::Bind(e.kind()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| CommsError::SocketOption(e.kind()))?;
        Ok(Self {
            listener,
            sampler,
            shared,
            recv_timeout,
            accept_poll,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("CMD | listening on {}", addr);
        }
        self.shared.server_up.store(true, Ordering::Release);
        let _listening = ListeningGuard(&self.shared);

        while self.running() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.shared.stats.record_connection();
                    info!("CMD | hub connected from {}", peer);
                    match self.serve(stream) {
                        Ok(Close::PeerClosed) => info!("CMD | {} disconnected", peer),
                        Ok(Close::Stopping) => break,
                        Err(e) => warn!("CMD | {} dropped: {}", peer, e),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.accept_poll);
                }
                Err(e) => {
                    warn!("CMD | {}", CommsError::Accept(e.kind()));
                    thread::sleep(self.accept_poll);
                }
            }
        }
        debug!("CMD | server stopped");
    }

    fn serve(&self, mut stream: TcpStream) -> Result<Close, CommsError> {
        stream
            .set_nonblocking(false)
            .map_err(|e| CommsError::SocketOption(e.kind()))?;
        stream
            .set_read_timeout(Some(self.recv_timeout))
            .map_err(|e| CommsError::SocketOption(e.kind()))?;
        *self.shared.active_conn.lock() = stream.try_clone().ok();

        let result = self.read_loop(&mut stream);

        *self.shared.active_conn.lock() = None;
        result
    }

    fn read_loop(&self, stream: &mut TcpStream) -> Result<Close, CommsError> {
        let mut decoder = CommandDecoder::new();
        let mut buf = [0u8; READ_BUF_LEN];

        loop {
            if !self.running() {
                return Ok(Close::Stopping);
            }
            match stream.read(&mut buf) {
                Ok(0) => {
                    if !decoder.is_idle() {
                        debug!("CMD | peer closed mid-command");
                    }
                    return Ok(Close::PeerClosed);
                }
                Ok(n) => {
                    for msg in decoder.feed(&buf[..n]) {
                        if !self.handle(&msg) {
                            return Ok(Close::Stopping);
                        }
                    }
                }
                Err(e) if is_timeout(&e) => {
                    trace!("CMD | receive timed out");
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_peer_gone(&e) => return Ok(Close::PeerClosed),
                Err(e) => {
                    self.shared.stats.record_receive_error();
                    if !self.running() {
                        return Ok(Close::Stopping);
                    }
                    warn!("CMD | {}", CommsError::Receive(e.kind()));
                    thread::sleep(self.accept_poll);
                }
            }
        }
    }

    /// Apply one command.  Returns `false` once the node is stopping, in
    /// which case the command is dropped.
    fn handle(&self, msg: &CommandMessage) -> bool {
        let _gate = self.shared.apply_gate.lock();
        if !self.running() {
            debug!("CMD | stopping, category {} command dropped", msg.category);
            return false;
        }
        match dispatch(&self.sampler, msg) {
            Dispatch::Applied(report) => {
                self.shared.stats.record_command();
                debug!(
                    "CMD | {} mask={:#b} on={} off={} failed={}",
                    msg.category,
                    msg.mask.unwrap_or_default().bits(),
                    report.switched_on,
                    report.switched_off,
                    report.failed
                );
            }
            Dispatch::AutoIgnored(code) => {
                self.shared.stats.record_auto_ignored();
                info!("CMD | auto mode command ({}) ignored", code);
            }
            Dispatch::Unknown(code) => {
                self.shared.stats.record_unknown();
                debug!("CMD | unknown category {}", code);
            }
        }
        true
    }

    fn running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

/// Clears `server_up` when the server loop exits, unwinding included.
struct ListeningGuard<'a>(&'a NodeShared);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.server_up.store(false, Ordering::Release);
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn is_peer_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
