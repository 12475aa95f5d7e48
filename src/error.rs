//! Unified error types for the home node.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the startup path and the runtime loops' error handling uniform.
//! All variants are `Copy` so they can be logged from any thread and
//! passed around without allocation; I/O failures carry only their
//! [`io::ErrorKind`].

use core::fmt;
use std::io;

use crate::device::DeviceCategory;

// ---------------------------------------------------------------------------
// Top-level node error
// ---------------------------------------------------------------------------

/// Every fallible operation in the node funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The device inventory violates the registry invariants.
    Registry(RegistryError),
    /// A sensor could not be read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// A socket operation failed.
    Comms(CommsError),
    /// Runtime initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Fatal inventory problems detected while building the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Two devices claim the same (category, index) slot.
    DuplicateDevice { category: DeviceCategory, index: u32 },
    /// The index does not fit in a 64-bit state mask.
    IndexOutOfRange { category: DeviceCategory, index: u32 },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDevice { category, index } => {
                write!(f, "duplicate device {category}#{index}")
            }
            Self::IndexOutOfRange { category, index } => {
                write!(f, "device {category}#{index} exceeds the 64-device mask")
            }
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
    /// The environment sensor has no sample available yet.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::NotReady => write!(f, "sensor not ready"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// The device is a sensor and cannot be driven.
    PassiveDevice,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PassiveDevice => write!(f, "passive device cannot be driven"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The command listener could not bind its port.
    Bind(io::ErrorKind),
    /// The uplink to the hub could not be established.
    Connect(io::ErrorKind),
    /// A timeout or other socket option was rejected.
    SocketOption(io::ErrorKind),
    /// Accepting a hub connection failed.
    Accept(io::ErrorKind),
    /// Writing a message to the hub failed or timed out.
    Send(io::ErrorKind),
    /// Reading a command failed or timed out.
    Receive(io::ErrorKind),
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(kind) => write!(f, "bind failed ({kind})"),
            Self::Connect(kind) => write!(f, "connect to hub failed ({kind})"),
            Self::SocketOption(kind) => write!(f, "socket option rejected ({kind})"),
            Self::Accept(kind) => write!(f, "accept failed ({kind})"),
            Self::Send(kind) => write!(f, "send failed ({kind})"),
            Self::Receive(kind) => write!(f, "receive failed ({kind})"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Node-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
