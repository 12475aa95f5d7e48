//! Port traits: the hexagonal boundary between the node runtime and the
//! outside world.
//!
//! ```text
//!   Driver / adapter ──▶ Port trait ──▶ StateSampler / NodeRuntime
//! ```
//!
//! Drivers (GPIO pins, environment sensor, config storage) implement
//! these traits.  The runtime only ever sees the traits, so every loop is
//! testable with in-memory drivers.

use crate::config::NodeConfig;
use crate::error::{ActuatorError, SensorError};

// ───────────────────────────────────────────────────────────────
// Device port (one actuator or sensor)
// ───────────────────────────────────────────────────────────────

/// Capability set of a single device.
///
/// Methods take `&self`: the sampler calls them from several threads at
/// once, so implementations serialize their own hardware access.
/// Passive devices may refuse writes; the sampler never issues them.
pub trait DevicePort: Send + Sync {
    fn turn_on(&self) -> Result<(), ActuatorError>;

    fn turn_off(&self) -> Result<(), ActuatorError>;

    /// `true` when the device is on (actuator) or triggered (sensor).
    fn read(&self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Environment port (temperature / humidity)
// ───────────────────────────────────────────────────────────────

/// One environmental sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl EnvReading {
    /// Sentinel pair meaning "no environmental reading attached".
    pub const UNAVAILABLE: Self = Self {
        temperature_c: -1.0,
        humidity_pct: -1.0,
    };
}

pub trait EnvironmentPort: Send + Sync {
    /// Acquire the next (temperature, humidity) sample.
    fn get_next(&self) -> Result<EnvReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate before persisting.  Invalid values are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`NodeConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config could not be parsed.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}
