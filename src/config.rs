//! Node configuration parameters
//!
//! All tunable parameters for the edge node.  Values can be overridden
//! from a JSON file (see [`crate::adapters::config_file`]).

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, EnvReading};
use crate::device::{DeviceCategory, MASK_BITS};
use crate::pins;

/// Hub telemetry port.
pub const HUB_PORT: u16 = 10008;
/// Node command port.
pub const NODE_PORT: u16 = 10108;

/// One physical device in the inventory.  Order within a category
/// defines the device index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub category: DeviceCategory,
    pub gpio: u8,
    /// Defaults to "category is a sensor".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
    #[serde(default)]
    pub active_low: bool,
}

impl DeviceSpec {
    pub fn new(name: &str, category: DeviceCategory, gpio: u8) -> Self {
        Self {
            name: name.to_owned(),
            category,
            gpio,
            passive: None,
            active_low: false,
        }
    }

    pub fn is_passive(&self) -> bool {
        self.passive.unwrap_or(self.category.is_sensor())
    }
}

/// Fixed environmental values reported by the simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            humidity_pct: 50.0,
        }
    }
}

impl From<EnvironmentConfig> for EnvReading {
    fn from(c: EnvironmentConfig) -> Self {
        Self {
            temperature_c: c.temperature_c,
            humidity_pct: c.humidity_pct,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Network ---
    /// Hub endpoint for telemetry and alerts
    pub hub_addr: SocketAddr,
    /// Local endpoint for hub commands
    pub listen_addr: SocketAddr,
    /// Uplink write timeout (milliseconds)
    pub send_timeout_ms: u32,
    /// Command connection read timeout (milliseconds); bounds stop latency
    pub recv_timeout_ms: u32,
    /// Listener accept poll interval (milliseconds)
    pub accept_poll_ms: u32,

    // --- Timing ---
    /// Telemetry cycle interval (milliseconds)
    pub telemetry_interval_ms: u32,
    /// Alarm sensor poll interval (microseconds)
    pub alarm_poll_interval_us: u32,
    /// Alarm poll iterations before a standing alert is repeated
    pub alarm_cooldown_ticks: u32,
    /// Diagnostics log interval (seconds, 0 = off)
    pub stats_interval_secs: u32,

    // --- Hardware ---
    pub environment: EnvironmentConfig,
    pub devices: Vec<DeviceSpec>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        use DeviceCategory::*;

        Self {
            // Network
            hub_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, HUB_PORT)),
            listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, NODE_PORT)),
            send_timeout_ms: 2000,
            recv_timeout_ms: 2000,
            accept_poll_ms: 50,

            // Timing
            telemetry_interval_ms: 1000, // 1 Hz
            alarm_poll_interval_us: 500, // 2 kHz
            alarm_cooldown_ticks: 100_000,
            stats_interval_secs: 60,

            // Hardware
            environment: EnvironmentConfig::default(),
            devices: vec![
                DeviceSpec::new("Room 1 lamp", Lamp, pins::LAMP_ROOM_1_GPIO),
                DeviceSpec::new("Room 2 lamp", Lamp, pins::LAMP_ROOM_2_GPIO),
                DeviceSpec::new("Room 1 A/C", AirConditioning, pins::AC_ROOM_1_GPIO),
                DeviceSpec::new("Room 2 A/C", AirConditioning, pins::AC_ROOM_2_GPIO),
                DeviceSpec::new("Room 1 presence", PresenceSensor, pins::PRESENCE_ROOM_1_GPIO),
                DeviceSpec::new("Room 2 presence", PresenceSensor, pins::PRESENCE_ROOM_2_GPIO),
                DeviceSpec::new("Front door", OpeningSensor, pins::OPENING_FRONT_DOOR_GPIO),
                DeviceSpec::new("Room 1 window", OpeningSensor, pins::OPENING_WINDOW_1_GPIO),
                DeviceSpec::new("Room 2 window", OpeningSensor, pins::OPENING_WINDOW_2_GPIO),
            ],
        }
    }
}

impl NodeConfig {
    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_timeout_ms == 0 || self.recv_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("socket timeouts must be non-zero"));
        }
        if self.accept_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("accept_poll_ms must be non-zero"));
        }
        if self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("telemetry_interval_ms must be non-zero"));
        }
        if self.alarm_poll_interval_us == 0 {
            return Err(ConfigError::ValidationFailed("alarm_poll_interval_us must be non-zero"));
        }

        let mut per_category = [0usize; DeviceCategory::ALL.len()];
        for dev in &self.devices {
            if dev.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed("device name must not be empty"));
            }
            if dev.category.is_auto() {
                return Err(ConfigError::ValidationFailed(
                    "auto categories cannot hold devices",
                ));
            }
            let slot = dev.category.slot();
            per_category[slot] += 1;
            if per_category[slot] > MASK_BITS {
                return Err(ConfigError::ValidationFailed(
                    "more than 64 devices in one category",
                ));
            }
        }
        Ok(())
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_timeout_ms))
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.recv_timeout_ms))
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.accept_poll_ms))
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.telemetry_interval_ms))
    }

    pub fn alarm_poll_interval(&self) -> Duration {
        Duration::from_micros(u64::from(self.alarm_poll_interval_us))
    }
}
