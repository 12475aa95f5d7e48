//! Device model: categories, per-category identity, and the device
//! handle that couples identity with its driver capability.
//!
//! Identity is `(category, index)`: the index is sequential *within* a
//! category, starting at 0, in the order devices were listed.  The hub
//! registers its own devices in the same order, so the inventory order
//! is part of the protocol even though nothing on this side can check it.

pub mod mask;
pub mod registry;
pub mod sampler;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::DevicePort;
use crate::error::{ActuatorError, SensorError};

pub use mask::{MASK_BITS, StateMask};
pub use registry::DeviceRegistry;
pub use sampler::{ApplyReport, StateSampler};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Functional class of a device.  Discriminants are the wire codes the
/// hub uses and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DeviceCategory {
    OpeningSensor = 1,
    PresenceSensor = 2,
    Lamp = 3,
    AirConditioning = 4,
    /// Automatic temperature control for the A/C units; commands carry no mask.
    AirConditioningAuto = 5,
}

/// Categories whose commands carry no state payload.
pub const AUTO_CATEGORIES: [DeviceCategory; 1] = [DeviceCategory::AirConditioningAuto];

impl DeviceCategory {
    pub const ALL: [Self; 5] = [
        Self::OpeningSensor,
        Self::PresenceSensor,
        Self::Lamp,
        Self::AirConditioning,
        Self::AirConditioningAuto,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Map a wire code back to a category.  Unknown codes yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::OpeningSensor),
            2 => Some(Self::PresenceSensor),
            3 => Some(Self::Lamp),
            4 => Some(Self::AirConditioning),
            5 => Some(Self::AirConditioningAuto),
            _ => None,
        }
    }

    pub const fn is_auto(self) -> bool {
        matches!(self, Self::AirConditioningAuto)
    }

    /// Sensors are read but never driven.
    pub const fn is_sensor(self) -> bool {
        matches!(self, Self::OpeningSensor | Self::PresenceSensor)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::OpeningSensor => "OPENING_SENSOR",
            Self::PresenceSensor => "PRESENCE_SENSOR",
            Self::Lamp => "LAMP",
            Self::AirConditioning => "AIR_CONDITIONING",
            Self::AirConditioningAuto => "AIR_CONDITIONING_AUTO",
        }
    }

    /// Dense 0-based slot for per-category tables.
    pub(crate) const fn slot(self) -> usize {
        self as usize - 1
    }
}

/// True when a raw wire code belongs to the auto set.  Works on unknown
/// codes too, which are never auto.
pub fn is_auto_code(code: u8) -> bool {
    AUTO_CATEGORIES.iter().any(|c| c.code() == code)
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable device key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub category: DeviceCategory,
    pub index: u32,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.index)
    }
}

/// Hands out sequential indices per category in inventory order.
#[derive(Debug, Default)]
pub struct IndexAllocator {
    next: [u32; DeviceCategory::ALL.len()],
}

impl IndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, category: DeviceCategory) -> u32 {
        let slot = &mut self.next[category.slot()];
        let index = *slot;
        *slot += 1;
        index
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// One physical actuator or sensor.
pub struct Device {
    name: String,
    key: DeviceKey,
    passive: bool,
    driver: Box<dyn DevicePort>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        category: DeviceCategory,
        index: u32,
        passive: bool,
        driver: impl DevicePort + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            key: DeviceKey { category, index },
            passive,
            driver: Box::new(driver),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> DeviceKey {
        self.key
    }

    pub fn category(&self) -> DeviceCategory {
        self.key.category
    }

    pub fn index(&self) -> u32 {
        self.key.index
    }

    pub fn is_passive(&self) -> bool {
        self.passive
    }

    pub fn turn_on(&self) -> Result<(), ActuatorError> {
        self.driver.turn_on()
    }

    pub fn turn_off(&self) -> Result<(), ActuatorError> {
        self.driver.turn_off()
    }

    /// Current level: `true` = on / triggered.
    pub fn read(&self) -> Result<bool, SensorError> {
        self.driver.read()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("passive", &self.passive)
            .finish_non_exhaustive()
    }
}
