//! Hardware adapter: turns the configured inventory into live devices.
//!
//! This is the only module that decides which driver backs a device.
//! Pins come from a [`PinFactory`]: the simulated [`SimBoard`] off-target,
//! or a board-specific factory wrapping a real `embedded-hal` GPIO crate.

use std::collections::BTreeMap;

use embedded_hal::digital::{InputPin, StatefulOutputPin};
use log::{debug, info};

use crate::config::DeviceSpec;
use crate::device::{Device, DeviceRegistry, IndexAllocator};
use crate::drivers::gpio::{GpioActuator, GpioSensor, SimPin};
use crate::error::Error;

/// Source of GPIO lines.
pub trait PinFactory {
    type Output: StatefulOutputPin + Send + 'static;
    type Input: InputPin + Send + 'static;

    fn output(&mut self, gpio: u8) -> Result<Self::Output, Error>;

    fn input(&mut self, gpio: u8) -> Result<Self::Input, Error>;
}

/// Build the registry from an ordered inventory.
///
/// Indices are assigned per category in list order.  Passive entries get
/// an input driver; everything else gets an output driver.
pub fn build_registry<F: PinFactory>(
    specs: &[DeviceSpec],
    pins: &mut F,
) -> Result<DeviceRegistry, Error> {
    let mut alloc = IndexAllocator::new();
    let mut devices = Vec::with_capacity(specs.len());

    for spec in specs {
        let index = alloc.next(spec.category);
        let passive = spec.is_passive();
        let device = if passive {
            let pin = pins.input(spec.gpio)?;
            let driver = if spec.active_low {
                GpioSensor::active_low(pin)
            } else {
                GpioSensor::new(pin)
            };
            Device::new(spec.name.clone(), spec.category, index, true, driver)
        } else {
            let pin = pins.output(spec.gpio)?;
            Device::new(spec.name.clone(), spec.category, index, false, GpioActuator::new(pin))
        };
        debug!(
            "hw: {} '{}' on GPIO {}{}",
            device.key(),
            spec.name,
            spec.gpio,
            if passive { " (passive)" } else { "" }
        );
        devices.push(device);
    }

    let registry = DeviceRegistry::register(devices)?;
    info!("hw: {} devices registered", registry.len());
    Ok(registry)
}

// ── Simulated board ───────────────────────────────────────────

/// In-memory GPIO bank.  Every requested line is remembered so callers
/// can inspect actuator levels or inject sensor edges by GPIO number.
#[derive(Debug, Default)]
pub struct SimBoard {
    pins: BTreeMap<u8, SimPin>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to a line, creating it (low) if nothing claimed it yet.
    pub fn pin(&mut self, gpio: u8) -> SimPin {
        self.pins
            .entry(gpio)
            .or_insert_with(|| SimPin::new(gpio))
            .clone()
    }

    /// Handle to a line that was already claimed.
    pub fn get(&self, gpio: u8) -> Option<SimPin> {
        self.pins.get(&gpio).cloned()
    }

    pub fn claimed(&self) -> impl Iterator<Item = u8> + '_ {
        self.pins.keys().copied()
    }
}

impl PinFactory for SimBoard {
    type Output = SimPin;
    type Input = SimPin;

    fn output(&mut self, gpio: u8) -> Result<SimPin, Error> {
        Ok(self.pin(gpio))
    }

    fn input(&mut self, gpio: u8) -> Result<SimPin, Error> {
        Ok(self.pin(gpio))
    }
}
