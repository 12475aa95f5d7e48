//! Single-pin GPIO device drivers.
//!
//! Actuators (lamp relays, A/C contactors) drive a `StatefulOutputPin`
//! and read back the latched output level; sensors (reed contacts, PIR
//! outputs) read an `InputPin`.  Each driver owns its pin behind a mutex
//! so the command thread and the sampling threads never interleave on
//! the same line.
//!
//! ## Dual-target design
//!
//! Any `embedded-hal` 1.0 pin implementation plugs in.  Off-target the
//! node uses [`SimPin`], which tracks the level in memory and lets tests
//! inject sensor edges.

use core::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use log::trace;
use parking_lot::Mutex;

use crate::app::ports::DevicePort;
use crate::error::{ActuatorError, SensorError};

// ── Actuator ─────────────────────────────────────────────────

/// Active-high output line.
pub struct GpioActuator<P> {
    pin: Mutex<P>,
}

impl<P> GpioActuator<P>
where
    P: StatefulOutputPin + Send,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin: Mutex::new(pin),
        }
    }
}

impl<P> DevicePort for GpioActuator<P>
where
    P: StatefulOutputPin + Send,
{
    fn turn_on(&self) -> Result<(), ActuatorError> {
        self.pin
            .lock()
            .set_high()
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }

    fn turn_off(&self) -> Result<(), ActuatorError> {
        self.pin
            .lock()
            .set_low()
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }

    fn read(&self) -> Result<bool, SensorError> {
        self.pin
            .lock()
            .is_set_high()
            .map_err(|_| SensorError::GpioReadFailed)
    }
}

// ── Sensor ───────────────────────────────────────────────────

/// Digital input line.  Contacts wired to ground use `active_low`.
pub struct GpioSensor<P> {
    pin: Mutex<P>,
    active_low: bool,
}

impl<P> GpioSensor<P>
where
    P: InputPin + Send,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin: Mutex::new(pin),
            active_low: false,
        }
    }

    pub fn active_low(pin: P) -> Self {
        Self {
            pin: Mutex::new(pin),
            active_low: true,
        }
    }
}

impl<P> DevicePort for GpioSensor<P>
where
    P: InputPin + Send,
{
    fn turn_on(&self) -> Result<(), ActuatorError> {
        Err(ActuatorError::PassiveDevice)
    }

    fn turn_off(&self) -> Result<(), ActuatorError> {
        Err(ActuatorError::PassiveDevice)
    }

    fn read(&self) -> Result<bool, SensorError> {
        let high = self
            .pin
            .lock()
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed)?;
        Ok(high != self.active_low)
    }
}

// ── Simulation pin ───────────────────────────────────────────

/// In-memory pin.  Clones share the same level, so a test (or the
/// simulated board) can keep a handle and flip a sensor input while a
/// driver owns the other clone.
#[derive(Debug, Clone)]
pub struct SimPin {
    gpio: u8,
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(gpio: u8) -> Self {
        Self {
            gpio,
            level: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Inject an input level (sensor edge) from outside the driver.
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::Release);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        trace!("gpio(sim): {} -> LOW", self.gpio);
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        trace!("gpio(sim): {} -> HIGH", self.gpio);
        self.set_level(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}
