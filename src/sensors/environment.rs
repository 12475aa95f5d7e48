//! Room temperature / humidity source.
//!
//! The node has no physical climate sensor wired yet; it reports the
//! configured nominal values.  Values are held as `f32` bit patterns in
//! atomics so tests (or a future driver thread) can inject readings
//! while the telemetry thread samples.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::app::ports::{EnvReading, EnvironmentPort};
use crate::error::SensorError;

pub struct SimEnvironment {
    temperature_bits: AtomicU32,
    humidity_bits: AtomicU32,
    offline: AtomicBool,
}

impl SimEnvironment {
    pub fn new(initial: EnvReading) -> Self {
        Self {
            temperature_bits: AtomicU32::new(initial.temperature_c.to_bits()),
            humidity_bits: AtomicU32::new(initial.humidity_pct.to_bits()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set(&self, reading: EnvReading) {
        self.temperature_bits
            .store(reading.temperature_c.to_bits(), Ordering::Relaxed);
        self.humidity_bits
            .store(reading.humidity_pct.to_bits(), Ordering::Relaxed);
    }

    /// Simulate the sensor dropping off the bus.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }
}

impl EnvironmentPort for SimEnvironment {
    fn get_next(&self) -> Result<EnvReading, SensorError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(SensorError::NotReady);
        }
        Ok(EnvReading {
            temperature_c: f32::from_bits(self.temperature_bits.load(Ordering::Relaxed)),
            humidity_pct: f32::from_bits(self.humidity_bits.load(Ordering::Relaxed)),
        })
    }
}
