//! State sampler: converts between live device levels and masks.
//!
//! `sample` is called from the telemetry and alarm threads while `apply`
//! runs on the command-server thread; concurrent pin access is
//! serialized inside each driver.

use std::sync::Arc;

use log::{debug, warn};

use super::{DeviceCategory, DeviceRegistry, MASK_BITS, StateMask};

/// What an [`StateSampler::apply`] sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub switched_on: u32,
    pub switched_off: u32,
    /// Passive devices present in the category (never written).
    pub skipped_passive: u32,
    /// Driver writes that returned an error.
    pub failed: u32,
}

impl ApplyReport {
    pub fn touched(&self) -> u32 {
        self.switched_on + self.switched_off
    }
}

#[derive(Clone)]
pub struct StateSampler {
    registry: Arc<DeviceRegistry>,
}

impl StateSampler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Read every device of `category` and pack the levels into a mask.
    ///
    /// A device whose read fails is reported as not asserted.
    pub fn sample(&self, category: DeviceCategory) -> StateMask {
        let mut mask = StateMask::EMPTY;
        for device in self.registry.all_in(category) {
            match device.read() {
                Ok(true) => {
                    mask.set(device.index());
                }
                Ok(false) => {}
                Err(e) => warn!("sample: {} '{}' read failed: {}", device.key(), device.name(), e),
            }
        }
        mask
    }

    /// Drive every registered, non-passive device of `category` to the
    /// level its bit in `mask` requests.
    ///
    /// Unregistered indices are ignored.  A failing write is logged and
    /// counted; the sweep continues with the next index.
    pub fn apply(&self, category: DeviceCategory, mask: StateMask) -> ApplyReport {
        let mut report = ApplyReport::default();

        for index in 0..MASK_BITS as u32 {
            let Some(device) = self.registry.lookup(category, index) else {
                continue;
            };
            if device.is_passive() {
                report.skipped_passive += 1;
                continue;
            }

            let on = mask.is_set(index);
            let result = if on { device.turn_on() } else { device.turn_off() };
            match result {
                Ok(()) if on => report.switched_on += 1,
                Ok(()) => report.switched_off += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("apply: {} '{}' write failed: {}", device.key(), device.name(), e);
                }
            }
        }

        debug!("apply: {} {:?}", category, report);
        report
    }
}
