//! Telemetry client: periodic state reports to the hub.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use super::NodeShared;
use crate::app::ports::{EnvReading, EnvironmentPort};
use crate::device::{DeviceCategory, StateSampler};
use crate::link::{TelemetryMessage, Uplink};

/// Categories reported each cycle, in send order.
pub const TELEMETRY_CATEGORIES: [DeviceCategory; 4] = [
    DeviceCategory::Lamp,
    DeviceCategory::AirConditioning,
    DeviceCategory::OpeningSensor,
    DeviceCategory::PresenceSensor,
];

/// Longest single sleep, so a stop request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct TelemetryClient {
    sampler: StateSampler,
    environment: Arc<dyn EnvironmentPort>,
    uplink: Arc<Uplink>,
    shared: Arc<NodeShared>,
}

impl TelemetryClient {
    pub(crate) fn new(
        sampler: StateSampler,
        environment: Arc<dyn EnvironmentPort>,
        uplink: Arc<Uplink>,
        shared: Arc<NodeShared>,
    ) -> Self {
        Self {
            sampler,
            environment,
            uplink,
            shared,
        }
    }

    /// Sample and send one message per reported category.
    /// Returns how many were delivered.
    pub fn push_cycle(&self) -> usize {
        let mut delivered = 0;
        for category in TELEMETRY_CATEGORIES {
            let mask = self.sampler.sample(category);
            let env = self.environment.get_next().unwrap_or_else(|e| {
                debug!("TELEM | environment unavailable: {}", e);
                EnvReading::UNAVAILABLE
            });
            let msg = TelemetryMessage::new(category, mask, env);

            match self.uplink.send(&msg) {
                Ok(()) => {
                    delivered += 1;
                    self.shared.stats.record_telemetry();
                    trace!(
                        "TELEM | {} mask={:#b} t={:.1} h={:.1}",
                        category,
                        mask.bits(),
                        env.temperature_c,
                        env.humidity_pct
                    );
                }
                Err(e) => {
                    self.shared.stats.record_send_failure();
                    warn!("TELEM | {}: {}", category, e);
                }
            }
        }
        delivered
    }

    pub fn run(self, interval: Duration) {
        // Reports start once the command listener is up.
        while self.running() && !self.shared.server_up.load(Ordering::Acquire) {
            thread::sleep(SLEEP_SLICE.min(interval));
        }
        debug!("TELEM | started ({:?} cycle)", interval);

        while self.running() {
            self.push_cycle();
            self.sleep(interval);
        }
        debug!("TELEM | stopped");
    }

    fn running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn sleep(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
