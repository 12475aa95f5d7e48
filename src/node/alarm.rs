//! Alarm monitor: low-latency intrusion alerts.
//!
//! Polls the opening and presence sensors far faster than the telemetry
//! cycle and pushes an alert to the hub as soon as either reports an
//! asserted device.  A standing alarm is repeated only after a cooldown
//! measured in poll iterations, so its wall-clock length depends on the
//! poll interval and on how long each sample takes.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use log::{debug, info, warn};

use super::NodeShared;
use crate::device::{DeviceCategory, StateMask, StateSampler};
use crate::link::{TelemetryMessage, Uplink};

/// Alarm sources, in priority order.
pub const ALARM_CATEGORIES: [DeviceCategory; 2] =
    [DeviceCategory::OpeningSensor, DeviceCategory::PresenceSensor];

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Alert/cooldown bookkeeping, one observation per poll iteration.
///
/// ```text
///   clear ──assert──▶ SENT(ticks=0) ──assert──▶ ticks+1 … ticks > cooldown ──▶ clear
///     ▲                   │
///     └──── no alert ─────┘
/// ```
#[derive(Debug, Clone)]
pub struct AlarmDebouncer {
    cooldown_ticks: u32,
    alert_sent: bool,
    ticks: u32,
}

impl AlarmDebouncer {
    pub fn new(cooldown_ticks: u32) -> Self {
        Self {
            cooldown_ticks,
            alert_sent: false,
            ticks: 0,
        }
    }

    pub fn in_cooldown(&self) -> bool {
        self.alert_sent
    }

    /// Feed the current alert (if any).  Returns the message to send.
    pub fn observe(&mut self, alert: Option<(DeviceCategory, StateMask)>) -> Option<TelemetryMessage> {
        let Some((category, mask)) = alert else {
            self.alert_sent = false;
            self.ticks = 0;
            return None;
        };

        if !self.alert_sent {
            self.alert_sent = true;
            self.ticks = 0;
            return Some(TelemetryMessage::alert(category, mask));
        }

        self.ticks = self.ticks.saturating_add(1);
        if self.ticks > self.cooldown_ticks {
            self.ticks = 0;
            self.alert_sent = false;
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct AlarmMonitor {
    sampler: StateSampler,
    uplink: Arc<Uplink>,
    shared: Arc<NodeShared>,
    debouncer: AlarmDebouncer,
}

impl AlarmMonitor {
    pub(crate) fn new(
        sampler: StateSampler,
        uplink: Arc<Uplink>,
        shared: Arc<NodeShared>,
        cooldown_ticks: u32,
    ) -> Self {
        Self {
            sampler,
            uplink,
            shared,
            debouncer: AlarmDebouncer::new(cooldown_ticks),
        }
    }

    /// First alarm category with an asserted device.
    fn current_alert(&self) -> Option<(DeviceCategory, StateMask)> {
        ALARM_CATEGORIES.iter().find_map(|&category| {
            let mask = self.sampler.sample(category);
            (!mask.is_empty()).then_some((category, mask))
        })
    }

    /// One poll iteration.  Returns `true` if an alert was sent.
    pub fn poll_once(&mut self) -> bool {
        let Some(msg) = self.debouncer.observe(self.current_alert()) else {
            return false;
        };

        // The alert counts as sent even if the write fails; the next
        // attempt waits for the cooldown like any other.
        match self.uplink.send(&msg) {
            Ok(()) => {
                self.shared.stats.record_alert();
                info!("ALARM | {} mask={:#b}", category_label(msg.category), msg.mask.bits());
                true
            }
            Err(e) => {
                self.shared.stats.record_send_failure();
                warn!("ALARM | {}", e);
                false
            }
        }
    }

    pub fn run(mut self, interval: std::time::Duration) {
        debug!("ALARM | monitor started ({:?} poll)", interval);
        while self.shared.running.load(Ordering::Acquire) {
            self.poll_once();
            thread::sleep(interval);
        }
        debug!("ALARM | monitor stopped");
    }
}

fn category_label(code: u8) -> &'static str {
    DeviceCategory::from_code(code).map_or("?", DeviceCategory::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOOR: Option<(DeviceCategory, StateMask)> =
        Some((DeviceCategory::OpeningSensor, StateMask::from_bits(1)));

    #[test]
    fn first_assertion_alerts_immediately() {
        let mut d = AlarmDebouncer::new(3);
        let msg = d.observe(DOOR).unwrap();
        assert_eq!(msg.category, DeviceCategory::OpeningSensor.code());
        assert_eq!(msg.mask.bits(), 1);
        assert_eq!(msg.temperature, -1.0);
        assert_eq!(msg.humidity, -1.0);
        assert!(d.in_cooldown());
    }

    #[test]
    fn sustained_assertion_repeats_after_cooldown() {
        let cooldown = 3;
        let mut d = AlarmDebouncer::new(cooldown);
        let sent: Vec<usize> = (0..20)
            .filter_map(|i| d.observe(DOOR).map(|_| i))
            .collect();
        // Alert, then cooldown+1 silent ticks (the last one re-arms),
        // so sends are cooldown+2 iterations apart.
        let period = cooldown as usize + 2;
        assert_eq!(sent, (0..20).step_by(period).collect::<Vec<_>>());
    }

    #[test]
    fn clear_rearms_immediately() {
        let mut d = AlarmDebouncer::new(1_000);
        assert!(d.observe(DOOR).is_some());
        assert!(d.observe(DOOR).is_none());
        assert!(d.observe(None).is_none());
        assert!(!d.in_cooldown());
        assert!(d.observe(DOOR).is_some());
    }

    #[test]
    fn category_change_during_cooldown_is_silent() {
        let mut d = AlarmDebouncer::new(10);
        assert!(d.observe(DOOR).is_some());
        let presence = Some((DeviceCategory::PresenceSensor, StateMask::from_bits(2)));
        assert!(d.observe(presence).is_none());
    }
}
