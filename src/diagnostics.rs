//! Runtime diagnostics.
//!
//! Lock-free counters bumped by the node threads, plus a serializable
//! snapshot the binary logs periodically.  Also installs a panic hook
//! so a dying worker thread leaves a log line behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Shared counters.  All updates are `Relaxed`; the values are only
/// ever reported, never used for control flow.
#[derive(Debug)]
pub struct NodeStats {
    started: Instant,
    connections_accepted: AtomicU64,
    commands_applied: AtomicU64,
    auto_commands_ignored: AtomicU64,
    unknown_commands: AtomicU64,
    receive_errors: AtomicU64,
    telemetry_sent: AtomicU64,
    alerts_sent: AtomicU64,
    send_failures: AtomicU64,
}

impl Default for NodeStats {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! counter {
    ($($bump:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $bump(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl NodeStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            commands_applied: AtomicU64::new(0),
            auto_commands_ignored: AtomicU64::new(0),
            unknown_commands: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
            telemetry_sent: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    counter! {
        record_connection => connections_accepted,
        record_command => commands_applied,
        record_auto_ignored => auto_commands_ignored,
        record_unknown => unknown_commands,
        record_receive_error => receive_errors,
        record_telemetry => telemetry_sent,
        record_alert => alerts_sent,
        record_send_failure => send_failures,
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            connections_accepted: get(&self.connections_accepted),
            commands_applied: get(&self.commands_applied),
            auto_commands_ignored: get(&self.auto_commands_ignored),
            unknown_commands: get(&self.unknown_commands),
            receive_errors: get(&self.receive_errors),
            telemetry_sent: get(&self.telemetry_sent),
            alerts_sent: get(&self.alerts_sent),
            send_failures: get(&self.send_failures),
        }
    }
}

/// Point-in-time copy of [`NodeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub connections_accepted: u64,
    pub commands_applied: u64,
    pub auto_commands_ignored: u64,
    pub unknown_commands: u64,
    pub receive_errors: u64,
    pub telemetry_sent: u64,
    pub alerts_sent: u64,
    pub send_failures: u64,
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that logs the panicking thread and reason
/// before chaining to the default hook.
pub fn install_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");

        log::error!("PANIC in {}: {}", name, reason);
        default_hook(info);
    }));
}
