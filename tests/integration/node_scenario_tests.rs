//! End-to-end: node started against a fake hub over loopback TCP.

use std::sync::Arc;

use homenode::adapters::hardware::{SimBoard, build_registry};
use homenode::app::ports::EnvReading;
use homenode::config::DeviceSpec;
use homenode::device::{DeviceCategory, StateMask};
use homenode::error::{CommsError, Error};
use homenode::link::CommandMessage;
use homenode::node::NodeRuntime;
use homenode::sensors::environment::SimEnvironment;

use crate::mock_hw::{FakeHub, test_config, wait_until};

const LAMP_GPIO: u8 = 17;
const DOOR_GPIO: u8 = 5;

fn lamp_and_door() -> Vec<DeviceSpec> {
    vec![
        DeviceSpec::new("Living room lamp", DeviceCategory::Lamp, LAMP_GPIO),
        DeviceSpec::new("Front door", DeviceCategory::OpeningSensor, DOOR_GPIO),
    ]
}

fn is_alert(m: &homenode::link::TelemetryMessage) -> bool {
    m.category == DeviceCategory::OpeningSensor.code() && m.temperature == -1.0 && m.humidity == -1.0
}

#[test]
fn lamp_command_then_door_alarm() {
    let hub = FakeHub::start();
    let cfg = homenode::config::NodeConfig {
        devices: lamp_and_door(),
        // Long enough that a sustained alarm is not repeated during the test.
        alarm_cooldown_ticks: 1_000_000,
        ..test_config(hub.addr())
    };
    let mut board = SimBoard::new();
    let registry = build_registry(&cfg.devices, &mut board).unwrap();
    let env = Arc::new(SimEnvironment::new(cfg.environment.into()));
    let runtime = NodeRuntime::start(&cfg, registry, env).unwrap();

    // Telemetry flows once the listener is up, with the configured climate.
    assert!(wait_until(|| hub.count(|m| m.category == DeviceCategory::Lamp.code()) >= 1));
    let first = hub.frames()[0];
    assert_eq!(first.category, DeviceCategory::Lamp.code());
    assert_eq!(first.mask, StateMask::EMPTY);
    assert_eq!(first.temperature, 25.0);
    assert_eq!(first.humidity, 50.0);

    // Hub switches the lamp on; the next lamp report shows bit 0.
    let mut cmd = FakeHub::connect_commands(runtime.local_addr());
    FakeHub::send_command(&mut cmd, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(1)));
    assert!(wait_until(|| board.get(LAMP_GPIO).unwrap().level()));
    assert!(wait_until(|| {
        hub.count(|m| m.category == DeviceCategory::Lamp.code() && m.mask.bits() == 1) >= 1
    }));

    // Door opens: exactly one alert while it stays open.
    assert_eq!(hub.count(is_alert), 0);
    board.get(DOOR_GPIO).unwrap().set_level(true);
    assert!(wait_until(|| hub.count(is_alert) == 1));
    let alert = hub.frames().into_iter().find(is_alert).unwrap();
    assert_eq!(alert.mask, StateMask::from_bits(1));
    std::thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(hub.count(is_alert), 1);

    // Closing and reopening re-arms the alarm.
    board.get(DOOR_GPIO).unwrap().set_level(false);
    std::thread::sleep(std::time::Duration::from_millis(20));
    board.get(DOOR_GPIO).unwrap().set_level(true);
    assert!(wait_until(|| hub.count(is_alert) == 2));

    let handle = runtime.handle();
    handle.stop();
    assert!(!board.get(LAMP_GPIO).unwrap().level());
    runtime.join();
    assert!(handle.stats().alerts_sent >= 2);
}

#[test]
fn sustained_alarm_repeats_after_cooldown() {
    let hub = FakeHub::start();
    let cfg = homenode::config::NodeConfig {
        devices: lamp_and_door(),
        alarm_cooldown_ticks: 10,
        telemetry_interval_ms: 10_000,
        ..test_config(hub.addr())
    };
    let mut board = SimBoard::new();
    let registry = build_registry(&cfg.devices, &mut board).unwrap();
    board.get(DOOR_GPIO).unwrap().set_level(true);
    let env = Arc::new(SimEnvironment::new(cfg.environment.into()));
    let runtime = NodeRuntime::start(&cfg, registry, env).unwrap();

    assert!(wait_until(|| hub.count(is_alert) >= 3));

    runtime.handle().stop();
    runtime.join();
}

#[test]
fn missing_hub_is_fatal() {
    let cfg = homenode::config::NodeConfig {
        devices: lamp_and_door(),
        ..test_config(unused_port())
    };
    let mut board = SimBoard::new();
    let registry = build_registry(&cfg.devices, &mut board).unwrap();
    let env = Arc::new(SimEnvironment::new(EnvReading::UNAVAILABLE));
    let err = NodeRuntime::start(&cfg, registry, env).err().unwrap();
    assert!(matches!(err, Error::Comms(CommsError::Connect(_))));
}

#[test]
fn busy_command_port_is_fatal() {
    let hub = FakeHub::start();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let cfg = homenode::config::NodeConfig {
        listen_addr: taken.local_addr().unwrap(),
        ..test_config(hub.addr())
    };
    let mut board = SimBoard::new();
    let registry = build_registry(&cfg.devices, &mut board).unwrap();
    let env = Arc::new(SimEnvironment::new(EnvReading::UNAVAILABLE));
    let err = NodeRuntime::start(&cfg, registry, env).err().unwrap();
    assert!(matches!(err, Error::Comms(CommsError::Bind(_))));
}

fn unused_port() -> std::net::SocketAddr {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    l.local_addr().unwrap()
}
