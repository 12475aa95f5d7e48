//! Command path: hub → node TCP → decoder → sampler → drivers.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use homenode::app::ports::EnvReading;
use homenode::device::{Device, DeviceCategory, DeviceRegistry, StateMask};
use homenode::link::{CommandMessage, NullTransport, Uplink};
use homenode::node::NodeRuntime;
use homenode::sensors::environment::SimEnvironment;

use crate::mock_hw::{DeviceCall, FakeHub, RecordingDevice, test_config, wait_until};

struct Bench {
    runtime: NodeRuntime,
    lamps: Vec<RecordingDevice>,
    ac: RecordingDevice,
}

fn bench() -> Bench {
    let lamps: Vec<RecordingDevice> = (0..3).map(|_| RecordingDevice::new()).collect();
    let ac = RecordingDevice::new();
    let mut devices: Vec<Device> = lamps
        .iter()
        .enumerate()
        .map(|(i, d)| Device::new(format!("lamp {i}"), DeviceCategory::Lamp, i as u32, false, d.clone()))
        .collect();
    devices.push(Device::new("ac", DeviceCategory::AirConditioning, 0, false, ac.clone()));
    let registry = DeviceRegistry::register(devices).unwrap();

    let cfg = test_config("127.0.0.1:9".parse().unwrap());
    let env = Arc::new(SimEnvironment::new(EnvReading::UNAVAILABLE));
    let runtime = NodeRuntime::start_with_uplink(&cfg, registry, env, Uplink::new(NullTransport)).unwrap();
    Bench { runtime, lamps, ac }
}

fn shutdown(b: Bench) {
    b.runtime.handle().stop();
    b.runtime.join();
}

#[test]
fn lamp_command_switches_lamps() {
    let b = bench();
    let mut hub = FakeHub::connect_commands(b.runtime.local_addr());

    FakeHub::send_command(&mut hub, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(0b101)));
    assert!(wait_until(|| b.lamps[0].is_on() && b.lamps[2].is_on()));
    assert!(!b.lamps[1].is_on());
    assert_eq!(b.lamps[1].history(), vec![DeviceCall::Off]);
    assert!(b.ac.history().is_empty());

    FakeHub::send_command(&mut hub, CommandMessage::set(DeviceCategory::Lamp, StateMask::EMPTY));
    assert!(wait_until(|| b.lamps.iter().all(|l| !l.is_on())));
    shutdown(b);
}

#[test]
fn auto_and_unknown_commands_are_noops() {
    let b = bench();
    let handle = b.runtime.handle();
    let mut hub = FakeHub::connect_commands(b.runtime.local_addr());

    FakeHub::send_command(&mut hub, CommandMessage::auto(DeviceCategory::AirConditioningAuto));
    FakeHub::send_command(
        &mut hub,
        CommandMessage {
            category: 0x7F,
            mask: Some(StateMask::from_bits(u64::MAX)),
        },
    );
    // A following real command proves the stream stayed in sync.
    FakeHub::send_command(&mut hub, CommandMessage::set(DeviceCategory::AirConditioning, StateMask::from_bits(1)));

    assert!(wait_until(|| b.ac.is_on()));
    let stats = handle.stats();
    assert_eq!(stats.auto_commands_ignored, 1);
    assert_eq!(stats.unknown_commands, 1);
    assert_eq!(stats.commands_applied, 1);
    assert!(b.lamps.iter().all(|l| l.history().is_empty()));
    shutdown(b);
}

#[test]
fn command_split_across_writes() {
    let b = bench();
    let mut hub = FakeHub::connect_commands(b.runtime.local_addr());
    let wire = CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(0b10)).encode();

    hub.write_all(&wire[..3]).unwrap();
    hub.flush().unwrap();
    std::thread::sleep(Duration::from_millis(80));
    assert!(!b.lamps[1].is_on());
    hub.write_all(&wire[3..]).unwrap();

    assert!(wait_until(|| b.lamps[1].is_on()));
    shutdown(b);
}

#[test]
fn server_accepts_again_after_disconnect() {
    let b = bench();
    let handle = b.runtime.handle();
    {
        let mut first = FakeHub::connect_commands(b.runtime.local_addr());
        FakeHub::send_command(&mut first, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(1)));
        assert!(wait_until(|| b.lamps[0].is_on()));
    }

    let mut second = FakeHub::connect_commands(b.runtime.local_addr());
    FakeHub::send_command(&mut second, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(0b10)));
    assert!(wait_until(|| b.lamps[1].is_on() && !b.lamps[0].is_on()));
    assert!(wait_until(|| handle.stats().connections_accepted == 2));
    shutdown(b);
}

#[test]
fn stop_unblocks_open_connection_and_switches_off() {
    let b = bench();
    let _hub = {
        let mut s = FakeHub::connect_commands(b.runtime.local_addr());
        FakeHub::send_command(&mut s, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(0b111)));
        s
    };
    assert!(wait_until(|| b.lamps.iter().all(RecordingDevice::is_on)));

    let handle = b.runtime.handle();
    handle.stop();
    assert!(b.lamps.iter().all(|l| !l.is_on()));
    assert!(!b.ac.is_on());
    // join returns even though the hub never closed its side.
    b.runtime.join();
}

#[test]
fn stop_during_slow_apply_still_leaves_actuators_off() {
    let slow = RecordingDevice::with_slow_first_off(Duration::from_millis(300));
    let lamp1 = RecordingDevice::new();
    let registry = DeviceRegistry::register(vec![
        Device::new("lamp 0", DeviceCategory::Lamp, 0, false, slow.clone()),
        Device::new("lamp 1", DeviceCategory::Lamp, 1, false, lamp1.clone()),
    ])
    .unwrap();
    let cfg = test_config("127.0.0.1:9".parse().unwrap());
    let env = Arc::new(SimEnvironment::new(EnvReading::UNAVAILABLE));
    let runtime = NodeRuntime::start_with_uplink(&cfg, registry, env, Uplink::new(NullTransport)).unwrap();

    let mut hub = FakeHub::connect_commands(runtime.local_addr());
    FakeHub::send_command(&mut hub, CommandMessage::set(DeviceCategory::Lamp, StateMask::from_bits(0b10)));
    // The command is now stalled switching lamp 0 off; lamp 1 is next.
    assert!(wait_until(|| !slow.history().is_empty()));
    assert!(!lamp1.is_on());

    runtime.handle().stop();
    assert!(!lamp1.is_on());
    assert_eq!(lamp1.history().last(), Some(&DeviceCall::Off));
    assert!(!slow.is_on());

    runtime.join();
    assert!(!lamp1.is_on());
}
