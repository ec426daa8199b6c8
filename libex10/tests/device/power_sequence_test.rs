use std::sync::Arc;

use libex10::device::{BoardConfig, Device, PowerTransactor};
use libex10::test_support::{fast_config, initialized_sim_device, protocol_rig};
use libex10::transport::{GpioCall, GpioInterface, MockGpio, SimulatedEx10};
use libex10::{Error, Module, PowerMode, RunLocation};

use crate::common::init_logging;

fn index(calls: &[GpioCall], call: GpioCall) -> usize {
    calls.iter().position(|c| *c == call).unwrap()
}

#[test]
fn teardown_unhooks_irq_before_removing_power() {
    init_logging();
    let (device, sim, gpio) = initialized_sim_device(fast_config()).unwrap();
    gpio.clear_calls();
    device.teardown().unwrap();

    let calls = gpio.calls();
    let deregister = index(&calls, GpioCall::DeregisterIrqCallback);
    let enable_off = index(&calls, GpioCall::SetEx10Enable(false));
    let reset = index(&calls, GpioCall::AssertResetN);
    let power_off = index(&calls, GpioCall::SetBoardPower(false));
    assert!(deregister < enable_off);
    assert!(enable_off < reset && reset < power_off);
    assert_eq!(calls.last(), Some(&GpioCall::Cleanup));
    assert_eq!(sim.run_location(), None);
}

#[test]
fn power_off_mode_holds_the_device_in_reset() {
    let (device, sim, gpio) = initialized_sim_device(fast_config()).unwrap();
    device.set_power_mode(PowerMode::Off).unwrap();
    assert_eq!(sim.run_location(), None);
    assert!(!gpio.get_board_power());

    device.set_power_mode(PowerMode::Ready).unwrap();
    assert_eq!(sim.run_location(), Some(RunLocation::Application));
    assert_eq!(device.power_modes().get_power_mode(), PowerMode::Ready);
}

#[test]
fn reset_confirms_where_the_device_landed() {
    let sim = SimulatedEx10::new();
    let rig = protocol_rig(sim.clone(), &fast_config()).unwrap();

    rig.protocol.reset(RunLocation::Bootloader).unwrap();
    assert_eq!(rig.protocol.get_running_location(), Some(RunLocation::Bootloader));
    assert_eq!(sim.opened_clocks().last(), Some(&1_000_000));

    rig.protocol.reset(RunLocation::Application).unwrap();
    assert_eq!(rig.protocol.get_running_location(), Some(RunLocation::Application));
    assert_eq!(sim.opened_clocks().last(), Some(&4_000_000));

    sim.set_application_image_valid(false);
    match rig.protocol.reset(RunLocation::Application) {
        Err(Error::RunLocation {
            expected, actual, ..
        }) => {
            assert_eq!(expected, RunLocation::Application);
            assert_eq!(actual, Some(RunLocation::Bootloader));
        }
        other => panic!("unexpected: {:?}", other),
    }
    // the link stays at the bootloader clock
    assert_eq!(sim.opened_clocks().last(), Some(&1_000_000));
}

#[test]
fn bootloader_bring_up_reports_bootloader() {
    let sim = SimulatedEx10::new();
    let gpio = Arc::new(MockGpio::attached(sim.clone()));
    let device = Device::new(Box::new(sim.clone()), gpio, fast_config())
        .initialize_bootloader()
        .unwrap();
    assert_eq!(device.protocol().get_running_location(), Some(RunLocation::Bootloader));
    let version = device.protocol().get_bootloader_version().unwrap();
    assert!(version.version_string.starts_with("sim-boot"));
    // the read leaves the device where it was
    assert_eq!(device.protocol().get_running_location(), Some(RunLocation::Bootloader));
    device.teardown().unwrap();
}

#[test]
fn stuck_ready_n_fails_bring_up_with_timeout() {
    let sim = SimulatedEx10::new();
    let gpio = Arc::new(MockGpio::attached(sim.clone()));
    gpio.set_ready_n(true);
    let config = BoardConfig::default().with_ready_n_timeout_ms(10);
    let result = Device::new(Box::new(sim), gpio.clone(), config).initialize();
    assert!(matches!(
        result,
        Err(Error::Timeout {
            module: Module::PowerTransactor
        })
    ));
    assert_eq!(gpio.calls().last(), Some(&GpioCall::Cleanup));
}

#[test]
fn power_up_without_image_lands_in_bootloader() {
    let sim = SimulatedEx10::new().without_application_image();
    let rig = protocol_rig(sim.clone(), &fast_config()).unwrap();
    let power = PowerTransactor::new(rig.protocol.clone());
    power.power_down();
    assert_eq!(power.power_up_to_application().unwrap(), RunLocation::Bootloader);
    assert_eq!(sim.run_location(), Some(RunLocation::Bootloader));
}
