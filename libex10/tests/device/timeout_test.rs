// Timing assertions. Serialised so a loaded test runner does not skew the
// measured intervals.

use std::time::{Duration, Instant};

use libex10::device::Ex10Ops;
use libex10::test_support::{fast_config, protocol_rig};
use libex10::transport::SimulatedEx10;
use libex10::types::OpId;
use libex10::Error;
use serial_test::serial;

#[test]
#[serial]
fn op_wait_gives_up_after_its_budget() {
    let rig = protocol_rig(SimulatedEx10::new(), &fast_config()).unwrap();
    rig.sim.set_ops_stuck_busy(true);
    rig.protocol.start_op(OpId::TxRampDownOp).unwrap();

    let started = Instant::now();
    let result = rig.protocol.wait_op_completion_with_timeout(40);
    let elapsed = started.elapsed();
    assert!(matches!(result, Err(Error::OpsTimeout { .. })));
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
#[serial]
fn op_timeout_comes_from_the_board_config() {
    let config = fast_config().with_op_timeout_ms(25);
    let rig = protocol_rig(SimulatedEx10::new(), &config).unwrap();
    rig.sim.set_ops_stuck_busy(true);
    let ops = Ex10Ops::new(rig.protocol.clone());

    let started = Instant::now();
    assert!(ops.radio_power_control(true).is_ok());
    assert!(ops.wait_op_completion().is_err());
    assert!(started.elapsed() >= Duration::from_millis(25));
}

#[test]
#[serial]
fn stuck_ready_n_times_out_each_transfer() {
    let rig = protocol_rig(SimulatedEx10::new(), &fast_config().with_ready_n_timeout_ms(15))
        .unwrap();
    rig.gpio.set_ready_n(true);

    let started = Instant::now();
    let mut status = [0u8; 2];
    assert!(rig
        .protocol
        .read(&libex10::registers::application::STATUS, &mut status)
        .is_err());
    assert!(started.elapsed() >= Duration::from_millis(15));
    rig.gpio.set_ready_n(false);
    assert!(rig.protocol.read_running_location().is_ok());
}
