// libex10-rs/libex10/src/device/power_modes.rs

//! Power-mode state machine.
//!
//! | mode      | core power | analog | PA bias / RF supply |
//! |-----------|------------|--------|---------------------|
//! | Off       | off        | off    | off                 |
//! | Standby   | on         | off    | off                 |
//! | ReadyCold | on         | on     | off                 |
//! | Ready     | on         | on     | on                  |
//!
//! Leaving Off runs the full power-up and init sequence first. A failed
//! transition leaves the recorded mode where it was.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::constants::PA_BIAS_POWER_ON_DELAY_MS;
use crate::device::event_queue::EventFifoQueue;
use crate::device::ops::Ex10Ops;
use crate::device::power::PowerTransactor;
use crate::device::protocol::Ex10Protocol;
use crate::error::Module;
use crate::types::{PowerMode, RunLocation};
use crate::utils::busy_wait_ms;
use crate::{Error, Result};

/// Power mode state machine over the board and the device.
#[derive(Debug)]
pub struct PowerModes {
    protocol: Arc<Ex10Protocol>,
    ops: Ex10Ops,
    power: PowerTransactor,
    queue: Arc<EventFifoQueue>,
    mode: Mutex<PowerMode>,
}

impl PowerModes {
    /// The device is assumed powered and initialised, in Ready.
    pub fn new(protocol: Arc<Ex10Protocol>, queue: Arc<EventFifoQueue>) -> Self {
        Self {
            ops: Ex10Ops::new(Arc::clone(&protocol)),
            power: PowerTransactor::new(Arc::clone(&protocol)),
            protocol,
            queue,
            mode: Mutex::new(PowerMode::Ready),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PowerMode> {
        self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mode last entered.
    pub fn get_power_mode(&self) -> PowerMode {
        *self.lock()
    }

    /// Move to `target`.
    ///
    /// Going to Off drops the protocol callbacks, so an attached
    /// [`EventFifoQueue`] must be attached again after power returns.
    pub fn set_power_mode(&self, target: PowerMode) -> Result<()> {
        let mut mode = self.lock();
        if *mode == target {
            return Ok(());
        }
        debug!("power mode {} -> {}", *mode, target);

        if *mode == PowerMode::Off {
            self.powerup_and_init()?;
        }
        let result = match target {
            PowerMode::Off => self.enter_off(),
            PowerMode::Standby => self.enter_cold(false),
            PowerMode::ReadyCold => self.enter_cold(true),
            PowerMode::Ready => self.enter_ready(),
        };
        match &result {
            Ok(()) => *mode = target,
            Err(e) => warn!("power mode {} failed, staying in {}: {}", target, *mode, e),
        }
        result
    }

    fn powerup_and_init(&self) -> Result<()> {
        let location = self.power.power_up_to_application()?;
        if location != RunLocation::Application {
            return Err(Error::RunLocation {
                module: Module::PowerModes,
                expected: RunLocation::Application,
                actual: Some(location),
            });
        }
        self.ops.init_ex10()?;
        self.ops.set_default_gpio_setup()?;
        self.ops.wait_op_completion()?;
        self.protocol.enable_interrupt_handlers(true);
        Ok(())
    }

    fn set_gpio_pins(&self, pa_bias: bool, rf_power_supply: bool) -> Result<()> {
        self.ops.set_gpio_pins(pa_bias, rf_power_supply)?;
        self.ops.wait_op_completion()
    }

    fn enter_cold(&self, radio_power: bool) -> Result<()> {
        self.ops.stop_op_and_ramp_down()?;
        self.set_gpio_pins(false, false)?;
        self.ops.radio_power_control(radio_power)?;
        self.ops.wait_op_completion()
    }

    fn enter_ready(&self) -> Result<()> {
        let result = self
            .ops
            .radio_power_control(true)
            .and_then(|()| self.ops.wait_op_completion())
            .and_then(|()| self.set_gpio_pins(true, true));
        busy_wait_ms(PA_BIAS_POWER_ON_DELAY_MS);
        result
    }

    /// The device is powered down even when stopping the transmitter
    /// fails; the stop failure is still reported.
    fn enter_off(&self) -> Result<()> {
        let stopped = self.ops.stop_op_and_ramp_down();

        // the IRQ_N edge caused by removing power must not reach the handler
        self.protocol.enable_interrupt_handlers(false);
        if let Err(e) = self.protocol.unregister_interrupt_callback() {
            warn!("power off: clearing interrupt mask failed: {}", e);
        }
        self.protocol.unregister_fifo_data_callback();
        self.queue.clear();

        self.power.power_down();
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::config::BoardConfig;
    use crate::device::fifo_pool::{FifoBufferPool, FifoEvent};
    use crate::registers::application;
    use crate::transport::mock::{GpioCall, MockGpio, SimulatedEx10};
    use crate::transport::GpioInterface;
    use crate::types::{InterruptFlags, OpId};

    struct Rig {
        modes: PowerModes,
        sim: SimulatedEx10,
        gpio: Arc<MockGpio>,
        protocol: Arc<Ex10Protocol>,
        queue: Arc<EventFifoQueue>,
    }

    fn rig() -> Rig {
        let sim = SimulatedEx10::new();
        let gpio = Arc::new(MockGpio::attached(sim.clone()));
        gpio.set_board_power(true);
        gpio.set_ex10_enable(true);
        let pool = FifoBufferPool::new(2, 4096).unwrap();
        let protocol = Arc::new(Ex10Protocol::new(
            gpio.clone(),
            Box::new(sim.clone()),
            pool,
            &BoardConfig::default().with_op_timeout_ms(50),
        ));
        protocol.init_ex10().unwrap();
        let queue = EventFifoQueue::new();
        let modes = PowerModes::new(Arc::clone(&protocol), Arc::clone(&queue));
        Rig {
            modes,
            sim,
            gpio,
            protocol,
            queue,
        }
    }

    fn analog_enable(sim: &SimulatedEx10) -> u8 {
        sim.peek(RunLocation::Application, application::ANALOG_ENABLE.address, 1)[0]
    }

    #[test]
    fn starts_ready_and_same_mode_is_noop() {
        let r = rig();
        assert_eq!(r.modes.get_power_mode(), PowerMode::Ready);
        r.sim.clear_commands();
        r.modes.set_power_mode(PowerMode::Ready).unwrap();
        assert!(r.sim.commands().is_empty());
    }

    #[test]
    fn cold_modes_switch_analog_power() {
        let r = rig();
        r.modes.set_power_mode(PowerMode::Standby).unwrap();
        assert_eq!(analog_enable(&r.sim), 0);
        r.modes.set_power_mode(PowerMode::ReadyCold).unwrap();
        assert_eq!(analog_enable(&r.sim), 1);
        assert_eq!(r.modes.get_power_mode(), PowerMode::ReadyCold);
        r.modes.set_power_mode(PowerMode::Ready).unwrap();
        assert_eq!(
            r.sim.op_log().last(),
            Some(&OpId::SetClearGpioPinsOp.as_u8())
        );
    }

    #[test]
    fn off_masks_interrupts_before_removing_power() {
        let r = rig();
        r.queue.attach(&r.protocol, InterruptFlags::EVENT_FIFO_ABOVE_THRESH).unwrap();
        r.gpio.clear_calls();

        r.modes.set_power_mode(PowerMode::Off).unwrap();
        let masked = r.gpio.position(GpioCall::IrqMonitorEnable(false)).unwrap();
        let unpowered = r.gpio.position(GpioCall::SetBoardPower(false)).unwrap();
        assert!(masked < unpowered);
        assert_eq!(r.modes.get_power_mode(), PowerMode::Off);
        assert_eq!(r.sim.run_location(), None);
        assert!(!r.gpio.fire_irq());
        // callbacks were dropped, so attaching again succeeds
        assert!(r.protocol.register_fifo_data_callback(|_| {}).is_ok());
    }

    #[test]
    fn off_discards_queued_buffers() {
        let r = rig();
        let mut node = r.protocol.pool().acquire().unwrap();
        node.set_len(4).unwrap();
        r.queue.push(FifoEvent::Data(node));
        assert_eq!(r.protocol.pool().free_count(), 1);
        r.modes.set_power_mode(PowerMode::Off).unwrap();
        assert!(r.queue.is_empty());
        assert_eq!(r.protocol.pool().free_count(), 2);
    }

    #[test]
    fn leaving_off_powers_up_and_restores_interrupts() {
        let r = rig();
        r.modes.set_power_mode(PowerMode::Off).unwrap();
        r.gpio.clear_calls();
        r.modes.set_power_mode(PowerMode::Standby).unwrap();
        assert_eq!(r.sim.run_location(), Some(RunLocation::Application));
        assert_eq!(r.gpio.calls().last(), Some(&GpioCall::IrqEnable(true)));
        assert!(r.gpio.position(GpioCall::IrqMonitorEnable(true)).is_some());
        assert_eq!(analog_enable(&r.sim), 0);
        assert_eq!(r.modes.get_power_mode(), PowerMode::Standby);
    }

    #[test]
    fn failed_power_up_keeps_off() {
        let r = rig();
        r.modes.set_power_mode(PowerMode::Off).unwrap();
        r.sim.set_application_image_valid(false);
        assert!(matches!(
            r.modes.set_power_mode(PowerMode::Ready),
            Err(Error::RunLocation {
                module: Module::PowerModes,
                actual: Some(RunLocation::Bootloader),
                ..
            })
        ));
        assert_eq!(r.modes.get_power_mode(), PowerMode::Off);
    }

    #[test]
    fn failed_op_keeps_mode() {
        let r = rig();
        r.sim.set_ops_stuck_busy(true);
        assert!(matches!(
            r.modes.set_power_mode(PowerMode::Standby),
            Err(Error::OpsTimeout { .. })
        ));
        assert_eq!(r.modes.get_power_mode(), PowerMode::Ready);
    }
}
