// libex10-rs/libex10/src/device/ops.rs

//! Device ops needed to bring the radio up and down.
//!
//! An op is started by writing its parameters and then its id to
//! OpsControl; both go out in one Write frame so the parameters are in
//! place when the op starts. Callers wait for completion separately.

use std::sync::Arc;

use log::debug;

use crate::device::protocol::Ex10Protocol;
use crate::registers::application;
use crate::types::{GpioPinsSetClear, OpId, RxGainControl};
use crate::Result;

/// Device ops used for bring-up and power transitions.
#[derive(Debug, Clone)]
pub struct Ex10Ops {
    protocol: Arc<Ex10Protocol>,
}

impl Ex10Ops {
    /// Ops over `protocol`.
    pub fn new(protocol: Arc<Ex10Protocol>) -> Self {
        Self { protocol }
    }

    /// Protocol the ops run on.
    pub fn protocol(&self) -> &Arc<Ex10Protocol> {
        &self.protocol
    }

    /// Radio power on, then the default receive configuration.
    pub fn init_ex10(&self) -> Result<()> {
        self.radio_power_control(true)?;
        self.wait_op_completion()?;
        self.set_analog_rx_config(RxGainControl::DEFAULT)?;
        self.wait_op_completion()
    }

    /// Block until the running op clears its busy bit.
    pub fn wait_op_completion(&self) -> Result<()> {
        self.protocol.wait_op_completion()
    }

    /// Switch the internal analog supplies.
    pub fn radio_power_control(&self, enable: bool) -> Result<()> {
        debug!("radio power {}", if enable { "on" } else { "off" });
        self.protocol.write_multiple(
            &[application::ANALOG_ENABLE, application::OPS_CONTROL],
            &[
                &[enable as u8, 0, 0, 0],
                &[OpId::RadioPowerControlOp.as_u8()],
            ],
        )
    }

    /// Apply receive gain settings.
    pub fn set_analog_rx_config(&self, config: RxGainControl) -> Result<()> {
        self.protocol.write_multiple(
            &[application::RX_GAIN_CONTROL, application::OPS_CONTROL],
            &[&config.to_le_bytes(), &[OpId::SetRxGainOp.as_u8()]],
        )
    }

    /// Drive the board GPIO pins.
    pub fn set_clear_gpio_pins(&self, pins: &GpioPinsSetClear) -> Result<()> {
        self.protocol.write_multiple(
            &[
                application::GPIO_OUTPUT_LEVEL_SET,
                application::GPIO_OUTPUT_LEVEL_CLEAR,
                application::GPIO_OUTPUT_ENABLE_SET,
                application::GPIO_OUTPUT_ENABLE_CLEAR,
                application::OPS_CONTROL,
            ],
            &[
                &pins.output_level_set.to_le_bytes(),
                &pins.output_level_clear.to_le_bytes(),
                &pins.output_enable_set.to_le_bytes(),
                &pins.output_enable_clear.to_le_bytes(),
                &[OpId::SetClearGpioPinsOp.as_u8()],
            ],
        )
    }

    /// Drive only the PA bias and RF supply enables.
    pub fn set_gpio_pins(&self, pa_bias: bool, rf_power_supply: bool) -> Result<()> {
        let mut pins = GpioPinsSetClear::default();
        pins.set_pa_bias_enable(pa_bias);
        pins.set_rf_power_supply_enable(rf_power_supply);
        self.set_clear_gpio_pins(&pins)
    }

    /// Reference board pin setup.
    pub fn set_default_gpio_setup(&self) -> Result<()> {
        self.set_clear_gpio_pins(&GpioPinsSetClear::board_default())
    }

    /// Start ramping the transmitter down.
    pub fn tx_ramp_down(&self) -> Result<()> {
        self.protocol.start_op(OpId::TxRampDownOp)
    }

    /// Stop whatever op is running and bring the transmitter down.
    pub fn stop_op_and_ramp_down(&self) -> Result<()> {
        self.protocol.stop_op()?;
        self.wait_op_completion()?;
        self.tx_ramp_down()?;
        self.wait_op_completion()
    }
}
