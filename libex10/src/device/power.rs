// libex10-rs/libex10/src/device/power.rs

//! GPIO power sequencing.
//!
//! Every sequence runs with IRQ delivery masked; edges seen while the
//! supplies move are noise.

use std::sync::Arc;

use log::debug;

use crate::constants::{
    BOOTLOADER_SPI_CLOCK_HZ, ENABLE_OFF_TO_RESET_MS, ENABLE_TO_RESET_RELEASE_DELAY_MS,
    POWER_DOWN_HOLD_MS, READY_N_HOLD_MS, VDD_TO_ENABLE_DELAY_MS,
};
use crate::device::protocol::Ex10Protocol;
use crate::error::Module;
use crate::transport::{ETIMEDOUT, GpioInterface};
use crate::types::RunLocation;
use crate::utils::busy_wait_ms;
use crate::{Error, Result};

/// Board power sequencing over the GPIO driver.
#[derive(Debug, Clone)]
pub struct PowerTransactor {
    protocol: Arc<Ex10Protocol>,
}

impl PowerTransactor {
    /// Sequencer for the board behind `protocol`.
    pub fn new(protocol: Arc<Ex10Protocol>) -> Self {
        Self { protocol }
    }

    fn gpio(&self) -> &dyn GpioInterface {
        self.protocol.gpio().as_ref()
    }

    fn masked<T>(&self, sequence: impl FnOnce() -> Result<T>) -> Result<T> {
        self.gpio().irq_enable(false);
        let result = sequence();
        self.gpio().irq_enable(true);
        result
    }

    fn wait_ready(&self) -> Result<()> {
        let timeout = self.protocol.config().ready_n_timeout_ms;
        self.gpio().busy_wait_ready_n(timeout).map_err(|status| {
            if status == -ETIMEDOUT {
                Error::Timeout {
                    module: Module::PowerTransactor,
                }
            } else {
                Error::GpioInterface {
                    module: Module::PowerTransactor,
                    status,
                }
            }
        })
    }

    fn supplies_on(&self) {
        let gpio = self.gpio();
        gpio.assert_reset_n();
        gpio.set_board_power(true);
        busy_wait_ms(VDD_TO_ENABLE_DELAY_MS);
        gpio.set_ex10_enable(true);
    }

    /// Location the device reports after power-up, at the bootloader clock.
    fn landed(&self, expected: RunLocation) -> Result<RunLocation> {
        self.protocol.host_if_reopen(BOOTLOADER_SPI_CLOCK_HZ)?;
        self.protocol
            .read_running_location()?
            .ok_or(Error::RunLocation {
                module: Module::PowerTransactor,
                expected,
                actual: None,
            })
    }

    /// Apply power and release reset. The application starts if its image
    /// is valid; the returned location says where the device landed.
    pub fn power_up_to_application(&self) -> Result<RunLocation> {
        self.masked(|| {
            self.supplies_on();
            busy_wait_ms(ENABLE_TO_RESET_RELEASE_DELAY_MS);
            self.gpio().deassert_reset_n();
            self.wait_ready()?;

            let location = self.landed(RunLocation::Application)?;
            if location == RunLocation::Application {
                self.protocol.host_if_reopen(self.protocol.config().spi_clock_hz)?;
            }
            debug!("powered up into {}", location);
            Ok(location)
        })
    }

    /// Power up with READY_N held low across the reset release so the
    /// device stays in the bootloader.
    pub fn power_up_to_bootloader(&self) -> Result<RunLocation> {
        self.masked(|| {
            self.supplies_on();
            busy_wait_ms(ENABLE_TO_RESET_RELEASE_DELAY_MS);
            let gpio = self.gpio();
            gpio.assert_ready_n();
            busy_wait_ms(READY_N_HOLD_MS);
            gpio.deassert_reset_n();
            busy_wait_ms(ENABLE_TO_RESET_RELEASE_DELAY_MS);
            gpio.release_ready_n();
            busy_wait_ms(READY_N_HOLD_MS);
            self.wait_ready()?;

            let location = self.landed(RunLocation::Bootloader)?;
            debug!("powered up into {}", location);
            Ok(location)
        })
    }

    /// Remove power. Holds long enough that an immediate power-up starts
    /// from a clean reset.
    pub fn power_down(&self) {
        let gpio = self.gpio();
        gpio.irq_enable(false);
        gpio.set_ex10_enable(false);
        busy_wait_ms(ENABLE_OFF_TO_RESET_MS);
        gpio.assert_reset_n();
        gpio.set_board_power(false);
        busy_wait_ms(POWER_DOWN_HOLD_MS);
        gpio.irq_enable(true);
        debug!("powered down");
    }
}
