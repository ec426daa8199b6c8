// libex10-rs/libex10/src/device/builder.rs

//! Builder that wires board drivers into a [`Device`](crate::device::Device).

use std::sync::Arc;

use crate::device::config::BoardConfig;
use crate::device::handle::{Device, Uninitialized};
use crate::error::Module;
use crate::transport::{GpioInterface, HostInterface};
use crate::{Error, Result};

/// Collects the board drivers and settings for a [`Device`].
#[derive(Default)]
pub struct DeviceBuilder {
    host: Option<Box<dyn HostInterface>>,
    gpio: Option<Arc<dyn GpioInterface>>,
    config: BoardConfig,
}

impl DeviceBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte transport to the device (SPI on the reference board).
    pub fn with_host(mut self, host: Box<dyn HostInterface>) -> Self {
        self.host = Some(host);
        self
    }

    /// GPIO driver for READY_N, RESET_N, ENABLE and IRQ_N.
    pub fn with_gpio(mut self, gpio: Arc<dyn GpioInterface>) -> Self {
        self.gpio = Some(gpio);
        self
    }

    /// Defaults to [`BoardConfig::default`].
    pub fn with_config(mut self, config: BoardConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails with `NullPointer` if a driver is missing.
    pub fn build(self) -> Result<Device<Uninitialized>> {
        let missing = Error::NullPointer {
            module: Module::BoardInit,
        };
        let host = self.host.ok_or_else(|| missing.clone())?;
        let gpio = self.gpio.ok_or(missing)?;
        Ok(Device::new(host, gpio, self.config))
    }
}
