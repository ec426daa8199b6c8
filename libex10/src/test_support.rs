//! Rigs shared by unit tests, integration tests and benches.
//!
//! Everything here runs against [`SimulatedEx10`] and [`MockGpio`], so no
//! hardware is needed.
#![allow(dead_code)]

use std::sync::Arc;

use crate::device::{BoardConfig, Device, Ex10Protocol, FifoBufferPool, Initialized};
use crate::transport::mock::{MockGpio, SimulatedEx10};
use crate::transport::GpioInterface;
use crate::Result;

/// Short timeouts so failure paths finish quickly under test.
#[doc(hidden)]
pub fn fast_config() -> BoardConfig {
    BoardConfig::default()
        .with_ready_n_timeout_ms(50)
        .with_op_timeout_ms(100)
}

/// A powered simulated device with a protocol instance already attached.
#[doc(hidden)]
pub struct SimRig {
    pub sim: SimulatedEx10,
    pub gpio: Arc<MockGpio>,
    pub protocol: Arc<Ex10Protocol>,
}

/// Power the simulated board and run protocol init, without the ops and
/// power-mode layers.
#[doc(hidden)]
pub fn protocol_rig(sim: SimulatedEx10, config: &BoardConfig) -> Result<SimRig> {
    let gpio = Arc::new(MockGpio::attached(sim.clone()));
    gpio.set_board_power(true);
    gpio.set_ex10_enable(true);
    let pool = FifoBufferPool::new(config.fifo_buffer_count, config.fifo_buffer_size)?;
    let protocol = Arc::new(Ex10Protocol::new(
        gpio.clone(),
        Box::new(sim.clone()),
        pool,
        config,
    ));
    protocol.init_ex10()?;
    Ok(SimRig {
        sim,
        gpio,
        protocol,
    })
}

/// Full board bring-up against a fresh simulated device.
#[doc(hidden)]
pub fn initialized_sim_device(
    config: BoardConfig,
) -> Result<(Device<Initialized>, SimulatedEx10, Arc<MockGpio>)> {
    let sim = SimulatedEx10::new();
    let gpio = Arc::new(MockGpio::attached(sim.clone()));
    let device = Device::new(Box::new(sim.clone()), gpio.clone(), config).initialize()?;
    Ok((device, sim, gpio))
}
