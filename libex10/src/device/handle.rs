// libex10-rs/libex10/src/device/handle.rs

//! Type-state device handle.

use std::sync::Arc;

use log::{debug, warn};

use crate::device::config::BoardConfig;
use crate::device::event_queue::EventFifoQueue;
use crate::device::fifo_pool::FifoBufferPool;
use crate::device::ops::Ex10Ops;
use crate::device::power::PowerTransactor;
use crate::device::power_modes::PowerModes;
use crate::device::protocol::Ex10Protocol;
use crate::error::Module;
use crate::transport::{GpioInterface, HostInterface};
use crate::types::{InterruptFlags, PowerMode, RunLocation};
use crate::{Error, Result};

/// Interrupts the event queue listens to after bring-up.
pub const DEFAULT_QUEUE_INTERRUPTS: InterruptFlags =
    InterruptFlags::EVENT_FIFO_ABOVE_THRESH.union(InterruptFlags::EVENT_FIFO_FULL);

/// Type-state markers. Each carries what the board owns in that state.
pub struct Uninitialized {
    host: Box<dyn HostInterface>,
}

/// Powered and running the application.
pub struct Initialized {
    protocol: Arc<Ex10Protocol>,
    ops: Ex10Ops,
    power_modes: PowerModes,
    queue: Arc<EventFifoQueue>,
    location: RunLocation,
}

/// Powered and held in the bootloader.
pub struct Bootloader {
    protocol: Arc<Ex10Protocol>,
}

/// A board with an Ex10 on it. Bring-up is enforced at compile time.
pub struct Device<State = Uninitialized> {
    gpio: Arc<dyn GpioInterface>,
    config: BoardConfig,
    state: State,
}

impl<State> Device<State> {
    /// Board settings.
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// GPIO driver.
    pub fn gpio(&self) -> &Arc<dyn GpioInterface> {
        &self.gpio
    }
}

fn shut_down(gpio: &dyn GpioInterface, protocol: &Arc<Ex10Protocol>) -> Result<()> {
    let detached = protocol.deinit();
    PowerTransactor::new(Arc::clone(protocol)).power_down();
    gpio.cleanup();
    if let Some(mut host) = detached? {
        host.close();
    }
    Ok(())
}

/// Best-effort teardown after a failed bring-up; `cause` is what gets
/// reported.
fn abandon(gpio: &dyn GpioInterface, protocol: &Arc<Ex10Protocol>, cause: Error) -> Error {
    warn!("board bring-up failed: {}", cause);
    if let Err(e) = shut_down(gpio, protocol) {
        debug!("cleanup after failed bring-up: {}", e);
    }
    cause
}

impl Device<Uninitialized> {
    /// Handle over unopened drivers.
    pub fn new(
        host: Box<dyn HostInterface>,
        gpio: Arc<dyn GpioInterface>,
        config: BoardConfig,
    ) -> Self {
        Self {
            gpio,
            config,
            state: Uninitialized { host },
        }
    }

    /// Drivers up, host open, protocol attached. The device is still
    /// unpowered.
    fn attach(self) -> Result<(Arc<dyn GpioInterface>, BoardConfig, Arc<Ex10Protocol>)> {
        let Self {
            gpio,
            config,
            state: Uninitialized { mut host },
        } = self;

        gpio.initialize(false, false, true)
            .map_err(|status| Error::GpioInterface {
                module: Module::BoardInit,
                status,
            })?;
        host.open(config.spi_clock_hz)
            .map_err(|status| Error::HostInterface {
                module: Module::BoardInit,
                status,
            })?;

        let pool = FifoBufferPool::new(config.fifo_buffer_count, config.fifo_buffer_size)?;
        let protocol = Arc::new(Ex10Protocol::new(Arc::clone(&gpio), host, pool, &config));
        Ok((gpio, config, protocol))
    }

    /// Power the device up into the application and initialise it.
    ///
    /// The event queue is attached and listens for EventFifo interrupts.
    pub fn initialize(self) -> Result<Device<Initialized>> {
        let (gpio, config, protocol) = self.attach()?;
        match Self::bring_up(&protocol, &config) {
            Ok(state) => {
                debug!("board initialised in {}", state.location);
                Ok(Device {
                    gpio,
                    config,
                    state,
                })
            }
            Err(e) => Err(abandon(gpio.as_ref(), &protocol, e)),
        }
    }

    fn bring_up(protocol: &Arc<Ex10Protocol>, config: &BoardConfig) -> Result<Initialized> {
        let location = PowerTransactor::new(Arc::clone(protocol)).power_up_to_application()?;
        if location != RunLocation::Application {
            return Err(Error::RunLocation {
                module: Module::BoardInit,
                expected: RunLocation::Application,
                actual: Some(location),
            });
        }

        protocol.init_ex10()?;
        let ops = Ex10Ops::new(Arc::clone(protocol));
        ops.init_ex10()?;
        protocol.set_event_fifo_threshold(config.event_fifo_threshold)?;

        let queue = EventFifoQueue::new();
        queue.attach(protocol, DEFAULT_QUEUE_INTERRUPTS)?;
        Ok(Initialized {
            protocol: Arc::clone(protocol),
            ops,
            power_modes: PowerModes::new(Arc::clone(protocol), Arc::clone(&queue)),
            queue,
            location,
        })
    }

    /// Power up with the device held in the bootloader, for flashing.
    pub fn initialize_bootloader(self) -> Result<Device<Bootloader>> {
        let (gpio, config, protocol) = self.attach()?;
        let landed = PowerTransactor::new(Arc::clone(&protocol)).power_up_to_bootloader();
        let cause = match landed {
            Ok(RunLocation::Bootloader) => {
                return Ok(Device {
                    gpio,
                    config,
                    state: Bootloader { protocol },
                });
            }
            Ok(actual) => Error::RunLocation {
                module: Module::BoardInit,
                expected: RunLocation::Bootloader,
                actual: Some(actual),
            },
            Err(e) => e,
        };
        Err(abandon(gpio.as_ref(), &protocol, cause))
    }
}

impl Device<Initialized> {
    /// Register-level protocol.
    pub fn protocol(&self) -> &Arc<Ex10Protocol> {
        &self.state.protocol
    }

    /// Device ops.
    pub fn ops(&self) -> &Ex10Ops {
        &self.state.ops
    }

    /// Power mode control.
    pub fn power_modes(&self) -> &PowerModes {
        &self.state.power_modes
    }

    /// EventFifo queue fed by the interrupt path.
    pub fn event_queue(&self) -> &Arc<EventFifoQueue> {
        &self.state.queue
    }

    /// Where the firmware was running at the end of bring-up.
    pub fn running_location(&self) -> RunLocation {
        self.state.location
    }

    /// Change power mode, re-attaching the event queue when power returns.
    pub fn set_power_mode(&self, mode: PowerMode) -> Result<()> {
        let was_off = self.state.power_modes.get_power_mode() == PowerMode::Off;
        self.state.power_modes.set_power_mode(mode)?;
        if was_off && mode != PowerMode::Off {
            self.state.protocol.init_ex10()?;
            self.state
                .protocol
                .set_event_fifo_threshold(self.config.event_fifo_threshold)?;
            self.state
                .queue
                .attach(&self.state.protocol, DEFAULT_QUEUE_INTERRUPTS)?;
        }
        Ok(())
    }

    /// Unhook interrupts, power down and release the drivers.
    pub fn teardown(self) -> Result<()> {
        self.state.queue.clear();
        shut_down(self.gpio.as_ref(), &self.state.protocol)
    }
}

impl Device<Bootloader> {
    /// Register-level protocol.
    pub fn protocol(&self) -> &Arc<Ex10Protocol> {
        &self.state.protocol
    }

    /// Power the board down and release the drivers.
    pub fn teardown(self) -> Result<()> {
        shut_down(self.gpio.as_ref(), &self.state.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fifo_pool::FifoEvent;
    use crate::error::Outcome;
    use crate::protocol::event_fifo::{EventFifoPacket, PacketType};
    use crate::transport::mock::{GpioCall, MockGpio, SimulatedEx10};
    use std::time::Duration;

    fn device(sim: &SimulatedEx10) -> (Device<Uninitialized>, Arc<MockGpio>) {
        let gpio = Arc::new(MockGpio::attached(sim.clone()));
        let config = BoardConfig::default()
            .with_ready_n_timeout_ms(50)
            .with_op_timeout_ms(100)
            .with_event_fifo_threshold(0);
        (
            Device::new(Box::new(sim.clone()), gpio.clone(), config),
            gpio,
        )
    }

    #[test]
    fn initialize_brings_up_application() {
        let sim = SimulatedEx10::new();
        let (dev, gpio) = device(&sim);
        let dev = dev.initialize().unwrap();
        assert_eq!(dev.running_location(), RunLocation::Application);
        assert_eq!(
            gpio.calls().first(),
            Some(&GpioCall::Initialize {
                board_power_on: false,
                ex10_enable: false,
                reset: true
            })
        );
        assert!(gpio.has_irq_callback());
        assert_eq!(dev.power_modes().get_power_mode(), PowerMode::Ready);
        assert_eq!(sim.opened_clocks(), vec![4_000_000, 1_000_000, 4_000_000]);
    }

    #[test]
    fn invalid_image_fails_bring_up() {
        let sim = SimulatedEx10::new().without_application_image();
        let (dev, gpio) = device(&sim);
        assert!(matches!(
            dev.initialize(),
            Err(Error::RunLocation {
                module: Module::BoardInit,
                ..
            })
        ));
        assert!(gpio.position(GpioCall::Cleanup).is_some());
    }

    #[test]
    fn queue_receives_inserted_events() {
        let sim = SimulatedEx10::new();
        let (dev, gpio) = device(&sim);
        let dev = dev.initialize().unwrap();

        let packet = EventFifoPacket::new(PacketType::Custom, &[7, 0, 0, 0], &[]);
        dev.protocol().insert_fifo_event(true, Some(&packet)).unwrap();
        assert!(gpio.fire_irq());
        assert!(dev.event_queue().packet_wait_with_timeout(Duration::from_millis(100)));

        let mut seen = Vec::new();
        let outcome = dev.event_queue().drain_with(|p| {
            seen.push((p.packet_type, p.static_data[0]));
            Outcome::Ok(())
        });
        assert_eq!(outcome, Outcome::Ok(1));
        assert_eq!(seen, vec![(PacketType::Custom, 7)]);
        assert_eq!(dev.protocol().pool().free_count(), 8);
    }

    #[test]
    fn power_cycle_reattaches_queue() {
        let sim = SimulatedEx10::new();
        let (dev, gpio) = device(&sim);
        let dev = dev.initialize().unwrap();
        dev.set_power_mode(PowerMode::Off).unwrap();
        dev.set_power_mode(PowerMode::Ready).unwrap();

        sim.push_event_bytes(&EventFifoPacket::new(PacketType::Custom, &[1, 0, 0, 0], &[])
            .encode()
            .unwrap());
        assert!(gpio.fire_irq());
        assert_eq!(dev.event_queue().len(), 1);
        assert!(dev.protocol().register_fifo_data_callback(|_: FifoEvent| {}).is_err());
    }

    #[test]
    fn bootloader_bring_up_and_teardown() {
        let sim = SimulatedEx10::new();
        let (dev, gpio) = device(&sim);
        let dev = dev.initialize_bootloader().unwrap();
        assert_eq!(dev.protocol().get_running_location(), Some(RunLocation::Bootloader));
        dev.protocol().upload_image(0, &[0xaa; 64]).unwrap();
        assert_eq!(sim.completed_uploads().len(), 1);

        dev.teardown().unwrap();
        assert_eq!(sim.run_location(), None);
        assert_eq!(gpio.calls().last(), Some(&GpioCall::Cleanup));
    }

    #[test]
    fn teardown_powers_down_and_releases_irq() {
        let sim = SimulatedEx10::new();
        let (dev, gpio) = device(&sim);
        let dev = dev.initialize().unwrap();
        dev.teardown().unwrap();
        assert!(!gpio.has_irq_callback());
        assert_eq!(sim.run_location(), None);
        let deregistered = gpio.position(GpioCall::DeregisterIrqCallback).unwrap();
        let unpowered = gpio.position(GpioCall::SetBoardPower(false)).unwrap();
        assert!(deregistered < unpowered);
    }
}
