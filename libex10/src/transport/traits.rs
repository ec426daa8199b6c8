// libex10-rs/libex10/src/transport/traits.rs

//! SPI host and GPIO driver traits.

use crate::utils::Deadline;

/// Status returned by board drivers: the value on success, a negative errno
/// style code on failure.
pub type HostResult<T> = std::result::Result<T, i32>;

/// Errno reported by [`GpioInterface::busy_wait_ready_n`] on timeout.
pub const ETIMEDOUT: i32 = 110;

/// Callback invoked by the GPIO driver on an IRQ_N falling edge.
pub type IrqCallback = Box<dyn Fn() + Send + Sync>;

/// Byte transport to the device (SPI on the reference board).
///
/// Implementations move raw bytes only; framing and the ready handshake are
/// handled by [`crate::protocol::CommandTransactor`].
pub trait HostInterface: Send {
    /// Open the transport at the given clock. Reopening an open transport
    /// changes its clock.
    fn open(&mut self, clock_hz: u32) -> HostResult<()>;

    /// Close the transport.
    fn close(&mut self);

    /// Read exactly `buf.len()` bytes if possible; returns the count read.
    fn read(&mut self, buf: &mut [u8]) -> HostResult<usize>;

    /// Write `data`; returns the count written.
    fn write(&mut self, data: &[u8]) -> HostResult<usize>;
}

/// Board GPIO lines wired to the device.
///
/// Methods take `&self` because the IRQ line is serviced from a different
/// thread than the one issuing commands; implementations synchronize
/// internally.
pub trait GpioInterface: Send + Sync {
    /// Configure all lines and drive the initial levels. `reset` true means
    /// RESET_N asserted (low).
    fn initialize(&self, board_power_on: bool, ex10_enable: bool, reset: bool) -> HostResult<()>;

    /// Release all lines.
    fn cleanup(&self);

    fn set_board_power(&self, on: bool);
    fn get_board_power(&self) -> bool;

    fn set_ex10_enable(&self, enable: bool);
    fn get_ex10_enable(&self) -> bool;

    /// Install the IRQ_N handler. Only one handler is installed at a time.
    fn register_irq_callback(&self, callback: IrqCallback) -> HostResult<()>;

    /// Remove the IRQ_N handler.
    fn deregister_irq_callback(&self) -> HostResult<()>;

    /// Allow or block delivery of IRQ_N edges to the installed handler.
    fn irq_enable(&self, enable: bool);

    /// Keep the IRQ monitor alive but stop (or resume) calling the handler.
    /// Used around power transitions where edges are meaningless.
    fn irq_monitor_callback_enable(&self, enable: bool);

    fn assert_reset_n(&self);
    fn deassert_reset_n(&self);

    /// Drive READY_N low from the host side, holding the device in the
    /// bootloader across a reset.
    fn assert_ready_n(&self);

    /// Return READY_N to an input.
    fn release_ready_n(&self);

    /// Current READY_N level. `false` (low) means the device is ready.
    fn ready_n_pin_get(&self) -> bool;

    /// Spin until READY_N reads low or `timeout_ms` elapses.
    fn busy_wait_ready_n(&self, timeout_ms: u64) -> HostResult<()> {
        let deadline = Deadline::after_ms(timeout_ms);
        loop {
            if !self.ready_n_pin_get() {
                return Ok(());
            }
            if deadline.expired() {
                return Err(-ETIMEDOUT);
            }
            std::thread::yield_now();
        }
    }
}

