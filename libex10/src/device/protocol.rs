// libex10-rs/libex10/src/device/protocol.rs

//! Stateful protocol core.
//!
//! [`Ex10Protocol`] owns the only path to the wire. Foreground calls and the
//! IRQ handler both go through [`Ex10Protocol::wire`], which holds the wire
//! mutex and keeps IRQ delivery masked until the guard drops, on every exit
//! path.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::constants::{
    BOOTLOADER_GIT_HASH_REV_3, BOOTLOADER_GIT_HASH_REV_4, BOOTLOADER_SPI_CLOCK_HZ,
    EVENT_FIFO_SIZE, INFO_PAGE_SIZE, MAX_IMAGE_CHUNK_SIZE, RESPONSE_BUFFER_SIZE, SPI_BURST_SIZE,
    STORED_SETTINGS_PREFIX, UPLOAD_CHUNK_SIZE,
};
use crate::device::commands::Ex10Commands;
use crate::device::config::BoardConfig;
use crate::device::fifo_pool::{FifoBufferPool, FifoEvent};
use crate::error::Module;
use crate::protocol::compute_crc16;
use crate::protocol::event_fifo::EventFifoPacket;
use crate::registers::{RegisterInfo, application, bootloader};
use crate::transport::{GpioInterface, HostInterface};
use crate::types::{
    CommandCode, CommandResultFields, DeviceInfo, FifoSelection, ImageValidity, InterruptFlags,
    OpId, OpsStatusFields, PageId, ProductSku, RemainReason, RunLocation, RxGainControl,
    VersionInfo,
};
use crate::utils::{Deadline, busy_wait_ms};
use crate::{Error, Result};

/// Called from the IRQ path with the InterruptStatus bits. Returning `true`
/// asks for the EventFifo to be drained.
pub type InterruptCallback = Arc<dyn Fn(InterruptFlags) -> bool + Send + Sync>;

/// Receives drained EventFifo buffers and errors raised inside the IRQ path.
pub type FifoDataCallback = Arc<dyn Fn(FifoEvent) + Send + Sync>;

/// Bytes left and total size of the image upload in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    /// Bytes not yet sent.
    pub remaining: usize,
    /// Image size.
    pub total: usize,
}

impl UploadProgress {
    /// An upload is open.
    pub fn is_active(&self) -> bool {
        self.total != 0
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Exclusive access to the commands layer with IRQ delivery masked.
pub struct WireGuard<'a> {
    commands: MutexGuard<'a, Ex10Commands>,
    gpio: &'a dyn GpioInterface,
}

impl Deref for WireGuard<'_> {
    type Target = Ex10Commands;

    fn deref(&self) -> &Ex10Commands {
        &self.commands
    }
}

impl DerefMut for WireGuard<'_> {
    fn deref_mut(&mut self) -> &mut Ex10Commands {
        &mut self.commands
    }
}

impl Drop for WireGuard<'_> {
    fn drop(&mut self) {
        self.gpio.irq_enable(true);
    }
}

/// Register-level access to the device shared by all higher layers.
pub struct Ex10Protocol {
    gpio: Arc<dyn GpioInterface>,
    wire: Mutex<Ex10Commands>,
    upload: Mutex<UploadProgress>,
    interrupt_cb: Mutex<Option<InterruptCallback>>,
    fifo_cb: Mutex<Option<FifoDataCallback>>,
    pool: Arc<FifoBufferPool>,
    config: BoardConfig,
}

impl fmt::Debug for Ex10Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ex10Protocol")
            .field("upload", &*lock(&self.upload))
            .field("interrupt_cb", &lock(&self.interrupt_cb).is_some())
            .field("fifo_cb", &lock(&self.fifo_cb).is_some())
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish()
    }
}

impl Ex10Protocol {
    /// Attach the board drivers. The host must already be open.
    pub fn new(
        gpio: Arc<dyn GpioInterface>,
        host: Box<dyn HostInterface>,
        pool: Arc<FifoBufferPool>,
        config: &BoardConfig,
    ) -> Self {
        let mut commands = Ex10Commands::default();
        commands.init(Arc::clone(&gpio), host);
        commands.set_ready_n_timeout_ms(config.ready_n_timeout_ms);
        Self {
            gpio,
            wire: Mutex::new(commands),
            upload: Mutex::new(UploadProgress::default()),
            interrupt_cb: Mutex::new(None),
            fifo_cb: Mutex::new(None),
            pool,
            config: *config,
        }
    }

    /// Board settings.
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// EventFifo buffer pool.
    pub fn pool(&self) -> &Arc<FifoBufferPool> {
        &self.pool
    }

    /// GPIO driver.
    pub fn gpio(&self) -> &Arc<dyn GpioInterface> {
        &self.gpio
    }

    /// Lock the wire. IRQ delivery stays off until the guard is dropped.
    /// Never hold two guards at once.
    pub fn wire(&self) -> WireGuard<'_> {
        let commands = lock(&self.wire);
        self.gpio.irq_enable(false);
        WireGuard {
            commands,
            gpio: self.gpio.as_ref(),
        }
    }

    fn ready_n_timeout(&self) -> u64 {
        self.config.ready_n_timeout_ms
    }

    // ---------------------------------------------------------------------
    // Register access
    // ---------------------------------------------------------------------

    /// Read one register.
    pub fn read(&self, reg: &RegisterInfo, buffer: &mut [u8]) -> Result<()> {
        self.read_multiple(std::slice::from_ref(reg), &mut [buffer])
    }

    /// Write one register.
    pub fn write(&self, reg: &RegisterInfo, data: &[u8]) -> Result<()> {
        self.write_multiple(std::slice::from_ref(reg), &[data])
    }

    /// Read several registers in one locked transaction. `buffers[i]`
    /// receives `regs[i]`.
    pub fn read_multiple(&self, regs: &[RegisterInfo], buffers: &mut [&mut [u8]]) -> Result<()> {
        let timeout = self.ready_n_timeout();
        self.wire().read(regs, buffers, timeout)
    }

    /// Write several registers, packing them into as few frames as fit.
    pub fn write_multiple(&self, regs: &[RegisterInfo], data: &[&[u8]]) -> Result<()> {
        let timeout = self.ready_n_timeout();
        self.wire().write(regs, data, timeout)
    }

    fn read_array<const N: usize>(&self, reg: &RegisterInfo) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read(reg, &mut buf)?;
        Ok(buf)
    }

    fn indexed(reg: &RegisterInfo, index: u16) -> Result<RegisterInfo> {
        reg.entry(index).ok_or(Error::BadParamValue {
            module: Module::Protocol,
            reason: "register index out of range",
        })
    }

    /// Read entry `index` of an indexed register.
    pub fn read_index(&self, reg: &RegisterInfo, index: u16, buffer: &mut [u8]) -> Result<()> {
        self.read(&Self::indexed(reg, index)?, buffer)
    }

    /// Write entry `index` of an indexed register.
    pub fn write_index(&self, reg: &RegisterInfo, index: u16, data: &[u8]) -> Result<()> {
        self.write(&Self::indexed(reg, index)?, data)
    }

    /// Read `buffer.len()` bytes at a raw register address.
    pub fn read_partial(&self, address: u16, buffer: &mut [u8]) -> Result<()> {
        let length = u16::try_from(buffer.len()).map_err(|_| Error::BadParamValue {
            module: Module::Protocol,
            reason: "partial read longer than the address space",
        })?;
        self.read(&RegisterInfo::raw(address, length), buffer)
    }

    /// Write `data` at a raw register address.
    pub fn write_partial(&self, address: u16, data: &[u8]) -> Result<()> {
        let length = u16::try_from(data.len()).map_err(|_| Error::BadParamValue {
            module: Module::Protocol,
            reason: "partial write longer than the address space",
        })?;
        self.write(&RegisterInfo::raw(address, length), data)
    }

    // ---------------------------------------------------------------------
    // Host link and run location
    // ---------------------------------------------------------------------

    /// Close and reopen the host interface at `clock_hz`.
    pub fn host_if_reopen(&self, clock_hz: u32) -> Result<()> {
        let mut wire = self.wire();
        let host = wire.host_mut()?;
        host.close();
        host.open(clock_hz).map_err(|status| Error::HostInterface {
            module: Module::Protocol,
            status,
        })?;
        debug!("host interface reopened at {} Hz", clock_hz);
        Ok(())
    }

    /// Decoded Status register. `Ok(None)` means the device reported a
    /// location outside the known set.
    pub fn read_running_location(&self) -> Result<Option<RunLocation>> {
        let status: [u8; 2] = self.read_array(&application::STATUS)?;
        Ok(RunLocation::from_status(u16::from_le_bytes(status)))
    }

    /// Where the firmware is running, or `None` if it cannot be determined.
    pub fn get_running_location(&self) -> Option<RunLocation> {
        match self.read_running_location() {
            Ok(location) => location,
            Err(e) => {
                debug!("run location unavailable: {}", e);
                None
            }
        }
    }

    fn require_location(&self, expected: RunLocation) -> Result<()> {
        let actual = self.read_running_location()?;
        if actual != Some(expected) {
            return Err(Error::RunLocation {
                module: Module::Protocol,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Reset into `destination` and confirm where the device landed.
    ///
    /// The link drops to the bootloader clock first and only goes back up
    /// once the application is confirmed running.
    pub fn reset(&self, destination: RunLocation) -> Result<()> {
        self.host_if_reopen(BOOTLOADER_SPI_CLOCK_HZ)?;
        self.upload_reset();
        self.wire().reset(destination)?;

        let actual = self.read_running_location()?;
        debug!("reset to {}: running in {:?}", destination, actual);
        if actual != Some(destination) {
            return Err(Error::RunLocation {
                module: Module::Protocol,
                expected: destination,
                actual,
            });
        }
        if destination == RunLocation::Application {
            self.host_if_reopen(self.config.spi_clock_hz)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Interrupts and the EventFifo
    // ---------------------------------------------------------------------

    /// Reset interrupt state and hook the IRQ line up to
    /// [`Ex10Protocol::handle_interrupt`].
    pub fn init_ex10(self: &Arc<Self>) -> Result<()> {
        self.write(&application::INTERRUPT_MASK, &[0; 4])?;
        self.set_event_fifo_threshold(crate::constants::DEFAULT_EVENT_FIFO_THRESHOLD)?;
        // InterruptStatus clears on read
        let _: [u8; 4] = self.read_array(&application::INTERRUPT_STATUS)?;

        self.unregister_fifo_data_callback();
        self.unregister_interrupt_callback()?;

        let weak = Arc::downgrade(self);
        self.pool.set_replenish_hook(move || {
            if let Some(protocol) = weak.upgrade() {
                protocol.restart_fifo_drain();
            }
        });

        let weak = Arc::downgrade(self);
        self.gpio
            .register_irq_callback(Box::new(move || {
                if let Some(protocol) = weak.upgrade() {
                    protocol.handle_interrupt();
                }
            }))
            .map_err(|status| Error::GpioInterface {
                module: Module::Protocol,
                status,
            })
    }

    /// Unhook the IRQ line, drop callbacks and detach the host interface,
    /// which is handed back to the caller.
    pub fn deinit(&self) -> Result<Option<Box<dyn HostInterface>>> {
        self.unregister_fifo_data_callback();
        if let Err(e) = self.unregister_interrupt_callback() {
            warn!("deinit: clearing interrupt mask failed: {}", e);
        }
        self.pool.clear_replenish_hook();
        self.gpio
            .deregister_irq_callback()
            .map_err(|status| Error::GpioInterface {
                module: Module::Protocol,
                status,
            })?;
        Ok(self.wire().deinit())
    }

    /// Pause or resume delivery of IRQ edges to the handler without
    /// unhooking it.
    pub fn enable_interrupt_handlers(&self, enable: bool) {
        self.gpio.irq_monitor_callback_enable(enable);
    }

    /// Install the EventFifo data consumer and enable fifo interrupts.
    pub fn register_fifo_data_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(FifoEvent) + Send + Sync + 'static,
    {
        let mut slot = lock(&self.fifo_cb);
        if slot.is_some() {
            return Err(Error::InvalidState {
                module: Module::Protocol,
                reason: "fifo data callback already registered",
            });
        }
        *slot = Some(Arc::new(callback));
        Ok(())
    }

    /// Enable the interrupts in `mask` and install `callback` for them.
    pub fn register_interrupt_callback<F>(&self, mask: InterruptFlags, callback: F) -> Result<()>
    where
        F: Fn(InterruptFlags) -> bool + Send + Sync + 'static,
    {
        if lock(&self.interrupt_cb).is_some() {
            return Err(Error::InvalidState {
                module: Module::Protocol,
                reason: "interrupt callback already registered",
            });
        }
        self.write(&application::INTERRUPT_MASK, &mask.bits().to_le_bytes())?;
        *lock(&self.interrupt_cb) = Some(Arc::new(callback));
        Ok(())
    }

    /// Remove the EventFifo data consumer.
    pub fn unregister_fifo_data_callback(&self) {
        lock(&self.fifo_cb).take();
    }

    /// Drop the interrupt callback. The mask is cleared only while the board
    /// is powered.
    pub fn unregister_interrupt_callback(&self) -> Result<()> {
        lock(&self.interrupt_cb).take();
        if self.gpio.get_board_power() {
            self.write(&application::INTERRUPT_MASK, &[0; 4])?;
        }
        Ok(())
    }

    /// EventFifo level, in bytes, that raises EVENT_FIFO_ABOVE_THRESH. Zero
    /// interrupts on any data.
    pub fn set_event_fifo_threshold(&self, threshold: usize) -> Result<()> {
        if threshold > EVENT_FIFO_SIZE {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "threshold larger than the EventFifo",
            });
        }
        let level = threshold as u16;
        self.write(&application::EVENT_FIFO_INT_LEVEL, &level.to_le_bytes())
    }

    fn deliver(&self, event: FifoEvent) {
        let callback = lock(&self.fifo_cb).clone();
        match (callback, event) {
            (Some(cb), event) => cb(event),
            (None, FifoEvent::Data(node)) => node.discard(),
            (None, FifoEvent::Error(e)) => debug!("dropping fifo error, no consumer: {}", e),
        }
    }

    /// IRQ_N service routine.
    ///
    /// Reads Status, InterruptStatus and EventFifoNumBytes in one
    /// transaction, lets the interrupt callback decide whether to drain, and
    /// hands the drained buffer (or the failure) to the fifo callback.
    pub fn handle_interrupt(&self) {
        let mut status = [0u8; 2];
        let mut irq = [0u8; 4];
        let mut num_bytes = [0u8; 2];
        let read = self.read_multiple(
            &[
                application::STATUS,
                application::INTERRUPT_STATUS,
                application::EVENT_FIFO_NUM_BYTES,
            ],
            &mut [&mut status, &mut irq, &mut num_bytes],
        );
        if let Err(e) = read {
            self.deliver(FifoEvent::Error(e));
            return;
        }

        let location = RunLocation::from_status(u16::from_le_bytes(status));
        if location != Some(RunLocation::Application) {
            return;
        }

        let flags = InterruptFlags::from_le_bytes(irq);
        let callback = lock(&self.interrupt_cb).clone();
        let drain = callback.is_some_and(|cb| cb(flags));
        let num_bytes = u16::from_le_bytes(num_bytes) as usize;
        if drain && num_bytes > 0 {
            let event = self.read_event_fifo(num_bytes);
            self.deliver(event);
        }
    }

    fn read_event_fifo(&self, num_bytes: usize) -> FifoEvent {
        let Some(mut node) = self.pool.acquire() else {
            return FifoEvent::Error(Error::NoFreeEventFifoBuffers {
                module: Module::Protocol,
            });
        };
        if num_bytes > node.capacity() {
            let capacity = node.capacity();
            node.discard();
            return FifoEvent::Error(Error::FreeEventFifoBuffersLengthMismatch {
                module: Module::Protocol,
                capacity,
                requested: num_bytes,
            });
        }

        let read = self
            .wire()
            .read_fifo(FifoSelection::EventFifo, &mut node.raw_mut()[..num_bytes]);
        match read.and_then(|()| node.set_len(num_bytes)) {
            Ok(()) => FifoEvent::Data(node),
            Err(e) => {
                node.discard();
                FifoEvent::Error(e)
            }
        }
    }

    /// Raise the fifo interrupt so data left behind while the pool was
    /// empty gets drained.
    fn restart_fifo_drain(&self) {
        if let Err(e) = self.insert_fifo_event(true, None) {
            self.deliver(FifoEvent::Error(e));
        }
    }

    /// Push `packet` into the device EventFifo, optionally raising the fifo
    /// interrupt.
    pub fn insert_fifo_event(
        &self,
        trigger_irq: bool,
        packet: Option<&EventFifoPacket<'_>>,
    ) -> Result<()> {
        self.wire().insert_fifo_event(trigger_irq, packet)
    }

    /// Read `dest.len()` bytes from a device fifo.
    pub fn read_fifo(&self, selection: FifoSelection, dest: &mut [u8]) -> Result<()> {
        self.wire().read_fifo(selection, dest)
    }

    fn event_fifo_num_bytes(&self) -> Result<usize> {
        let raw: [u8; 2] = self.read_array(&application::EVENT_FIFO_NUM_BYTES)?;
        Ok(u16::from_le_bytes(raw) as usize)
    }

    /// Wait for the IRQ path to drain the EventFifo.
    ///
    /// Fails with `NoFreeEventFifoBuffers` when data remains but no buffer
    /// is free to receive it, and with `Timeout` after the op timeout.
    pub fn wait_for_event_fifo_empty(&self) -> Result<()> {
        let deadline = Deadline::after_ms(self.config.op_timeout_ms);
        loop {
            if self.event_fifo_num_bytes()? == 0 {
                return Ok(());
            }
            if self.pool.free_count() == 0 {
                return Err(Error::NoFreeEventFifoBuffers {
                    module: Module::Protocol,
                });
            }
            if deadline.expired() {
                return Err(Error::Timeout {
                    module: Module::Protocol,
                });
            }
            busy_wait_ms(1);
        }
    }

    // ---------------------------------------------------------------------
    // Ops
    // ---------------------------------------------------------------------

    /// Start `op`.
    pub fn start_op(&self, op: OpId) -> Result<()> {
        self.write(&application::OPS_CONTROL, &[op.as_u8()])
    }

    /// Stop the running op by starting the Idle op.
    pub fn stop_op(&self) -> Result<()> {
        self.start_op(OpId::Idle)
    }

    /// The busy bit of OpsStatus.
    pub fn is_op_currently_running(&self) -> Result<bool> {
        let [op]: [u8; 1] = self.read_array(&application::OPS_CONTROL)?;
        Ok(op != OpId::Idle.as_u8())
    }

    /// OpsStatus, with a non-zero op error reported as `Error::Ops`.
    pub fn read_ops_status_reg(&self) -> Result<OpsStatusFields> {
        let status = OpsStatusFields::from_bytes(self.read_array(&application::OPS_STATUS)?);
        if status.error != 0 {
            return Err(Error::Ops {
                module: Module::Ops,
                status,
            });
        }
        Ok(status)
    }

    /// Block until the running op clears its busy bit or the op timeout passes.
    pub fn wait_op_completion(&self) -> Result<()> {
        self.wait_op_completion_with_timeout(self.config.op_timeout_ms)
    }

    /// Poll OpsStatus until the busy bit clears.
    pub fn wait_op_completion_with_timeout(&self, timeout_ms: u64) -> Result<()> {
        let deadline = Deadline::after_ms(timeout_ms);
        loop {
            let status = self.read_ops_status_reg()?;
            if !status.busy {
                return Ok(());
            }
            if deadline.expired() {
                return Err(Error::OpsTimeout {
                    module: Module::Ops,
                    status,
                });
            }
            std::thread::yield_now();
        }
    }

    // ---------------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------------

    /// Echo `data` through the device, optionally checking the transformed reply.
    pub fn test_transfer(&self, data: &[u8], verify: bool) -> Result<Vec<u8>> {
        self.wire().test_transfer(data, verify)
    }

    /// Read device memory with TestRead. Address and length must be word
    /// aligned; long reads are split into burst-sized transactions.
    pub fn test_read(&self, address: u32, dest: &mut [u8]) -> Result<()> {
        if address % 4 != 0 || dest.len() % 4 != 0 {
            return Err(Error::BadParamAlignment {
                module: Module::Protocol,
                address,
                length: dest.len(),
            });
        }
        // last byte read must still be addressable
        let last = dest.len().saturating_sub(1);
        if u32::try_from(last)
            .ok()
            .and_then(|span| address.checked_add(span))
            .is_none()
        {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "test read range exceeds address space",
            });
        }
        let max_chunk = (RESPONSE_BUFFER_SIZE - 1) / 4 * 4;
        let mut wire = self.wire();
        let mut offset = 0usize;
        for chunk in dest.chunks_mut(max_chunk) {
            wire.test_read(address + offset as u32, chunk)?;
            offset += chunk.len();
        }
        Ok(())
    }

    /// One info page worth of memory at `address`.
    pub fn read_info_page_buffer(&self, address: u32) -> Result<Vec<u8>> {
        let mut page = vec![0u8; INFO_PAGE_SIZE];
        self.test_read(address, &mut page)?;
        Ok(page)
    }

    /// Current receive gain settings.
    pub fn get_analog_rx_config(&self) -> Result<RxGainControl> {
        Ok(RxGainControl::from_le_bytes(
            self.read_array(&application::RX_GAIN_CONTROL)?,
        ))
    }

    // ---------------------------------------------------------------------
    // Flash and image upload (bootloader only)
    // ---------------------------------------------------------------------

    fn write_fref(&self, khz: u32) -> Result<()> {
        self.write(&bootloader::FREF_FREQ, &khz.to_le_bytes())
    }

    /// CommandResult after a bootloader command that has no response.
    fn check_command_result(&self) -> Result<()> {
        let result = CommandResultFields::from_bytes(self.read_array(&application::COMMAND_RESULT)?);
        if !result.is_success() {
            warn!(
                "command {:#04x} failed with result {:#04x}",
                result.failed_command_code, result.failed_result_code
            );
            return Err(Error::CommandsNoResponse(result));
        }
        Ok(())
    }

    /// Program one info page. An empty `data` erases the page.
    pub fn write_info_page(&self, page: PageId, data: &[u8], fref_khz: u32) -> Result<()> {
        self.require_location(RunLocation::Bootloader)?;
        self.write_fref(fref_khz)?;
        let crc = if data.is_empty() { 0 } else { compute_crc16(data) };
        self.wire().write_info_page(page, data, crc)
    }

    /// Clear flash info `page`.
    pub fn erase_info_page(&self, page: PageId, fref_khz: u32) -> Result<()> {
        self.write_info_page(page, &[], fref_khz)
    }

    /// Program the calibration info page.
    pub fn write_calibration_page(&self, data: &[u8]) -> Result<()> {
        self.write_info_page(PageId::Calibration, data, self.config.tcxo_freq_khz)
    }

    /// Clear the calibration info page.
    pub fn erase_calibration_page(&self) -> Result<()> {
        self.erase_info_page(PageId::Calibration, self.config.tcxo_freq_khz)
    }

    /// Program the stored settings info page.
    pub fn write_stored_settings_page(&self, data: &[u8]) -> Result<()> {
        self.write_info_page(PageId::StoredSettings, data, self.config.tcxo_freq_khz)
    }

    /// Serialize register writes the way the stored-settings page holds
    /// them: eight 0xff bytes, the Write opcode, then address/length/data
    /// triples.
    ///
    /// Returns the bytes used in `span` and the number of registers copied.
    pub fn get_write_multiple_stored_settings(
        &self,
        regs: &[RegisterInfo],
        data: &[&[u8]],
        span: &mut [u8],
    ) -> Result<(usize, usize)> {
        if regs.len() != data.len() {
            return Err(Error::BadParamLength {
                module: Module::Protocol,
                expected: regs.len(),
                actual: data.len(),
            });
        }
        let mut needed = STORED_SETTINGS_PREFIX.len() + 1;
        for (reg, bytes) in regs.iter().zip(data) {
            if bytes.len() < reg.total_len() {
                return Err(Error::BadParamLength {
                    module: Module::Protocol,
                    expected: reg.total_len(),
                    actual: bytes.len(),
                });
            }
            needed += 4 + reg.total_len();
        }
        if span.len() < needed {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "stored settings buffer too small",
            });
        }

        let prefix = STORED_SETTINGS_PREFIX.len();
        span[..prefix].copy_from_slice(&STORED_SETTINGS_PREFIX);
        span[prefix] = CommandCode::Write.as_u8();
        let mut at = prefix + 1;
        let mut copied = 0usize;
        for (reg, bytes) in regs.iter().zip(data) {
            let len = reg.total_len();
            if at + 4 + len > span.len() {
                break;
            }
            span[at..at + 2].copy_from_slice(&reg.address.to_le_bytes());
            span[at + 2..at + 4].copy_from_slice(&(len as u16).to_le_bytes());
            span[at + 4..at + 4 + len].copy_from_slice(&bytes[..len]);
            at += 4 + len;
            copied += 1;
        }
        Ok((at, copied))
    }

    fn log_chunking(image_len: usize) {
        debug!(
            "upload: {} bytes in chunks of {} (burst bound {}, command bound {})",
            image_len,
            UPLOAD_CHUNK_SIZE,
            SPI_BURST_SIZE - 2,
            MAX_IMAGE_CHUNK_SIZE - 2
        );
    }

    /// Upload a complete image to `destination` in one call.
    pub fn upload_image(&self, destination: u8, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "empty image",
            });
        }
        self.require_location(RunLocation::Bootloader)?;
        self.write_fref(self.config.tcxo_freq_khz)?;
        Self::log_chunking(image.len());

        for (index, chunk) in image.chunks(UPLOAD_CHUNK_SIZE).enumerate() {
            let sent = {
                let mut wire = self.wire();
                if index == 0 {
                    wire.start_upload(destination, chunk)
                } else {
                    wire.continue_upload(chunk)
                }
            };
            if let Err(e) = sent.and_then(|()| self.check_command_result()) {
                warn!("upload aborted at chunk {}: {}", index, e);
                self.upload_reset();
                return Err(e);
            }
        }

        self.wire().complete_upload()?;
        self.check_command_result()
    }

    /// Begin a streamed upload of `total_len` bytes with its first chunk.
    pub fn upload_start(&self, destination: u8, total_len: usize, chunk: &[u8]) -> Result<()> {
        self.require_location(RunLocation::Bootloader)?;
        self.write_fref(self.config.tcxo_freq_khz)?;
        if chunk.len() > UPLOAD_CHUNK_SIZE || chunk.len() > total_len {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "upload chunk larger than allowed",
            });
        }
        Self::log_chunking(total_len);
        *lock(&self.upload) = UploadProgress {
            remaining: total_len - chunk.len(),
            total: total_len,
        };

        let sent = self.wire().start_upload(destination, chunk);
        if let Err(e) = sent.and_then(|()| self.check_command_result()) {
            self.upload_reset();
            return Err(e);
        }
        Ok(())
    }

    /// Send the next chunk of a streamed upload. Any failure abandons the
    /// upload; a new `upload_start` is needed afterwards.
    pub fn upload_continue(&self, chunk: &[u8]) -> Result<()> {
        let abort = |e: Error| {
            self.upload_reset();
            Err(e)
        };

        match self.read_running_location() {
            Ok(Some(RunLocation::Bootloader)) => {}
            Ok(actual) => {
                return abort(Error::RunLocation {
                    module: Module::Protocol,
                    expected: RunLocation::Bootloader,
                    actual,
                });
            }
            Err(e) => return abort(e),
        }

        let progress = self.upload_progress();
        if !progress.is_active() {
            return Err(Error::BadParamValue {
                module: Module::Protocol,
                reason: "no upload in progress",
            });
        }
        if chunk.len() > UPLOAD_CHUNK_SIZE || chunk.len() > progress.remaining {
            return abort(Error::BadParamValue {
                module: Module::Protocol,
                reason: "upload chunk exceeds the remaining image",
            });
        }

        if let Err(e) = self.wire().continue_upload(chunk) {
            return abort(e);
        }
        lock(&self.upload).remaining -= chunk.len();
        if let Err(e) = self.check_command_result() {
            return abort(e);
        }
        Ok(())
    }

    /// Finish a streamed upload.
    pub fn upload_complete(&self) -> Result<()> {
        self.upload_reset();
        self.require_location(RunLocation::Bootloader)?;
        self.wire().complete_upload()?;
        self.check_command_result()
    }

    /// Forget any upload in progress.
    pub fn upload_reset(&self) {
        *lock(&self.upload) = UploadProgress::default();
    }

    /// Upload in progress, if any.
    pub fn upload_progress(&self) -> UploadProgress {
        *lock(&self.upload)
    }

    /// Ask the bootloader to re-check the application image. Failures
    /// report a zeroed validity.
    pub fn revalidate_image(&self) -> ImageValidity {
        let attempt = || -> Result<ImageValidity> {
            // clears any stale failure
            let _: [u8; 4] = self.read_array(&application::COMMAND_RESULT)?;
            self.write_fref(self.config.tcxo_freq_khz)?;
            self.wire().revalidate_main_image()?;
            Ok(self.get_image_validity())
        };
        attempt().unwrap_or_else(|e| {
            warn!("image revalidation failed: {}", e);
            ImageValidity::default()
        })
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    /// Silicon revision. The bootloader has no DeviceInfo register, so there
    /// it is inferred from the bootloader build.
    pub fn get_device_info(&self) -> Result<DeviceInfo> {
        if self.read_running_location()? == Some(RunLocation::Application) {
            return Ok(DeviceInfo::from_bytes(
                self.read_array(&application::DEVICE_INFO)?,
            ));
        }
        let hash = u32::from_be_bytes(self.read_array(&bootloader::BOOTLOADER_GIT_HASH)?);
        let info = match hash {
            BOOTLOADER_GIT_HASH_REV_4 => DeviceInfo::from_bytes([0, 4, 0, 1]),
            BOOTLOADER_GIT_HASH_REV_3 => DeviceInfo::from_bytes([3, 3, 0, 1]),
            _ => DeviceInfo::default(),
        };
        Ok(info)
    }

    /// Application version, read while the application runs.
    pub fn get_application_version(&self) -> Result<VersionInfo> {
        let mut version = [0u8; 32];
        let mut git_hash = [0u8; 4];
        let mut build = [0u8; 4];
        self.read_multiple(
            &[
                application::VERSION_STRING,
                application::GIT_HASH,
                application::BUILD_NUMBER,
            ],
            &mut [&mut version, &mut git_hash, &mut build],
        )?;
        Ok(VersionInfo::from_registers(&version, git_hash, build))
    }

    fn read_bootloader_version(&self) -> Result<VersionInfo> {
        let mut version = [0u8; 32];
        let mut git_hash = [0u8; 4];
        let mut build = [0u8; 4];
        self.read_multiple(
            &[
                bootloader::BOOTLOADER_VERSION_STRING,
                bootloader::BOOTLOADER_GIT_HASH,
                bootloader::BOOTLOADER_BUILD_NUMBER,
            ],
            &mut [&mut version, &mut git_hash, &mut build],
        )?;
        Ok(VersionInfo::from_registers(&version, git_hash, build))
    }

    /// Bootloader version. From the application this resets into the
    /// bootloader and back.
    pub fn get_bootloader_version(&self) -> Result<VersionInfo> {
        let initial = self.read_running_location()?;
        let from_application = initial == Some(RunLocation::Application);
        if from_application {
            self.reset(RunLocation::Bootloader)?;
        }
        let version = self.read_bootloader_version();
        if from_application {
            self.reset(RunLocation::Application).map_err(|e| match e {
                Error::RunLocation { .. } => e,
                other => {
                    warn!("return to application failed: {}", other);
                    Error::RunLocation {
                        module: Module::Protocol,
                        expected: RunLocation::Application,
                        actual: self.get_running_location(),
                    }
                }
            })?;
        }
        version
    }

    /// Application image validity. Always valid while the application runs;
    /// a failed read reports a zeroed value.
    pub fn get_image_validity(&self) -> ImageValidity {
        if self.get_running_location() == Some(RunLocation::Application) {
            return ImageValidity {
                image_valid_marker: true,
                image_non_valid_marker: false,
            };
        }
        match self.read_array::<1>(&bootloader::IMAGE_VALIDITY) {
            Ok([raw]) => ImageValidity::from_u8(raw),
            Err(e) => {
                debug!("image validity unavailable: {}", e);
                ImageValidity::default()
            }
        }
    }

    /// Why the device stayed in the bootloader.
    pub fn get_remain_reason(&self) -> Result<RemainReason> {
        if self.read_running_location()? == Some(RunLocation::Application) {
            return Ok(RemainReason::NoReason);
        }
        let [raw]: [u8; 1] = self.read_array(&bootloader::REMAIN_REASON)?;
        Ok(RemainReason::from_u8(raw))
    }

    /// Product SKU; `Unknown` outside the application or on a failed read.
    pub fn get_sku(&self) -> ProductSku {
        if self.get_running_location() != Some(RunLocation::Application) {
            return ProductSku::Unknown;
        }
        match self.read_array::<8>(&application::PRODUCT_SKU) {
            Ok(raw) => ProductSku::from_u16(u16::from_le_bytes([raw[0], raw[1]])),
            Err(_) => ProductSku::Unknown,
        }
    }
}
