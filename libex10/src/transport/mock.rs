// libex10-rs/libex10/src/transport/mock.rs

//! Simulated collaborators for tests.
//!
//! [`ScriptedHost`] replays queued responses byte for byte. [`SimulatedEx10`]
//! models enough of the device (register memory, run location, EventFifo,
//! ops, uploads, info pages) to drive the protocol layer end to end.
//! [`MockGpio`] records every line change so tests can assert ordering.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::crc16::compute_crc16;
use crate::registers::{application, bootloader, RegisterInfo};
use crate::transport::traits::{GpioInterface, HostInterface, HostResult, IrqCallback};
use crate::types::{
    CommandCode, CommandResultFields, InterruptFlags, OpId, OpsStatusFields, RemainReason,
    ResponseCode, RunLocation,
};

/// Errno returned by simulated I/O failures.
pub const EIO: i32 = 5;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
struct ScriptState {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    read_failures: VecDeque<i32>,
    write_limit: Option<usize>,
    opened: Vec<u32>,
}

/// Host interface that records sent frames and returns queued responses.
///
/// Clones share state, so a test can keep one handle while the transactor
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedHost {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes returned by a later read.
    pub fn push_response(&self, resp: Vec<u8>) {
        lock(&self.state).responses.push_back(resp);
    }

    /// Every write, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    /// Make the next read return `status` instead of data.
    pub fn fail_next_read(&self, status: i32) {
        lock(&self.state).read_failures.push_back(status);
    }

    /// Report at most `n` bytes written for every subsequent write.
    pub fn truncate_writes_to(&self, n: usize) {
        lock(&self.state).write_limit = Some(n);
    }

    /// Clock rate of every open, in order.
    pub fn opened_clocks(&self) -> Vec<u32> {
        lock(&self.state).opened.clone()
    }
}

impl HostInterface for ScriptedHost {
    fn open(&mut self, clock_hz: u32) -> HostResult<()> {
        lock(&self.state).opened.push(clock_hz);
        Ok(())
    }

    fn close(&mut self) {}

    fn read(&mut self, buf: &mut [u8]) -> HostResult<usize> {
        let mut s = lock(&self.state);
        if let Some(status) = s.read_failures.pop_front() {
            return Err(status);
        }
        match s.responses.pop_front() {
            Some(resp) => {
                let n = resp.len().min(buf.len());
                buf[..n].copy_from_slice(&resp[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, data: &[u8]) -> HostResult<usize> {
        let mut s = lock(&self.state);
        s.sent.push(data.to_vec());
        Ok(s.write_limit.map_or(data.len(), |limit| limit.min(data.len())))
    }
}

/// One image upload as seen by the simulated bootloader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadRecord {
    /// Destination byte of StartUpload.
    pub destination: u8,
    /// Concatenated chunk payloads.
    pub data: Vec<u8>,
    /// Chunks received, StartUpload included.
    pub chunks: usize,
}

const REGISTER_SPACE: usize = 0x1_0000;

#[derive(Debug)]
struct SimState {
    app_regs: Vec<u8>,
    boot_regs: Vec<u8>,
    run_location: Option<RunLocation>,
    application_image_valid: bool,
    remain_reason: RemainReason,
    event_fifo: VecDeque<u8>,
    pending_irq: InterruptFlags,
    command_result: CommandResultFields,
    ops_status: OpsStatusFields,
    op_errors: HashMap<u8, u8>,
    ops_stuck_busy: bool,
    op_log: Vec<u8>,
    upload: Option<UploadRecord>,
    completed_uploads: Vec<UploadRecord>,
    fail_upload_chunk: Option<usize>,
    info_pages: HashMap<u8, Vec<u8>>,
    memory: BTreeMap<u32, u8>,
    response: Option<Vec<u8>>,
    read_failures: VecDeque<i32>,
    fifo_read_failures: usize,
    open_failure: Option<i32>,
    opens_before_failure: usize,
    opened_clocks: Vec<u32>,
    commands: Vec<Vec<u8>>,
}

fn put(map: &mut [u8], reg: &RegisterInfo, bytes: &[u8]) {
    let start = reg.address as usize;
    let n = bytes.len().min(reg.total_len());
    map[start..start + n].copy_from_slice(&bytes[..n]);
}

impl SimState {
    fn new() -> Self {
        let mut s = Self {
            app_regs: vec![0; REGISTER_SPACE],
            boot_regs: vec![0; REGISTER_SPACE],
            run_location: Some(RunLocation::Application),
            application_image_valid: true,
            remain_reason: RemainReason::NoReason,
            event_fifo: VecDeque::new(),
            pending_irq: InterruptFlags::empty(),
            command_result: success_result(),
            ops_status: OpsStatusFields {
                op_id: OpId::Idle.as_u8(),
                busy: false,
                error: 0,
            },
            op_errors: HashMap::new(),
            ops_stuck_busy: false,
            op_log: Vec::new(),
            upload: None,
            completed_uploads: Vec::new(),
            fail_upload_chunk: None,
            info_pages: HashMap::new(),
            memory: BTreeMap::new(),
            response: None,
            read_failures: VecDeque::new(),
            fifo_read_failures: 0,
            open_failure: None,
            opens_before_failure: 0,
            opened_clocks: Vec::new(),
            commands: Vec::new(),
        };
        s.seed_identity();
        s
    }

    fn seed_identity(&mut self) {
        let mut version = [0u8; 32];
        version[..10].copy_from_slice(b"sim-app-v1");
        put(&mut self.app_regs, &application::VERSION_STRING, &version);
        put(&mut self.app_regs, &application::BUILD_NUMBER, &42u32.to_le_bytes());
        put(&mut self.app_regs, &application::GIT_HASH, &0x1234_abcdu32.to_le_bytes());
        put(&mut self.app_regs, &application::PRODUCT_SKU, &[0x10, 0x07, 0, 0, 0, 0, 0, 0]);
        put(&mut self.app_regs, &application::DEVICE_INFO, &[0, 4, 0, 1]);
        put(
            &mut self.app_regs,
            &application::OPS_CONTROL,
            &[OpId::Idle.as_u8()],
        );

        let mut boot_version = [0u8; 32];
        boot_version[..11].copy_from_slice(b"sim-boot-v1");
        put(&mut self.boot_regs, &bootloader::BOOTLOADER_VERSION_STRING, &boot_version);
        put(&mut self.boot_regs, &bootloader::BOOTLOADER_BUILD_NUMBER, &7u32.to_le_bytes());
        // rev 4 silicon, stored most significant byte first
        put(&mut self.boot_regs, &bootloader::BOOTLOADER_GIT_HASH, &[0xb3, 0xa0, 0x18, 0x18]);
    }

    fn regs(&mut self) -> &mut Vec<u8> {
        match self.run_location {
            Some(RunLocation::Bootloader) => &mut self.boot_regs,
            _ => &mut self.app_regs,
        }
    }

    fn boot(&mut self, location: RunLocation, reason: RemainReason) {
        self.run_location = Some(location);
        self.remain_reason = reason;
        self.event_fifo.clear();
        self.pending_irq = InterruptFlags::empty();
        self.command_result = success_result();
        self.ops_status = OpsStatusFields {
            op_id: OpId::Idle.as_u8(),
            busy: false,
            error: 0,
        };
        self.upload = None;
        self.response = None;
        let idle = [OpId::Idle.as_u8()];
        put(&mut self.app_regs, &application::OPS_CONTROL, &idle);
        put(&mut self.app_regs, &application::INTERRUPT_MASK, &[0; 4]);
    }

    fn fail_command(&mut self, code: ResponseCode, command: u8) {
        if self.command_result.is_success() {
            self.command_result = CommandResultFields {
                failed_result_code: code as u8,
                failed_command_code: command,
                commands_since_first_error: 0,
            };
        } else {
            self.command_result.commands_since_first_error =
                self.command_result.commands_since_first_error.saturating_add(1);
        }
    }

    fn fifo_threshold(&self) -> usize {
        let at = application::EVENT_FIFO_INT_LEVEL.address as usize;
        u16::from_le_bytes([self.app_regs[at], self.app_regs[at + 1]]) as usize
    }

    fn interrupt_status(&self) -> InterruptFlags {
        let mut flags = self.pending_irq;
        let level = self.event_fifo.len();
        if level > 0 && level >= self.fifo_threshold() {
            flags |= InterruptFlags::EVENT_FIFO_ABOVE_THRESH;
        }
        flags
    }

    /// Copy the live values of the dynamic registers into the active map.
    fn refresh(&mut self) {
        let status = self.run_location.map_or(0u16, |l| l.as_u8() as u16);
        let command_result = self.command_result.to_bytes();
        let ops_status = self.ops_status.to_bytes();
        let irq = self.interrupt_status().bits().to_le_bytes();
        let fifo_bytes = (self.event_fifo.len().min(u16::MAX as usize) as u16).to_le_bytes();
        let validity: u8 = if self.application_image_valid { 0x01 } else { 0x02 };
        let remain = self.remain_reason as u8;

        for map in [&mut self.app_regs, &mut self.boot_regs] {
            put(map, &application::COMMAND_RESULT, &command_result);
            put(map, &application::STATUS, &status.to_le_bytes());
        }
        put(&mut self.app_regs, &application::INTERRUPT_STATUS, &irq);
        put(&mut self.app_regs, &application::EVENT_FIFO_NUM_BYTES, &fifo_bytes);
        put(&mut self.app_regs, &application::OPS_STATUS, &ops_status);
        put(&mut self.boot_regs, &bootloader::IMAGE_VALIDITY, &[validity]);
        put(&mut self.boot_regs, &bootloader::REMAIN_REASON, &[remain]);
    }

    fn covers(address: usize, len: usize, reg: &RegisterInfo) -> bool {
        let start = reg.address as usize;
        address <= start && start < address + len
    }

    fn handle_read(&mut self, frame: &[u8]) {
        self.refresh();
        let mut resp = vec![ResponseCode::Success as u8];
        let mut cleared_irq = false;
        let mut cleared_result = false;
        for seg in frame[1..].chunks(4) {
            if seg.len() < 4 {
                self.response = Some(vec![ResponseCode::CommandMalformed as u8]);
                return;
            }
            let address = u16::from_le_bytes([seg[0], seg[1]]) as usize;
            let len = u16::from_le_bytes([seg[2], seg[3]]) as usize;
            let end = (address + len).min(REGISTER_SPACE);
            resp.extend_from_slice(&self.regs()[address..end]);
            cleared_irq |= Self::covers(address, len, &application::INTERRUPT_STATUS);
            cleared_result |= Self::covers(address, len, &application::COMMAND_RESULT);
        }
        if cleared_irq && self.run_location == Some(RunLocation::Application) {
            self.pending_irq = InterruptFlags::empty();
        }
        if cleared_result {
            self.command_result = success_result();
        }
        self.response = Some(resp);
    }

    fn handle_write(&mut self, frame: &[u8]) {
        let mut rest = &frame[1..];
        while rest.len() >= 4 {
            let address = u16::from_le_bytes([rest[0], rest[1]]) as usize;
            let len = u16::from_le_bytes([rest[2], rest[3]]) as usize;
            if rest.len() < 4 + len || address + len > REGISTER_SPACE {
                self.fail_command(ResponseCode::CommandMalformed, CommandCode::Write.as_u8());
                return;
            }
            let data = &rest[4..4 + len];
            self.regs()[address..address + len].copy_from_slice(data);
            if self.run_location == Some(RunLocation::Application)
                && Self::covers(address, len, &application::OPS_CONTROL)
            {
                let op = data[application::OPS_CONTROL.address as usize - address];
                self.run_op(op);
            }
            rest = &rest[4 + len..];
        }
    }

    fn run_op(&mut self, op: u8) {
        if op == OpId::Idle.as_u8() {
            self.ops_status.busy = false;
            return;
        }
        self.op_log.push(op);
        if self.ops_stuck_busy {
            self.ops_status = OpsStatusFields {
                op_id: op,
                busy: true,
                error: 0,
            };
            return;
        }
        self.ops_status = OpsStatusFields {
            op_id: op,
            busy: false,
            error: self.op_errors.get(&op).copied().unwrap_or(0),
        };
        put(&mut self.app_regs, &application::OPS_CONTROL, &[OpId::Idle.as_u8()]);
        self.pending_irq |= InterruptFlags::OP_DONE;
    }

    fn in_bootloader(&self) -> bool {
        self.run_location == Some(RunLocation::Bootloader)
    }

    fn upload_chunk(&mut self, code: u8, chunk: &[u8]) {
        if !self.in_bootloader() {
            self.fail_command(ResponseCode::CommandInvalid, code);
            return;
        }
        let Some(upload) = self.upload.as_mut() else {
            self.fail_command(ResponseCode::UploadStateInvalid, code);
            return;
        };
        let index = upload.chunks;
        upload.chunks += 1;
        upload.data.extend_from_slice(chunk);
        if self.fail_upload_chunk == Some(index) {
            self.fail_upload_chunk = None;
            self.upload = None;
            self.fail_command(ResponseCode::UploadStateInvalid, code);
        }
    }

    fn handle_command(&mut self, frame: &[u8]) {
        self.commands.push(frame.to_vec());
        self.response = None;
        let Some(&code) = frame.first() else {
            return;
        };
        if self.run_location.is_none() {
            return;
        }
        match code {
            0x01 => self.handle_read(frame),
            0x02 => self.handle_write(frame),
            0x03 => {
                let len = frame
                    .get(2..4)
                    .map_or(0, |b| u16::from_le_bytes([b[0], b[1]]) as usize);
                let mut resp = vec![ResponseCode::Success as u8];
                let take = len.min(self.event_fifo.len());
                resp.extend(self.event_fifo.drain(..take));
                if self.fifo_read_failures > 0 {
                    self.fifo_read_failures -= 1;
                    self.read_failures.push_back(-EIO);
                }
                self.response = Some(resp);
            }
            0x04 => {
                if !self.in_bootloader() {
                    self.fail_command(ResponseCode::CommandInvalid, code);
                    return;
                }
                self.upload = Some(UploadRecord {
                    destination: frame.get(1).copied().unwrap_or(0),
                    data: Vec::new(),
                    chunks: 0,
                });
                self.upload_chunk(code, frame.get(2..).unwrap_or(&[]));
            }
            0x05 => self.upload_chunk(code, &frame[1..]),
            0x06 => match self.upload.take() {
                Some(upload) if self.in_bootloader() => {
                    if upload.destination == 0 {
                        self.application_image_valid = true;
                    }
                    self.completed_uploads.push(upload);
                }
                _ => self.fail_command(ResponseCode::UploadStateInvalid, code),
            },
            0x07 => {
                if !self.in_bootloader() {
                    self.fail_command(ResponseCode::CommandInvalid, code);
                }
            }
            0x08 => {
                let wanted = frame.get(1).copied().unwrap_or(0);
                if wanted == RunLocation::Application.as_u8() && self.application_image_valid {
                    self.boot(RunLocation::Application, RemainReason::NoReason);
                } else if wanted == RunLocation::Application.as_u8() {
                    self.boot(RunLocation::Bootloader, RemainReason::ApplicationImageInvalid);
                } else {
                    self.boot(RunLocation::Bootloader, RemainReason::ResetCommand);
                }
            }
            0x0a => {
                let mut resp = vec![ResponseCode::Success as u8];
                resp.extend(
                    frame[1..]
                        .iter()
                        .enumerate()
                        .map(|(i, b)| b.wrapping_add(i as u8)),
                );
                self.response = Some(resp);
            }
            0x0b => self.handle_write_info_page(frame),
            0x0c => {
                if frame.len() < 7 {
                    self.response = Some(vec![ResponseCode::CommandMalformed as u8]);
                    return;
                }
                let address = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
                let words = u16::from_le_bytes([frame[5], frame[6]]) as u32;
                let mut resp = vec![ResponseCode::Success as u8];
                resp.extend(
                    (0..words * 4).map(|i| self.memory.get(&(address + i)).copied().unwrap_or(0)),
                );
                self.response = Some(resp);
            }
            0x0e => {
                if self.run_location != Some(RunLocation::Application) {
                    self.fail_command(ResponseCode::CommandInvalid, code);
                    return;
                }
                let trigger = frame.get(1).copied().unwrap_or(0) != 0;
                self.event_fifo.extend(frame.iter().skip(2));
                if trigger {
                    self.pending_irq |= InterruptFlags::EVENT_FIFO_ABOVE_THRESH;
                }
            }
            _ => self.fail_command(ResponseCode::CommandInvalid, code),
        }
    }

    fn handle_write_info_page(&mut self, frame: &[u8]) {
        let code = CommandCode::WriteInfoPage.as_u8();
        if !self.in_bootloader() {
            self.response = Some(vec![ResponseCode::CommandInvalid as u8]);
            self.fail_command(ResponseCode::CommandInvalid, code);
            return;
        }
        if frame.len() < 4 {
            self.response = Some(vec![ResponseCode::CommandMalformed as u8]);
            return;
        }
        let page = frame[1];
        let data = &frame[2..frame.len() - 2];
        let crc = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
        if !data.is_empty() && compute_crc16(data) != crc {
            self.response = Some(vec![ResponseCode::BadCrc as u8]);
            self.fail_command(ResponseCode::BadCrc, code);
            return;
        }
        if data.is_empty() {
            self.info_pages.remove(&page);
        } else {
            self.info_pages.insert(page, data.to_vec());
        }
        self.response = Some(vec![ResponseCode::Success as u8]);
    }
}

fn success_result() -> CommandResultFields {
    CommandResultFields {
        failed_result_code: ResponseCode::Success as u8,
        failed_command_code: 0,
        commands_since_first_error: 0,
    }
}

/// Register-level model of the device behind a [`HostInterface`].
///
/// Starts powered, running the application with a valid image. Clones share
/// the same device.
#[derive(Debug, Clone)]
pub struct SimulatedEx10 {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedEx10 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEx10 {
    /// Powered device running a valid application.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        lock(&self.state)
    }

    /// Start in the bootloader instead of the application.
    pub fn in_bootloader(self) -> Self {
        self.state()
            .boot(RunLocation::Bootloader, RemainReason::ReadyNAsserted);
        self
    }

    /// Mark the flashed application image invalid. Resets into the
    /// application then land in the bootloader.
    pub fn without_application_image(self) -> Self {
        self.state().application_image_valid = false;
        self
    }

    /// `None` while powered off.
    pub fn run_location(&self) -> Option<RunLocation> {
        self.state().run_location
    }

    /// Takes effect at the next reset.
    pub fn set_application_image_valid(&self, valid: bool) {
        self.state().application_image_valid = valid;
    }

    /// Power-on reset as seen from RESET_N release.
    pub fn power_on_reset(&self, ready_n_held: bool) {
        let mut s = self.state();
        if ready_n_held {
            s.boot(RunLocation::Bootloader, RemainReason::ReadyNAsserted);
        } else if s.application_image_valid {
            s.boot(RunLocation::Application, RemainReason::NoReason);
        } else {
            s.boot(RunLocation::Bootloader, RemainReason::ApplicationImageInvalid);
        }
    }

    /// Remove power; the device stops answering until the next reset.
    pub fn power_off(&self) {
        let mut s = self.state();
        s.boot(RunLocation::Application, RemainReason::NoReason);
        s.run_location = None;
    }

    /// Append raw bytes to the EventFifo.
    pub fn push_event_bytes(&self, bytes: &[u8]) {
        self.state().event_fifo.extend(bytes.iter().copied());
    }

    /// Bytes waiting in the EventFifo.
    pub fn event_fifo_len(&self) -> usize {
        self.state().event_fifo.len()
    }

    /// Latch interrupt status bits until the next InterruptStatus read.
    pub fn raise_interrupt(&self, flags: InterruptFlags) {
        self.state().pending_irq |= flags;
    }

    /// Report `error` in OpsStatus whenever `op` runs.
    pub fn set_op_error(&self, op: OpId, error: u8) {
        self.state().op_errors.insert(op.as_u8(), error);
    }

    /// Leave every started op busy forever.
    pub fn set_ops_stuck_busy(&self, stuck: bool) {
        self.state().ops_stuck_busy = stuck;
    }

    /// Ids of every op started, in order.
    pub fn op_log(&self) -> Vec<u8> {
        self.state().op_log.clone()
    }

    /// Reject upload chunk `index` (0 is the StartUpload chunk).
    pub fn fail_upload_chunk(&self, index: usize) {
        self.state().fail_upload_chunk = Some(index);
    }

    /// Uploads closed by CompleteUpload.
    pub fn completed_uploads(&self) -> Vec<UploadRecord> {
        self.state().completed_uploads.clone()
    }

    /// Upload started but not yet completed.
    pub fn upload_in_progress(&self) -> Option<UploadRecord> {
        self.state().upload.clone()
    }

    /// Last contents written to info page `page`.
    pub fn info_page(&self, page: u8) -> Option<Vec<u8>> {
        self.state().info_pages.get(&page).cloned()
    }

    /// Preload memory visible to TestRead.
    pub fn load_memory(&self, address: u32, bytes: &[u8]) {
        let mut s = self.state();
        for (i, b) in bytes.iter().enumerate() {
            s.memory.insert(address + i as u32, *b);
        }
    }

    /// Fail the next `count` host reads with `status`.
    pub fn fail_reads(&self, count: usize, status: i32) {
        let mut s = self.state();
        for _ in 0..count {
            s.read_failures.push_back(status);
        }
    }

    /// Fail the response read of the next `count` ReadFifo commands.
    pub fn fail_fifo_reads(&self, count: usize) {
        self.state().fifo_read_failures = count;
    }

    /// Fail the next open with `status`.
    pub fn fail_next_open(&self, status: i32) {
        self.fail_open_after(0, status);
    }

    /// Let `opens` more opens succeed, then fail one with `status`.
    pub fn fail_open_after(&self, opens: usize, status: i32) {
        let mut s = self.state();
        s.open_failure = Some(status);
        s.opens_before_failure = opens;
    }

    /// Clock rate of every successful open, in order.
    pub fn opened_clocks(&self) -> Vec<u32> {
        self.state().opened_clocks.clone()
    }

    /// Every frame written, in order.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state().commands.clone()
    }

    /// Frames written with opcode `code`.
    pub fn count_commands(&self, code: CommandCode) -> usize {
        self.state()
            .commands
            .iter()
            .filter(|f| f.first() == Some(&code.as_u8()))
            .count()
    }

    /// Forget the frames recorded so far.
    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Register bytes in the map of `location`, bypassing the wire.
    pub fn peek(&self, location: RunLocation, address: u16, len: usize) -> Vec<u8> {
        let mut s = self.state();
        s.refresh();
        let map = match location {
            RunLocation::Application => &s.app_regs,
            RunLocation::Bootloader => &s.boot_regs,
        };
        let start = address as usize;
        map[start..(start + len).min(REGISTER_SPACE)].to_vec()
    }

    /// Overwrite register bytes, bypassing the wire.
    pub fn poke(&self, location: RunLocation, address: u16, bytes: &[u8]) {
        let mut s = self.state();
        let map = match location {
            RunLocation::Application => &mut s.app_regs,
            RunLocation::Bootloader => &mut s.boot_regs,
        };
        let start = address as usize;
        map[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

impl HostInterface for SimulatedEx10 {
    fn open(&mut self, clock_hz: u32) -> HostResult<()> {
        let mut s = self.state();
        if s.opens_before_failure > 0 {
            s.opens_before_failure -= 1;
        } else if let Some(status) = s.open_failure.take() {
            return Err(status);
        }
        s.opened_clocks.push(clock_hz);
        Ok(())
    }

    fn close(&mut self) {}

    fn read(&mut self, buf: &mut [u8]) -> HostResult<usize> {
        let mut s = self.state();
        if let Some(status) = s.read_failures.pop_front() {
            s.response = None;
            return Err(status);
        }
        match s.response.take() {
            Some(resp) => {
                let n = resp.len().min(buf.len());
                buf[..n].copy_from_slice(&resp[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, data: &[u8]) -> HostResult<usize> {
        self.state().handle_command(data);
        Ok(data.len())
    }
}

/// GPIO activity recorded by [`MockGpio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GpioCall {
    Initialize {
        board_power_on: bool,
        ex10_enable: bool,
        reset: bool,
    },
    Cleanup,
    SetBoardPower(bool),
    SetEx10Enable(bool),
    RegisterIrqCallback,
    DeregisterIrqCallback,
    IrqEnable(bool),
    IrqMonitorEnable(bool),
    AssertResetN,
    DeassertResetN,
    AssertReadyN,
    ReleaseReadyN,
}

type SharedIrq = Arc<dyn Fn() + Send + Sync>;

/// Instrumented GPIO driver. Optionally wired to a [`SimulatedEx10`] so
/// power and reset lines reach the simulated device.
#[derive(Default)]
pub struct MockGpio {
    calls: Mutex<Vec<GpioCall>>,
    board_power: AtomicBool,
    ex10_enable: AtomicBool,
    ready_n_high: AtomicBool,
    ready_n_driven: AtomicBool,
    irq_disabled: AtomicBool,
    monitor_disabled: AtomicBool,
    callback: Mutex<Option<SharedIrq>>,
    delivered: AtomicUsize,
    device: Option<SimulatedEx10>,
}

impl std::fmt::Debug for MockGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGpio")
            .field("board_power", &self.get_board_power())
            .field("ex10_enable", &self.get_ex10_enable())
            .field("delivered", &self.delivered())
            .finish()
    }
}

impl MockGpio {
    /// Free-standing driver with no device behind it.
    pub fn new() -> Self {
        Self::default()
    }

    /// GPIO whose power and reset lines drive `device`.
    pub fn attached(device: SimulatedEx10) -> Self {
        Self {
            device: Some(device),
            ..Self::default()
        }
    }

    fn record(&self, call: GpioCall) {
        lock(&self.calls).push(call);
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<GpioCall> {
        lock(&self.calls).clone()
    }

    #[allow(missing_docs)]
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Index of the first recorded `call`.
    pub fn position(&self, call: GpioCall) -> Option<usize> {
        lock(&self.calls).iter().position(|c| *c == call)
    }

    /// Force the READY_N level seen by the host. `true` means busy.
    pub fn set_ready_n(&self, high: bool) {
        self.ready_n_high.store(high, Ordering::SeqCst);
    }

    /// An IRQ handler is registered.
    pub fn has_irq_callback(&self) -> bool {
        lock(&self.callback).is_some()
    }

    /// Number of IRQ edges delivered to the handler.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Simulate a falling IRQ_N edge. Returns whether the handler ran.
    pub fn fire_irq(&self) -> bool {
        if self.irq_disabled.load(Ordering::SeqCst) || self.monitor_disabled.load(Ordering::SeqCst) {
            return false;
        }
        let callback = lock(&self.callback).clone();
        match callback {
            Some(cb) => {
                cb();
                self.delivered.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl GpioInterface for MockGpio {
    fn initialize(&self, board_power_on: bool, ex10_enable: bool, reset: bool) -> HostResult<()> {
        self.record(GpioCall::Initialize {
            board_power_on,
            ex10_enable,
            reset,
        });
        self.board_power.store(board_power_on, Ordering::SeqCst);
        self.ex10_enable.store(ex10_enable, Ordering::SeqCst);
        if !board_power_on {
            if let Some(device) = &self.device {
                device.power_off();
            }
        }
        Ok(())
    }

    fn cleanup(&self) {
        self.record(GpioCall::Cleanup);
    }

    fn set_board_power(&self, on: bool) {
        self.record(GpioCall::SetBoardPower(on));
        self.board_power.store(on, Ordering::SeqCst);
        if !on {
            if let Some(device) = &self.device {
                device.power_off();
            }
        }
    }

    fn get_board_power(&self) -> bool {
        self.board_power.load(Ordering::SeqCst)
    }

    fn set_ex10_enable(&self, enable: bool) {
        self.record(GpioCall::SetEx10Enable(enable));
        self.ex10_enable.store(enable, Ordering::SeqCst);
    }

    fn get_ex10_enable(&self) -> bool {
        self.ex10_enable.load(Ordering::SeqCst)
    }

    fn register_irq_callback(&self, callback: IrqCallback) -> HostResult<()> {
        self.record(GpioCall::RegisterIrqCallback);
        *lock(&self.callback) = Some(Arc::from(callback));
        Ok(())
    }

    fn deregister_irq_callback(&self) -> HostResult<()> {
        self.record(GpioCall::DeregisterIrqCallback);
        lock(&self.callback).take();
        Ok(())
    }

    fn irq_enable(&self, enable: bool) {
        self.record(GpioCall::IrqEnable(enable));
        self.irq_disabled.store(!enable, Ordering::SeqCst);
    }

    fn irq_monitor_callback_enable(&self, enable: bool) {
        self.record(GpioCall::IrqMonitorEnable(enable));
        self.monitor_disabled.store(!enable, Ordering::SeqCst);
    }

    fn assert_reset_n(&self) {
        self.record(GpioCall::AssertResetN);
    }

    fn deassert_reset_n(&self) {
        self.record(GpioCall::DeassertResetN);
        let powered = self.get_board_power() && self.get_ex10_enable();
        if let (Some(device), true) = (&self.device, powered) {
            device.power_on_reset(self.ready_n_driven.load(Ordering::SeqCst));
        }
    }

    fn assert_ready_n(&self) {
        self.record(GpioCall::AssertReadyN);
        self.ready_n_driven.store(true, Ordering::SeqCst);
    }

    fn release_ready_n(&self) {
        self.record(GpioCall::ReleaseReadyN);
        self.ready_n_driven.store(false, Ordering::SeqCst);
    }

    fn ready_n_pin_get(&self) -> bool {
        self.ready_n_high.load(Ordering::SeqCst)
    }
}
