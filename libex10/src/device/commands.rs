// libex10-rs/libex10/src/device/commands.rs

//! Typed command execution over a [`CommandTransactor`].
//!
//! Frame layouts live in [`crate::protocol::commands`]; this layer sends
//! them, sizes the response buffers and decodes what comes back.

use std::sync::Arc;

use log::debug;

use crate::constants::RESPONSE_BUFFER_SIZE;
use crate::protocol::commands::{Command, demux_read, encode_write, plan_read, read_fifo_chunks};
use crate::protocol::event_fifo::EventFifoPacket;
use crate::protocol::responses::{
    decode_read, decode_read_fifo, decode_test_read, decode_test_transfer, decode_write_info_page,
};
use crate::protocol::CommandTransactor;
use crate::registers::RegisterInfo;
use crate::transport::{GpioInterface, HostInterface};
use crate::types::{FifoSelection, PageId, RunLocation};
use crate::utils::NOMINAL_READY_N_TIMEOUT_MS;
use crate::Result;

/// Typed commands over a [`CommandTransactor`], one call per command.
#[derive(Debug)]
pub struct Ex10Commands {
    transactor: CommandTransactor,
    ready_n_timeout_ms: u64,
}

impl Default for Ex10Commands {
    fn default() -> Self {
        Self::new(CommandTransactor::new())
    }
}

impl Ex10Commands {
    /// Wrap `transactor` with the nominal READY_N budget.
    pub fn new(transactor: CommandTransactor) -> Self {
        Self {
            transactor,
            ready_n_timeout_ms: NOMINAL_READY_N_TIMEOUT_MS,
        }
    }

    /// Attach drivers to the underlying transactor.
    pub fn init(&mut self, gpio: Arc<dyn GpioInterface>, host: Box<dyn HostInterface>) {
        self.transactor.init(gpio, host);
    }

    /// Detach the drivers, handing the host interface back.
    pub fn deinit(&mut self) -> Option<Box<dyn HostInterface>> {
        self.transactor.deinit()
    }

    /// READY_N budget for commands that take no explicit timeout.
    pub fn set_ready_n_timeout_ms(&mut self, timeout_ms: u64) {
        self.ready_n_timeout_ms = timeout_ms;
    }

    /// Underlying transactor.
    pub fn transactor(&self) -> &CommandTransactor {
        &self.transactor
    }

    /// Direct access to the host interface.
    pub fn host_mut(&mut self) -> Result<&mut dyn HostInterface> {
        self.transactor.host_mut()
    }

    fn execute(&mut self, command: &Command<'_>) -> Result<Vec<u8>> {
        let frame = command.encode()?;
        let timeout = self.ready_n_timeout_ms;
        match command.response_len() {
            Some(len) => {
                let mut response = vec![0u8; len];
                self.transactor.send_and_receive(&frame, &mut response, timeout)?;
                Ok(response)
            }
            None => {
                self.transactor.send(&frame, timeout)?;
                Ok(Vec::new())
            }
        }
    }

    /// Read every register in `regs` into the matching entry of `buffers`.
    ///
    /// As many registers as fit share one Read frame; a register too large
    /// for the remaining response space is split across frames.
    pub fn read(
        &mut self,
        regs: &[RegisterInfo],
        buffers: &mut [&mut [u8]],
        ready_n_timeout_ms: u64,
    ) -> Result<()> {
        let batches = plan_read(regs)?;
        let total: usize = batches.iter().map(|b| b.payload_len()).sum();
        let mut payload = Vec::with_capacity(total);
        let mut response = [0u8; RESPONSE_BUFFER_SIZE];
        for batch in &batches {
            let resp = &mut response[..batch.response_len];
            self.transactor
                .send_and_receive(&batch.frame, resp, ready_n_timeout_ms)?;
            payload.extend_from_slice(decode_read(resp)?);
        }
        demux_read(&payload, regs, buffers)
    }

    /// Write `data[i]` to `regs[i]`. The device does not answer Write
    /// commands; failures surface in the CommandResult register.
    pub fn write(
        &mut self,
        regs: &[RegisterInfo],
        data: &[&[u8]],
        ready_n_timeout_ms: u64,
    ) -> Result<()> {
        for frame in encode_write(regs, data)? {
            self.transactor.send(&frame, ready_n_timeout_ms)?;
        }
        Ok(())
    }

    /// Fill `dest` from the selected fifo using as many ReadFifo commands
    /// as needed.
    pub fn read_fifo(&mut self, selection: FifoSelection, dest: &mut [u8]) -> Result<()> {
        let mut offset = 0usize;
        for chunk in read_fifo_chunks(dest.len()) {
            let response = self.execute(&Command::ReadFifo {
                selection,
                length: chunk,
            })?;
            let payload = decode_read_fifo(&response)?;
            dest[offset..offset + chunk].copy_from_slice(payload);
            offset += chunk;
        }
        Ok(())
    }

    /// Open an upload into image slot `destination`.
    pub fn start_upload(&mut self, destination: u8, chunk: &[u8]) -> Result<()> {
        self.execute(&Command::StartUpload { destination, chunk })
            .map(drop)
    }

    /// Send the next upload chunk.
    pub fn continue_upload(&mut self, chunk: &[u8]) -> Result<()> {
        self.execute(&Command::ContinueUpload { chunk }).map(drop)
    }

    /// Close the upload and write the image.
    pub fn complete_upload(&mut self) -> Result<()> {
        self.execute(&Command::CompleteUpload).map(drop)
    }

    /// Ask the bootloader to recheck the application image.
    pub fn revalidate_main_image(&mut self) -> Result<()> {
        self.execute(&Command::ReValidateMainImage).map(drop)
    }

    /// Fire-and-forget; the caller confirms the landing location.
    pub fn reset(&mut self, destination: RunLocation) -> Result<()> {
        debug!("reset command: destination {}", destination);
        self.execute(&Command::Reset { destination }).map(drop)
    }

    /// Program flash info `page`, guarded by `crc16`.
    pub fn write_info_page(&mut self, page: PageId, data: &[u8], crc16: u16) -> Result<()> {
        let response = self.execute(&Command::WriteInfoPage { page, data, crc16 })?;
        decode_write_info_page(&response)
    }

    /// Loop `data` through the device and return what came back.
    pub fn test_transfer(&mut self, data: &[u8], verify: bool) -> Result<Vec<u8>> {
        let response = self.execute(&Command::TestTransfer { data })?;
        decode_test_transfer(data, &response, verify).map(<[u8]>::to_vec)
    }

    /// One TestRead transaction of `dest.len()` bytes.
    pub fn test_read(&mut self, address: u32, dest: &mut [u8]) -> Result<()> {
        let response = self.execute(&Command::TestRead {
            address,
            length: dest.len(),
        })?;
        dest.copy_from_slice(decode_test_read(&response)?);
        Ok(())
    }

    /// Push `packet` (or nothing) into the EventFifo.
    pub fn insert_fifo_event(
        &mut self,
        trigger_irq: bool,
        packet: Option<&EventFifoPacket<'_>>,
    ) -> Result<()> {
        self.execute(&Command::InsertFifoEvent {
            trigger_irq,
            packet: packet.cloned(),
        })
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::application;
    use crate::transport::mock::{MockGpio, ScriptedHost, SimulatedEx10};
    use crate::Error;

    fn scripted() -> (Ex10Commands, ScriptedHost) {
        let host = ScriptedHost::new();
        let mut cmds = Ex10Commands::default();
        cmds.init(Arc::new(MockGpio::new()), Box::new(host.clone()));
        (cmds, host)
    }

    fn simulated() -> (Ex10Commands, SimulatedEx10) {
        let sim = SimulatedEx10::new();
        let mut cmds = Ex10Commands::default();
        cmds.init(Arc::new(MockGpio::new()), Box::new(sim.clone()));
        (cmds, sim)
    }

    #[test]
    fn read_demultiplexes_in_order() {
        let (mut cmds, host) = scripted();
        host.push_response(vec![0xa5, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00]);
        let mut status = [0u8; 2];
        let mut irq = [0u8; 4];
        let mut num = [0u8; 2];
        cmds.read(
            &[
                application::STATUS,
                application::INTERRUPT_STATUS,
                application::EVENT_FIFO_NUM_BYTES,
            ],
            &mut [&mut status, &mut irq, &mut num],
            100,
        )
        .unwrap();
        assert_eq!(status, [0x02, 0x00]);
        assert_eq!(irq, [0x01, 0, 0, 0]);
        assert_eq!(num, [0x10, 0x00]);
    }

    #[test]
    fn read_status_failure_is_reported() {
        let (mut cmds, host) = scripted();
        host.push_response(vec![0x01, 0, 0]);
        let mut status = [0u8; 2];
        let err = cmds
            .read(&[application::STATUS], &mut [&mut status], 100)
            .unwrap_err();
        assert!(matches!(err, Error::CommandsWithResponse { result_code: 0x01, .. }));
    }

    #[test]
    fn write_then_read_against_simulator() {
        let (mut cmds, _sim) = simulated();
        cmds.write(&[application::RX_GAIN_CONTROL], &[&[0xcc, 0x44]], 100)
            .unwrap();
        let mut out = [0u8; 2];
        cmds.read(&[application::RX_GAIN_CONTROL], &mut [&mut out], 100)
            .unwrap();
        assert_eq!(out, [0xcc, 0x44]);
    }

    #[test]
    fn read_fifo_spans_several_commands() {
        let (mut cmds, sim) = simulated();
        let bytes: Vec<u8> = (0..2100u32).map(|i| i as u8).collect();
        sim.push_event_bytes(&bytes);
        let mut dest = vec![0u8; bytes.len()];
        cmds.read_fifo(FifoSelection::EventFifo, &mut dest).unwrap();
        assert_eq!(dest, bytes);
        assert_eq!(sim.count_commands(crate::types::CommandCode::ReadFifo), 3);
    }

    #[test]
    fn read_fifo_short_response() {
        let (mut cmds, sim) = simulated();
        sim.push_event_bytes(&[1, 2, 3, 4]);
        let mut dest = [0u8; 8];
        match cmds.read_fifo(FifoSelection::EventFifo, &mut dest) {
            Err(Error::CommandsWithResponse { host_result, .. }) => {
                assert_eq!(host_result, crate::types::HostResultCode::ReceivedLengthIncorrect)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_transfer_verifies_echo() {
        let (mut cmds, _sim) = simulated();
        let echoed = cmds.test_transfer(&[0x10, 0x20, 0x30], true).unwrap();
        assert_eq!(echoed, vec![0x10, 0x21, 0x32]);
    }

    #[test]
    fn test_read_returns_memory() {
        let (mut cmds, sim) = simulated();
        sim.load_memory(0x2000, &[9, 8, 7, 6, 5, 4, 3, 2]);
        let mut dest = [0u8; 8];
        cmds.test_read(0x2000, &mut dest).unwrap();
        assert_eq!(dest, [9, 8, 7, 6, 5, 4, 3, 2]);
    }

    #[test]
    fn reset_sends_no_response_read() {
        let (mut cmds, host) = scripted();
        cmds.reset(RunLocation::Bootloader).unwrap();
        assert_eq!(host.sent(), vec![vec![0x08, 0x01]]);
    }
}
