// libex10-rs/libex10/src/protocol/commands/mod.rs

//! Command codes and frame builders.

/// ReadFifo and InsertFifoEvent frames.
pub mod fifo;
/// Read frame planning and response demultiplexing.
pub mod read;
/// Upload and WriteInfoPage frames.
pub mod upload;
/// Write frame splitting.
pub mod write;

pub use fifo::{READ_FIFO_CHUNK_SIZE, encode_insert_fifo_event, encode_read_fifo, read_fifo_chunks};
pub use read::{ReadBatch, demux_read, plan_read};
pub use upload::{encode_continue_upload, encode_start_upload, encode_write_info_page};
pub use write::{encode_write, encode_write_with_limit};

use crate::constants::{RESPONSE_BUFFER_SIZE, SPI_BURST_SIZE};
use crate::error::Module;
use crate::protocol::event_fifo::EventFifoPacket;
use crate::types::{CommandCode, FifoSelection, PageId, RunLocation};
use crate::{Error, Result};

/// Non-register commands. Read and Write frames are built by
/// [`plan_read`] and [`encode_write`] because one request may need several
/// frames.
#[derive(Debug, Clone)]
pub enum Command<'a> {
    /// Read `length` bytes from a fifo.
    ReadFifo {
        #[allow(missing_docs)]
        selection: FifoSelection,
        #[allow(missing_docs)]
        length: usize,
    },
    /// Open an upload and send the first chunk.
    StartUpload {
        /// Image slot on the device.
        destination: u8,
        #[allow(missing_docs)]
        chunk: &'a [u8],
    },
    /// Next chunk of an open upload.
    ContinueUpload {
        #[allow(missing_docs)]
        chunk: &'a [u8],
    },
    /// Close the upload and write the image.
    CompleteUpload,
    /// Recheck the flashed application image.
    ReValidateMainImage,
    /// Restart into `destination`.
    Reset {
        #[allow(missing_docs)]
        destination: RunLocation,
    },
    /// Echo test; the device answers with a transformed copy.
    TestTransfer {
        #[allow(missing_docs)]
        data: &'a [u8],
    },
    /// Program a flash info page.
    WriteInfoPage {
        #[allow(missing_docs)]
        page: PageId,
        #[allow(missing_docs)]
        data: &'a [u8],
        /// CRC16 of `data`.
        crc16: u16,
    },
    /// Read word-aligned device memory.
    TestRead {
        #[allow(missing_docs)]
        address: u32,
        /// Bytes, a multiple of four.
        length: usize,
    },
    /// Push a packet into the EventFifo.
    InsertFifoEvent {
        /// Raise EVENT_FIFO_ABOVE_THRESH afterwards.
        trigger_irq: bool,
        /// `None` only triggers the interrupt.
        packet: Option<EventFifoPacket<'a>>,
    },
}

impl Command<'_> {
    /// Opcode byte of the frame.
    pub fn command_code(&self) -> CommandCode {
        match self {
            Self::ReadFifo { .. } => CommandCode::ReadFifo,
            Self::StartUpload { .. } => CommandCode::StartUpload,
            Self::ContinueUpload { .. } => CommandCode::ContinueUpload,
            Self::CompleteUpload => CommandCode::CompleteUpload,
            Self::ReValidateMainImage => CommandCode::ReValidateMainImage,
            Self::Reset { .. } => CommandCode::Reset,
            Self::TestTransfer { .. } => CommandCode::TestTransfer,
            Self::WriteInfoPage { .. } => CommandCode::WriteInfoPage,
            Self::TestRead { .. } => CommandCode::TestRead,
            Self::InsertFifoEvent { .. } => CommandCode::InsertFifoEvent,
        }
    }

    /// Expected response length including the status byte, or `None` for
    /// commands the device does not answer.
    pub fn response_len(&self) -> Option<usize> {
        match self {
            Self::ReadFifo { length, .. } => Some(length + 1),
            Self::TestTransfer { data } => Some(data.len() + 1),
            Self::WriteInfoPage { .. } => Some(1),
            Self::TestRead { length, .. } => Some(length + 1),
            _ => None,
        }
    }

    /// Encode the complete wire frame, opcode first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::ReadFifo { selection, length } => {
                encode_read_fifo(*selection, *length).map(|f| f.to_vec())
            }
            Self::StartUpload { destination, chunk } => encode_start_upload(*destination, chunk),
            Self::ContinueUpload { chunk } => encode_continue_upload(chunk),
            Self::CompleteUpload | Self::ReValidateMainImage => {
                Ok(vec![self.command_code().as_u8()])
            }
            Self::Reset { destination } => {
                Ok(vec![CommandCode::Reset.as_u8(), destination.as_u8()])
            }
            Self::TestTransfer { data } => encode_test_transfer(data),
            Self::WriteInfoPage { page, data, crc16 } => encode_write_info_page(*page, data, *crc16),
            Self::TestRead { address, length } => encode_test_read(*address, *length),
            Self::InsertFifoEvent {
                trigger_irq,
                packet,
            } => encode_insert_fifo_event(*trigger_irq, packet.as_ref()),
        }
    }
}

/// TestTransfer (0x0a): loopback of arbitrary bytes.
pub fn encode_test_transfer(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() >= SPI_BURST_SIZE {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: SPI_BURST_SIZE - 1,
            actual: data.len(),
        });
    }
    let mut frame = Vec::with_capacity(1 + data.len());
    frame.push(CommandCode::TestTransfer.as_u8());
    frame.extend_from_slice(data);
    Ok(frame)
}

/// TestRead (0x0c): 32-bit address and a length in 32-bit words. Address and
/// byte length must be word aligned.
pub fn encode_test_read(address: u32, length: usize) -> Result<Vec<u8>> {
    if address % 4 != 0 || length % 4 != 0 {
        return Err(Error::BadParamAlignment {
            module: Module::Commands,
            address,
            length,
        });
    }
    if length + 1 > RESPONSE_BUFFER_SIZE {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: RESPONSE_BUFFER_SIZE - 1,
            actual: length,
        });
    }
    let words = (length / 4) as u16;
    let mut frame = Vec::with_capacity(7);
    frame.push(CommandCode::TestRead.as_u8());
    frame.extend_from_slice(&address.to_le_bytes());
    frame.extend_from_slice(&words.to_le_bytes());
    Ok(frame)
}
