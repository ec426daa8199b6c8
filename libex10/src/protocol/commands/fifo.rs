// libex10-rs/libex10/src/protocol/commands/fifo.rs

use crate::constants::{COMMAND_BUFFER_SIZE, RESPONSE_BUFFER_SIZE};
use crate::error::Module;
use crate::protocol::event_fifo::EventFifoPacket;
use crate::types::{CommandCode, FifoSelection};
use crate::{Error, Result};

/// Largest fifo payload one ReadFifo response can carry next to its status
/// byte.
pub const READ_FIFO_CHUNK_SIZE: usize = RESPONSE_BUFFER_SIZE - 1;

/// Encode ReadFifo (0x03): selector and a 16-bit little-endian byte count.
pub fn encode_read_fifo(selection: FifoSelection, length: usize) -> Result<[u8; 4]> {
    if length > READ_FIFO_CHUNK_SIZE {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: READ_FIFO_CHUNK_SIZE,
            actual: length,
        });
    }
    let len = (length as u16).to_le_bytes();
    Ok([CommandCode::ReadFifo.as_u8(), selection as u8, len[0], len[1]])
}

/// Chunk lengths used to read `total` bytes from a fifo.
pub fn read_fifo_chunks(total: usize) -> impl Iterator<Item = usize> {
    let mut remaining = total;
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let n = remaining.min(READ_FIFO_CHUNK_SIZE);
        remaining -= n;
        Some(n)
    })
}

/// Encode InsertFifoEvent (0x0e). Without a packet the command only raises
/// the fifo interrupt when `trigger_irq` is set.
pub fn encode_insert_fifo_event(
    trigger_irq: bool,
    packet: Option<&EventFifoPacket<'_>>,
) -> Result<Vec<u8>> {
    let mut frame = vec![CommandCode::InsertFifoEvent.as_u8(), trigger_irq as u8];
    if let Some(packet) = packet {
        let encoded = packet.encode()?;
        if frame.len() + encoded.len() > COMMAND_BUFFER_SIZE {
            return Err(Error::BadParamLength {
                module: Module::Commands,
                expected: COMMAND_BUFFER_SIZE - frame.len(),
                actual: encoded.len(),
            });
        }
        frame.extend_from_slice(&encoded);
    }
    Ok(frame)
}
