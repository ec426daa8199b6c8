// libex10-rs/libex10/src/protocol/commands/read.rs

use crate::constants::{COMMAND_BUFFER_SIZE, RESPONSE_BUFFER_SIZE};
use crate::error::Module;
use crate::registers::RegisterInfo;
use crate::types::CommandCode;
use crate::{Error, Result};

/// Bytes of one address/length descriptor in a Read or Write frame.
pub const SEGMENT_DESCRIPTOR_SIZE: usize = 4;

/// One Read command frame together with the response length it produces
/// (status byte included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBatch {
    /// Encoded Read frame.
    pub frame: Vec<u8>,
    /// Response bytes including the status byte.
    pub response_len: usize,
}

impl ReadBatch {
    /// Payload bytes carried by the response, excluding the status byte.
    pub fn payload_len(&self) -> usize {
        self.response_len - 1
    }
}

/// Reject descriptors that would run past the end of the 16-bit address
/// space.
pub fn check_register(reg: &RegisterInfo) -> Result<()> {
    if reg.address as usize + reg.total_len() > u16::MAX as usize {
        return Err(Error::BadParamValue {
            module: Module::Commands,
            reason: "register range exceeds address space",
        });
    }
    Ok(())
}

/// Split a list of register reads into as few Read frames as fit the
/// command and response buffers.
///
/// Concatenating the response payloads of all batches yields every
/// register's bytes in list order, so callers demultiplex by walking the
/// register list with a running offset.
pub fn plan_read(regs: &[RegisterInfo]) -> Result<Vec<ReadBatch>> {
    let mut batches = Vec::new();
    let mut frame = vec![CommandCode::Read.as_u8()];
    let mut response_len = 1usize;
    let mut index = 0usize;
    let mut segment_offset = 0usize;

    while index < regs.len() {
        let reg = &regs[index];
        check_register(reg)?;

        let segment_len = reg.total_len();
        let remaining = segment_len - segment_offset;
        let avail = RESPONSE_BUFFER_SIZE - response_len;
        let read_len = remaining.min(avail);
        response_len += read_len;

        let address = reg.address as usize + segment_offset;
        frame.extend_from_slice(&(address as u16).to_le_bytes());
        frame.extend_from_slice(&(read_len as u16).to_le_bytes());

        segment_offset += read_len;
        if segment_offset >= segment_len {
            segment_offset = 0;
            index += 1;
        }

        let done = index >= regs.len();
        let command_full = frame.len() + SEGMENT_DESCRIPTOR_SIZE > COMMAND_BUFFER_SIZE;
        let response_full = response_len >= RESPONSE_BUFFER_SIZE;
        if done || command_full || response_full {
            batches.push(ReadBatch {
                frame: std::mem::replace(&mut frame, vec![CommandCode::Read.as_u8()]),
                response_len,
            });
            response_len = 1;
        }
    }

    Ok(batches)
}

/// Copy a concatenated read payload into the destination buffers, one per
/// register, in list order.
pub fn demux_read(payload: &[u8], regs: &[RegisterInfo], buffers: &mut [&mut [u8]]) -> Result<()> {
    if regs.len() != buffers.len() {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: regs.len(),
            actual: buffers.len(),
        });
    }
    let mut offset = 0usize;
    for (reg, buf) in regs.iter().zip(buffers.iter_mut()) {
        let len = reg.total_len();
        if buf.len() < len {
            return Err(Error::BadParamLength {
                module: Module::Commands,
                expected: len,
                actual: buf.len(),
            });
        }
        let src = crate::protocol::parser::slice_at(payload, offset, len)?;
        buf[..len].copy_from_slice(src);
        offset += len;
    }
    Ok(())
}
