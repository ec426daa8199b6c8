// libex10-rs/libex10/src/protocol/parser.rs

//! Bounds-checked little-endian readers for response buffers.

use crate::error::Module;
use crate::types::{HostResultCode, ResponseCode};
use crate::{Error, Result};

/// Ensure the slice has at least `min` bytes.
pub fn ensure_len(data: &[u8], min: usize) -> Result<()> {
    if data.len() < min {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: min,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Read a little-endian u16 at given index, with bounds checking.
pub fn le_u16_at(data: &[u8], idx: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(array_at(data, idx)?))
}

/// Read a little-endian u32 at given index, with bounds checking.
pub fn le_u32_at(data: &[u8], idx: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(array_at(data, idx)?))
}

/// Copy `N` bytes starting at `idx` into an array.
pub fn array_at<const N: usize>(data: &[u8], idx: usize) -> Result<[u8; N]> {
    let s = slice_at(data, idx, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(s);
    Ok(out)
}

/// Return a subslice with bounds checking.
pub fn slice_at(data: &[u8], idx: usize, len: usize) -> Result<&[u8]> {
    ensure_len(data, idx + len)?;
    Ok(&data[idx..idx + len])
}

/// Read a single byte at `idx` with bounds checking.
pub fn byte_at(data: &[u8], idx: usize) -> Result<u8> {
    ensure_len(data, idx + 1)?;
    Ok(data[idx])
}

/// Check the leading response status byte of a command that carries a
/// response. Anything other than `Success` is reported as a device response
/// error tagged with the command that produced it.
pub fn expect_success(response: &[u8], command_code: u8) -> Result<()> {
    let status = byte_at(response, 0)?;
    if status != ResponseCode::Success as u8 {
        return Err(Error::CommandsWithResponse {
            result_code: status,
            command_code,
            host_result: HostResultCode::Success,
        });
    }
    Ok(())
}
