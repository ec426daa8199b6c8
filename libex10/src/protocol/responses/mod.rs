// libex10-rs/libex10/src/protocol/responses/mod.rs

//! Response decoding. Every response that exists starts with a status byte;
//! the decoders check it and hand back the payload that follows.

use log::warn;

use crate::protocol::parser::expect_success;
use crate::types::{CommandCode, HostResultCode, ResponseCode};
use crate::utils::hex_dump;
use crate::{Error, Result};

/// Payload of a Read response.
pub fn decode_read(response: &[u8]) -> Result<&[u8]> {
    expect_success(response, CommandCode::Read.as_u8())?;
    Ok(&response[1..])
}

/// Payload of a ReadFifo response.
pub fn decode_read_fifo(response: &[u8]) -> Result<&[u8]> {
    expect_success(response, CommandCode::ReadFifo.as_u8())?;
    Ok(&response[1..])
}

/// Payload of a TestRead response.
pub fn decode_test_read(response: &[u8]) -> Result<&[u8]> {
    expect_success(response, CommandCode::TestRead.as_u8())?;
    Ok(&response[1..])
}

/// WriteInfoPage answers with a lone status byte.
pub fn decode_write_info_page(response: &[u8]) -> Result<()> {
    expect_success(response, CommandCode::WriteInfoPage.as_u8())
}

/// Decode a TestTransfer response. The device echoes byte `i` as
/// `sent[i] + i`; with `verify` set any other value is an error.
pub fn decode_test_transfer<'a>(sent: &[u8], response: &'a [u8], verify: bool) -> Result<&'a [u8]> {
    expect_success(response, CommandCode::TestTransfer.as_u8())?;
    let echoed = &response[1..];
    if verify {
        for (i, (&s, &r)) in sent.iter().zip(echoed.iter()).enumerate() {
            let expected = s.wrapping_add(i as u8);
            if r != expected {
                warn!(
                    "test transfer mismatch at {}: received {:#04x}, expected {:#04x} ({})",
                    i,
                    r,
                    expected,
                    hex_dump(echoed, 32)
                );
                return Err(Error::CommandsWithResponse {
                    result_code: ResponseCode::Success as u8,
                    command_code: CommandCode::TestTransfer.as_u8(),
                    host_result: HostResultCode::TestTransferVerifyError,
                });
            }
        }
    }
    Ok(echoed)
}
