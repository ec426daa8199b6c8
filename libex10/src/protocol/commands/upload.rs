// libex10-rs/libex10/src/protocol/commands/upload.rs
//! Bootloader flash and image commands.

use crate::constants::{BOOTLOADER_MAX_COMMAND_SIZE, MAX_IMAGE_CHUNK_SIZE};
use crate::error::Module;
use crate::types::{CommandCode, PageId};
use crate::{Error, Result};

fn length_error(limit: usize, actual: usize) -> Error {
    Error::BadParamLength {
        module: Module::Commands,
        expected: limit,
        actual,
    }
}

/// StartUpload (0x04): destination byte followed by the first image chunk.
pub fn encode_start_upload(destination: u8, chunk: &[u8]) -> Result<Vec<u8>> {
    // one byte of the chunk budget goes to the destination code
    if chunk.len() >= MAX_IMAGE_CHUNK_SIZE - 1 {
        return Err(length_error(MAX_IMAGE_CHUNK_SIZE - 2, chunk.len()));
    }
    let mut frame = Vec::with_capacity(2 + chunk.len());
    frame.push(CommandCode::StartUpload.as_u8());
    frame.push(destination);
    frame.extend_from_slice(chunk);
    Ok(frame)
}

/// ContinueUpload (0x05): the next image chunk.
pub fn encode_continue_upload(chunk: &[u8]) -> Result<Vec<u8>> {
    if chunk.len() >= MAX_IMAGE_CHUNK_SIZE {
        return Err(length_error(MAX_IMAGE_CHUNK_SIZE - 1, chunk.len()));
    }
    let mut frame = Vec::with_capacity(1 + chunk.len());
    frame.push(CommandCode::ContinueUpload.as_u8());
    frame.extend_from_slice(chunk);
    Ok(frame)
}

/// WriteInfoPage (0x0b): page id, page data and the CRC16 of the data,
/// little-endian.
pub fn encode_write_info_page(page: PageId, data: &[u8], crc16: u16) -> Result<Vec<u8>> {
    let overhead = 4;
    if overhead + data.len() > BOOTLOADER_MAX_COMMAND_SIZE {
        return Err(length_error(BOOTLOADER_MAX_COMMAND_SIZE - overhead, data.len()));
    }
    let mut frame = Vec::with_capacity(overhead + data.len());
    frame.push(CommandCode::WriteInfoPage.as_u8());
    frame.push(page as u8);
    frame.extend_from_slice(data);
    frame.extend_from_slice(&crc16.to_le_bytes());
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc16::compute_crc16;

    #[test]
    fn start_upload_bounds() {
        let ok = vec![0u8; MAX_IMAGE_CHUNK_SIZE - 2];
        let frame = encode_start_upload(0x02, &ok).unwrap();
        assert_eq!(&frame[..2], &[0x04, 0x02]);
        assert!(encode_start_upload(0x02, &[0u8; MAX_IMAGE_CHUNK_SIZE - 1]).is_err());
    }

    #[test]
    fn continue_upload_bounds() {
        assert!(encode_continue_upload(&[0u8; MAX_IMAGE_CHUNK_SIZE - 1]).is_ok());
        assert!(encode_continue_upload(&[0u8; MAX_IMAGE_CHUNK_SIZE]).is_err());
    }

    #[test]
    fn write_info_page_appends_crc() {
        let data = b"123456789";
        let crc = compute_crc16(data);
        let frame = encode_write_info_page(PageId::Calibration, data, crc).unwrap();
        assert_eq!(frame[0], 0x0b);
        assert_eq!(frame[1], 3);
        assert_eq!(&frame[frame.len() - 2..], &[0xb1, 0x29]);
    }

    #[test]
    fn write_info_page_full_page_fits() {
        let page = vec![0xffu8; 2048];
        assert_eq!(encode_write_info_page(PageId::StoredSettings, &page, 0).unwrap().len(), 2052);
        assert!(encode_write_info_page(PageId::StoredSettings, &[0u8; 2049], 0).is_err());
    }
}
