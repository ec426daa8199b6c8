// libex10-rs/libex10/src/protocol/commands/write.rs

use super::read::{SEGMENT_DESCRIPTOR_SIZE, check_register};
use crate::constants::COMMAND_BUFFER_SIZE;
use crate::error::Module;
use crate::registers::RegisterInfo;
use crate::types::CommandCode;
use crate::{Error, Result};

// A new segment is only started when at least this much payload still fits.
const MIN_SEGMENT_PAYLOAD: usize = 16;

/// Encode register writes as one or more Write frames.
///
/// Each frame carries `(address, length, data)` triples. A register that does
/// not fit in the current frame is continued in the next one. Frames are
/// never empty, so an empty register list produces no frames.
pub fn encode_write(regs: &[RegisterInfo], data: &[&[u8]]) -> Result<Vec<Vec<u8>>> {
    encode_write_with_limit(regs, data, COMMAND_BUFFER_SIZE)
}

/// Same as [`encode_write`] but with an explicit frame size limit. The
/// limit must leave room for at least one segment descriptor and the
/// minimum segment payload after the command byte.
pub fn encode_write_with_limit(
    regs: &[RegisterInfo],
    data: &[&[u8]],
    frame_limit: usize,
) -> Result<Vec<Vec<u8>>> {
    if regs.len() != data.len() {
        return Err(Error::BadParamLength {
            module: Module::Commands,
            expected: regs.len(),
            actual: data.len(),
        });
    }

    let mut frames = Vec::new();
    let mut frame = vec![CommandCode::Write.as_u8()];

    for (reg, bytes) in regs.iter().zip(data.iter()) {
        check_register(reg)?;
        let total = reg.total_len();
        if bytes.len() < total {
            return Err(Error::BadParamLength {
                module: Module::Commands,
                expected: total,
                actual: bytes.len(),
            });
        }

        let mut offset = 0usize;
        while offset < total {
            if frame.len() + SEGMENT_DESCRIPTOR_SIZE + MIN_SEGMENT_PAYLOAD <= frame_limit {
                let avail = frame_limit - (frame.len() + SEGMENT_DESCRIPTOR_SIZE);
                let len = avail.min(total - offset);
                let address = reg.address as usize + offset;
                frame.extend_from_slice(&(address as u16).to_le_bytes());
                frame.extend_from_slice(&(len as u16).to_le_bytes());
                frame.extend_from_slice(&bytes[offset..offset + len]);
                offset += len;
            } else if frame.len() == 1 {
                return Err(Error::BadParamValue {
                    module: Module::Commands,
                    reason: "write frame limit too small for one segment",
                });
            } else {
                frames.push(std::mem::replace(
                    &mut frame,
                    vec![CommandCode::Write.as_u8()],
                ));
            }
        }
    }

    if frame.len() > 1 {
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::application;

    #[test]
    fn encode_two_registers_in_one_frame() {
        let regs = [application::ANALOG_ENABLE, application::OPS_CONTROL];
        let frames = encode_write(&regs, &[&[1, 0, 0, 0], &[0xa7]]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0],
            vec![
                0x02, 0x00, 0x07, 0x04, 0x00, 1, 0, 0, 0, 0x00, 0x03, 0x01, 0x00, 0xa7
            ]
        );
    }

    #[test]
    fn large_write_is_split() {
        let reg = RegisterInfo::raw(0x2000, 1500);
        let data = vec![0x5a; 1500];
        let frames = encode_write(&[reg], &[&data]).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() <= COMMAND_BUFFER_SIZE));
        let first_len = u16::from_le_bytes([frames[0][3], frames[0][4]]) as usize;
        assert_eq!(first_len, COMMAND_BUFFER_SIZE - 5);
        let second_addr = u16::from_le_bytes([frames[1][1], frames[1][2]]) as usize;
        assert_eq!(second_addr, 0x2000 + first_len);
    }

    #[test]
    fn empty_list_produces_no_frames() {
        assert!(encode_write(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn frame_limit_below_one_segment_rejected() {
        let reg = RegisterInfo::raw(0x10, 4);
        let smallest = 1 + SEGMENT_DESCRIPTOR_SIZE + MIN_SEGMENT_PAYLOAD;
        assert!(matches!(
            encode_write_with_limit(&[reg], &[&[1, 2, 3, 4]], smallest - 1),
            Err(Error::BadParamValue {
                module: Module::Commands,
                ..
            })
        ));
        assert!(matches!(
            encode_write_with_limit(&[reg], &[&[1, 2, 3, 4]], 0),
            Err(Error::BadParamValue { .. })
        ));
        let frames = encode_write_with_limit(&[reg], &[&[1, 2, 3, 4]], smallest).unwrap();
        assert_eq!(frames, vec![vec![0x02, 0x10, 0x00, 0x04, 0x00, 1, 2, 3, 4]]);
    }

    #[test]
    fn short_data_rejected() {
        let regs = [application::INTERRUPT_MASK];
        assert!(matches!(
            encode_write(&regs, &[&[0x00]]),
            Err(Error::BadParamLength { expected: 4, actual: 1, .. })
        ));
    }
}
