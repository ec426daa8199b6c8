// libex10-rs/libex10/src/protocol/crc16.rs

//! CRC16-CCITT (polynomial 0x1021, seed 0xFFFF, no reflection, no final
//! xor) used to validate flash writes.

/// Seed for the first chunk of a partial computation.
pub const CRC16_SEED: u16 = 0xffff;

const POLY: u16 = 0x1021;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC over a whole buffer.
pub fn compute_crc16(data: &[u8]) -> u16 {
    compute_crc16_partial(data, CRC16_SEED)
}

/// Continue a CRC computation over the next chunk. Pass [`CRC16_SEED`] for
/// the first chunk and the previous return value afterwards.
pub fn compute_crc16_partial(data: &[u8], crc: u16) -> u16 {
    data.iter().fold(crc, |crc, &b| {
        let idx = ((crc >> 8) ^ b as u16) as usize;
        (crc << 8) ^ TABLE[idx]
    })
}
