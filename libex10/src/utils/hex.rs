//! Hex formatting for log output of command frames and fifo contents.

use std::fmt::Write;

/// Lowercase hex with no separators: `&[0xde, 0xad]` -> `"dead"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

/// Space separated hex, truncated to `limit` bytes. Truncated output ends
/// with the number of bytes left out, e.g. `"01 02 .. (+30)"`.
pub fn hex_dump(bytes: &[u8], limit: usize) -> String {
    let shown = bytes.len().min(limit);
    let mut s = String::with_capacity(shown * 3 + 12);
    for (i, b) in bytes[..shown].iter().enumerate() {
        if i != 0 {
            s.push(' ');
        }
        let _ = write!(&mut s, "{:02x}", b);
    }
    if bytes.len() > shown {
        let _ = write!(&mut s, " .. (+{})", bytes.len() - shown);
    }
    s
}
