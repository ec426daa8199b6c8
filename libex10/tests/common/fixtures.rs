// fixtures.rs: sample EventFifo traffic and images

use libex10::protocol::{EventFifoPacket, PacketType};

/// Encoded Custom packet whose first static byte is `tag`.
pub fn custom_packet(tag: u8, dynamic: &[u8]) -> Vec<u8> {
    EventFifoPacket::new(PacketType::Custom, &[tag, 0, 0, 0], dynamic)
        .encode()
        .unwrap()
}

/// Several Custom packets back to back, tags `0..count`.
pub fn custom_stream(count: u8) -> Vec<u8> {
    (0..count).flat_map(|tag| custom_packet(tag, &[])).collect()
}

/// Deterministic image bytes.
pub fn sample_image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}
