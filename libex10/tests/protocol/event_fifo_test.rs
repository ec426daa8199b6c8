use libex10::protocol::{EventFifoPacket, PacketIter, PacketType, parse_event_packet};
use proptest::prelude::*;

use crate::common::{custom_packet, custom_stream};

#[test]
fn stream_parses_in_order() {
    let stream = custom_stream(5);
    let tags: Vec<u8> = PacketIter::new(&stream).map(|p| p.static_data[0]).collect();
    assert_eq!(tags, vec![0, 1, 2, 3, 4]);
}

#[test]
fn corrupt_packet_stops_the_buffer() {
    let mut stream = custom_packet(1, &[]);
    let mut bad = custom_packet(2, &[]);
    bad[2] ^= 0xff; // sha
    stream.extend_from_slice(&bad);
    stream.extend_from_slice(&custom_packet(3, &[]));

    let packets: Vec<_> = PacketIter::new(&stream).collect();
    assert_eq!(packets.len(), 2);
    assert!(packets[0].is_valid);
    assert!(!packets[1].is_valid);
    assert_eq!(packets[1].packet_type, PacketType::InvalidPacket);
}

#[test]
fn truncated_header_yields_invalid() {
    let stream = custom_packet(1, &[]);
    let mut cursor: &[u8] = &stream[..5];
    let packet = parse_event_packet(&mut cursor);
    assert!(!packet.is_valid);
    assert!(cursor.is_empty());
}

proptest! {
    // Every encoded packet is word aligned, and a concatenation parses back
    // packet for packet with the dynamic payload as a prefix.
    #[test]
    fn packets_stay_word_aligned(payloads in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..40), 1..12)) {
        let mut stream = Vec::new();
        for (i, dynamic) in payloads.iter().enumerate() {
            let bytes = EventFifoPacket::new(PacketType::Custom, &[i as u8, 0, 0, 0], dynamic)
                .encode()
                .unwrap();
            prop_assert_eq!(bytes.len() % 4, 0);
            stream.extend_from_slice(&bytes);
        }

        let mut iter = PacketIter::new(&stream);
        for (i, dynamic) in payloads.iter().enumerate() {
            let packet = iter.next().unwrap();
            prop_assert!(packet.is_valid);
            prop_assert_eq!(packet.static_data[0], i as u8);
            prop_assert!(packet.dynamic_data.starts_with(dynamic));
            prop_assert!(packet.dynamic_data.len() - dynamic.len() < 4);
        }
        prop_assert!(iter.next().is_none());
    }
}
