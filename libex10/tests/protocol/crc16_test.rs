use libex10::protocol::{CRC16_SEED, compute_crc16, compute_crc16_partial};
use proptest::prelude::*;

#[test]
fn ccitt_check_value() {
    assert_eq!(compute_crc16(b"123456789"), 0x29b1);
}

proptest! {
    // Splitting the input anywhere must not change the result.
    #[test]
    fn chunked_crc_matches_whole(data in proptest::collection::vec(any::<u8>(), 0..512),
                                 cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6)) {
        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(data.len() + 1)).collect();
        points.push(0);
        points.push(data.len());
        points.sort_unstable();

        let chunked = points
            .windows(2)
            .fold(CRC16_SEED, |crc, w| compute_crc16_partial(&data[w[0]..w[1]], crc));
        prop_assert_eq!(chunked, compute_crc16(&data));
    }
}
