use libex10::registers::RegisterInfo;
use libex10::test_support::{fast_config, protocol_rig};
use libex10::transport::SimulatedEx10;
use libex10::types::{CommandCode, RunLocation};
use proptest::prelude::*;

const SCRATCH_BASE: u16 = 0x6000;

/// Scratch registers of assorted sizes, each filled with a distinct pattern.
fn scratch(sim: &SimulatedEx10, lengths: &[u16]) -> Vec<(RegisterInfo, Vec<u8>)> {
    let mut address = SCRATCH_BASE;
    lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| {
            let reg = RegisterInfo::raw(address, len);
            let bytes: Vec<u8> = (0..len).map(|b| (b as u8).wrapping_mul(3) ^ i as u8).collect();
            sim.poke(RunLocation::Application, address, &bytes);
            address += len;
            (reg, bytes)
        })
        .collect()
}

#[test]
fn oversized_read_is_split_across_frames() {
    let sim = SimulatedEx10::new();
    let rig = protocol_rig(sim.clone(), &fast_config()).unwrap();
    let regs = scratch(&sim, &[900, 900]);
    sim.clear_commands();

    let mut a = vec![0u8; 900];
    let mut b = vec![0u8; 900];
    let descriptors: Vec<RegisterInfo> = regs.iter().map(|(r, _)| *r).collect();
    rig.protocol
        .read_multiple(&descriptors, &mut [&mut a, &mut b])
        .unwrap();
    assert_eq!(a, regs[0].1);
    assert_eq!(b, regs[1].1);
    assert!(sim.count_commands(CommandCode::Read) >= 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Whatever order registers are requested in, each buffer receives the
    // bytes of the register at the same position.
    #[test]
    fn read_multiple_keeps_register_order(
        lengths in proptest::collection::vec(1u16..400, 1..8),
        seed in any::<u64>(),
    ) {
        let sim = SimulatedEx10::new();
        let rig = protocol_rig(sim.clone(), &fast_config()).unwrap();
        let mut regs = scratch(&sim, &lengths);

        // deterministic shuffle from the seed
        let mut state = seed | 1;
        for i in (1..regs.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            regs.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let descriptors: Vec<RegisterInfo> = regs.iter().map(|(r, _)| *r).collect();
        let mut storage: Vec<Vec<u8>> = regs.iter().map(|(_, b)| vec![0u8; b.len()]).collect();
        let mut buffers: Vec<&mut [u8]> = storage.iter_mut().map(|v| v.as_mut_slice()).collect();
        rig.protocol.read_multiple(&descriptors, &mut buffers).unwrap();

        for ((_, expected), got) in regs.iter().zip(storage.iter()) {
            prop_assert_eq!(expected, got);
        }
    }
}
