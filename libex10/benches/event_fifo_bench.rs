use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use libex10::protocol::{EventFifoPacket, PacketIter, PacketType};

fn stream(packets: usize) -> Vec<u8> {
    let epc = [0x30u8, 0x00, 0xe2, 0x80, 0x11, 0x05, 0x20, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc];
    (0..packets)
        .flat_map(|i| {
            EventFifoPacket::new(PacketType::Custom, &[i as u8, 0, 0, 0], &epc)
                .encode()
                .unwrap()
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_fifo_parse");
    for &count in &[1usize, 32, 128] {
        let bytes = stream(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| PacketIter::new(black_box(bytes)).filter(|p| p.is_valid).count());
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let dynamic = [0u8; 24];
    c.bench_function("event_fifo_encode", |b| {
        b.iter(|| {
            EventFifoPacket::new(PacketType::Custom, black_box(&[1, 2, 3, 4]), black_box(&dynamic))
                .encode()
        });
    });
}

criterion_group!(benches, bench_parse, bench_encode);
criterion_main!(benches);
