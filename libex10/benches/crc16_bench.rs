use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use libex10::protocol::{CRC16_SEED, compute_crc16, compute_crc16_partial};

fn bench_crc16(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for &size in &[16usize, 256, 1021, 2048] {
        let data: Vec<u8> = (0..size).map(|i| (i & 0xff) as u8).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, d| {
            b.iter(|| black_box(compute_crc16(black_box(d))));
        });
    }
    group.finish();
}

fn bench_crc16_chunked(c: &mut Criterion) {
    let page: Vec<u8> = (0..2048).map(|i| (i * 31) as u8).collect();
    c.bench_function("crc16_info_page_in_chunks", |b| {
        b.iter(|| {
            page.chunks(256)
                .fold(CRC16_SEED, |crc, chunk| compute_crc16_partial(black_box(chunk), crc))
        });
    });
}

criterion_group!(benches, bench_crc16, bench_crc16_chunked);
criterion_main!(benches);
