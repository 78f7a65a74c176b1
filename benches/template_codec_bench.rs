//! Performance benchmarks for the template transfer codec.
//!
//! These benchmarks measure hex framing and reassembly throughput to
//! confirm the codec never becomes the bottleneck next to a 9600 baud
//! serial link.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench template_codec_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use whorl_core::{SensorSlot, constants::HEX_CHUNK_LEN};
use whorl_protocol::{
    TemplateAssembler, TransferDialect, decode_hex, encode_hex, encode_transfer,
};

/// Create a deterministic template blob of the requested size.
fn make_template(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Build the extraction line sequence a device would emit for a blob.
fn make_export_lines(template: &[u8]) -> Vec<String> {
    let hex = encode_hex(template);
    let mut lines = vec![r#"{"status":"start_export","sensor_id":12}"#.to_string()];
    let mut rest = hex.as_str();
    while !rest.is_empty() {
        let split = rest.len().min(HEX_CHUNK_LEN);
        let (chunk, tail) = rest.split_at(split);
        lines.push(format!("TEMPLATE_HEX:{chunk}"));
        rest = tail;
    }
    lines.push(r#"{"status":"export_done"}"#.to_string());
    lines
}

/// Benchmark hex encoding across template sizes.
fn bench_encode_hex(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_hex");

    for size in [256, 1536, 8192].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let template = make_template(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let hex = encode_hex(black_box(&template));
                black_box(hex);
            });
        });
    }

    group.finish();
}

/// Benchmark hex decoding across template sizes.
fn bench_decode_hex(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_hex");

    for size in [256, 1536, 8192].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let hex = encode_hex(&make_template(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let bytes = decode_hex(black_box(&hex)).unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

/// Benchmark upload framing for a typical fingerprint template.
fn bench_encode_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_transfer");
    group.throughput(Throughput::Elements(1));

    let slot = SensorSlot::new(12).unwrap();
    let template = make_template(1536);

    group.bench_function("direct_dialect", |b| {
        b.iter(|| {
            let lines = encode_transfer(TransferDialect::Direct, slot, black_box(&template));
            black_box(lines);
        });
    });

    group.bench_function("batch_dialect", |b| {
        b.iter(|| {
            let lines = encode_transfer(TransferDialect::Batch, slot, black_box(&template));
            black_box(lines);
        });
    });

    group.finish();
}

/// Benchmark extraction reassembly line by line.
fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    for size in [256, 1536, 8192].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let lines = make_export_lines(&make_template(*size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut assembler = TemplateAssembler::new();
                for line in &lines {
                    assembler.push_line(black_box(line)).unwrap();
                }
                black_box(assembler.into_bytes().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark the full round trip: frame a blob, then reassemble it.
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Elements(1));

    let template = make_template(1536);

    group.bench_function("frame_and_reassemble", |b| {
        b.iter(|| {
            let lines = make_export_lines(black_box(&template));
            let mut assembler = TemplateAssembler::new();
            for line in &lines {
                assembler.push_line(line).unwrap();
            }
            black_box(assembler.into_bytes().unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_hex,
    bench_decode_hex,
    bench_encode_transfer,
    bench_assemble,
    bench_round_trip,
);

criterion_main!(benches);
