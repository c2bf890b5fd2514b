//! Benchmarks for the hot receive-path primitives
//!
//! Covers the per-frame costs the receive loop pays at camera rate:
//! - Wire header encode/decode and bounds validation
//! - Frame packet construction from a received payload
//! - Hand-off slot push/pop under the drop-oldest policy

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Instant;
use viewfinder::codec::{MAX_FRAME_LEN, decode_header, encode_header, validate_length};
use viewfinder::{FramePacket, FrameSlot};

/// A JPEG-sized payload, representative of one 1080p camera frame
fn sample_payload() -> Vec<u8> {
    (0..256 * 1024u32).map(|i| (i % 251) as u8).collect()
}

fn bench_header_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_codec");

    group.bench_function("encode", |b| {
        b.iter(|| black_box(encode_header(black_box(256 * 1024))))
    });

    group.bench_function("decode_and_validate", |b| {
        let header = encode_header(256 * 1024);
        b.iter(|| {
            let length = decode_header(black_box(header));
            black_box(validate_length(length, MAX_FRAME_LEN))
        })
    });

    group.finish();
}

fn bench_packet_construction(c: &mut Criterion) {
    let payload = sample_payload();

    let mut group = c.benchmark_group("packet_construction");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("new_from_payload", |b| {
        b.iter(|| {
            let packet =
                FramePacket::new(black_box(payload.clone()), black_box(Instant::now()), 1);
            black_box(packet)
        })
    });

    group.finish();
}

fn bench_slot_handoff(c: &mut Criterion) {
    let payload = sample_payload();
    let packet = FramePacket::new(payload, Instant::now(), 1);

    let mut group = c.benchmark_group("slot_handoff");

    group.bench_function("push_replace", |b| {
        let slot = FrameSlot::new();
        b.iter(|| slot.push(black_box(packet.clone())))
    });

    group.bench_function("push_then_pop", |b| {
        let slot = FrameSlot::new();
        b.iter(|| {
            slot.push(black_box(packet.clone()));
            black_box(slot.try_pop())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_header_codec, bench_packet_construction, bench_slot_handoff);
criterion_main!(benches);
