//! Codec benchmarks

use cortex_core::{codec, frame, Message};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn organism_update() -> Message {
    Message::new("/brahma/organism/update")
        .arg("organism-17")
        .arg("Proteus")
        .arg(0.73f32)
        .arg(0.21f32)
}

fn encode_benchmark(c: &mut Criterion) {
    let msg = organism_update();

    c.bench_function("encode_osc_message", |b| {
        b.iter(|| black_box(codec::encode(&msg).unwrap()))
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let encoded = codec::encode(&organism_update()).unwrap();

    c.bench_function("decode_osc_message", |b| {
        b.iter(|| black_box(codec::decode_packet(&encoded).unwrap()))
    });
}

fn reframe_benchmark(c: &mut Criterion) {
    let encoded = codec::encode(&organism_update()).unwrap();

    c.bench_function("datagram_to_frame", |b| {
        b.iter(|| {
            let msg = codec::decode(&encoded).unwrap();
            black_box(frame::to_json(&msg).unwrap())
        })
    });
}

fn parse_frame_benchmark(c: &mut Criterion) {
    let text = r#"{"address":"/daemon/lorenz/create","args":["lorenz1",10,28,2.667]}"#;

    c.bench_function("client_frame_to_datagram", |b| {
        b.iter(|| {
            let msg = frame::parse(text).unwrap();
            black_box(codec::encode(&msg).unwrap())
        })
    });
}

criterion_group!(
    benches,
    encode_benchmark,
    decode_benchmark,
    reframe_benchmark,
    parse_frame_benchmark
);
criterion_main!(benches);
