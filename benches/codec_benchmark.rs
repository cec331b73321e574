//! Codec benchmark: encode and decode typical mesh traffic.
//!
//! Target: < 1µs per message either way

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dimple::protocol::codec;
use dimple::{Arg, Message};

fn position_update() -> Message {
    Message::new("/world/ball1/position")
        .arg(1.0f32)
        .arg(2.0f32)
        .arg(3.0f32)
}

fn hinge_create() -> Message {
    let msg = Message::new("/world/hinge/create")
        .arg("door_hinge")
        .arg("door")
        .arg("world");
    (0..6).fold(msg, |msg, i| msg.arg(Arg::float(f64::from(i))))
}

fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in [("position", position_update()), ("hinge_create", hinge_create())] {
        let mut out = Vec::with_capacity(codec::encoded_len(&msg));
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, msg| {
            b.iter(|| {
                out.clear();
                codec::encode_into(black_box(msg), &mut out);
            })
        });
    }
    group.finish();
}

fn decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, msg) in [("position", position_update()), ("hinge_create", hinge_create())] {
        let bytes = msg.encode();
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| codec::decode(black_box(bytes)))
        });
    }
    group.finish();
}

criterion_group!(benches, encode, decode);
criterion_main!(benches);
