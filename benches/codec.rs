//! Benchmarks for PDU framing.
//!
//! Run with: cargo bench --bench codec

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tokio_util::codec::{Decoder, Encoder};

use smppc::pdu::{Command, Header, Pdu, SmppCodec, SubmitSm};

fn sample_submit_sm() -> SubmitSm {
    SubmitSm {
        source_addr: "31612345678".into(),
        dest_addr: "491701234567".into(),
        short_message: b"the quick brown fox jumps over the lazy dog".to_vec(),
        registered_delivery: 1,
        ..SubmitSm::default()
    }
}

fn bench_encode_submit_sm(c: &mut Criterion) {
    let submit = sample_submit_sm();
    let mut codec = SmppCodec::new();

    let mut group = c.benchmark_group("codec/encode");
    group.throughput(Throughput::Elements(1));
    group.bench_function("submit_sm", |b| {
        let mut sequence = 0u32;
        b.iter(|| {
            sequence += 1;
            let mut buf = BytesMut::with_capacity(256);
            codec
                .encode(
                    (
                        Header::new(Command::SubmitSm, sequence),
                        Pdu::SubmitSm(Box::new(submit.clone())),
                    ),
                    &mut buf,
                )
                .unwrap();
            black_box(buf)
        })
    });
    group.finish();
}

fn bench_decode_submit_sm(c: &mut Criterion) {
    let mut codec = SmppCodec::new();
    let mut encoded = BytesMut::new();
    codec
        .encode(
            (
                Header::new(Command::SubmitSm, 1),
                Pdu::SubmitSm(Box::new(sample_submit_sm())),
            ),
            &mut encoded,
        )
        .unwrap();
    let encoded = encoded.freeze();

    let mut group = c.benchmark_group("codec/decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&encoded[..]);
            let frame = codec.decode(&mut buf).unwrap().unwrap();
            black_box(Pdu::parse(&frame.header, &frame.body).unwrap())
        })
    });
    group.finish();
}

fn bench_decode_enquire_link(c: &mut Criterion) {
    let mut codec = SmppCodec::new();
    let mut encoded = BytesMut::new();
    codec
        .encode((Header::new(Command::EnquireLink, 1), Pdu::EnquireLink), &mut encoded)
        .unwrap();
    let encoded = encoded.freeze();

    c.bench_function("codec/decode/enquire_link", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&encoded[..]);
            black_box(codec.decode(&mut buf).unwrap().unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_encode_submit_sm,
    bench_decode_submit_sm,
    bench_decode_enquire_link
);
criterion_main!(benches);
