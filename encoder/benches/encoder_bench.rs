use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxprep_encoder::{EncoderConfig, SpeakerEncoder};

fn make_sine(freq_hz: f64, n_samples: usize, sample_rate: usize) -> Vec<f32> {
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (freq_hz * 2.0 * std::f64::consts::PI * t).sin() as f32
        })
        .collect()
}

fn bench_encode_1s(c: &mut Criterion) {
    let enc = SpeakerEncoder::new(&EncoderConfig::default());
    let wave = make_sine(440.0, 16000, 16000); // 1s

    c.bench_function("encoder_encode_1s", |b| {
        b.iter(|| {
            let _ = black_box(enc.encode_one(black_box(&wave)));
        });
    });
}

fn bench_encode_4s(c: &mut Criterion) {
    let enc = SpeakerEncoder::new(&EncoderConfig::default());
    let wave = make_sine(440.0, 64000, 16000); // canonical 4s example

    c.bench_function("encoder_encode_4s", |b| {
        b.iter(|| {
            let _ = black_box(enc.encode_one(black_box(&wave)));
        });
    });
}

fn bench_construct(c: &mut Criterion) {
    c.bench_function("encoder_construct_seeded", |b| {
        b.iter(|| {
            let _ = black_box(SpeakerEncoder::new(&EncoderConfig::default()));
        });
    });
}

criterion_group!(benches, bench_encode_1s, bench_encode_4s, bench_construct);
criterion_main!(benches);
