//! MFCC extraction throughput over a 3-second 16 kHz waveform.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sfe::TransformTree;

const SAMPLES: usize = 48000;

fn waveform() -> Vec<i16> {
    (0..SAMPLES)
        .map(|i| {
            let t = i as f32 / 16000.0;
            ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 9000.0) as i16 + (i % 13) as i16
        })
        .collect()
}

fn bench_mfcc(c: &mut Criterion) {
    let input = waveform();
    let mut engine = TransformTree::new(SAMPLES, 16000).unwrap();
    engine
        .add_feature_from_text(
            "MFCC[Preemphasis(value=0.9),Window(length=512,step=205),RDFT,SpectralEnergy,\
             FilterBank(number=40,squared=true),Log,DCT,Selector(length=16),STMSN(length=25)]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();

    c.bench_function("mfcc_48000_samples", |b| {
        b.iter(|| {
            let results = engine.execute(black_box(&input)).unwrap();
            black_box(results);
        })
    });
}

criterion_group!(benches, bench_mfcc);
criterion_main!(benches);
