use beholder::{AudioClip, AudioFormat, AudioTimeline, BackgroundMusicMixer, MixWindowPolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const FORMAT: AudioFormat = AudioFormat::new(24_000, 1);

fn timeline(seconds: usize) -> AudioTimeline {
    let frames = seconds * 24_000;
    let samples = (0..frames).map(|i| ((i % 200) as f32 / 200.0) - 0.5).collect();
    AudioTimeline {
        clip: AudioClip::from_samples(FORMAT, samples).unwrap(),
        intro_end: Some(24_000 * 5),
        outro_start: Some(frames - 24_000 * 5),
    }
}

fn benchmark_mix(c: &mut Criterion) {
    let bgm = AudioClip::from_samples(FORMAT, vec![0.1; 24_000 * 30]).unwrap();
    let mixer = BackgroundMusicMixer::new(-5.0, MixWindowPolicy::WholeTimeline);

    let mut group = c.benchmark_group("mix");
    group.sample_size(20);
    for minutes in [1, 10] {
        let timeline = timeline(minutes * 60);
        group.bench_with_input(BenchmarkId::from_parameter(minutes), &timeline, |b, t| {
            b.iter(|| mixer.mix(black_box(t), black_box(&bgm)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_mix);
criterion_main!(benches);
