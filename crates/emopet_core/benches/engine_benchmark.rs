//! Engine benchmarks
//!
//! Measures the per-frame animation tick and burst creation in the sound engine.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emopet_core::animation::{Bounds, Vec2};
use emopet_core::{
    AnimationConfig, AnimationEngine, Emotion, ManualClock, OfflineOutput, SoundConfig,
    SoundEngine,
};

fn benchmark_animation_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("animation_tick");

    for emotion in [Emotion::Neutral, Emotion::Angry, Emotion::Excited] {
        let config = AnimationConfig {
            seed: Some(1),
            ..Default::default()
        };
        let mut engine = AnimationEngine::from_config(&config);
        engine.set_emotion(emotion);
        let bounds = Bounds {
            left: 0.0,
            top: 0.0,
            width: 300.0,
            height: 300.0,
        };
        engine.pointer_moved(Vec2::new(190.0, 125.0), &bounds);

        let mut now = 0.0;
        group.bench_function(format!("tick_{}", emotion), |b| {
            b.iter(|| {
                now += 16.7;
                black_box(engine.tick(black_box(now)));
            })
        });
    }

    group.finish();
}

fn benchmark_svg(c: &mut Criterion) {
    let mut engine = AnimationEngine::from_config(&AnimationConfig {
        seed: Some(2),
        ..Default::default()
    });
    engine.set_emotion(Emotion::Angry);
    let frame = engine.tick(100.0);

    c.bench_function("frame_to_svg", |b| b.iter(|| black_box(frame.to_svg())));
}

fn benchmark_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("sound_burst");

    for emotion in [Emotion::Happy, Emotion::Angry, Emotion::Playful] {
        let output = OfflineOutput::new(48000, 0.22).unwrap();
        let clock = ManualClock::new();
        let config = SoundConfig {
            seed: Some(3),
            ..Default::default()
        };
        let mut sound = SoundEngine::new(config, output.factory(), Arc::new(clock));
        sound.unlock();

        group.bench_function(format!("play_{}", emotion), |b| {
            b.iter(|| {
                sound.play(black_box(emotion));
                sound.stop();
                // Keep the mixer from filling up with released voices
                output.render(4800);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_animation_tick, benchmark_svg, benchmark_burst);
criterion_main!(benches);
