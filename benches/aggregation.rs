//! Aggregation benchmark: per-frame results → video verdict.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dog_aggression::config::SceneConfig;
use dog_aggression::results::{Detection, FrameResult};
use dog_aggression::scene::SceneScorer;
use dog_aggression::temporal::TemporalAggregator;

fn make_frames(n: usize) -> Vec<FrameResult> {
    let scorer = SceneScorer::new(SceneConfig::default());
    (0..n)
        .map(|i| {
            let mut detections = vec![Detection::new("dog", 0.5 + (i % 5) as f32 * 0.1, [0.0, 0.0, 8.0, 8.0])];
            if i % 3 == 0 {
                detections.push(Detection::new("chasing dog", 0.7, [i as f32, 0.0, 9.0, 9.0]));
            }
            scorer.score(detections).into_frame_result()
        })
        .collect()
}

fn bench_aggregate_video(c: &mut Criterion) {
    let aggregator = TemporalAggregator::new(0.5);
    let frames = make_frames(200);

    c.bench_function("aggregate_200_frames", |b| {
        b.iter(|| black_box(aggregator.aggregate(black_box(&frames))))
    });
}

fn bench_live_session(c: &mut Criterion) {
    let aggregator = TemporalAggregator::new(0.5);
    let frames = make_frames(50);

    c.bench_function("live_session_push_50", |b| {
        b.iter(|| {
            let mut session = aggregator.session();
            for f in &frames {
                session.push(f);
            }
            black_box(session.finish())
        })
    });
}

criterion_group!(benches, bench_aggregate_video, bench_live_session);
criterion_main!(benches);
