//! Pipeline benchmark: keypoints → features, detections → scene score.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dog_aggression::config::{FeaturesConfig, SceneConfig};
use dog_aggression::features::{FeatureExtractor, KeypointSet};
use dog_aggression::results::Detection;
use dog_aggression::scene::SceneScorer;

fn make_keypoints(seed: u32) -> KeypointSet {
    let rows: Vec<[f32; 3]> = (0..24u32)
        .map(|i| {
            let t = (seed * 31 + i * 7) as f32;
            [40.0 + (t * 0.13).sin() * 30.0, 60.0 + (t * 0.29).cos() * 25.0, 0.6 + (i % 4) as f32 * 0.1]
        })
        .collect();
    KeypointSet::from_rows(&rows).unwrap()
}

fn make_detections(n: usize) -> Vec<Detection> {
    let labels = ["dog", "child", "chasing dog", "running child", "dog biting child"];
    (0..n)
        .map(|i| Detection::new(labels[i % labels.len()], 0.3 + (i % 7) as f32 * 0.1, [i as f32, 0.0, 10.0, 10.0]))
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let kps = make_keypoints(7);

    c.bench_function("feature_extract_24_keypoints", |b| {
        b.iter(|| black_box(extractor.extract(Some(black_box(&kps)))))
    });
}

fn bench_feature_batch(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeaturesConfig::default());
    let batch: Vec<KeypointSet> = (0..100).map(make_keypoints).collect();

    c.bench_function("feature_extract_100_frames", |b| {
        b.iter(|| {
            for kps in &batch {
                black_box(extractor.extract(Some(kps)));
            }
        })
    });
}

fn bench_scene_scoring(c: &mut Criterion) {
    let scorer = SceneScorer::new(SceneConfig::default());
    let detections = make_detections(12);

    c.bench_function("scene_score_12_detections", |b| {
        b.iter(|| black_box(scorer.score(black_box(detections.clone()))))
    });
}

criterion_group!(
    benches,
    bench_feature_extraction,
    bench_feature_batch,
    bench_scene_scoring
);
criterion_main!(benches);
