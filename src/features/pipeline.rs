//! Feature extraction pipeline: keypoints → behavioral features → fixed-width vector.

use super::{BehavioralFeatures, FeatureVector, KeypointSet};
use crate::config::FeaturesConfig;

/// Stateless and shared across requests.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    /// Always returns `feature_dim` values; all zeros when no subject was detected or
    /// too few landmarks were confident.
    pub fn extract(&self, keypoints: Option<&KeypointSet>) -> FeatureVector {
        let dim = self.config.feature_dim;
        let Some(kps) = keypoints else {
            return FeatureVector::zeros(dim);
        };
        match BehavioralFeatures::from_keypoints(kps, &self.config) {
            Some(features) => FeatureVector::new(features.to_vector(dim)),
            None => {
                tracing::debug!("insufficient confident keypoints; zero feature vector");
                FeatureVector::zeros(dim)
            }
        }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }
}

/// Keypoints → features, under its domain name
pub type KeypointFeatureExtractor = FeatureExtractor;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_DIM;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeaturesConfig::default())
    }

    #[test]
    fn absent_subject_is_zero_vector() {
        let v = extractor().extract(None);
        assert_eq!(v.len(), FEATURE_DIM);
        assert!(v.is_zero());
    }

    #[test]
    fn four_confident_landmarks_is_zero_vector() {
        let mut rows = [[50.0f32, 50.0, 0.2]; 24];
        rows[0] = [10.0, 10.0, 0.9];
        rows[5] = [30.0, 40.0, 0.9];
        rows[11] = [70.0, 45.0, 0.9];
        rows[21] = [90.0, 20.0, 0.9];
        let set = KeypointSet::from_rows(&rows).unwrap();
        let v = extractor().extract(Some(&set));
        assert_eq!(v.len(), FEATURE_DIM);
        assert!(v.is_zero());
    }

    #[test]
    fn always_exactly_35_values() {
        // Deterministic pseudo-random layouts covering sparse and dense confidence
        let mut seed = 7u32;
        let mut next = || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 8) as f32 / (1u32 << 24) as f32
        };
        for _ in 0..200 {
            let rows: Vec<[f32; 3]> = (0..24).map(|_| [next() * 640.0, next() * 480.0, next()]).collect();
            let set = KeypointSet::from_rows(&rows).unwrap();
            let v = extractor().extract(Some(&set));
            assert_eq!(v.len(), 35);
            assert!(v.as_slice().iter().all(|x| x.is_finite()));
        }
    }
}
