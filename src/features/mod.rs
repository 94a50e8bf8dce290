//! Behavioral feature extraction from dog pose keypoints.

mod pipeline;
mod behavioral;
pub mod keypoints;

pub use pipeline::{FeatureExtractor, KeypointFeatureExtractor};
pub use behavioral::{BehavioralFeatures, DERIVED_FEATURES};
pub use keypoints::{Keypoint, KeypointSet, KEYPOINT_COUNT};

use serde::{Deserialize, Serialize};

/// Width the trained classifier expects
pub const FEATURE_DIM: usize = 35;

/// Fixed-size feature vector for model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn zeros(dim: usize) -> Self {
        Self {
            values: vec![0.0; dim],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True for the "insufficient signal" vector
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}
