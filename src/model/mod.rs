//! Behavior classifier: preprocessing, ONNX inference, frame-level decision.

mod classifier;
mod onnx;
mod preprocess;

pub use classifier::{Classification, FrameClassifier};
pub use onnx::OnnxClassifier;
pub use preprocess::Preprocessor;

use crate::config::ModelConfig;
use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// External capability: class probabilities for one preprocessed feature row.
/// Index 0 = Non-Aggressive, index 1 = Aggressive.
pub trait ProbabilityModel: Send + Sync {
    fn predict_proba(&self, input: &[f32]) -> Result<Vec<f32>, AgentError>;
}

/// Which model handles the service was started with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub image_classifier_loaded: bool,
    pub pose_detector_loaded: bool,
    pub object_detector_loaded: bool,
}

/// Build the frame classifier from config. A missing model or preprocessing file yields the
/// degraded classifier; a present but broken one is an error.
pub fn load_classifier(config: &ModelConfig) -> Result<FrameClassifier, AgentError> {
    let Some(model) = OnnxClassifier::load(&config.classifier_path)? else {
        return Ok(FrameClassifier::unavailable());
    };
    if !config.preprocess_path.exists() {
        tracing::warn!(
            path = %config.preprocess_path.display(),
            "preprocessing parameters not found; classification degraded"
        );
        return Ok(FrameClassifier::unavailable());
    }
    let preprocessor = Preprocessor::load(&config.preprocess_path)?;
    Ok(FrameClassifier::new(preprocessor, Arc::new(model)))
}
