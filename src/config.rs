//! Agent configuration. Thresholds and sampling bounds are tunable; defaults match the trained models.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Classifier and preprocessing parameter locations
    pub model: ModelConfig,
    /// Keypoint feature extraction parameters
    pub features: FeaturesConfig,
    /// Scene scoring weights and thresholds
    pub scene: SceneConfig,
    /// Video / live sampling bounds
    pub video: VideoConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX behavior classifier
    pub classifier_path: PathBuf,
    /// Path to the JSON preprocessing parameters (imputer, scaler, selector)
    pub preprocess_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// A landmark counts as valid only above this confidence
    pub keypoint_confidence: f32,
    /// Fewer valid landmarks than this yields the zero vector
    pub min_confident_keypoints: usize,
    /// Confidence above which a landmark counts toward the high-confidence ratio
    pub high_confidence: f32,
    /// Width of the feature vector handed to the classifier
    pub feature_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Aggression score at or above this is AGGRESSIVE (0.0–1.0)
    pub aggression_threshold: f32,
    /// Minimum detector confidence requested from the object detector
    pub detection_confidence: f32,
    /// Class label → aggression weight
    pub aggressive_weights: BTreeMap<String, f32>,
    /// Class label → presence weight (tracked, never scored)
    pub neutral_weights: BTreeMap<String, f32>,
    /// Detector class index → label
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePipeline {
    /// Object detections → weighted scene score
    Scene,
    /// Pose keypoints → behavioral features → classifier
    Pose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Stop after this many processed frames
    pub max_frames: usize,
    /// Process every Nth frame
    pub frame_skip: usize,
    /// Per-frame pipeline used for videos
    pub pipeline: FramePipeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

pub const BITING_CLASS: &str = "dog biting child";
pub const CHASING_CLASS: &str = "chasing dog";
pub const FLEEING_CLASS: &str = "running child";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            features: FeaturesConfig::default(),
            scene: SceneConfig::default(),
            video: VideoConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier_path: PathBuf::from("models/behavior_classifier.onnx"),
            preprocess_path: PathBuf::from("models/preprocess.json"),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            keypoint_confidence: 0.3,
            min_confident_keypoints: 5,
            high_confidence: 0.5,
            feature_dim: 35,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        let aggressive_weights = [(BITING_CLASS, 1.0), (CHASING_CLASS, 0.8), (FLEEING_CLASS, 0.6)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let neutral_weights = [("child", 0.1), ("dog", 0.1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            aggression_threshold: 0.5,
            detection_confidence: 0.25,
            aggressive_weights,
            neutral_weights,
            class_names: vec![
                CHASING_CLASS.to_string(),
                "child".to_string(),
                "dog".to_string(),
                BITING_CLASS.to_string(),
                FLEEING_CLASS.to_string(),
            ],
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_frames: 200,
            frame_skip: 2,
            pipeline: FramePipeline::Scene,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AppConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.video.frame_skip == 0 {
            return Err(AgentError::Config("video.frame_skip must be at least 1".into()));
        }
        let unit = 0.0..=1.0;
        for (name, value) in [
            ("scene.aggression_threshold", self.scene.aggression_threshold),
            ("scene.detection_confidence", self.scene.detection_confidence),
            ("features.keypoint_confidence", self.features.keypoint_confidence),
            ("features.high_confidence", self.features.high_confidence),
        ] {
            if !unit.contains(&value) {
                return Err(AgentError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.features.feature_dim != crate::features::FEATURE_DIM {
            return Err(AgentError::Config(format!(
                "features.feature_dim must be {} to match the trained classifier, got {}",
                crate::features::FEATURE_DIM,
                self.features.feature_dim
            )));
        }
        for (table, weights) in [
            ("scene.aggressive_weights", &self.scene.aggressive_weights),
            ("scene.neutral_weights", &self.scene.neutral_weights),
        ] {
            if let Some((class, weight)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
                return Err(AgentError::Config(format!(
                    "{table}[{class}] must be a finite non-negative weight, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let c: AppConfig = serde_json::from_str(r#"{"video":{"frame_skip":5}}"#).unwrap();
        assert_eq!(c.video.frame_skip, 5);
        assert_eq!(c.video.max_frames, 200);
        assert_eq!(c.scene.aggression_threshold, 0.5);
        assert_eq!(c.video.pipeline, FramePipeline::Scene);
    }

    #[test]
    fn validate_rejects_zero_stride() {
        let mut c = AppConfig::default();
        assert!(c.validate().is_ok());
        c.video.frame_skip = 0;
        assert!(matches!(c.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut c = AppConfig::default();
        c.scene.aggression_threshold = 1.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_or_nan_weight() {
        let c: AppConfig =
            serde_json::from_str(r#"{"scene":{"aggressive_weights":{"dog biting child":-1.0}}}"#).unwrap();
        assert!(matches!(c.validate(), Err(AgentError::Config(_))));

        let mut c = AppConfig::default();
        c.scene.neutral_weights.insert("dog".into(), f32::NAN);
        assert!(matches!(c.validate(), Err(AgentError::Config(_))));

        let mut c = AppConfig::default();
        c.scene.aggressive_weights.insert(CHASING_CLASS.into(), 0.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_pins_feature_width() {
        let mut c = AppConfig::default();
        c.features.feature_dim = 40;
        assert!(matches!(c.validate(), Err(AgentError::Config(_))));
        c.features.feature_dim = 28;
        assert!(c.validate().is_err());
    }
}
