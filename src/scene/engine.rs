//! Weights object detections into an aggression score and classifies the scene against a
//! configurable threshold.

use crate::config::{SceneConfig, BITING_CLASS, CHASING_CLASS, FLEEING_CLASS};
use crate::results::{round3, Detection, FrameLabel, FrameResult};
use serde::{Deserialize, Serialize};

pub const REASON_NO_OBJECTS: &str = "No objects detected";
pub const REASON_CALM: &str = "No significant aggressive behavior detected";
pub const REASON_BITING: &str = "Critical: Dog biting child detected";
pub const REASON_CHASING: &str = "High risk: Dog chasing behavior detected";
pub const REASON_FLEEING: &str = "Concern: Child running (possibly fleeing)";
pub const REASON_MULTIPLE: &str = "Multiple risk indicators present";

/// Scored frame from the object-detection pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneScore {
    pub classification: FrameLabel,
    pub confidence: f32,
    pub aggression_score: f32,
    pub reason: String,
    pub detections: Vec<Detection>,
    pub dog_detected: bool,
}

impl SceneScore {
    pub fn into_frame_result(self) -> FrameResult {
        FrameResult {
            label: self.classification,
            confidence: self.confidence,
            raw_score: Some(self.aggression_score),
            subject_detected: !self.detections.is_empty(),
            detections: self.detections,
            reason: Some(self.reason),
            note: None,
            error: None,
        }
    }
}

pub struct SceneScorer {
    config: SceneConfig,
}

pub type SceneAggressionScorer = SceneScorer;

impl SceneScorer {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, aggression_score: f32) -> FrameLabel {
        if aggression_score >= self.config.aggression_threshold {
            FrameLabel::Aggressive
        } else {
            FrameLabel::NonAggressive
        }
    }

    /// Aggression weight for a class, None for neutral or unknown classes
    pub fn weight(&self, class_label: &str) -> Option<f32> {
        self.config.aggressive_weights.get(class_label).copied()
    }

    /// Detector class index → label
    pub fn class_name(&self, class_id: usize) -> Option<&str> {
        self.config.class_names.get(class_id).map(String::as_str)
    }

    pub fn score(&self, mut detections: Vec<Detection>) -> SceneScore {
        if detections.is_empty() {
            return SceneScore {
                classification: FrameLabel::NonAggressive,
                confidence: 0.0,
                aggression_score: 0.0,
                reason: REASON_NO_OBJECTS.to_string(),
                detections,
                dog_detected: false,
            };
        }

        let mut aggression_score = 0.0f32;
        let mut max_confidence = 0.0f32;
        let mut dog_detected = false;
        for d in &mut detections {
            let confidence = if d.confidence.is_finite() { d.confidence.clamp(0.0, 1.0) } else { 0.0 };
            // Reported value; the score below keeps full precision
            d.confidence = round3(confidence);
            max_confidence = max_confidence.max(confidence);
            if d.class_label.to_lowercase().contains("dog") {
                dog_detected = true;
            }
            if let Some(weight) = self.weight(&d.class_label) {
                aggression_score += confidence * weight;
                tracing::debug!(class = %d.class_label, confidence, "aggressive indicator");
            } else if self.config.neutral_weights.contains_key(&d.class_label) {
                tracing::debug!(class = %d.class_label, confidence, "neutral object");
            }
        }

        let classification = self.classify(aggression_score);
        let reason = match classification {
            FrameLabel::Aggressive => self.aggression_reason(&detections),
            _ => REASON_CALM,
        };
        SceneScore {
            classification,
            confidence: round3(aggression_score.max(max_confidence).min(1.0)),
            aggression_score: round3(aggression_score),
            reason: reason.to_string(),
            detections,
            dog_detected,
        }
    }

    /// Most severe aggressive indicator present decides the message
    fn aggression_reason(&self, detections: &[Detection]) -> &'static str {
        let present = |class: &str| {
            detections
                .iter()
                .any(|d| d.class_label == class && self.weight(class).is_some())
        };
        if present(BITING_CLASS) {
            REASON_BITING
        } else if present(CHASING_CLASS) {
            REASON_CHASING
        } else if present(FLEEING_CLASS) {
            REASON_FLEEING
        } else {
            REASON_MULTIPLE
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SceneScorer {
        SceneScorer::new(SceneConfig::default())
    }

    fn det(class: &str, confidence: f32) -> Detection {
        Detection::new(class, confidence, [0.0, 0.0, 10.0, 10.0])
    }

    #[test]
    fn empty_frame_is_calm_with_no_objects_reason() {
        let s = scorer().score(Vec::new());
        assert_eq!(s.classification, FrameLabel::NonAggressive);
        assert_eq!(s.aggression_score, 0.0);
        assert_eq!(s.reason, REASON_NO_OBJECTS);
        assert!(!s.into_frame_result().subject_detected);
    }

    #[test]
    fn biting_wins_over_neutral_presence() {
        let s = scorer().score(vec![
            det("dog biting child", 0.6),
            det("dog", 0.9),
            det("child", 0.8),
            det("child", 0.7),
        ]);
        assert_eq!(s.classification, FrameLabel::Aggressive);
        assert_eq!(s.aggression_score, 0.6);
        assert_eq!(s.reason, REASON_BITING);
        assert!(s.dog_detected);
    }

    #[test]
    fn neutral_only_frame_scores_zero() {
        let s = scorer().score(vec![det("dog", 0.95), det("child", 0.9)]);
        assert_eq!(s.classification, FrameLabel::NonAggressive);
        assert_eq!(s.aggression_score, 0.0);
        assert_eq!(s.reason, REASON_CALM);
        assert_eq!(s.confidence, 0.95);
        assert!(s.into_frame_result().subject_detected);
    }

    #[test]
    fn reason_priority_is_biting_chasing_fleeing() {
        let s = scorer().score(vec![det("running child", 0.9), det("chasing dog", 0.9)]);
        assert_eq!(s.reason, REASON_CHASING);
        let s = scorer().score(vec![det("running child", 0.9)]);
        assert_eq!(s.reason, REASON_FLEEING);
        let s = scorer().score(vec![det("running child", 0.5), det("chasing dog", 0.3), det("dog biting child", 0.2)]);
        assert_eq!(s.reason, REASON_BITING);
    }

    #[test]
    fn reported_confidences_are_clamped_and_rounded() {
        let s = scorer().score(vec![det("chasing dog", 0.62549), det("dog", f32::NAN), det("child", 1.7)]);
        let confidences: Vec<f32> = s.detections.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.625, 0.0, 1.0]);
        // 0.62549 * 0.8 = 0.500392, scored before rounding
        assert_eq!(s.aggression_score, 0.5);
        assert_eq!(s.classification, FrameLabel::Aggressive);
        let json = serde_json::to_value(&s.detections).unwrap();
        assert!(json.as_array().unwrap().iter().all(|d| d["confidence"].is_number()));
    }

    #[test]
    fn threshold_is_inclusive() {
        // 0.625 * 0.8 = 0.5 exactly
        let s = scorer().score(vec![det("chasing dog", 0.625)]);
        assert_eq!(s.classification, FrameLabel::Aggressive);
        let s = scorer().score(vec![det("chasing dog", 0.6)]);
        assert_eq!(s.classification, FrameLabel::NonAggressive);
    }

    #[test]
    fn custom_table_without_named_classes_uses_generic_reason() {
        let mut config = SceneConfig::default();
        config.aggressive_weights.insert("growling dog".into(), 1.0);
        let s = SceneScorer::new(config).score(vec![det("growling dog", 0.7)]);
        assert_eq!(s.reason, REASON_MULTIPLE);
    }

    #[test]
    fn adding_aggressive_detection_never_lowers_score() {
        let base = vec![det("dog", 0.8), det("running child", 0.3)];
        let before = scorer().score(base.clone()).aggression_score;
        for class in ["dog biting child", "chasing dog", "running child"] {
            for conf in [0.01, 0.25, 0.5, 0.99] {
                let mut more = base.clone();
                more.push(det(class, conf));
                assert!(scorer().score(more).aggression_score >= before);
            }
        }
    }

    #[test]
    fn class_index_mapping() {
        assert_eq!(scorer().class_name(3), Some("dog biting child"));
        assert_eq!(scorer().class_name(9), None);
    }
}
