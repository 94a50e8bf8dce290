//! Per-frame results shared by both pipelines and consumed by the temporal aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameLabel {
    #[serde(rename = "Aggressive")]
    Aggressive,
    #[serde(rename = "Non-Aggressive")]
    NonAggressive,
    #[serde(rename = "No-Detection")]
    NoDetection,
    #[serde(rename = "Error")]
    Error,
}

impl FrameLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameLabel::Aggressive => "Aggressive",
            FrameLabel::NonAggressive => "Non-Aggressive",
            FrameLabel::NoDetection => "No-Detection",
            FrameLabel::Error => "Error",
        }
    }

    /// Labels that take part in the majority vote
    pub fn is_vote(&self) -> bool {
        matches!(self, FrameLabel::Aggressive | FrameLabel::NonAggressive)
    }
}

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object found by the object detector in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
    /// [x1, y1, x2, y2]
    #[serde(rename = "bbox")]
    pub bounding_box: [f32; 4],
}

impl Detection {
    pub fn new(class_label: impl Into<String>, confidence: f32, bounding_box: [f32; 4]) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bounding_box,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub label: FrameLabel,
    pub confidence: f32,
    /// Aggression score, present only on the scene pipeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<f32>,
    pub detections: Vec<Detection>,
    /// A dog (pose path) or any object (scene path) was found
    pub subject_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Set when the result came from degraded mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameResult {
    pub fn no_detection() -> Self {
        Self {
            label: FrameLabel::NoDetection,
            confidence: 0.0,
            raw_score: None,
            detections: Vec::new(),
            subject_detected: false,
            reason: Some("No dog detected".to_string()),
            note: None,
            error: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            label: FrameLabel::Error,
            confidence: 0.0,
            raw_score: None,
            detections: Vec::new(),
            subject_detected: false,
            reason: None,
            note: None,
            error: Some(detail.into()),
        }
    }

    /// Counts toward the majority vote
    pub fn votes(&self) -> bool {
        self.subject_detected && self.label.is_vote()
    }
}

/// Round to 3 decimals; non-finite values collapse to 0 so results stay JSON-safe
pub fn round3(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_with_hyphens() {
        assert_eq!(serde_json::to_string(&FrameLabel::NonAggressive).unwrap(), "\"Non-Aggressive\"");
        assert_eq!(serde_json::to_string(&FrameLabel::NoDetection).unwrap(), "\"No-Detection\"");
    }

    #[test]
    fn detection_uses_detector_field_names() {
        let d: Detection =
            serde_json::from_str(r#"{"class":"dog","confidence":0.7,"bbox":[1,2,3,4]}"#).unwrap();
        assert_eq!(d.class_label, "dog");
        assert_eq!(d.bounding_box, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn round3_is_json_safe() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(f32::NAN), 0.0);
        assert_eq!(round3(f32::INFINITY), 0.0);
    }

    #[test]
    fn error_and_no_detection_never_vote() {
        assert!(!FrameResult::error("boom").votes());
        assert!(!FrameResult::no_detection().votes());
    }
}
