//! Frame-level behavior classification: preprocess → probabilities → label.
//! Falls back to detector confidence when no classifier is loaded.

use super::{Preprocessor, ProbabilityModel};
use crate::error::AgentError;
use crate::features::FeatureVector;
use crate::results::{round3, FrameLabel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class index order used at training time
const CLASS_LABELS: [FrameLabel; 2] = [FrameLabel::NonAggressive, FrameLabel::Aggressive];

const NOTE_NO_CLASSIFIER: &str = "classifier unavailable; label reflects detector confidence only";
const NOTE_NO_FEATURES: &str = "insufficient keypoints for classification; label reflects detector confidence only";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: FrameLabel,
    pub confidence: f32,
    /// No trained decision was made
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Classification {
    fn degraded(detector_confidence: f32, note: &str) -> Self {
        Self {
            label: FrameLabel::NonAggressive,
            confidence: if detector_confidence.is_finite() {
                detector_confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            degraded: true,
            note: Some(note.to_string()),
            error: None,
        }
    }

    fn failed(detail: String) -> Self {
        Self {
            label: FrameLabel::Error,
            confidence: 0.0,
            degraded: false,
            note: None,
            error: Some(detail),
        }
    }
}

struct LoadedClassifier {
    preprocessor: Preprocessor,
    model: Arc<dyn ProbabilityModel>,
}

/// Immutable after construction; shared by reference across requests.
pub struct FrameClassifier {
    loaded: Option<LoadedClassifier>,
}

impl FrameClassifier {
    pub fn new(preprocessor: Preprocessor, model: Arc<dyn ProbabilityModel>) -> Self {
        Self {
            loaded: Some(LoadedClassifier { preprocessor, model }),
        }
    }

    /// Degraded-only classifier
    pub fn unavailable() -> Self {
        Self { loaded: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn classify(&self, features: &FeatureVector, detector_confidence: f32) -> Classification {
        let Some(loaded) = &self.loaded else {
            tracing::warn!("no classifier loaded; degraded classification");
            return Classification::degraded(detector_confidence, NOTE_NO_CLASSIFIER);
        };
        if features.is_zero() {
            tracing::debug!("zero feature vector; degraded classification");
            return Classification::degraded(detector_confidence, NOTE_NO_FEATURES);
        }
        match predict(loaded, features) {
            Ok((label, confidence)) => Classification {
                label,
                confidence: round3(confidence),
                degraded: false,
                note: None,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "frame classification failed");
                Classification::failed(e.to_string())
            }
        }
    }
}

fn predict(loaded: &LoadedClassifier, features: &FeatureVector) -> Result<(FrameLabel, f32), AgentError> {
    let input = loaded.preprocessor.transform(features.as_slice())?;
    let probabilities = loaded.model.predict_proba(&input)?;
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(AgentError::Model("non-finite class probability".into()));
    }
    let (index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| AgentError::Model("empty probability output".into()))?;
    let label = CLASS_LABELS
        .get(index)
        .copied()
        .ok_or_else(|| AgentError::Model(format!("unexpected class index {index}")))?;
    Ok((label, confidence))
}
