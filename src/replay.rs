//! Recorded detector output, replayed through the detector traits. Lets the binary and the
//! tests drive the full pipeline without model weights.

use crate::error::AgentError;
use crate::media::{Frame, VideoMetadata, VideoSource};
use crate::results::Detection;
use crate::service::{ObjectDetector, PoseDetection, PoseDetector};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedDetection {
    /// Label as emitted by the detector; takes precedence over `class_id`
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    /// Class index, mapped through `scene.class_names`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<usize>,
    pub confidence: f32,
    #[serde(default)]
    pub bbox: [f32; 4],
}

/// One frame of detector output. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseDetection>,
    #[serde(default)]
    pub detections: Vec<RecordedDetection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub fps: f64,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Resolve recorded detections into labelled records
pub fn resolve_detections(
    recorded: &[RecordedDetection],
    class_names: &[String],
    min_confidence: f32,
) -> Result<Vec<Detection>, AgentError> {
    recorded
        .iter()
        .filter(|d| d.confidence >= min_confidence)
        .map(|d| {
            let label = match (&d.class_label, d.class_id) {
                (Some(label), _) => label.clone(),
                (None, Some(id)) => class_names
                    .get(id)
                    .cloned()
                    .ok_or_else(|| AgentError::Detector(format!("unknown class id {id}")))?,
                (None, None) => return Err(AgentError::Detector("detection without class".into())),
            };
            Ok(Detection::new(label, d.confidence, d.bbox))
        })
        .collect()
}

pub struct ReplayDetector {
    frames: Vec<RecordedFrame>,
    class_names: Vec<String>,
}

impl ReplayDetector {
    pub fn new(recording: &Recording, class_names: Vec<String>) -> Self {
        Self {
            frames: recording.frames.clone(),
            class_names,
        }
    }

    fn frame(&self, frame: &Frame) -> Result<&RecordedFrame, AgentError> {
        usize::try_from(frame.index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .ok_or_else(|| AgentError::Detector(format!("no recorded output for frame {}", frame.index)))
    }
}

impl PoseDetector for ReplayDetector {
    fn detect_pose(&self, frame: &Frame) -> Result<Option<PoseDetection>, AgentError> {
        Ok(self.frame(frame)?.pose.clone())
    }
}

impl ObjectDetector for ReplayDetector {
    fn detect_objects(&self, frame: &Frame, min_confidence: f32) -> Result<Vec<Detection>, AgentError> {
        resolve_detections(&self.frame(frame)?.detections, &self.class_names, min_confidence)
    }
}

/// Emits one empty frame per recorded frame, indexed in order
pub struct ReplaySource {
    next: u64,
    metadata: VideoMetadata,
}

impl ReplaySource {
    pub fn new(recording: &Recording) -> Self {
        Self {
            next: 0,
            metadata: VideoMetadata::new(recording.frames.len() as u64, recording.fps),
        }
    }
}

impl VideoSource for ReplaySource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, AgentError> {
        if self.next >= self.metadata.total_frames {
            return Ok(None);
        }
        let frame = Frame::new(self.next, 0, 0, Vec::new());
        self.next += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        crate::config::SceneConfig::default().class_names
    }

    #[test]
    fn class_ids_map_through_names() {
        let recorded = vec![
            RecordedDetection {
                class_id: Some(3),
                confidence: 0.7,
                ..Default::default()
            },
            RecordedDetection {
                class_label: Some("dog".into()),
                confidence: 0.1,
                ..Default::default()
            },
        ];
        let dets = resolve_detections(&recorded, &names(), 0.25).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_label, "dog biting child");
    }

    #[test]
    fn unknown_class_id_is_detector_error() {
        let recorded = vec![RecordedDetection {
            class_id: Some(42),
            confidence: 0.9,
            ..Default::default()
        }];
        assert!(matches!(
            resolve_detections(&recorded, &names(), 0.25),
            Err(AgentError::Detector(_))
        ));
    }

    #[test]
    fn source_yields_each_recorded_frame() {
        let recording = Recording {
            fps: 10.0,
            frames: vec![RecordedFrame::default(); 3],
        };
        let mut source = ReplaySource::new(&recording);
        assert_eq!(source.metadata().duration_secs, 0.3);
        let mut indices = Vec::new();
        while let Some(f) = source.next_frame().unwrap() {
            indices.push(f.index);
        }
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
