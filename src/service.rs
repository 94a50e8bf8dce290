//! Analysis service: the detectors, extractor, classifier, scorer and aggregator built once
//! at startup and shared read-only by every request.

use crate::config::{AppConfig, FramePipeline, VideoConfig};
use crate::error::AgentError;
use crate::features::{FeatureExtractor, KeypointSet};
use crate::media::{Frame, SamplingPolicy, TempMedia, VideoDecoder, VideoMetadata, VideoSource};
use crate::model::{FrameClassifier, ModelInfo};
use crate::results::{Detection, FrameLabel, FrameResult};
use crate::scene::{SceneScore, SceneScorer};
use crate::temporal::{AggregateVerdict, AggregationSession, TemporalAggregator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Single subject found by the pose detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDetection {
    pub keypoints: KeypointSet,
    /// Detector confidence for the subject box
    pub confidence: f32,
    #[serde(default)]
    pub bbox: [f32; 4],
}

/// External pose model. Must be reentrant or serialize internally.
pub trait PoseDetector: Send + Sync {
    fn detect_pose(&self, frame: &Frame) -> Result<Option<PoseDetection>, AgentError>;
}

/// External object model returning detections at or above `min_confidence`.
pub trait ObjectDetector: Send + Sync {
    fn detect_objects(&self, frame: &Frame, min_confidence: f32) -> Result<Vec<Detection>, AgentError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub frame: FrameResult,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveAnalysis {
    pub frame: FrameResult,
    pub dog_detected: bool,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub session_id: Uuid,
    pub verdict: AggregateVerdict,
    pub metadata: VideoMetadata,
    pub frames_read: u64,
    pub frames_processed: usize,
    pub frame_skip: usize,
    pub processing_time_ms: f64,
}

pub struct AnalysisService {
    pose: Option<Arc<dyn PoseDetector>>,
    objects: Option<Arc<dyn ObjectDetector>>,
    extractor: FeatureExtractor,
    classifier: FrameClassifier,
    scorer: SceneScorer,
    aggregator: TemporalAggregator,
    video: VideoConfig,
    detection_confidence: f32,
}

pub struct AnalysisServiceBuilder {
    config: AppConfig,
    pose: Option<Arc<dyn PoseDetector>>,
    objects: Option<Arc<dyn ObjectDetector>>,
    classifier: Option<FrameClassifier>,
}

impl AnalysisServiceBuilder {
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pose_detector(mut self, detector: Arc<dyn PoseDetector>) -> Self {
        self.pose = Some(detector);
        self
    }

    pub fn object_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.objects = Some(detector);
        self
    }

    pub fn classifier(mut self, classifier: FrameClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn build(self) -> Result<AnalysisService, AgentError> {
        self.config.validate()?;
        let AppConfig {
            features,
            scene,
            video,
            ..
        } = self.config;
        let service = AnalysisService {
            pose: self.pose,
            objects: self.objects,
            extractor: FeatureExtractor::new(features),
            classifier: self.classifier.unwrap_or_else(FrameClassifier::unavailable),
            aggregator: TemporalAggregator::new(scene.aggression_threshold),
            detection_confidence: scene.detection_confidence,
            scorer: SceneScorer::new(scene),
            video,
        };
        info!(info = ?service.model_info(), pipeline = ?service.video.pipeline, "analysis service ready");
        Ok(service)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

impl AnalysisService {
    pub fn builder() -> AnalysisServiceBuilder {
        AnalysisServiceBuilder {
            config: AppConfig::default(),
            pose: None,
            objects: None,
            classifier: None,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            image_classifier_loaded: self.classifier.is_loaded(),
            pose_detector_loaded: self.pose.is_some(),
            object_detector_loaded: self.objects.is_some(),
        }
    }

    pub fn scorer(&self) -> &SceneScorer {
        &self.scorer
    }

    /// Fresh aggregation for a live feed
    pub fn live_session(&self) -> AggregationSession {
        self.aggregator.session()
    }

    /// Pose path on detector output already in hand
    pub fn classify_pose(&self, detection: Option<PoseDetection>) -> FrameResult {
        let Some(pose) = detection else {
            return FrameResult::no_detection();
        };
        let features = self.extractor.extract(Some(&pose.keypoints));
        let c = self.classifier.classify(&features, pose.confidence);
        FrameResult {
            label: c.label,
            confidence: c.confidence,
            raw_score: None,
            detections: vec![Detection::new("dog", pose.confidence, pose.bbox)],
            subject_detected: true,
            reason: None,
            note: c.note,
            error: c.error,
        }
    }

    /// Scene path on detector output already in hand
    pub fn score_scene(&self, detections: Vec<Detection>) -> SceneScore {
        self.scorer.score(detections)
    }

    pub fn analyze_pose_frame(&self, frame: &Frame) -> FrameResult {
        let Some(detector) = &self.pose else {
            return unavailable("pose detector not loaded");
        };
        match detector.detect_pose(frame) {
            Ok(detection) => self.classify_pose(detection),
            Err(e) => {
                warn!(frame = frame.index, error = %e, "pose detection failed");
                FrameResult::error(e.to_string())
            }
        }
    }

    fn detect_scene(&self, frame: &Frame) -> Result<SceneScore, AgentError> {
        let detector = self
            .objects
            .as_ref()
            .ok_or_else(|| AgentError::Detector("object detector not loaded".into()))?;
        let detections = detector.detect_objects(frame, self.detection_confidence)?;
        Ok(self.scorer.score(detections))
    }

    pub fn analyze_scene_frame(&self, frame: &Frame) -> FrameResult {
        if self.objects.is_none() {
            return unavailable("object detector not loaded");
        }
        match self.detect_scene(frame) {
            Ok(score) => score.into_frame_result(),
            Err(e) => {
                warn!(frame = frame.index, error = %e, "object detection failed");
                FrameResult::error(e.to_string())
            }
        }
    }

    /// One frame through the configured video pipeline
    pub fn analyze_frame(&self, frame: &Frame) -> FrameResult {
        match self.video.pipeline {
            FramePipeline::Scene => self.analyze_scene_frame(frame),
            FramePipeline::Pose => self.analyze_pose_frame(frame),
        }
    }

    pub fn analyze_image(&self, frame: &Frame) -> ImageAnalysis {
        let start = Instant::now();
        let result = self.analyze_pose_frame(frame);
        info!(label = %result.label, confidence = result.confidence, "image analyzed");
        ImageAnalysis {
            frame: result,
            processing_time_ms: elapsed_ms(start),
        }
    }

    pub fn analyze_live_frame(&self, frame: &Frame) -> LiveAnalysis {
        let start = Instant::now();
        let (result, dog_detected) = if self.objects.is_none() {
            (unavailable("object detector not loaded"), false)
        } else {
            match self.detect_scene(frame) {
                Ok(score) => {
                    let dog = score.dog_detected;
                    (score.into_frame_result(), dog)
                }
                Err(e) => {
                    warn!(frame = frame.index, error = %e, "live frame detection failed");
                    (FrameResult::error(e.to_string()), false)
                }
            }
        };
        live_analysis(result, dog_detected, start)
    }

    /// Live path on detections already in hand
    pub fn analyze_live_detections(&self, detections: Vec<Detection>) -> LiveAnalysis {
        let start = Instant::now();
        let score = self.scorer.score(detections);
        let dog_detected = score.dog_detected;
        live_analysis(score.into_frame_result(), dog_detected, start)
    }

    /// Live pose path on detector output already in hand
    pub fn analyze_live_pose(&self, detection: Option<PoseDetection>) -> LiveAnalysis {
        let start = Instant::now();
        let result = self.classify_pose(detection);
        let dog_detected = result.subject_detected;
        live_analysis(result, dog_detected, start)
    }

    /// Read `source` in order, analyze sampled frames and vote.
    pub fn analyze_video(&self, source: &mut dyn VideoSource) -> VideoAnalysis {
        let start = Instant::now();
        let session_id = Uuid::new_v4();
        let metadata = source.metadata();
        let policy = SamplingPolicy {
            max_frames: self.video.max_frames,
            frame_skip: self.video.frame_skip,
        };
        info!(
            %session_id,
            total_frames = metadata.total_frames,
            fps = metadata.fps,
            duration_secs = metadata.duration_secs,
            "processing video"
        );

        let mut session = self.aggregator.session();
        let mut frames_read: u64 = 0;
        let mut processed = 0usize;
        while !policy.exhausted(processed) {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    // A broken stream ends the read; frames so far still vote
                    warn!(%session_id, frames_read, error = %e, "video decode failed");
                    session.push(&FrameResult::error(e.to_string()));
                    processed += 1;
                    break;
                }
            };
            if policy.samples(frames_read) {
                session.push(&self.analyze_frame(&frame));
                processed += 1;
                if processed % 20 == 0 {
                    info!(%session_id, processed, "video progress");
                }
            }
            frames_read += 1;
        }

        let verdict = session.finish();
        info!(
            %session_id,
            label = %verdict.final_label,
            confidence = verdict.final_confidence,
            "video analysis complete"
        );
        VideoAnalysis {
            session_id,
            verdict,
            metadata,
            frames_read,
            frames_processed: processed,
            frame_skip: policy.frame_skip,
            processing_time_ms: elapsed_ms(start),
        }
    }

    /// Uploaded video bytes: spill to a temp file, decode from its path, analyze. The temp
    /// file is gone by the time this returns, whatever the outcome.
    pub fn analyze_video_bytes(
        &self,
        bytes: &[u8],
        decoder: &dyn VideoDecoder,
    ) -> Result<VideoAnalysis, AgentError> {
        let media = TempMedia::write(bytes, ".mp4")?;
        let mut source = decoder.open(media.path())?;
        Ok(self.analyze_video(source.as_mut()))
    }

    /// Independent videos analyzed concurrently; results keep input order.
    pub async fn analyze_videos(
        self: Arc<Self>,
        sources: Vec<Box<dyn VideoSource>>,
    ) -> Vec<Result<VideoAnalysis, AgentError>> {
        let handles: Vec<_> = sources
            .into_iter()
            .map(|mut source| {
                let service = Arc::clone(&self);
                tokio::task::spawn_blocking(move || service.analyze_video(source.as_mut()))
            })
            .collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.map_err(|e| AgentError::Video(format!("analysis task failed: {e}"))));
        }
        out
    }
}

fn live_analysis(frame: FrameResult, dog_detected: bool, start: Instant) -> LiveAnalysis {
    LiveAnalysis {
        frame,
        dog_detected,
        timestamp: Utc::now(),
        source: "live_feed".to_string(),
        processing_time_ms: elapsed_ms(start),
    }
}

/// Neutral result for a missing model handle; the note keeps it distinguishable
fn unavailable(note: &str) -> FrameResult {
    FrameResult {
        label: FrameLabel::NoDetection,
        note: Some(note.to_string()),
        reason: None,
        ..FrameResult::no_detection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoDog;

    impl PoseDetector for NoDog {
        fn detect_pose(&self, _frame: &Frame) -> Result<Option<PoseDetection>, AgentError> {
            Ok(None)
        }
    }

    #[test]
    fn missing_pose_detector_is_neutral_with_note() {
        let svc = AnalysisService::builder().build().unwrap();
        let r = svc.analyze_image(&Frame::default()).frame;
        assert_eq!(r.label, FrameLabel::NoDetection);
        assert!(r.note.unwrap().contains("pose detector"));
    }

    #[test]
    fn no_dog_is_no_detection() {
        let svc = AnalysisService::builder()
            .pose_detector(Arc::new(NoDog))
            .build()
            .unwrap();
        let r = svc.analyze_image(&Frame::default()).frame;
        assert_eq!(r.label, FrameLabel::NoDetection);
        assert!(r.note.is_none());
        assert!(svc.model_info().pose_detector_loaded);
        assert!(!svc.model_info().image_classifier_loaded);
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let mut config = AppConfig::default();
        config.video.frame_skip = 0;
        assert!(AnalysisService::builder().config(config).build().is_err());
    }
}
