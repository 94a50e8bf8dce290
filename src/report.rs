//! JSON shapes handed to the HTTP caller. Canonical results carry one field per value; the
//! legacy duplicate keys (`classification` / `prediction` / `result`) exist only here.

use crate::media::VideoMetadata;
use crate::results::{Detection, FrameLabel, FrameResult};
use crate::service::{ImageAnalysis, LiveAnalysis, VideoAnalysis};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Upper-case scene classification string
pub fn classification_str(label: FrameLabel) -> &'static str {
    match label {
        FrameLabel::Aggressive => "AGGRESSIVE",
        FrameLabel::NonAggressive => "NON-AGGRESSIVE",
        FrameLabel::NoDetection => "NO DETECTION",
        FrameLabel::Error => "ERROR",
    }
}

/// Title-case prediction string
pub fn prediction_str(label: FrameLabel) -> &'static str {
    match label {
        FrameLabel::Aggressive => "Aggressive",
        FrameLabel::NonAggressive => "Non-Aggressive",
        FrameLabel::NoDetection => "No Detection",
        FrameLabel::Error => "Error",
    }
}

#[derive(Debug, Serialize)]
pub struct FrameReport<'a> {
    pub classification: &'static str,
    pub prediction: &'static str,
    pub confidence: f32,
    pub dog_detected: bool,
    pub detections: &'a [Detection],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggression_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a FrameResult> for FrameReport<'a> {
    fn from(r: &'a FrameResult) -> Self {
        Self {
            classification: classification_str(r.label),
            prediction: prediction_str(r.label),
            confidence: r.confidence,
            dog_detected: r.subject_detected,
            detections: &r.detections,
            aggression_score: r.raw_score,
            reason: r.reason.as_deref(),
            note: r.note.as_deref(),
            error: r.error.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageReport<'a> {
    pub result: &'static str,
    #[serde(flatten)]
    pub frame: FrameReport<'a>,
    pub processing_time: f64,
}

impl<'a> From<&'a ImageAnalysis> for ImageReport<'a> {
    fn from(a: &'a ImageAnalysis) -> Self {
        Self {
            result: prediction_str(a.frame.label),
            frame: FrameReport::from(&a.frame),
            processing_time: a.processing_time_ms / 1000.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LiveReport<'a> {
    #[serde(flatten)]
    pub frame: FrameReport<'a>,
    pub timestamp: DateTime<Utc>,
    pub source: &'a str,
    pub processing_time: f64,
}

impl<'a> From<&'a LiveAnalysis> for LiveReport<'a> {
    fn from(a: &'a LiveAnalysis) -> Self {
        let mut frame = FrameReport::from(&a.frame);
        frame.dog_detected = a.dog_detected;
        Self {
            frame,
            timestamp: a.timestamp,
            source: &a.source,
            processing_time: a.processing_time_ms / 1000.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FrameAnalysisReport {
    pub aggressive_votes: usize,
    pub non_aggressive_votes: usize,
    pub frames_excluded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_aggression_score: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct VideoMetadataReport {
    pub duration: f64,
    pub fps: f64,
    pub total_frames: u64,
    pub frames_processed: usize,
    pub frame_skip: usize,
}

#[derive(Debug, Serialize)]
pub struct VerdictReport<'a> {
    pub session_id: Uuid,
    pub classification: &'static str,
    pub prediction: &'static str,
    pub confidence: f32,
    pub detections: &'a [Detection],
    pub reason: &'a str,
    pub frame_analysis: FrameAnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_metadata: Option<VideoMetadataReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

impl<'a> VerdictReport<'a> {
    pub fn new(session_id: Uuid, verdict: &'a crate::temporal::AggregateVerdict) -> Self {
        Self {
            session_id,
            classification: classification_str(verdict.final_label),
            prediction: prediction_str(verdict.final_label),
            confidence: verdict.final_confidence,
            detections: &verdict.representative_detections,
            reason: &verdict.reason,
            frame_analysis: FrameAnalysisReport {
                aggressive_votes: verdict.vote_counts.aggressive,
                non_aggressive_votes: verdict.vote_counts.non_aggressive,
                frames_excluded: verdict.frames_excluded,
                average_aggression_score: verdict.mean_aggression_score,
            },
            video_metadata: None,
            processing_time: None,
        }
    }

    fn with_video(mut self, metadata: &VideoMetadata, frames_processed: usize, frame_skip: usize) -> Self {
        self.video_metadata = Some(VideoMetadataReport {
            duration: metadata.duration_secs,
            fps: metadata.fps,
            total_frames: metadata.total_frames,
            frames_processed,
            frame_skip,
        });
        self
    }
}

impl<'a> From<&'a VideoAnalysis> for VerdictReport<'a> {
    fn from(a: &'a VideoAnalysis) -> Self {
        let mut report = VerdictReport::new(a.session_id, &a.verdict).with_video(
            &a.metadata,
            a.frames_processed,
            a.frame_skip,
        );
        report.processing_time = Some(a.processing_time_ms / 1000.0);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TemporalAggregator;

    #[test]
    fn frame_report_carries_both_legacy_keys() {
        let r = FrameResult {
            label: FrameLabel::Aggressive,
            confidence: 0.8,
            raw_score: Some(0.6),
            detections: vec![Detection::new("dog biting child", 0.6, [1.0, 2.0, 3.0, 4.0])],
            subject_detected: true,
            reason: Some("Critical: Dog biting child detected".into()),
            note: None,
            error: None,
        };
        let json = serde_json::to_value(FrameReport::from(&r)).unwrap();
        assert_eq!(json["classification"], "AGGRESSIVE");
        assert_eq!(json["prediction"], "Aggressive");
        assert_eq!(json["detections"][0]["class"], "dog biting child");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn empty_verdict_report_serializes() {
        let verdict = TemporalAggregator::new(0.5).aggregate(&[]);
        let json = serde_json::to_value(VerdictReport::new(Uuid::nil(), &verdict)).unwrap();
        assert_eq!(json["classification"], "NO DETECTION");
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["frame_analysis"]["aggressive_votes"], 0);
        assert!(json.get("video_metadata").is_none());
    }
}
