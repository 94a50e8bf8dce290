//! Majority vote over per-frame results with a confidence / score tie-break.
//!
//! A session collects frames, then `finish` votes and returns the verdict, consuming the
//! session. The outcome depends only on the multiset of frames, never on their order:
//! confidences and scores are summed in sorted order and representative detections are
//! keyed by class.

use crate::results::{round3, Detection, FrameLabel, FrameResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REASON_EMPTY: &str = "No frames analyzed";
pub const REASON_NO_SUBJECT: &str = "No dog detected in analyzed frames";
pub const REASON_MAJORITY_CALM: &str = "No significant aggressive behavior detected";
pub const REASON_TIE_SCORE: &str = "Tie resolved by aggression score";
pub const REASON_TIE_CONFIDENCE: &str = "Tie resolved by confidence";
pub const REASON_TIE_CALM: &str = "Tie resolved - no clear aggressive behavior";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub aggressive: usize,
    pub non_aggressive: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub final_label: FrameLabel,
    pub final_confidence: f32,
    pub vote_counts: VoteCounts,
    /// Highest-confidence detection per class, ordered by class label
    pub representative_detections: Vec<Detection>,
    pub reason: String,
    pub frames_analyzed: usize,
    /// Frames that did not vote (no subject, no detection, error)
    pub frames_excluded: usize,
    /// Mean aggression score over analyzed frames, when frames carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_aggression_score: Option<f32>,
}

/// Stateless; `session()` starts a collection for one media source.
#[derive(Debug, Clone)]
pub struct TemporalAggregator {
    aggression_threshold: f32,
}

impl TemporalAggregator {
    pub fn new(aggression_threshold: f32) -> Self {
        Self { aggression_threshold }
    }

    pub fn session(&self) -> AggregationSession {
        AggregationSession {
            aggression_threshold: self.aggression_threshold,
            aggressive: Vec::new(),
            non_aggressive: Vec::new(),
            scores: Vec::new(),
            representatives: BTreeMap::new(),
            frames_analyzed: 0,
            frames_excluded: 0,
        }
    }

    pub fn aggregate(&self, frames: &[FrameResult]) -> AggregateVerdict {
        let mut session = self.session();
        for frame in frames {
            session.push(frame);
        }
        session.finish()
    }
}

#[derive(Debug, Clone)]
pub struct AggregationSession {
    aggression_threshold: f32,
    aggressive: Vec<f32>,
    non_aggressive: Vec<f32>,
    scores: Vec<f32>,
    representatives: BTreeMap<String, Detection>,
    frames_analyzed: usize,
    frames_excluded: usize,
}

/// Sum in ascending order so the result does not depend on arrival order
fn stable_mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    sorted.iter().sum::<f32>() / sorted.len() as f32
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Higher confidence wins; exact ties fall back to box coordinates so the pick is total
fn outranks(candidate: &Detection, current: &Detection) -> bool {
    match candidate.confidence.total_cmp(&current.confidence) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate
            .bounding_box
            .iter()
            .zip(&current.bounding_box)
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            == Some(std::cmp::Ordering::Greater),
    }
}

impl AggregationSession {
    pub fn push(&mut self, frame: &FrameResult) {
        self.frames_analyzed += 1;
        if let Some(score) = frame.raw_score {
            self.scores.push(finite_or_zero(score));
        }
        for d in &frame.detections {
            match self.representatives.get(&d.class_label) {
                Some(current) if !outranks(d, current) => {}
                _ => {
                    self.representatives.insert(d.class_label.clone(), d.clone());
                }
            }
        }
        if !frame.votes() {
            self.frames_excluded += 1;
            return;
        }
        let confidence = finite_or_zero(frame.confidence);
        match frame.label {
            FrameLabel::Aggressive => self.aggressive.push(confidence),
            _ => self.non_aggressive.push(confidence),
        }
    }

    pub fn vote_counts(&self) -> VoteCounts {
        VoteCounts {
            aggressive: self.aggressive.len(),
            non_aggressive: self.non_aggressive.len(),
        }
    }

    pub fn frames_analyzed(&self) -> usize {
        self.frames_analyzed
    }

    pub fn finish(self) -> AggregateVerdict {
        let votes = self.vote_counts();
        let mean_aggression_score = if self.scores.is_empty() {
            None
        } else {
            let mut sorted = self.scores.clone();
            sorted.sort_by(f32::total_cmp);
            Some(sorted.iter().sum::<f32>() / self.frames_analyzed as f32)
        };

        let (final_label, final_confidence, reason) = if self.frames_analyzed == 0 {
            (FrameLabel::NoDetection, 0.0, REASON_EMPTY.to_string())
        } else if votes.aggressive + votes.non_aggressive == 0 {
            (FrameLabel::NoDetection, 0.0, REASON_NO_SUBJECT.to_string())
        } else if votes.aggressive > votes.non_aggressive {
            (
                FrameLabel::Aggressive,
                stable_mean(&self.aggressive),
                format!(
                    "Aggressive behavior detected in {}/{} frames",
                    votes.aggressive, self.frames_analyzed
                ),
            )
        } else if votes.non_aggressive > votes.aggressive {
            (
                FrameLabel::NonAggressive,
                stable_mean(&self.non_aggressive),
                REASON_MAJORITY_CALM.to_string(),
            )
        } else {
            let aggressive_mean = stable_mean(&self.aggressive);
            let calm_mean = stable_mean(&self.non_aggressive);
            // The score signal, when present, overrides the confidence comparison
            if mean_aggression_score.is_some_and(|s| s >= self.aggression_threshold) {
                (FrameLabel::Aggressive, aggressive_mean, REASON_TIE_SCORE.to_string())
            } else if aggressive_mean >= calm_mean {
                (FrameLabel::Aggressive, aggressive_mean, REASON_TIE_CONFIDENCE.to_string())
            } else {
                (FrameLabel::NonAggressive, calm_mean, REASON_TIE_CALM.to_string())
            }
        };

        let verdict = AggregateVerdict {
            final_label,
            final_confidence: round3(final_confidence),
            vote_counts: votes,
            representative_detections: self.representatives.into_values().collect(),
            reason,
            frames_analyzed: self.frames_analyzed,
            frames_excluded: self.frames_excluded,
            mean_aggression_score: mean_aggression_score.map(round3),
        };
        tracing::info!(
            label = %verdict.final_label,
            confidence = verdict.final_confidence,
            aggressive_votes = votes.aggressive,
            non_aggressive_votes = votes.non_aggressive,
            frames = verdict.frames_analyzed,
            "temporal verdict"
        );
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> TemporalAggregator {
        TemporalAggregator::new(0.5)
    }

    fn vote(label: FrameLabel, confidence: f32) -> FrameResult {
        FrameResult {
            label,
            confidence,
            raw_score: None,
            detections: vec![Detection::new("dog", confidence, [0.0, 0.0, 1.0, 1.0])],
            subject_detected: true,
            reason: None,
            note: None,
            error: None,
        }
    }

    fn scored(label: FrameLabel, confidence: f32, score: f32) -> FrameResult {
        FrameResult {
            raw_score: Some(score),
            ..vote(label, confidence)
        }
    }

    #[test]
    fn empty_sequence_is_no_detection() {
        let v = aggregator().aggregate(&[]);
        assert_eq!(v.final_label, FrameLabel::NoDetection);
        assert_eq!(v.final_confidence, 0.0);
        assert_eq!(v.vote_counts, VoteCounts::default());
        assert_eq!(v.frames_analyzed, 0);
    }

    #[test]
    fn only_excluded_frames_is_no_detection() {
        let frames = vec![FrameResult::no_detection(), FrameResult::error("decode"), FrameResult::no_detection()];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::NoDetection);
        assert_eq!(v.frames_analyzed, 3);
        assert_eq!(v.frames_excluded, 3);
        assert_eq!(v.reason, REASON_NO_SUBJECT);
    }

    #[test]
    fn majority_uses_winning_subset_mean() {
        let frames = vec![
            vote(FrameLabel::NonAggressive, 0.9),
            vote(FrameLabel::NonAggressive, 0.7),
            vote(FrameLabel::Aggressive, 0.2),
        ];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::NonAggressive);
        assert_eq!(v.final_confidence, 0.8);
        assert_eq!(v.vote_counts.non_aggressive, 2);
        assert_eq!(v.vote_counts.aggressive, 1);
    }

    #[test]
    fn tie_goes_to_higher_mean_confidence() {
        let frames = vec![
            vote(FrameLabel::Aggressive, 0.9),
            vote(FrameLabel::Aggressive, 0.8),
            vote(FrameLabel::Aggressive, 0.7),
            vote(FrameLabel::NonAggressive, 0.4),
            vote(FrameLabel::NonAggressive, 0.3),
            vote(FrameLabel::NonAggressive, 0.2),
        ];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::Aggressive);
        assert!((v.final_confidence - 0.8).abs() < 1e-6);
        assert_eq!(v.reason, REASON_TIE_CONFIDENCE);
    }

    #[test]
    fn tie_toward_calm_without_score_signal() {
        let frames = vec![vote(FrameLabel::Aggressive, 0.3), vote(FrameLabel::NonAggressive, 0.9)];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::NonAggressive);
        assert_eq!(v.final_confidence, 0.9);
        assert_eq!(v.reason, REASON_TIE_CALM);
    }

    #[test]
    fn score_override_beats_confidence_on_tie() {
        let frames = vec![
            scored(FrameLabel::Aggressive, 0.3, 1.2),
            scored(FrameLabel::NonAggressive, 0.9, 0.0),
        ];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::Aggressive);
        assert_eq!(v.final_confidence, 0.3);
        assert_eq!(v.reason, REASON_TIE_SCORE);
        assert_eq!(v.mean_aggression_score, Some(0.6));
    }

    #[test]
    fn low_score_does_not_override() {
        let frames = vec![
            scored(FrameLabel::Aggressive, 0.3, 0.5),
            scored(FrameLabel::NonAggressive, 0.9, 0.0),
        ];
        assert_eq!(aggregator().aggregate(&frames).final_label, FrameLabel::NonAggressive);
    }

    #[test]
    fn excluded_frames_count_but_do_not_vote() {
        let mut empty_scene = vote(FrameLabel::NonAggressive, 0.0);
        empty_scene.detections.clear();
        empty_scene.subject_detected = false;
        let frames = vec![
            vote(FrameLabel::Aggressive, 0.6),
            empty_scene.clone(),
            empty_scene,
            FrameResult::error("boom"),
        ];
        let v = aggregator().aggregate(&frames);
        assert_eq!(v.final_label, FrameLabel::Aggressive);
        assert_eq!(v.vote_counts.non_aggressive, 0);
        assert_eq!(v.frames_analyzed, 4);
        assert_eq!(v.frames_excluded, 3);
        assert_eq!(v.reason, "Aggressive behavior detected in 1/4 frames");
    }

    #[test]
    fn representatives_keep_best_per_class() {
        let mut a = vote(FrameLabel::Aggressive, 0.6);
        a.detections = vec![
            Detection::new("dog", 0.5, [0.0; 4]),
            Detection::new("chasing dog", 0.7, [1.0; 4]),
        ];
        let mut b = vote(FrameLabel::Aggressive, 0.6);
        b.detections = vec![Detection::new("dog", 0.9, [2.0; 4])];
        let v = aggregator().aggregate(&[a, b]);
        let classes: Vec<&str> = v.representative_detections.iter().map(|d| d.class_label.as_str()).collect();
        assert_eq!(classes, vec!["chasing dog", "dog"]);
        assert_eq!(v.representative_detections[1].confidence, 0.9);
    }

    #[test]
    fn permutations_give_identical_verdicts() {
        let frames = vec![
            scored(FrameLabel::Aggressive, 0.91, 0.7),
            scored(FrameLabel::NonAggressive, 0.33, 0.1),
            scored(FrameLabel::Aggressive, 0.57, 0.55),
            FrameResult::error("bad frame"),
            scored(FrameLabel::NonAggressive, 0.72, 0.0),
            FrameResult::no_detection(),
        ];
        let expected = aggregator().aggregate(&frames);
        let mut rotated = frames.clone();
        for _ in 0..frames.len() {
            rotated.rotate_left(1);
            assert_eq!(aggregator().aggregate(&rotated), expected);
        }
        let mut reversed = frames.clone();
        reversed.reverse();
        assert_eq!(aggregator().aggregate(&reversed), expected);
    }
}
