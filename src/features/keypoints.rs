//! Dog pose landmarks as produced by the pose detector: 24 points, identity by position.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};

pub const KEYPOINT_COUNT: usize = 24;

pub const NOSE: usize = 0;
pub const LEFT_EAR: usize = 3;
pub const RIGHT_EAR: usize = 4;
pub const TAIL_BASE: usize = 21;
pub const TAIL_TIP: usize = 23;

/// Nose, eyes, ears
pub const HEAD: [usize; 5] = [0, 1, 2, 3, 4];
/// Shoulders, elbows, paws
pub const FRONT_LEGS: [usize; 6] = [5, 6, 7, 8, 9, 10];
pub const LEFT_FRONT: [usize; 3] = [5, 7, 9];
pub const RIGHT_FRONT: [usize; 3] = [6, 8, 10];
/// Hips, knees, paws
pub const HIND_LEGS: [usize; 6] = [11, 12, 13, 14, 15, 16];
pub const LEFT_HIND: [usize; 3] = [11, 13, 15];
pub const RIGHT_HIND: [usize; 3] = [12, 14, 16];
/// Neck and three back points
pub const SPINE: [usize; 4] = [17, 18, 19, 20];
/// Base, mid, tip
pub const TAIL: [usize; 3] = [21, 22, 23];
/// Left eye, ear and leg points
pub const LEFT_SIDE: [usize; 8] = [1, 3, 5, 7, 9, 11, 13, 15];
pub const RIGHT_SIDE: [usize; 8] = [2, 4, 6, 8, 10, 12, 14, 16];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_valid(&self, min_confidence: f32) -> bool {
        self.confidence > min_confidence
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// One detected subject. Serialized as `[[x, y, confidence]; 24]`, the detector's native layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f32; 3]>", into = "Vec<[f32; 3]>")]
pub struct KeypointSet {
    points: [Keypoint; KEYPOINT_COUNT],
}

impl KeypointSet {
    pub fn new(points: [Keypoint; KEYPOINT_COUNT]) -> Self {
        Self { points }
    }

    pub fn from_rows(rows: &[[f32; 3]]) -> Result<Self, AgentError> {
        if rows.len() != KEYPOINT_COUNT {
            return Err(AgentError::Detector(format!(
                "expected {KEYPOINT_COUNT} keypoints, got {}",
                rows.len()
            )));
        }
        let mut points = [Keypoint::default(); KEYPOINT_COUNT];
        for (p, r) in points.iter_mut().zip(rows) {
            *p = Keypoint::new(r[0], r[1], r[2]);
        }
        Ok(Self { points })
    }

    pub fn get(&self, index: usize) -> &Keypoint {
        &self.points[index]
    }

    pub fn points(&self) -> &[Keypoint] {
        &self.points
    }

    /// Landmarks at `indices` whose confidence clears `min_confidence`
    pub fn valid(&self, indices: &[usize], min_confidence: f32) -> Vec<Keypoint> {
        indices
            .iter()
            .map(|&i| self.points[i])
            .filter(|p| p.is_valid(min_confidence))
            .collect()
    }

    pub fn all_valid(&self, min_confidence: f32) -> Vec<Keypoint> {
        self.points
            .iter()
            .copied()
            .filter(|p| p.is_valid(min_confidence))
            .collect()
    }
}

impl TryFrom<Vec<[f32; 3]>> for KeypointSet {
    type Error = AgentError;

    fn try_from(rows: Vec<[f32; 3]>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<KeypointSet> for Vec<[f32; 3]> {
    fn from(set: KeypointSet) -> Self {
        set.points.iter().map(|p| [p.x, p.y, p.confidence]).collect()
    }
}
