//! Behavioral posture features from one keypoint set.
//!
//! Spatial values are divided by the confident-landmark bounding box so the vector does not
//! depend on image resolution. Each body region degrades to zeros on its own when its
//! landmarks are not confident.

use super::keypoints::{self, Keypoint, KeypointSet, KEYPOINT_COUNT};
use crate::config::FeaturesConfig;
use serde::{Deserialize, Serialize};

/// Number of slots actually derived from landmarks; the rest of the vector is zero padding.
pub const DERIVED_FEATURES: usize = 28;

const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralFeatures {
    /// Box width, height, area, aspect ratio (pixels; these are the normalizers)
    pub geometry: [f32; 4],
    /// Forward lean, head height, head spread
    pub head: [f32; 3],
    /// Stance width, height spread, left/right asymmetry
    pub front_legs: [f32; 3],
    pub hind_legs: [f32; 3],
    /// Deviation from linear fit, absolute slope
    pub spine: [f32; 2],
    /// Relative height, stiffness, base-to-tip angle / pi
    pub tail: [f32; 3],
    pub symmetry: f32,
    /// Mean landmark confidence, high-confidence ratio, body compactness
    pub tension: [f32; 3],
    pub nose_lean: f32,
    pub front_hind_balance: f32,
    /// Nose-to-tail distance, alignment
    pub head_tail: [f32; 2],
    /// Ear height, ear spread
    pub ears: [f32; 2],
}

/// Confident-landmark bounding box and centroid.
#[derive(Debug, Clone, Copy)]
struct BodyFrame {
    width: f32,
    height: f32,
    center_x: f32,
    center_y: f32,
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

/// Population variance
fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32
}

fn std_dev(values: &[f32]) -> f32 {
    variance(values).sqrt()
}

fn xs(points: &[Keypoint]) -> Vec<f32> {
    points.iter().map(|p| p.x).collect()
}

fn ys(points: &[Keypoint]) -> Vec<f32> {
    points.iter().map(|p| p.y).collect()
}

fn centroid(points: &[Keypoint]) -> (f32, f32) {
    (mean(points.iter().map(|p| p.x)), mean(points.iter().map(|p| p.y)))
}

fn span(values: &[f32]) -> f32 {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    max - min
}

/// Distance between the centroids of two sides, zero if either side is empty
fn side_gap(left: &[Keypoint], right: &[Keypoint]) -> Option<f32> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    let (lx, ly) = centroid(left);
    let (rx, ry) = centroid(right);
    Some(((lx - rx).powi(2) + (ly - ry).powi(2)).sqrt())
}

/// Least-squares line y = slope * x + intercept; None when all x coincide
fn linear_fit(points: &[Keypoint]) -> Option<(f32, f32)> {
    let mx = mean(points.iter().map(|p| p.x));
    let my = mean(points.iter().map(|p| p.y));
    let sxx: f32 = points.iter().map(|p| (p.x - mx).powi(2)).sum();
    if sxx <= f32::EPSILON {
        return None;
    }
    let sxy: f32 = points.iter().map(|p| (p.x - mx) * (p.y - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

impl BehavioralFeatures {
    /// Derive features, or None when the subject is too sparse to measure
    pub fn from_keypoints(kps: &KeypointSet, config: &FeaturesConfig) -> Option<Self> {
        let min_conf = config.keypoint_confidence;
        let confident = kps.all_valid(min_conf);
        if confident.len() < config.min_confident_keypoints {
            return None;
        }

        let x_all = xs(&confident);
        let y_all = ys(&confident);
        let width = span(&x_all);
        let height = span(&y_all);
        if width == 0.0 || height == 0.0 || !width.is_finite() || !height.is_finite() {
            return None;
        }
        let (center_x, center_y) = centroid(&confident);
        let body = BodyFrame {
            width,
            height,
            center_x,
            center_y,
        };

        let valid_front = kps.valid(&keypoints::FRONT_LEGS, min_conf);
        let valid_hind = kps.valid(&keypoints::HIND_LEGS, min_conf);

        let mut f = BehavioralFeatures {
            geometry: [width, height, width * height, width / height],
            head: head_features(&kps.valid(&keypoints::HEAD, min_conf), body),
            front_legs: leg_features(
                &valid_front,
                &kps.valid(&keypoints::LEFT_FRONT, min_conf),
                &kps.valid(&keypoints::RIGHT_FRONT, min_conf),
                body,
            ),
            hind_legs: leg_features(
                &valid_hind,
                &kps.valid(&keypoints::LEFT_HIND, min_conf),
                &kps.valid(&keypoints::RIGHT_HIND, min_conf),
                body,
            ),
            spine: spine_features(&kps.valid(&keypoints::SPINE, min_conf), body),
            tail: tail_features(kps, min_conf, body),
            symmetry: side_gap(
                &kps.valid(&keypoints::LEFT_SIDE, min_conf),
                &kps.valid(&keypoints::RIGHT_SIDE, min_conf),
            )
            .map(|d| d / width)
            .unwrap_or(0.0),
            tension: tension_features(kps, &confident, config, body),
            ..Default::default()
        };

        let nose = kps.get(keypoints::NOSE);
        if nose.is_valid(min_conf) {
            f.nose_lean = nose.distance_to(center_x, center_y) / width;
        }

        if !valid_front.is_empty() && !valid_hind.is_empty() {
            let front_y = mean(valid_front.iter().map(|p| p.y));
            let hind_y = mean(valid_hind.iter().map(|p| p.y));
            f.front_hind_balance = (hind_y - front_y) / height;
        }

        let tail_base = kps.get(keypoints::TAIL_BASE);
        if nose.is_valid(min_conf) && tail_base.is_valid(min_conf) {
            let distance = nose.distance_to(tail_base.x, tail_base.y) / width;
            f.head_tail = [distance, distance / (width + height)];
        }

        let (left_ear, right_ear) = (kps.get(keypoints::LEFT_EAR), kps.get(keypoints::RIGHT_EAR));
        if left_ear.is_valid(min_conf) && right_ear.is_valid(min_conf) {
            let ear_y = (left_ear.y + right_ear.y) / 2.0;
            f.ears = [(center_y - ear_y) / height, (left_ear.x - right_ear.x).abs() / width];
        }

        Some(f)
    }

    /// Encode to a fixed-dim vector for model input; non-finite slots become zero
    pub fn to_vector(&self, dim: usize) -> Vec<f32> {
        let mut raw: Vec<f32> = Vec::with_capacity(DERIVED_FEATURES);
        raw.extend_from_slice(&self.geometry);
        raw.extend_from_slice(&self.head);
        raw.extend_from_slice(&self.front_legs);
        raw.extend_from_slice(&self.hind_legs);
        raw.extend_from_slice(&self.spine);
        raw.extend_from_slice(&self.tail);
        raw.push(self.symmetry);
        raw.extend_from_slice(&self.tension);
        raw.push(self.nose_lean);
        raw.push(self.front_hind_balance);
        raw.extend_from_slice(&self.head_tail);
        raw.extend_from_slice(&self.ears);

        // Pad or truncate to dim
        let mut out = vec![0.0f32; dim];
        let copy = raw.len().min(dim);
        for (o, v) in out[..copy].iter_mut().zip(&raw[..copy]) {
            *o = if v.is_finite() { *v } else { 0.0 };
        }
        out
    }
}

fn head_features(head: &[Keypoint], body: BodyFrame) -> [f32; 3] {
    if head.is_empty() {
        return [0.0; 3];
    }
    let (hx, hy) = centroid(head);
    let spread = if head.len() > 1 {
        let coords: Vec<f32> = head.iter().flat_map(|p| [p.x, p.y]).collect();
        std_dev(&coords) / body.width
    } else {
        0.0
    };
    [
        (hx - body.center_x) / body.width,
        (body.center_y - hy) / body.height,
        spread,
    ]
}

fn leg_features(legs: &[Keypoint], left: &[Keypoint], right: &[Keypoint], body: BodyFrame) -> [f32; 3] {
    if legs.len() < 2 {
        return [0.0; 3];
    }
    let stance = span(&xs(legs)) / body.width;
    let height_spread = std_dev(&ys(legs)) / body.height;
    let asymmetry = side_gap(left, right).map(|d| d / body.width).unwrap_or(0.0);
    [stance, height_spread, asymmetry]
}

fn spine_features(spine: &[Keypoint], body: BodyFrame) -> [f32; 2] {
    if spine.len() < 3 {
        return [0.0; 2];
    }
    let Some((slope, intercept)) = linear_fit(spine) else {
        return [0.0; 2];
    };
    let deviation = mean(spine.iter().map(|p| (p.y - (slope * p.x + intercept)).abs())) / body.height;
    [deviation, slope.abs()]
}

fn tail_features(kps: &KeypointSet, min_conf: f32, body: BodyFrame) -> [f32; 3] {
    let tail = kps.valid(&keypoints::TAIL, min_conf);
    if tail.len() < 2 {
        return [0.0; 3];
    }
    let relative_height = (body.center_y - mean(tail.iter().map(|p| p.y))) / body.height;

    // Low positional variance = stiff tail; epsilon keeps a perfectly static tail finite
    let x_var = variance(&xs(&tail)) / body.width.powi(2);
    let y_var = variance(&ys(&tail)) / body.height.powi(2);
    let stiffness = 1.0 / (x_var + y_var + EPSILON);

    let (base, tip) = (kps.get(keypoints::TAIL_BASE), kps.get(keypoints::TAIL_TIP));
    let angle = if tail.len() > 2 && base.is_valid(min_conf) && tip.is_valid(min_conf) {
        (tip.y - base.y).atan2(tip.x - base.x) / std::f32::consts::PI
    } else {
        0.0
    };
    [relative_height, stiffness, angle]
}

fn tension_features(
    kps: &KeypointSet,
    confident: &[Keypoint],
    config: &FeaturesConfig,
    body: BodyFrame,
) -> [f32; 3] {
    let avg_confidence = mean(kps.points().iter().map(|p| p.confidence));
    let high = kps
        .points()
        .iter()
        .filter(|p| p.confidence > config.high_confidence)
        .count();
    let high_ratio = high as f32 / KEYPOINT_COUNT as f32;
    let compactness = if confident.len() > 5 {
        let x_std = std_dev(&xs(confident)) / body.width;
        let y_std = std_dev(&ys(confident)) / body.height;
        1.0 / (x_std + y_std + EPSILON)
    } else {
        0.0
    };
    [avg_confidence, high_ratio, compactness]
}
