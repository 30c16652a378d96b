//! Geometry extraction
//!
//! Pure functions mapping one landmark frame to scalar measurements. Nothing
//! here keeps state. Extraction fails closed: a frame missing a required
//! landmark, carrying non-finite coordinates, or with a collapsed eye yields
//! `None` and is treated exactly like a frame without a face.

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeIndices, Landmark, LandmarkFrame, LandmarkTopology};

/// Distances below this are treated as degenerate
const MIN_SPAN: f64 = 1e-6;

/// Landmarks are normalized image coordinates; anything beyond this is garbage
const MAX_COORDINATE: f64 = 1e3;

/// Scalar measurements extracted from one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeasurements {
    /// Head yaw ratio in roughly [-1, 1]; negative when the nose is nearer the left ear
    pub yaw: f64,
    /// Head pitch ratio: nose height relative to the ear line, over the chin span
    pub pitch: f64,
    pub left_eye_openness: f64,
    pub right_eye_openness: f64,
    /// Sum of both eyes' horizontal iris offsets from center (0 = centered)
    pub gaze_deviation: f64,
    /// Inner lip gap in normalized image units
    pub mouth_aperture: f64,
    /// Whether real iris landmarks were used for gaze (false = eye-center fallback)
    pub iris_tracked: bool,
}

impl FrameMeasurements {
    pub fn mean_eye_openness(&self) -> f64 {
        (self.left_eye_openness + self.right_eye_openness) / 2.0
    }
}

/// Head pose ratios
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
}

/// Extract every measurement, or `None` when the frame is unusable
pub fn extract(frame: &LandmarkFrame, topology: &LandmarkTopology) -> Option<FrameMeasurements> {
    if frame.len() < topology.min_points() {
        return None;
    }
    let required_finite = topology
        .required_indices()
        .iter()
        .all(|&i| frame.get(i).is_some_and(is_usable));
    if !required_finite {
        return None;
    }

    let pose = head_pose(frame, topology)?;
    let left_eye_openness = eye_openness(frame, &topology.left_eye)?;
    let right_eye_openness = eye_openness(frame, &topology.right_eye)?;
    let (gaze_deviation, iris_tracked) = gaze_deviation(frame, topology)?;
    let mouth_aperture = mouth_aperture(frame, topology)?;

    let all_finite = [
        pose.yaw,
        pose.pitch,
        left_eye_openness,
        right_eye_openness,
        gaze_deviation,
        mouth_aperture,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !all_finite {
        return None;
    }

    Some(FrameMeasurements {
        yaw: pose.yaw,
        pitch: pose.pitch,
        left_eye_openness,
        right_eye_openness,
        gaze_deviation,
        mouth_aperture,
        iris_tracked,
    })
}

/// Finite and within the normalized coordinate range
fn is_usable(p: &Landmark) -> bool {
    p.is_finite()
        && p.x.abs() <= MAX_COORDINATE
        && p.y.abs() <= MAX_COORDINATE
        && p.z.abs() <= MAX_COORDINATE
}

/// Head yaw and pitch ratios.
///
/// Degenerate denominators (ears on top of each other, chin on the ear line)
/// produce a neutral 0 for that axis.
pub fn head_pose(frame: &LandmarkFrame, topology: &LandmarkTopology) -> Option<HeadPose> {
    let nose = frame.get(topology.nose_tip)?;
    let chin = frame.get(topology.chin)?;
    let left_ear = frame.get(topology.left_ear_tragus)?;
    let right_ear = frame.get(topology.right_ear_tragus)?;

    let dist_left = nose.planar_distance(left_ear);
    let dist_right = nose.planar_distance(right_ear);
    let ear_sum = dist_left + dist_right;
    let yaw = if ear_sum > MIN_SPAN {
        (dist_left - dist_right) / ear_sum
    } else {
        0.0
    };

    let ear_mid_y = (left_ear.y + right_ear.y) / 2.0;
    let chin_span = (chin.y - ear_mid_y).abs();
    let pitch = if chin_span > MIN_SPAN {
        (nose.y - ear_mid_y) / chin_span
    } else {
        0.0
    };

    Some(HeadPose { yaw, pitch })
}

/// Vertical eyelid gap over eye width; `None` when the eye width collapses
pub fn eye_openness(frame: &LandmarkFrame, eye: &EyeIndices) -> Option<f64> {
    let top = frame.get(eye.top)?;
    let bottom = frame.get(eye.bottom)?;
    let width = eye_width(frame, eye)?;
    Some(top.planar_distance(bottom) / width)
}

fn eye_width(frame: &LandmarkFrame, eye: &EyeIndices) -> Option<f64> {
    let left = frame.get(eye.left_corner)?;
    let right = frame.get(eye.right_corner)?;
    let width = left.planar_distance(right);
    (width > MIN_SPAN).then_some(width)
}

/// Gaze deviation and whether iris landmarks were available.
///
/// Without iris points each eye's geometric center stands in for the iris,
/// which pulls the deviation toward 0 (centered). The flag lets callers see
/// when that bias applies.
pub fn gaze_deviation(frame: &LandmarkFrame, topology: &LandmarkTopology) -> Option<(f64, bool)> {
    let left_iris = iris_center(frame, &topology.left_iris);
    let right_iris = iris_center(frame, &topology.right_iris);
    let iris_tracked = left_iris.is_some() && right_iris.is_some();

    let (left_x, right_x) = match (left_iris, right_iris) {
        (Some(l), Some(r)) => (l, r),
        _ => (
            eye_center_x(frame, &topology.left_eye)?,
            eye_center_x(frame, &topology.right_eye)?,
        ),
    };

    let left_norm = normalize_in_eye(frame, &topology.left_eye, left_x)?;
    let right_norm = normalize_in_eye(frame, &topology.right_eye, right_x)?;
    let deviation = (left_norm - 0.5).abs() + (right_norm - 0.5).abs();
    Some((deviation, iris_tracked))
}

/// Centroid x of the iris points present in the frame
fn iris_center(frame: &LandmarkFrame, iris: &[usize; 5]) -> Option<f64> {
    let points: Vec<&Landmark> = iris
        .iter()
        .filter_map(|&i| frame.get(i))
        .filter(|p| is_usable(p))
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64)
}

fn eye_center_x(frame: &LandmarkFrame, eye: &EyeIndices) -> Option<f64> {
    let points = [eye.top, eye.bottom, eye.left_corner, eye.right_corner]
        .iter()
        .map(|&i| frame.get(i).map(|p| p.x))
        .collect::<Option<Vec<f64>>>()?;
    Some(points.iter().sum::<f64>() / points.len() as f64)
}

/// Position of `x` between the eye corners, clamped to [0, 1]
fn normalize_in_eye(frame: &LandmarkFrame, eye: &EyeIndices, x: f64) -> Option<f64> {
    let left = frame.get(eye.left_corner)?;
    let right = frame.get(eye.right_corner)?;
    let span = right.x - left.x;
    if span.abs() <= MIN_SPAN {
        return None;
    }
    Some(((x - left.x) / span).clamp(0.0, 1.0))
}

/// Distance between the inner upper and lower lip
pub fn mouth_aperture(frame: &LandmarkFrame, topology: &LandmarkTopology) -> Option<f64> {
    let upper = frame.get(topology.upper_inner_lip)?;
    let lower = frame.get(topology.lower_inner_lip)?;
    Some(upper.planar_distance(lower))
}
