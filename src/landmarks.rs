//! Facial landmark frames and the topology used to address them
//!
//! A frame is the dense point mesh delivered by an external face tracker for
//! one video frame. The engine only reads a handful of named points; their
//! indices are described by a caller-owned [`LandmarkTopology`].

use serde::{Deserialize, Serialize};

/// Number of points in a refined face mesh (468 face points + 2 × 5 iris points)
pub const REFINED_MESH_POINTS: usize = 478;

/// A single landmark: x, y normalized to [0, 1] image space, z relative depth
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane (z is ignored)
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Landmark {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f64; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// One face's landmark mesh for one video frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Build a frame from a flat `[x0, y0, z0, x1, y1, z1, ...]` buffer.
    ///
    /// A trailing partial triple is ignored.
    pub fn from_flat(values: &[f64]) -> Self {
        let points = values
            .chunks_exact(3)
            .map(|c| Landmark::new(c[0], c[1], c[2]))
            .collect();
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [Landmark] {
        &mut self.points
    }
}

/// Indices describing one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices {
    pub top: usize,
    pub bottom: usize,
    /// Corner with the smaller image x
    pub left_corner: usize,
    /// Corner with the larger image x
    pub right_corner: usize,
}

/// Indices of the named landmarks consumed by the geometry extractors.
///
/// "Left" and "right" refer to image space, not the subject's anatomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkTopology {
    pub nose_tip: usize,
    pub chin: usize,
    pub left_ear_tragus: usize,
    pub right_ear_tragus: usize,
    pub left_mouth_corner: usize,
    pub right_mouth_corner: usize,
    pub upper_inner_lip: usize,
    pub lower_inner_lip: usize,
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,
    /// Iris points (center first); optional in the frame
    pub left_iris: [usize; 5],
    pub right_iris: [usize; 5],
}

impl Default for LandmarkTopology {
    /// Refined 478-point face mesh layout
    fn default() -> Self {
        Self {
            nose_tip: 1,
            chin: 152,
            left_ear_tragus: 234,
            right_ear_tragus: 454,
            left_mouth_corner: 61,
            right_mouth_corner: 291,
            upper_inner_lip: 13,
            lower_inner_lip: 14,
            left_eye: EyeIndices {
                top: 159,
                bottom: 145,
                left_corner: 33,
                right_corner: 133,
            },
            right_eye: EyeIndices {
                top: 386,
                bottom: 374,
                left_corner: 362,
                right_corner: 263,
            },
            left_iris: [468, 469, 470, 471, 472],
            right_iris: [473, 474, 475, 476, 477],
        }
    }
}

impl LandmarkTopology {
    /// Indices that must be present for a frame to be usable
    pub fn required_indices(&self) -> [usize; 16] {
        [
            self.nose_tip,
            self.chin,
            self.left_ear_tragus,
            self.right_ear_tragus,
            self.left_mouth_corner,
            self.right_mouth_corner,
            self.upper_inner_lip,
            self.lower_inner_lip,
            self.left_eye.top,
            self.left_eye.bottom,
            self.left_eye.left_corner,
            self.left_eye.right_corner,
            self.right_eye.top,
            self.right_eye.bottom,
            self.right_eye.left_corner,
            self.right_eye.right_corner,
        ]
    }

    /// Number of points a frame needs for every required landmark to exist
    pub fn min_points(&self) -> usize {
        self.required_indices()
            .iter()
            .max()
            .map_or(0, |&max| max + 1)
    }
}
