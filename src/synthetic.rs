//! Synthetic landmark frames
//!
//! Renders a face mesh with prescribed yaw, pitch, eye openness, gaze
//! deviation and mouth aperture, laid out so the geometry extractors read the
//! prescribed values back. Used for calibration, replay scenarios and tests.

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeIndices, Landmark, LandmarkFrame, LandmarkTopology};

const EAR_Y: f64 = 0.45;
const EAR_HALF_SPAN: f64 = 0.2;
const CHIN_DROP: f64 = 0.25;
const EYE_Y: f64 = 0.40;
const EYE_WIDTH: f64 = 0.08;
const LEFT_EYE_X: f64 = 0.38;
const RIGHT_EYE_X: f64 = 0.54;
const IRIS_RADIUS: f64 = 0.012;
const MOUTH_Y: f64 = 0.62;

/// Parameters of one synthetic face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticFace {
    pub yaw: f64,
    pub pitch: f64,
    pub eye_openness: f64,
    pub gaze_deviation: f64,
    pub mouth_aperture: f64,
    pub with_iris: bool,
}

impl Default for SyntheticFace {
    /// Centered, motionless, eyes open, mouth closed
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            eye_openness: 0.3,
            gaze_deviation: 0.0,
            mouth_aperture: 0.01,
            with_iris: true,
        }
    }
}

impl SyntheticFace {
    #[must_use]
    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    #[must_use]
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    #[must_use]
    pub fn with_eye_openness(mut self, openness: f64) -> Self {
        self.eye_openness = openness;
        self
    }

    /// Total deviation split evenly across both eyes, in the same direction
    #[must_use]
    pub fn with_gaze_deviation(mut self, deviation: f64) -> Self {
        self.gaze_deviation = deviation;
        self
    }

    #[must_use]
    pub fn with_mouth_aperture(mut self, aperture: f64) -> Self {
        self.mouth_aperture = aperture;
        self
    }

    /// Omit iris points, as trackers without iris refinement do
    #[must_use]
    pub fn without_iris(mut self) -> Self {
        self.with_iris = false;
        self
    }

    /// Render the face into a frame addressed by `topology`
    pub fn render(&self, topology: &LandmarkTopology) -> LandmarkFrame {
        let iris_indices = topology.left_iris.iter().chain(topology.right_iris.iter());
        let len = if self.with_iris {
            iris_indices.max().map_or(0, |&m| m + 1).max(topology.min_points())
        } else {
            iris_indices.min().copied().unwrap_or(0).max(topology.min_points())
        };
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); len];
        let mut set = |i: usize, x: f64, y: f64| {
            if let Some(p) = points.get_mut(i) {
                *p = Landmark::new(x, y, 0.0);
            }
        };

        // Head: ears on a horizontal line, chin below, nose placed for yaw/pitch
        let nose_y = EAR_Y + self.pitch * CHIN_DROP;
        let nose_x = 0.5 + nose_offset_for_yaw(self.yaw, nose_y - EAR_Y);
        set(topology.left_ear_tragus, 0.5 - EAR_HALF_SPAN, EAR_Y);
        set(topology.right_ear_tragus, 0.5 + EAR_HALF_SPAN, EAR_Y);
        set(topology.chin, 0.5, EAR_Y + CHIN_DROP);
        set(topology.nose_tip, nose_x, nose_y);

        // Eyes
        let gaze_norm = 0.5 + self.gaze_deviation / 2.0;
        for (eye, iris, left_x) in [
            (&topology.left_eye, &topology.left_iris, LEFT_EYE_X),
            (&topology.right_eye, &topology.right_iris, RIGHT_EYE_X),
        ] {
            place_eye(&mut set, eye, left_x, self.eye_openness);
            if self.with_iris {
                let cx = left_x + gaze_norm * EYE_WIDTH;
                set(iris[0], cx, EYE_Y);
                set(iris[1], cx + IRIS_RADIUS, EYE_Y);
                set(iris[2], cx, EYE_Y - IRIS_RADIUS);
                set(iris[3], cx - IRIS_RADIUS, EYE_Y);
                set(iris[4], cx, EYE_Y + IRIS_RADIUS);
            }
        }

        // Mouth
        set(topology.left_mouth_corner, 0.44, MOUTH_Y);
        set(topology.right_mouth_corner, 0.56, MOUTH_Y);
        set(topology.upper_inner_lip, 0.5, MOUTH_Y - self.mouth_aperture / 2.0);
        set(topology.lower_inner_lip, 0.5, MOUTH_Y + self.mouth_aperture / 2.0);

        LandmarkFrame::new(points)
    }
}

fn place_eye(set: &mut impl FnMut(usize, f64, f64), eye: &EyeIndices, left_x: f64, openness: f64) {
    let cx = left_x + EYE_WIDTH / 2.0;
    let half_gap = openness * EYE_WIDTH / 2.0;
    set(eye.left_corner, left_x, EYE_Y);
    set(eye.right_corner, left_x + EYE_WIDTH, EYE_Y);
    set(eye.top, cx, EYE_Y - half_gap);
    set(eye.bottom, cx, EYE_Y + half_gap);
}

/// Horizontal nose offset producing `yaw` for a nose `height` off the ear line.
///
/// The yaw ratio is monotonic in the offset, so bisection finds it.
fn nose_offset_for_yaw(yaw: f64, height: f64) -> f64 {
    let ratio = |offset: f64| {
        let left = (EAR_HALF_SPAN + offset).hypot(height);
        let right = (EAR_HALF_SPAN - offset).hypot(height);
        (left - right) / (left + right)
    };
    let (mut lo, mut hi) = (-EAR_HALF_SPAN, EAR_HALF_SPAN);
    for _ in 0..100 {
        let mid = (lo + hi) / 2.0;
        if ratio(mid) < yaw {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Scripted synthetic sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Centered and motionless throughout
    Centered,
    /// Gaze held well away from the camera
    LookingAway,
    /// Open eyes with a 3-frame blink every 2 seconds
    Blinking,
    /// A pitch nod every 40 frames
    Nodding,
    /// Gaze alternating 0.05 / 0.25 every 15 frames with a ±0.05 yaw sway at 1 Hz
    Mixed,
}

impl Scenario {
    /// Face for frame `index` at the default ~30 fps cadence
    pub fn face(self, index: usize) -> SyntheticFace {
        let base = SyntheticFace::default();
        match self {
            Scenario::Centered => base,
            Scenario::LookingAway => base.with_gaze_deviation(0.5),
            Scenario::Blinking => {
                if index % 60 < 3 {
                    base.with_eye_openness(0.05)
                } else {
                    base
                }
            }
            Scenario::Nodding => {
                if index % 40 < 3 {
                    base.with_pitch(0.5)
                } else {
                    base
                }
            }
            Scenario::Mixed => {
                let gaze = if (index / 15) % 2 == 0 { 0.05 } else { 0.25 };
                let phase = index as f64 * std::f64::consts::TAU / 30.0;
                base.with_gaze_deviation(gaze).with_yaw(0.05 * phase.sin())
            }
        }
    }

    /// Render `count` consecutive frames
    pub fn frames(self, count: usize, topology: &LandmarkTopology) -> Vec<LandmarkFrame> {
        (0..count).map(|i| self.face(i).render(topology)).collect()
    }
}
