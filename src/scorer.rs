//! Composite scoring
//!
//! Turns already-filtered signals into the public percentages, the display
//! angles and the advisory alert. Never reads raw frames.

use crate::config::{AlertConfig, ScoringConfig};
use crate::types::Alert;

/// Filtered signals the scorer reads each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// Fraction of recent frames with eye contact (0-1)
    pub eye_contact_fraction: f64,
    /// Windowed mean of |smoothed yaw|
    pub yaw_motion: f64,
    /// Windowed mean of |smoothed pitch|
    pub pitch_motion: f64,
    /// Blinks per minute
    pub blink_rate: f64,
    pub yaw_smoothed: f64,
    pub pitch_smoothed: f64,
}

/// Scores derived for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub eye_contact_pct: f64,
    pub head_stability_pct: f64,
    pub nervousness: f64,
    pub confidence: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub alert: Option<Alert>,
}

/// Weighted composite scorer
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    scoring: ScoringConfig,
    alerts: AlertConfig,
}

impl CompositeScorer {
    pub fn new(scoring: ScoringConfig, alerts: AlertConfig) -> Self {
        Self { scoring, alerts }
    }

    /// Whether a smoothed gaze deviation counts as eye contact
    pub fn has_eye_contact(&self, gaze_smoothed: f64) -> bool {
        gaze_smoothed < self.scoring.eye_contact_threshold
    }

    pub fn score(&self, inputs: &ScoreInputs) -> Scores {
        let s = &self.scoring;

        let eye_contact_pct = clamp_pct(inputs.eye_contact_fraction * 100.0);
        let head_stability_pct =
            compute_head_stability(inputs.yaw_motion, inputs.pitch_motion, s.head_stability_gain);
        let nervousness = compute_nervousness(
            inputs.blink_rate,
            inputs.yaw_motion,
            inputs.pitch_motion,
            s,
        );
        let confidence = compute_confidence(eye_contact_pct, head_stability_pct, nervousness, s);

        let yaw_deg = inputs.yaw_smoothed * s.yaw_degrees_scale;
        let pitch_deg = inputs.pitch_smoothed * s.pitch_degrees_scale;
        let alert = select_alert(eye_contact_pct, yaw_deg, inputs.blink_rate, &self.alerts);

        Scores {
            eye_contact_pct,
            head_stability_pct,
            nervousness,
            confidence,
            yaw_deg,
            pitch_deg,
            alert,
        }
    }
}

/// Clamp to [0, 100], mapping NaN to 0
fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Head stability
///
/// Formula: `100 - (yaw_motion + pitch_motion) * gain`
fn compute_head_stability(yaw_motion: f64, pitch_motion: f64, gain: f64) -> f64 {
    clamp_pct(100.0 - (yaw_motion + pitch_motion) * gain)
}

/// Nervousness from excess blinking and sustained head motion
///
/// Formula:
/// ```text
/// max(0, blink_rate - baseline) * blink_gain
///   + (yaw_motion > floor ? yaw_motion * yaw_gain : 0)
///   + (pitch_motion > floor ? pitch_motion * pitch_gain : 0)
/// ```
fn compute_nervousness(
    blink_rate: f64,
    yaw_motion: f64,
    pitch_motion: f64,
    s: &ScoringConfig,
) -> f64 {
    let blink_term = (blink_rate - s.blink_rate_baseline).max(0.0) * s.blink_rate_gain;
    let yaw_term = if yaw_motion > s.yaw_motion_floor {
        yaw_motion * s.yaw_motion_gain
    } else {
        0.0
    };
    let pitch_term = if pitch_motion > s.pitch_motion_floor {
        pitch_motion * s.pitch_motion_gain
    } else {
        0.0
    };
    clamp_pct(blink_term + yaw_term + pitch_term)
}

/// Confidence (weighted combination)
///
/// Formula: `0.5 * eye_contact + 0.3 * stability + 0.2 * (100 - nervousness)`
fn compute_confidence(
    eye_contact_pct: f64,
    head_stability_pct: f64,
    nervousness: f64,
    s: &ScoringConfig,
) -> f64 {
    clamp_pct(
        eye_contact_pct * s.eye_contact_weight
            + head_stability_pct * s.stability_weight
            + (100.0 - nervousness) * s.calmness_weight,
    )
}

/// First matching rule wins: eye contact, then head yaw, then blink rate
fn select_alert(
    eye_contact_pct: f64,
    yaw_deg: f64,
    blink_rate: f64,
    alerts: &AlertConfig,
) -> Option<Alert> {
    if eye_contact_pct < alerts.min_eye_contact_pct {
        Some(Alert::LookAtCamera)
    } else if yaw_deg.abs() > alerts.max_yaw_degrees {
        Some(Alert::CenterHead)
    } else if blink_rate > alerts.max_blink_rate {
        Some(Alert::SlowDown)
    } else {
        None
    }
}
