//! Engine configuration
//!
//! Every heuristic constant used by the engine lives here. The defaults are
//! calibrated for a tracker delivering ~30 frames per second; callers running
//! at a different cadence must rescale explicitly with
//! [`EngineConfig::rescaled_for_frame_rate`].

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Frame rate the default constants are calibrated for
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Highest tracker cadence accepted
pub const MAX_FRAME_RATE: f64 = 1000.0;

/// Upper bound on window capacities and cooldowns, in frames
pub const MAX_FRAMES: usize = 1_000_000;

/// Exponential smoothing factors (0 < α ≤ 1; higher reacts faster)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// α for gaze deviation (typical 0.05 - 0.3)
    pub gaze_alpha: f64,
    /// α for head yaw and pitch (typical 0.1 - 0.4)
    pub head_alpha: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            gaze_alpha: 0.15,
            head_alpha: 0.20,
        }
    }
}

/// Sliding window capacities, in frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Eye contact window (90 frames ≈ 3 s at 30 fps)
    pub eye_contact: usize,
    /// Blink window (300 frames ≈ 10 s at 30 fps)
    pub blink: usize,
    /// Yaw and pitch motion windows (60 frames ≈ 2 s at 30 fps)
    pub head_motion: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            eye_contact: 90,
            blink: 300,
            head_motion: 60,
        }
    }
}

/// Threshold and cooldown of a single cooldown-gated detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub threshold: f64,
    pub cooldown_frames: u32,
}

/// Event detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Mean eye openness below which the eyes count as closed (typical 0.1 - 0.25)
    pub blink: ThresholdConfig,
    /// Per-frame change of smoothed pitch that counts as a nod (typical 0.01 - 0.1)
    pub nod: ThresholdConfig,
    /// Per-frame change of smoothed yaw that counts as a shake (typical 0.01 - 0.1)
    pub shake: ThresholdConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blink: ThresholdConfig {
                threshold: 0.15,
                cooldown_frames: 8,
            },
            nod: ThresholdConfig {
                threshold: 0.03,
                cooldown_frames: 20,
            },
            shake: ThresholdConfig {
                threshold: 0.03,
                cooldown_frames: 20,
            },
        }
    }
}

/// Composite score weights and gains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Smoothed gaze deviation below which the speaker holds eye contact
    pub eye_contact_threshold: f64,
    /// Penalty per unit of windowed head motion on the stability score
    pub head_stability_gain: f64,
    /// Blink rate (per minute) considered calm
    pub blink_rate_baseline: f64,
    /// Nervousness points per blink/min above the baseline
    pub blink_rate_gain: f64,
    /// Windowed |yaw| above which yaw motion contributes to nervousness
    pub yaw_motion_floor: f64,
    pub yaw_motion_gain: f64,
    /// Windowed |pitch| above which pitch motion contributes to nervousness
    pub pitch_motion_floor: f64,
    pub pitch_motion_gain: f64,
    /// Confidence weights (eye contact, stability, calmness); expected to sum to 1
    pub eye_contact_weight: f64,
    pub stability_weight: f64,
    pub calmness_weight: f64,
    /// Display scale from yaw ratio to degrees
    pub yaw_degrees_scale: f64,
    /// Display scale from pitch ratio to degrees
    pub pitch_degrees_scale: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            eye_contact_threshold: 0.18,
            head_stability_gain: 300.0,
            blink_rate_baseline: 25.0,
            blink_rate_gain: 2.0,
            yaw_motion_floor: 0.05,
            yaw_motion_gain: 200.0,
            pitch_motion_floor: 0.05,
            pitch_motion_gain: 150.0,
            eye_contact_weight: 0.5,
            stability_weight: 0.3,
            calmness_weight: 0.2,
            yaw_degrees_scale: 45.0,
            pitch_degrees_scale: 30.0,
        }
    }
}

/// Advisory alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Recent eye contact percentage below which "look at camera" fires
    pub min_eye_contact_pct: f64,
    /// Absolute yaw in degrees above which "center your head" fires
    pub max_yaw_degrees: f64,
    /// Blink rate per minute above which "slow down" fires
    pub max_blink_rate: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_eye_contact_pct: 40.0,
            max_yaw_degrees: 15.0,
            max_blink_rate: 30.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal tracker cadence the windows and cooldowns are sized for
    pub frame_rate: f64,
    pub smoothing: SmoothingConfig,
    pub windows: WindowConfig,
    pub detectors: DetectorConfig,
    pub scoring: ScoringConfig,
    pub alerts: AlertConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            smoothing: SmoothingConfig::default(),
            windows: WindowConfig::default(),
            detectors: DetectorConfig::default(),
            scoring: ScoringConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Copy of this configuration with windows and cooldowns resized for `frame_rate`.
    ///
    /// Window durations and cooldown durations in seconds are preserved.
    /// Smoothing factors are per-sample and are left untouched.
    pub fn rescaled_for_frame_rate(&self, frame_rate: f64) -> Result<Self, EngineError> {
        check_frame_rate(frame_rate)?;
        self.validate()?;
        let ratio = frame_rate / self.frame_rate;

        let mut scaled = self.clone();
        scaled.frame_rate = frame_rate;
        let w = &self.windows;
        scaled.windows.eye_contact = scale_frames("windows.eye_contact", w.eye_contact, ratio)?.max(1);
        scaled.windows.blink = scale_frames("windows.blink", w.blink, ratio)?.max(1);
        scaled.windows.head_motion = scale_frames("windows.head_motion", w.head_motion, ratio)?.max(1);

        // MAX_FRAMES fits in u32
        let d = &self.detectors;
        scaled.detectors.blink.cooldown_frames =
            scale_frames("detectors.blink.cooldown_frames", d.blink.cooldown_frames as usize, ratio)? as u32;
        scaled.detectors.nod.cooldown_frames =
            scale_frames("detectors.nod.cooldown_frames", d.nod.cooldown_frames as usize, ratio)? as u32;
        scaled.detectors.shake.cooldown_frames =
            scale_frames("detectors.shake.cooldown_frames", d.shake.cooldown_frames as usize, ratio)? as u32;
        Ok(scaled)
    }

    /// Blinks-per-minute multiplier for one closed-eye frame in the blink window.
    ///
    /// 300 frames at 30 fps span 10 s, so each frame scales by 6.
    pub fn blink_rate_scale(&self) -> f64 {
        60.0 * self.frame_rate / self.windows.blink as f64
    }

    /// Check every value against its documented range
    pub fn validate(&self) -> Result<(), EngineError> {
        check_frame_rate(self.frame_rate)?;
        check_alpha("smoothing.gaze_alpha", self.smoothing.gaze_alpha)?;
        check_alpha("smoothing.head_alpha", self.smoothing.head_alpha)?;

        for (name, capacity) in [
            ("windows.eye_contact", self.windows.eye_contact),
            ("windows.blink", self.windows.blink),
            ("windows.head_motion", self.windows.head_motion),
        ] {
            if capacity == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must hold at least one sample"
                )));
            }
            check_max_frames(name, capacity)?;
        }

        for (name, cooldown) in [
            ("detectors.blink.cooldown_frames", self.detectors.blink.cooldown_frames),
            ("detectors.nod.cooldown_frames", self.detectors.nod.cooldown_frames),
            ("detectors.shake.cooldown_frames", self.detectors.shake.cooldown_frames),
        ] {
            check_max_frames(name, cooldown as usize)?;
        }

        check_non_negative("detectors.blink.threshold", self.detectors.blink.threshold)?;
        check_non_negative("detectors.nod.threshold", self.detectors.nod.threshold)?;
        check_non_negative("detectors.shake.threshold", self.detectors.shake.threshold)?;

        let s = &self.scoring;
        for (name, value) in [
            ("scoring.eye_contact_threshold", s.eye_contact_threshold),
            ("scoring.head_stability_gain", s.head_stability_gain),
            ("scoring.blink_rate_baseline", s.blink_rate_baseline),
            ("scoring.blink_rate_gain", s.blink_rate_gain),
            ("scoring.yaw_motion_floor", s.yaw_motion_floor),
            ("scoring.yaw_motion_gain", s.yaw_motion_gain),
            ("scoring.pitch_motion_floor", s.pitch_motion_floor),
            ("scoring.pitch_motion_gain", s.pitch_motion_gain),
            ("scoring.eye_contact_weight", s.eye_contact_weight),
            ("scoring.stability_weight", s.stability_weight),
            ("scoring.calmness_weight", s.calmness_weight),
            ("scoring.yaw_degrees_scale", s.yaw_degrees_scale),
            ("scoring.pitch_degrees_scale", s.pitch_degrees_scale),
        ] {
            check_non_negative(name, value)?;
        }

        let a = &self.alerts;
        check_non_negative("alerts.min_eye_contact_pct", a.min_eye_contact_pct)?;
        check_non_negative("alerts.max_yaw_degrees", a.max_yaw_degrees)?;
        check_non_negative("alerts.max_blink_rate", a.max_blink_rate)?;

        Ok(())
    }
}

fn check_frame_rate(frame_rate: f64) -> Result<(), EngineError> {
    if frame_rate.is_finite() && frame_rate > 0.0 && frame_rate <= MAX_FRAME_RATE {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "frame_rate must lie in (0, {MAX_FRAME_RATE}], got {frame_rate}"
        )))
    }
}

fn check_max_frames(name: &str, frames: usize) -> Result<(), EngineError> {
    if frames <= MAX_FRAMES {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must not exceed {MAX_FRAMES} frames, got {frames}"
        )))
    }
}

/// Scale a frame count, checking the bound before converting back
fn scale_frames(name: &str, frames: usize, ratio: f64) -> Result<usize, EngineError> {
    let scaled = (frames as f64 * ratio).round();
    if !(scaled.is_finite() && scaled <= MAX_FRAMES as f64) {
        return Err(EngineError::InvalidConfig(format!(
            "{name} rescaled to {scaled} frames exceeds {MAX_FRAMES}"
        )));
    }
    Ok(scaled as usize)
}

fn check_non_negative(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn check_alpha(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must lie in (0, 1], got {value}"
        )))
    }
}
