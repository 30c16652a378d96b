//! Public output types
//!
//! [`Metrics`] is the engine's only output: an immutable snapshot produced on
//! every processed frame, with no link back to the engine state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse tracker status reported by the face-landmark collaborator.
///
/// The engine forwards it unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Active,
    Error,
}

impl Status {
    /// Stable integer code used across the C interface
    pub fn code(self) -> i32 {
        match self {
            Status::Idle => 0,
            Status::Loading => 1,
            Status::Active => 2,
            Status::Error => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Status::Idle),
            1 => Some(Status::Loading),
            2 => Some(Status::Active),
            3 => Some(Status::Error),
            _ => None,
        }
    }
}

/// Advisory coaching alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum Alert {
    /// Recent eye contact is too low
    LookAtCamera,
    /// Head is turned too far to one side
    CenterHead,
    /// Blink rate suggests nervousness
    SlowDown,
    /// The landmark tracker reported a failure
    TrackerError(String),
}

impl Alert {
    /// Human-readable coaching message
    pub fn message(&self) -> String {
        match self {
            Alert::LookAtCamera => "Look at the camera".to_string(),
            Alert::CenterHead => "Center your head".to_string(),
            Alert::SlowDown => "Slow down and take a breath".to_string(),
            Alert::TrackerError(detail) if detail.is_empty() => "Face tracking failed".to_string(),
            Alert::TrackerError(detail) => format!("Face tracking failed: {detail}"),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Snapshot of behavioral metrics after one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Eye contact over the recent window (0-100)
    pub eye_contact_pct: f64,
    /// Head stability (0-100)
    pub head_stability_pct: f64,
    /// Nervousness (0-100)
    pub nervousness: f64,
    /// Composite confidence (0-100)
    pub confidence: f64,
    /// Eye contact over the whole session (0-100)
    pub session_eye_contact_pct: f64,
    /// Estimated blinks per minute
    pub blink_rate: f64,
    /// Display yaw in degrees
    pub head_yaw_deg: f64,
    /// Display pitch in degrees
    pub head_pitch_deg: f64,
    /// Latest inner lip gap
    pub mouth_aperture: f64,
    pub blink_count: u32,
    pub nod_count: u32,
    pub shake_count: u32,
    pub frames_processed: u64,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

impl Metrics {
    /// Alert text, if any
    pub fn alert_message(&self) -> Option<String> {
        self.alert.as_ref().map(Alert::message)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_roundtrip() {
        for status in [Status::Idle, Status::Loading, Status::Active, Status::Error] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(7), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Status::Loading).unwrap(), "\"loading\"");
    }

    #[test]
    fn test_alert_messages() {
        assert_eq!(Alert::LookAtCamera.to_string(), "Look at the camera");
        assert_eq!(
            Alert::TrackerError("camera denied".to_string()).message(),
            "Face tracking failed: camera denied"
        );
        assert_eq!(
            Alert::TrackerError(String::new()).message(),
            "Face tracking failed"
        );
    }

    #[test]
    fn test_metrics_json_omits_missing_alert() {
        let json = Metrics::default().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("alert").is_none());
        assert_eq!(value["status"], "idle");

        let with_alert = Metrics {
            alert: Some(Alert::CenterHead),
            ..Metrics::default()
        };
        let value: serde_json::Value = serde_json::from_str(&with_alert.to_json().unwrap()).unwrap();
        assert_eq!(value["alert"]["kind"], "center_head");
    }
}
