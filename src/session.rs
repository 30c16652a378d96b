//! Session-lifetime accumulation
//!
//! Monotonic counters that live alongside the decaying windows. The windowed
//! eye contact reflects the last few seconds; these give the lifetime view
//! and the end-of-session averages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scorer::Scores;

/// Cumulative per-session counters.
///
/// Counters only grow; there is no reset. A new session gets a new engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionAccumulator {
    frames_processed: u64,
    frames_with_eye_contact: u64,
    confidence_sum: f64,
    head_stability_sum: f64,
    nervousness_sum: f64,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed frame
    pub fn record(&mut self, has_eye_contact: bool, scores: &Scores) {
        self.frames_processed += 1;
        if has_eye_contact {
            self.frames_with_eye_contact += 1;
        }
        self.confidence_sum += scores.confidence;
        self.head_stability_sum += scores.head_stability_pct;
        self.nervousness_sum += scores.nervousness;
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_with_eye_contact(&self) -> u64 {
        self.frames_with_eye_contact
    }

    /// Lifetime eye contact percentage, 0 before any frame
    pub fn eye_contact_pct(&self) -> f64 {
        self.ratio_pct(self.frames_with_eye_contact as f64)
    }

    pub fn average_confidence(&self) -> f64 {
        self.mean(self.confidence_sum)
    }

    pub fn average_head_stability(&self) -> f64 {
        self.mean(self.head_stability_sum)
    }

    pub fn average_nervousness(&self) -> f64 {
        self.mean(self.nervousness_sum)
    }

    fn ratio_pct(&self, count: f64) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        count / self.frames_processed as f64 * 100.0
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        sum / self.frames_processed as f64
    }
}

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub frames_processed: u64,
    pub frames_with_eye_contact: u64,
    pub eye_contact_pct: f64,
    pub average_confidence: f64,
    pub average_head_stability: f64,
    pub average_nervousness: f64,
    pub blink_count: u32,
    pub nod_count: u32,
    pub shake_count: u32,
}

/// Lifetime event counts carried into the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub blinks: u32,
    pub nods: u32,
    pub shakes: u32,
}

impl SessionSummary {
    pub fn new(
        session_id: Uuid,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        accumulator: &SessionAccumulator,
        events: EventCounts,
    ) -> Self {
        let duration_sec = ((ended_at - started_at).num_milliseconds() as f64 / 1000.0).max(0.0);
        Self {
            session_id,
            started_at,
            ended_at,
            duration_sec,
            frames_processed: accumulator.frames_processed(),
            frames_with_eye_contact: accumulator.frames_with_eye_contact(),
            eye_contact_pct: accumulator.eye_contact_pct(),
            average_confidence: accumulator.average_confidence(),
            average_head_stability: accumulator.average_head_stability(),
            average_nervousness: accumulator.average_nervousness(),
            blink_count: events.blinks,
            nod_count: events.nods,
            shake_count: events.shakes,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scores(confidence: f64) -> Scores {
        Scores {
            eye_contact_pct: 100.0,
            head_stability_pct: 90.0,
            nervousness: 10.0,
            confidence,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            alert: None,
        }
    }

    #[test]
    fn test_empty_accumulator_is_zero() {
        let acc = SessionAccumulator::new();
        assert_eq!(acc.eye_contact_pct(), 0.0);
        assert_eq!(acc.average_confidence(), 0.0);
    }

    #[test]
    fn test_eye_contact_ratio_is_exact() {
        let mut acc = SessionAccumulator::new();
        for i in 0..7 {
            acc.record(i % 7 < 3, &scores(80.0));
        }
        assert_eq!(acc.frames_processed(), 7);
        assert_eq!(acc.frames_with_eye_contact(), 3);
        assert_eq!(acc.eye_contact_pct(), 3.0 / 7.0 * 100.0);
    }

    #[test]
    fn test_averages() {
        let mut acc = SessionAccumulator::new();
        acc.record(true, &scores(60.0));
        acc.record(false, &scores(80.0));
        assert!((acc.average_confidence() - 70.0).abs() < 1e-9);
        assert!((acc.average_head_stability() - 90.0).abs() < 1e-9);
        assert!((acc.average_nervousness() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_fields() {
        let mut acc = SessionAccumulator::new();
        acc.record(true, &scores(90.0));
        acc.record(true, &scores(90.0));

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 14, 2, 30).unwrap();
        let id = Uuid::new_v4();
        let summary = SessionSummary::new(
            id,
            start,
            end,
            &acc,
            EventCounts {
                blinks: 4,
                nods: 2,
                shakes: 1,
            },
        );

        assert_eq!(summary.session_id, id);
        assert_eq!(summary.duration_sec, 150.0);
        assert_eq!(summary.eye_contact_pct, 100.0);
        assert_eq!(summary.blink_count, 4);

        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(value["nod_count"], 2);
        assert!(value["started_at"]
            .as_str()
            .unwrap()
            .starts_with("2024-01-15T14:00:00"));
    }
}
