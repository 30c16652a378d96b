//! Recorded tracker output
//!
//! A recording is newline-delimited JSON, one [`FrameRecord`] per tracker
//! callback. The [`Replayer`] feeds records to an engine in order and drops
//! records whose sequence number goes backwards, since out-of-order frames
//! would corrupt the derivative-based nod and shake detectors.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::BehaviorEngine;
use crate::error::EngineError;
use crate::landmarks::LandmarkFrame;
use crate::types::{Metrics, Status};

/// One tracker callback
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Capture sequence number; records without one are taken in file order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Landmarks as `[x, y, z]` triples; absent or null when no face was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkFrame>,
    /// Tracker status change reported with this callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl FrameRecord {
    pub fn with_landmarks(seq: u64, landmarks: LandmarkFrame) -> Self {
        Self {
            seq: Some(seq),
            landmarks: Some(landmarks),
            ..Self::default()
        }
    }
}

/// Parse newline-delimited frame records, skipping blank lines
pub fn parse_ndjson(input: &str) -> Result<Vec<FrameRecord>, EngineError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_record(line).map_err(|e| line_error(i + 1, e)))
        .collect()
}

/// Parse a single frame record line
pub fn parse_record(line: &str) -> Result<FrameRecord, EngineError> {
    Ok(serde_json::from_str(line.trim())?)
}

fn line_error(line: usize, error: EngineError) -> EngineError {
    EngineError::ParseError(format!("line {line}: {error}"))
}

/// Feeds recorded callbacks into an engine in capture order
#[derive(Debug)]
pub struct Replayer {
    engine: BehaviorEngine,
    last_seq: Option<u64>,
    skipped: usize,
}

impl Replayer {
    pub fn new(engine: BehaviorEngine) -> Self {
        Self {
            engine,
            last_seq: None,
            skipped: 0,
        }
    }

    /// Apply one record.
    ///
    /// Returns `None` when the record was dropped for arriving out of order.
    pub fn feed(&mut self, record: &FrameRecord) -> Option<Metrics> {
        if let Some(seq) = record.seq {
            if self.last_seq.is_some_and(|last| seq <= last) {
                warn!(seq, last_seq = ?self.last_seq, "Dropping out-of-order frame");
                self.skipped += 1;
                return None;
            }
            self.last_seq = Some(seq);
        }

        if let Some(status) = record.status {
            self.engine
                .set_status(status, record.status_message.as_deref());
        }
        Some(self.engine.process_frame(record.landmarks.as_ref()))
    }

    /// Apply every record, collecting the metrics of accepted ones
    pub fn feed_all<'a>(&mut self, records: impl IntoIterator<Item = &'a FrameRecord>) -> Vec<Metrics> {
        records.into_iter().filter_map(|r| self.feed(r)).collect()
    }

    /// Records dropped for arriving out of order
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn engine(&self) -> &BehaviorEngine {
        &self.engine
    }

    pub fn into_engine(self) -> BehaviorEngine {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LandmarkTopology;
    use crate::synthetic::SyntheticFace;

    fn record_line(seq: u64) -> String {
        let frame = SyntheticFace::default().render(&LandmarkTopology::default());
        serde_json::to_string(&FrameRecord::with_landmarks(seq, frame)).unwrap()
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", record_line(1), record_line(2));
        let records = parse_ndjson(&input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].seq, Some(2));
        assert_eq!(records[0].landmarks.as_ref().map(LandmarkFrame::len), Some(478));
    }

    #[test]
    fn test_parse_no_face_record() {
        let record = parse_record(r#"{"seq": 4, "landmarks": null}"#).unwrap();
        assert!(record.landmarks.is_none());

        let record = parse_record(r#"{"status": "error", "status_message": "no camera"}"#).unwrap();
        assert_eq!(record.status, Some(Status::Error));
        assert_eq!(record.seq, None);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = format!("{}\nnot json\n", record_line(1));
        match parse_ndjson(&input) {
            Err(EngineError::ParseError(msg)) => assert!(msg.starts_with("line 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_order_records_dropped() {
        let records = parse_ndjson(&[1, 2, 2, 1, 3].map(record_line).join("\n")).unwrap();
        let mut replayer = Replayer::new(BehaviorEngine::new());
        let metrics = replayer.feed_all(&records);

        assert_eq!(metrics.len(), 3);
        assert_eq!(replayer.skipped(), 2);
        assert_eq!(replayer.engine().state().session().frames_processed(), 3);
    }

    #[test]
    fn test_status_records_forwarded() {
        let mut replayer = Replayer::new(BehaviorEngine::new());
        let record = parse_record(r#"{"seq": 1, "status": "loading"}"#).unwrap();
        let metrics = replayer.feed(&record).unwrap();
        assert_eq!(metrics.status, Status::Loading);
        assert_eq!(metrics.frames_processed, 0);
    }
}
