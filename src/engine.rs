//! Behavior engine
//!
//! The engine is a per-frame reducer: each landmark frame flows through
//! geometry extraction, smoothing, event detection and scoring, then updates
//! the session counters and yields an immutable [`Metrics`] snapshot.
//!
//! One engine serves one session. `process_frame` takes `&mut self`, so a
//! session's frames are necessarily processed one at a time, in call order.
//! Frames must be fed in capture order: the nod and shake detectors
//! differentiate consecutive samples.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{BlinkDetector, MotionDetector};
use crate::filters::{Ema, SlidingWindow};
use crate::geometry::{self, FrameMeasurements};
use crate::landmarks::{LandmarkFrame, LandmarkTopology};
use crate::scorer::{CompositeScorer, ScoreInputs};
use crate::session::{EventCounts, SessionAccumulator, SessionSummary};
use crate::types::{Alert, Metrics, Status};

/// Carried per-session state, mutated only by [`BehaviorEngine::process_frame`]
#[derive(Debug, Clone)]
pub struct EngineState {
    gaze: Ema,
    yaw: Ema,
    pitch: Ema,
    eye_contact_window: SlidingWindow<bool>,
    yaw_motion_window: SlidingWindow<f64>,
    pitch_motion_window: SlidingWindow<f64>,
    blink: BlinkDetector,
    nod: MotionDetector,
    shake: MotionDetector,
    session: SessionAccumulator,
    mouth_aperture: f64,
}

impl EngineState {
    /// Fresh session state: zeroed filters, empty windows, idle detectors
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            gaze: Ema::new(config.smoothing.gaze_alpha),
            yaw: Ema::new(config.smoothing.head_alpha),
            pitch: Ema::new(config.smoothing.head_alpha),
            eye_contact_window: SlidingWindow::new(config.windows.eye_contact),
            yaw_motion_window: SlidingWindow::new(config.windows.head_motion),
            pitch_motion_window: SlidingWindow::new(config.windows.head_motion),
            blink: BlinkDetector::new(
                &config.detectors.blink,
                config.windows.blink,
                config.blink_rate_scale(),
            ),
            nod: MotionDetector::new(&config.detectors.nod),
            shake: MotionDetector::new(&config.detectors.shake),
            session: SessionAccumulator::new(),
            mouth_aperture: 0.0,
        }
    }

    pub fn gaze_smoothed(&self) -> f64 {
        self.gaze.value()
    }

    pub fn yaw_smoothed(&self) -> f64 {
        self.yaw.value()
    }

    pub fn pitch_smoothed(&self) -> f64 {
        self.pitch.value()
    }

    pub fn session(&self) -> &SessionAccumulator {
        &self.session
    }

    fn event_counts(&self) -> EventCounts {
        EventCounts {
            blinks: self.blink.count(),
            nods: self.nod.count(),
            shakes: self.shake.count(),
        }
    }
}

/// Real-time non-verbal behavior engine for one recording session
#[derive(Debug, Clone)]
pub struct BehaviorEngine {
    config: EngineConfig,
    topology: LandmarkTopology,
    scorer: CompositeScorer,
    state: EngineState,
    status: Status,
    status_message: String,
    last_metrics: Metrics,
    session_id: Uuid,
    started_at: DateTime<Utc>,
}

impl Default for BehaviorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorEngine {
    /// Engine with the default 30 fps configuration and refined-mesh topology
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), LandmarkTopology::default())
    }

    /// Engine with a custom configuration (validated)
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_config_and_topology(config, LandmarkTopology::default())
    }

    /// Engine with a custom configuration and landmark topology
    pub fn with_config_and_topology(
        config: EngineConfig,
        topology: LandmarkTopology,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, topology))
    }

    fn build(config: EngineConfig, topology: LandmarkTopology) -> Self {
        let scorer = CompositeScorer::new(config.scoring.clone(), config.alerts.clone());
        let state = EngineState::new(&config);
        Self {
            config,
            topology,
            scorer,
            state,
            status: Status::Idle,
            status_message: String::new(),
            last_metrics: Metrics::default(),
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Override the session identity (e.g. to match the host's session record)
    #[must_use]
    pub fn with_session(mut self, session_id: Uuid, started_at: DateTime<Utc>) -> Self {
        self.session_id = session_id;
        self.started_at = started_at;
        self
    }

    /// Process one tracker callback.
    ///
    /// `None` (no face) and frames that fail geometry extraction leave the
    /// state untouched and re-emit the last metrics.
    pub fn process_frame(&mut self, frame: Option<&LandmarkFrame>) -> Metrics {
        let measurements = frame.and_then(|f| geometry::extract(f, &self.topology));
        match measurements {
            Some(m) => self.step(&m),
            None => {
                debug!(
                    face_present = frame.is_some(),
                    "Skipping frame without usable landmarks"
                );
                self.stale_metrics()
            }
        }
    }

    /// Process a frame known to contain a face
    pub fn process_landmarks(&mut self, frame: &LandmarkFrame) -> Metrics {
        self.process_frame(Some(frame))
    }

    fn step(&mut self, m: &FrameMeasurements) -> Metrics {
        let tracker_alert = self.tracker_alert();
        let state = &mut self.state;

        // Temporal filters
        let gaze = state.gaze.update(m.gaze_deviation);
        let yaw = state.yaw.update(m.yaw);
        let pitch = state.pitch.update(m.pitch);

        let has_eye_contact = self.scorer.has_eye_contact(gaze);
        state.eye_contact_window.push(has_eye_contact);
        state.yaw_motion_window.push(yaw.abs());
        state.pitch_motion_window.push(pitch.abs());
        state.mouth_aperture = m.mouth_aperture;

        // Event detectors
        if state.blink.update(m.mean_eye_openness()) {
            debug!(count = state.blink.count(), "Blink detected");
        }
        if state.nod.update(pitch) {
            debug!(count = state.nod.count(), "Nod detected");
        }
        if state.shake.update(yaw) {
            debug!(count = state.shake.count(), "Shake detected");
        }

        // Composite scores
        let scores = self.scorer.score(&ScoreInputs {
            eye_contact_fraction: state.eye_contact_window.average(),
            yaw_motion: state.yaw_motion_window.average(),
            pitch_motion: state.pitch_motion_window.average(),
            blink_rate: state.blink.blink_rate(),
            yaw_smoothed: yaw,
            pitch_smoothed: pitch,
        });

        state.session.record(has_eye_contact, &scores);

        let alert = tracker_alert.or(scores.alert);
        let metrics = Metrics {
            eye_contact_pct: scores.eye_contact_pct,
            head_stability_pct: scores.head_stability_pct,
            nervousness: scores.nervousness,
            confidence: scores.confidence,
            session_eye_contact_pct: state.session.eye_contact_pct(),
            blink_rate: state.blink.blink_rate(),
            head_yaw_deg: scores.yaw_deg,
            head_pitch_deg: scores.pitch_deg,
            mouth_aperture: state.mouth_aperture,
            blink_count: state.blink.count(),
            nod_count: state.nod.count(),
            shake_count: state.shake.count(),
            frames_processed: state.session.frames_processed(),
            status: self.status,
            alert,
        };
        self.last_metrics = metrics.clone();
        metrics
    }

    /// Last good metrics with the current status applied
    fn stale_metrics(&self) -> Metrics {
        let mut metrics = self.last_metrics.clone();
        metrics.status = self.status;
        if let Some(alert) = self.tracker_alert() {
            metrics.alert = Some(alert);
        } else if matches!(metrics.alert, Some(Alert::TrackerError(_))) {
            metrics.alert = None;
        }
        metrics
    }

    fn tracker_alert(&self) -> Option<Alert> {
        (self.status == Status::Error).then(|| Alert::TrackerError(self.status_message.clone()))
    }

    /// Forward the tracker collaborator's status.
    ///
    /// `message` describes the failure when `status` is [`Status::Error`].
    /// Returns the last metrics re-stamped with the new status.
    pub fn set_status(&mut self, status: Status, message: Option<&str>) -> Metrics {
        if status != self.status {
            info!(from = ?self.status, to = ?status, "Tracker status changed");
        }
        self.status = status;
        self.status_message = message.unwrap_or_default().to_string();
        self.stale_metrics()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Most recent metrics snapshot (re-emitted for skipped frames)
    pub fn last_metrics(&self) -> Metrics {
        self.stale_metrics()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn topology(&self) -> &LandmarkTopology {
        &self.topology
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Summary of the session so far, as of `ended_at`
    pub fn summary_at(&self, ended_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary::new(
            self.session_id,
            self.started_at,
            ended_at,
            &self.state.session,
            self.state.event_counts(),
        )
    }

    /// End the session: consume the engine and return its summary
    pub fn finish(self) -> SessionSummary {
        let summary = self.summary_at(Utc::now());
        info!(
            session_id = %summary.session_id,
            frames = summary.frames_processed,
            eye_contact_pct = summary.eye_contact_pct,
            "Session finished"
        );
        summary
    }
}
