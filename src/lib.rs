//! Presence Flux - On-device engine for real-time non-verbal presence signals
//!
//! Presence Flux turns a stream of facial landmark frames into smoothed,
//! interpretable speaking-coach metrics through a deterministic per-frame
//! reducer: geometry extraction → temporal filtering → event detection
//! → composite scoring → session accumulation.
//!
//! ## Modules
//!
//! - **Engine**: [`BehaviorEngine::process_frame`] is the single entry point
//! - **Geometry / Filters / Events / Scorer / Session**: the stages it runs
//! - **Replay / Synthetic**: recorded and generated frame sources for hosts and tests
//!
//! The default constants are calibrated for ~30 frames per second. Trackers
//! running at another cadence must use [`EngineConfig::rescaled_for_frame_rate`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod filters;
pub mod geometry;
pub mod landmarks;
pub mod replay;
pub mod scorer;
pub mod session;
pub mod synthetic;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod integration_tests;

pub use config::EngineConfig;
pub use engine::{BehaviorEngine, EngineState};
pub use error::EngineError;
pub use landmarks::{Landmark, LandmarkFrame, LandmarkTopology};
pub use session::SessionSummary;
pub use types::{Alert, Metrics, Status};

/// Library version
pub const PRESENCE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name embedded in CLI reports
pub const PRODUCER_NAME: &str = "presence-flux";
