//! Error types for Presence Flux
//!
//! The per-frame step never fails: missing faces and malformed frames are
//! skips, not errors. These variants cover the fallible edges around it
//! (configuration, record parsing, FFI arguments).

use thiserror::Error;

/// Errors that can occur outside the per-frame step
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse frame record: {0}")]
    ParseError(String),
}
