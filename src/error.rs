//! Error types for the ecosmart assistant.

use crate::gateway::error::GatewayError;
use crate::voice::device::{CaptureError, PlaybackError};

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum EcoError {
    /// Generative-AI service error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Speech capture (recognition) error.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Audio decode or playback error.
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Profile validation or persistence error.
    #[error("profile error: {0}")]
    Profile(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EcoError>;
