//! Error types for the AI gateway.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`GatewayError::code()`].

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Invalid or missing gateway configuration (e.g. no API key).
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// The provider rejected the credentials.
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The request could not be sent or the connection failed.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The request timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// The provider answered with a non-success status.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";

    /// The provider answered successfully but without any text.
    pub const EMPTY_RESPONSE: &str = "EMPTY_RESPONSE";

    /// Speech synthesis answered without an audio payload.
    pub const SYNTHESIS_EMPTY: &str = "SYNTHESIS_EMPTY";

    /// The audio payload could not be decoded.
    pub const AUDIO_DECODE: &str = "AUDIO_DECODE";
}

/// Errors produced by [`AiGateway`](super::AiGateway) implementations.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// Authentication failed (invalid/missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    Auth(String),

    /// Network-level request failure.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    Request(String),

    /// Request timed out.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    Timeout(String),

    /// Non-success HTTP status from the provider.
    #[error("[{}] HTTP {status}: {message}", error_codes::PROVIDER_ERROR)]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Provider error message (or raw body).
        message: String,
    },

    /// The provider returned no text.
    #[error("[{}] {}", error_codes::EMPTY_RESPONSE, .0)]
    EmptyResponse(String),

    /// Speech synthesis returned no audio payload.
    #[error("[{}] synthesis returned no audio", error_codes::SYNTHESIS_EMPTY)]
    SynthesisEmpty,

    /// Audio payload was not valid base64.
    #[error("[{}] {}", error_codes::AUDIO_DECODE, .0)]
    AudioDecode(String),
}

impl GatewayError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Auth(_) => error_codes::AUTH_FAILED,
            Self::Request(_) => error_codes::REQUEST_FAILED,
            Self::Timeout(_) => error_codes::TIMEOUT_ERROR,
            Self::Provider { .. } => error_codes::PROVIDER_ERROR,
            Self::EmptyResponse(_) => error_codes::EMPTY_RESPONSE,
            Self::SynthesisEmpty => error_codes::SYNTHESIS_EMPTY,
            Self::AudioDecode(_) => error_codes::AUDIO_DECODE,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Auth(m)
            | Self::Request(m)
            | Self::Timeout(m)
            | Self::EmptyResponse(m)
            | Self::AudioDecode(m) => m,
            Self::Provider { message, .. } => message,
            Self::SynthesisEmpty => "synthesis returned no audio",
        }
    }

    /// Returns true if this error represents a transient failure.
    ///
    /// The gateway itself never retries; callers may use this to decide
    /// whether offering "try again" makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Auth(_) | Self::AudioDecode(_) => false,
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse(_) | Self::SynthesisEmpty => true,
        }
    }

    /// Map a reqwest transport error.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("request timed out: {err}"))
        } else {
            Self::Request(format!("request failed: {err}"))
        }
    }
}
