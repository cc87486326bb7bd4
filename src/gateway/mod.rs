//! Adapter boundary to the external generative-AI service.
//!
//! The [`AiGateway`] trait exposes the four operations the assistant needs:
//!
//! | Operation | Failure policy |
//! |-----------|----------------|
//! | [`chat_turn`](AiGateway::chat_turn) | propagates [`GatewayError`] |
//! | [`weather_insight`](AiGateway::weather_insight) | never fails, returns [`WEATHER_FALLBACK`] |
//! | [`topic_advice`](AiGateway::topic_advice) | propagates [`GatewayError`] |
//! | [`synthesize_speech`](AiGateway::synthesize_speech) | propagates, with [`GatewayError::SynthesisEmpty`] for a missing payload |
//!
//! Implementations hold no session state; every call is a single
//! request/response exchange with no local retry.

pub mod error;
pub mod gemini;
pub mod prompts;

use crate::profile::{Gender, UserProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::warn;

pub use error::GatewayError;
pub use gemini::GeminiGateway;

/// Returned by [`AiGateway::weather_insight`] when the service fails.
pub const WEATHER_FALLBACK: &str = "لا يمكن تحديد حالة الطقس حالياً.";

/// Marker appended to text truncated before synthesis.
pub const TRUNCATION_MARKER: &str = "...";

/// Author of a conversational message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One prior message projected for the provider: `{role, text}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// Input to [`AiGateway::chat_turn`].
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Prior conversation in arrival order.
    pub history: Vec<HistoryEntry>,
    /// The new user message.
    pub message: String,
    /// Personalisation source for the system instruction.
    pub profile: Option<UserProfile>,
}

impl ChatRequest {
    /// A request with no prior history.
    pub fn single(message: impl Into<String>, profile: Option<UserProfile>) -> Self {
        Self {
            history: Vec::new(),
            message: message.into(),
            profile,
        }
    }
}

/// Synthesis voice, selected from the user's gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    MaleVoice,
    FemaleVoice,
}

impl From<Gender> for Voice {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => Self::MaleVoice,
            Gender::Female => Self::FemaleVoice,
        }
    }
}

/// Raw audio returned by speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    /// Decoded audio bytes.
    pub bytes: Vec<u8>,
    /// Provider MIME type, e.g. `audio/L16;codec=pcm;rate=24000`.
    pub mime_type: Option<String>,
}

/// Truncate `text` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
///
/// Counts Unicode scalar values, so Arabic text is never split mid-character.
#[must_use]
pub fn truncate_for_speech(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(TRUNCATION_MARKER);
            Cow::Owned(out)
        }
    }
}

/// Contract with the external generative-AI service.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Send one chat turn and return the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on network/service failure or empty response.
    async fn chat_turn(&self, request: ChatRequest) -> Result<String, GatewayError>;

    /// Single-shot text generation for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on network/service failure or empty response.
    async fn generate_text(&self, prompt: String) -> Result<String, GatewayError>;

    /// Synthesize `text` with `voice`, returning decoded audio bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SynthesisEmpty`] when the response carries no
    /// audio, or another [`GatewayError`] on network/service failure.
    async fn synthesize_speech(&self, text: &str, voice: Voice)
    -> Result<SpeechAudio, GatewayError>;

    /// Short climate summary for the profile's city. Best-effort: never fails.
    async fn weather_insight(&self, profile: &UserProfile) -> String {
        match self.generate_text(prompts::weather_prompt(profile)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("weather insight failed, using fallback: {e}");
                WEATHER_FALLBACK.to_owned()
            }
        }
    }

    /// Actionable ideas for `topic`, localised when a profile is given.
    ///
    /// # Errors
    ///
    /// Propagates the [`GatewayError`] from the underlying generation.
    async fn topic_advice(
        &self,
        topic: &str,
        profile: Option<&UserProfile>,
    ) -> Result<String, GatewayError> {
        self.generate_text(prompts::advice_prompt(topic, profile))
            .await
    }
}
