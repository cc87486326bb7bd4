//! EcoSmart: an Arabic-language environmental-awareness assistant.
//!
//! Every piece of language work is delegated to a generative-AI service; this
//! crate shapes requests, keeps conversation and voice state, and absorbs
//! service failures into user-facing messages.
//!
//! # Architecture
//!
//! - **Gateway**: chat, weather, advice and speech synthesis against Gemini via `reqwest`
//! - **Conversation**: the text chat transcript, one reply per user turn
//! - **Voice**: capture → chat turn → synthesis → playback state machine
//! - **Audio**: speech decoding (`hound`) and speaker output (`cpal`)
//! - **Profile**: onboarding validation and the on-disk user profile
//! - **Insight / Projects**: dashboard weather refresh, topic advice, project board

pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod insight;
pub mod profile;
pub mod projects;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::EcoConfig;
pub use conversation::{ConversationSession, ReplyOutcome, Turn};
pub use error::{EcoError, Result};
pub use gateway::{AiGateway, GatewayError, GeminiGateway};
pub use profile::{ProfileStore, UserProfile};
pub use voice::{VoiceOrchestrator, VoicePhase};
