//! Voice interaction phases and the transient per-cycle session record.
//!
//! ```text
//! Idle → Listening → Transcribed → Processing → Speaking → Speaking(playing) → Idle
//!   │        │                         │            │
//!   └────────┴──────────→ Error ←──────┴────────────┘
//!                           │
//!                           └──→ Idle
//! ```

use crate::gateway::SpeechAudio;
use std::fmt;

/// Lifecycle state of the voice orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePhase {
    #[default]
    Idle,
    /// Capture device held, waiting for a recognized utterance.
    Listening,
    /// Utterance recorded, about to dispatch the chat turn.
    Transcribed,
    /// Waiting for the chat reply.
    Processing,
    /// Reply received; synthesizing (`playing = false`) or playing audio.
    Speaking { playing: bool },
    /// Failure being reported; always followed by `Idle`.
    Error,
}

/// Inputs that move the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Capture device acquired.
    Start,
    /// Capture device could not be acquired.
    StartFailed,
    /// Non-empty utterance recognized.
    Captured,
    /// Listening cancelled by the user.
    Stop,
    /// Chat turn dispatched for the utterance.
    Dispatch,
    /// Chat turn answered.
    Replied,
    /// Synthesized audio started playing.
    AudioReady,
    /// Playback finished, or capture ended without an utterance.
    Ended,
    /// Capture, chat, synthesis or playback failure.
    Failed,
    /// Error reported; return to rest.
    Reset,
}

impl VoicePhase {
    /// The phase reached from `self` on `event`, or `None` if illegal.
    #[must_use]
    pub fn on(self, event: PhaseEvent) -> Option<Self> {
        use PhaseEvent as E;
        use VoicePhase::*;

        match (self, event) {
            (Idle, E::Start) => Some(Listening),
            (Idle, E::StartFailed) => Some(Error),
            (Listening, E::Captured) => Some(Transcribed),
            (Listening, E::Stop | E::Ended) => Some(Idle),
            (Listening, E::Failed) => Some(Error),
            (Transcribed, E::Dispatch) => Some(Processing),
            (Processing, E::Replied) => Some(Speaking { playing: false }),
            (Processing, E::Failed) => Some(Error),
            (Speaking { playing: false }, E::AudioReady) => Some(Speaking { playing: true }),
            (Speaking { playing: true }, E::Ended) => Some(Idle),
            (Speaking { .. }, E::Failed) => Some(Error),
            (Error, E::Reset) => Some(Idle),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for VoicePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Transcribed => "transcribed",
            Self::Processing => "processing",
            Self::Speaking { playing: false } => "speaking",
            Self::Speaking { playing: true } => "speaking(playing)",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A phase change, broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: VoicePhase,
    pub to: VoicePhase,
}

/// State of the current voice cycle. Reset at the start of each cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSession {
    pub phase: VoicePhase,
    /// Recognized utterance.
    pub transcript_text: Option<String>,
    /// Model reply, or the apology when the reply failed.
    pub response_text: Option<String>,
    /// Synthesized audio for the reply.
    pub audio: Option<SpeechAudio>,
    /// User-facing message for the last failure.
    pub last_error: Option<String>,
}
