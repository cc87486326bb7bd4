//! Spoken conversation: capture an utterance, answer it, speak the answer.

pub mod console;
pub mod device;
pub mod orchestrator;
pub mod phase;

pub use console::ConsoleRecognizer;
pub use device::{
    AudioOutput, CaptureError, CaptureEvent, CaptureSession, DeviceLease, DeviceSlot,
    OutputBackend, PlaybackError, PlaybackHandle, RecognitionRequest, SpeechRecognizer,
    capture_slot, playback_slot,
};
pub use orchestrator::{CycleOutcome, StartOutcome, StopHandle, VoiceOrchestrator};
pub use phase::{PhaseChange, PhaseEvent, VoicePhase, VoiceSession};

/// Shown when the chat turn or synthesis for a spoken question fails.
pub const VOICE_APOLOGY: &str = "عذراً، حدث خطأ في الاتصال بالخدمة الذكية.";

/// Shown when recognition fails or hears nothing.
pub const CAPTURE_ERROR_MESSAGE: &str = "لم أتمكن من سماعك بوضوح، حاول مرة أخرى.";

/// Shown when the capture device cannot be started.
pub const MIC_START_ERROR_MESSAGE: &str = "تعذر بدء الميكروفون. تأكد من السماح بالوصول.";

/// Shown when the reply audio cannot be played.
pub const PLAYBACK_ERROR_MESSAGE: &str = "حدث خطأ في تشغيل الصوت.";
