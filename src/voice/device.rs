//! Capture and playback device seams, with exclusive-use leases.
//!
//! The capture device and the playback output are process-wide singletons.
//! Each is guarded by a [`DeviceSlot`]; whoever holds the [`DeviceLease`]
//! owns the device until the lease is dropped.

use crate::gateway::SpeechAudio;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Speech capture (recognition) failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("capture device is busy")]
    DeviceBusy,
    #[error("speech recognition is not supported")]
    Unsupported,
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("capture device error: {0}")]
    Device(String),
}

/// Audio decode and playback failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback device is busy")]
    DeviceBusy,
    #[error("cannot decode audio: {0}")]
    Decode(String),
    #[error("cannot start playback: {0}")]
    Start(String),
    #[error("output device error: {0}")]
    Device(String),
}

// ── Exclusive device slots ────────────────────────────────────

/// Exclusive-use guard for one device.
#[derive(Debug, Clone)]
pub struct DeviceSlot {
    name: &'static str,
    held: Arc<AtomicBool>,
}

impl DeviceSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take the device, or `None` if someone else holds it.
    #[must_use]
    pub fn try_acquire(&self) -> Option<DeviceLease> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        debug!("{} acquired", self.name);
        Some(DeviceLease { slot: self.clone() })
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Ownership of a device; released on drop.
#[derive(Debug)]
pub struct DeviceLease {
    slot: DeviceSlot,
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.slot.held.store(false, Ordering::Release);
        debug!("{} released", self.slot.name);
    }
}

/// The process-wide capture device slot.
pub fn capture_slot() -> DeviceSlot {
    static SLOT: OnceLock<DeviceSlot> = OnceLock::new();
    SLOT.get_or_init(|| DeviceSlot::new("capture device")).clone()
}

/// The process-wide playback output slot.
pub fn playback_slot() -> DeviceSlot {
    static SLOT: OnceLock<DeviceSlot> = OnceLock::new();
    SLOT.get_or_init(|| DeviceSlot::new("playback output")).clone()
}

// ── Capture ───────────────────────────────────────────────────

/// Parameters of a single-utterance recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    /// Locale tag, e.g. `ar-SA`.
    pub locale: String,
    /// Stop after the first final utterance.
    pub continuous: bool,
    /// Emit partial hypotheses.
    pub interim_results: bool,
}

impl RecognitionRequest {
    /// Single-utterance, final-results-only request.
    pub fn single_utterance(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// What a recognizer reports for the active capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Final recognized utterance.
    Final(String),
    /// Recognition failed.
    Failed(CaptureError),
    /// Capture ended without producing an utterance.
    Ended,
}

/// An active capture. Dropping it cancels recognition and frees the device.
#[derive(Debug)]
pub struct CaptureSession {
    events: mpsc::Receiver<CaptureEvent>,
    cancel: CancellationToken,
    _lease: Option<DeviceLease>,
}

impl CaptureSession {
    /// `cancel` is observed by the recognizer backend; `lease` is held until drop.
    pub fn new(
        events: mpsc::Receiver<CaptureEvent>,
        cancel: CancellationToken,
        lease: Option<DeviceLease>,
    ) -> Self {
        Self {
            events,
            cancel,
            _lease: lease,
        }
    }

    /// Token that stops this capture when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the next recognizer event. A closed channel reads as [`CaptureEvent::Ended`].
    pub async fn next_event(&mut self) -> CaptureEvent {
        self.events.recv().await.unwrap_or(CaptureEvent::Ended)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Speech recognition backend.
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Acquire the capture device and begin recognizing one utterance.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the device cannot be acquired (busy,
    /// permission denied, unsupported).
    async fn start(&mut self, request: &RecognitionRequest) -> Result<CaptureSession, CaptureError>;
}

// ── Playback ──────────────────────────────────────────────────

/// Completion signal for one started playback.
#[derive(Debug)]
pub struct PlaybackHandle {
    ended: oneshot::Receiver<()>,
}

impl PlaybackHandle {
    pub fn new(ended: oneshot::Receiver<()>) -> Self {
        Self { ended }
    }

    /// Resolves when playback ends. A dropped sender counts as ended.
    pub async fn finished(self) {
        if self.ended.await.is_err() {
            debug!("playback signal dropped before completion");
        }
    }
}

/// An open audio output context.
#[async_trait]
pub trait AudioOutput: Send {
    /// Decode `audio` and start playing it; returns once playback has started.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if decoding or stream start fails.
    async fn play(&mut self, audio: &SpeechAudio) -> Result<PlaybackHandle, PlaybackError>;

    /// Release the output context.
    fn close(&mut self);
}

/// Lazily opens the output context.
pub trait OutputBackend: Send {
    type Output: AudioOutput;

    /// Open the output context.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if the output device is unavailable.
    fn open(&mut self) -> Result<Self::Output, PlaybackError>;
}
