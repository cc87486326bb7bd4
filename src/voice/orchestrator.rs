//! Voice interaction orchestrator: capture → chat turn → synthesis → playback.
//!
//! A single owned state machine drives one cycle at a time. Every suspension
//! point (recognizer event, gateway call, playback end) is awaited in order,
//! and every failure is absorbed into the session record before the phase
//! returns to `Idle`.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::device::{
    AudioOutput, CaptureError, CaptureEvent, CaptureSession, OutputBackend, PlaybackError,
    RecognitionRequest, SpeechRecognizer,
};
use super::phase::{PhaseChange, PhaseEvent, VoicePhase, VoiceSession};
use super::{CAPTURE_ERROR_MESSAGE, MIC_START_ERROR_MESSAGE, PLAYBACK_ERROR_MESSAGE, VOICE_APOLOGY};
use crate::gateway::{AiGateway, ChatRequest, GatewayError, Voice};
use crate::profile::UserProfile;

const PHASE_CHANNEL_SIZE: usize = 32;

/// Result of [`VoiceOrchestrator::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Capture acquired; the orchestrator is listening.
    Started,
    /// A cycle is already active; nothing changed.
    Rejected { phase: VoicePhase },
    /// The capture device could not be acquired; reported and back to idle.
    Failed(CaptureError),
}

/// How a voice cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Reply played to the end.
    Completed,
    /// Listening was stopped, or capture ended without an utterance.
    Cancelled,
    /// `start` was refused or failed; no cycle ran.
    NotStarted(StartOutcome),
    CaptureFailed(CaptureError),
    ReplyFailed(GatewayError),
    SynthesisFailed(GatewayError),
    PlaybackFailed(PlaybackError),
}

/// Cancels the current listening phase from outside the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    /// Stop listening. No effect outside the listening phase.
    pub fn stop(&self) {
        let guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = guard.as_ref() {
            token.cancel();
        }
    }

    fn arm(&self, token: Option<CancellationToken>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Owns the capture device, the lazily opened output and the cycle state.
pub struct VoiceOrchestrator<G, R, B>
where
    G: AiGateway + ?Sized,
    R: SpeechRecognizer,
    B: OutputBackend,
{
    gateway: Arc<G>,
    recognizer: R,
    backend: B,
    output: Option<B::Output>,
    profile: Option<UserProfile>,
    request: RecognitionRequest,
    session: VoiceSession,
    capture: Option<CaptureSession>,
    stop: StopHandle,
    phase_tx: broadcast::Sender<PhaseChange>,
}

impl<G, R, B> VoiceOrchestrator<G, R, B>
where
    G: AiGateway + ?Sized,
    R: SpeechRecognizer,
    B: OutputBackend,
{
    pub fn new(
        gateway: Arc<G>,
        recognizer: R,
        backend: B,
        profile: Option<UserProfile>,
        locale: impl Into<String>,
    ) -> Self {
        let (phase_tx, _) = broadcast::channel(PHASE_CHANNEL_SIZE);
        Self {
            gateway,
            recognizer,
            backend,
            output: None,
            profile,
            request: RecognitionRequest::single_utterance(locale),
            session: VoiceSession::default(),
            capture: None,
            stop: StopHandle::default(),
            phase_tx,
        }
    }

    #[must_use]
    pub fn phase(&self) -> VoicePhase {
        self.session.phase
    }

    #[must_use]
    pub fn session(&self) -> &VoiceSession {
        &self.session
    }

    /// Whether the output context has been opened and not yet released.
    #[must_use]
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Handle for cancelling listening from another task.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Observe every phase change.
    pub fn subscribe(&self) -> broadcast::Receiver<PhaseChange> {
        self.phase_tx.subscribe()
    }

    fn fire(&mut self, event: PhaseEvent) {
        let from = self.session.phase;
        match from.on(event) {
            Some(to) => {
                self.session.phase = to;
                info!("voice phase {from} -> {to}");
                let _ = self.phase_tx.send(PhaseChange { from, to });
            }
            None => error!("illegal voice transition: {event:?} in {from}"),
        }
    }

    /// Enter `Error`, record `message`, and return to `Idle`.
    fn fail(&mut self, event: PhaseEvent, message: Option<&str>) {
        self.release_capture();
        self.fire(event);
        if let Some(message) = message {
            self.session.last_error = Some(message.to_owned());
        }
        self.fire(PhaseEvent::Reset);
    }

    fn release_capture(&mut self) {
        self.stop.arm(None);
        self.capture = None;
    }

    fn voice(&self) -> Voice {
        self.profile
            .as_ref()
            .map(|p| Voice::from(p.gender))
            .unwrap_or_default()
    }

    /// Begin a listening cycle.
    ///
    /// Rejected without side effects unless the orchestrator is idle.
    pub async fn start(&mut self) -> StartOutcome {
        if !self.session.phase.is_idle() {
            warn!("voice start rejected in phase {}", self.session.phase);
            return StartOutcome::Rejected {
                phase: self.session.phase,
            };
        }

        self.session = VoiceSession::default();
        match self.recognizer.start(&self.request).await {
            Ok(capture) => {
                self.stop.arm(Some(capture.cancel_token()));
                self.capture = Some(capture);
                self.fire(PhaseEvent::Start);
                StartOutcome::Started
            }
            Err(e) => {
                warn!("could not start capture: {e}");
                self.fail(PhaseEvent::StartFailed, Some(MIC_START_ERROR_MESSAGE));
                StartOutcome::Failed(e)
            }
        }
    }

    /// Cancel listening. Partial utterances are discarded.
    ///
    /// No effect outside the listening phase.
    pub fn stop(&mut self) {
        if self.session.phase == VoicePhase::Listening {
            self.release_capture();
            self.fire(PhaseEvent::Stop);
        }
    }

    /// Drive the active cycle from `Listening` back to `Idle`.
    ///
    /// Returns [`CycleOutcome::NotStarted`] when not listening.
    pub async fn complete_cycle(&mut self) -> CycleOutcome {
        let Some(capture) = self.capture.as_mut() else {
            return CycleOutcome::NotStarted(StartOutcome::Rejected {
                phase: self.session.phase,
            });
        };

        let cancel = capture.cancel_token();
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            event = capture.next_event() => Some(event),
        };
        self.release_capture();

        let text = match event {
            None | Some(CaptureEvent::Ended) => {
                self.fire(PhaseEvent::Stop);
                return CycleOutcome::Cancelled;
            }
            Some(CaptureEvent::Failed(e)) => {
                warn!("capture failed: {e}");
                self.fail(PhaseEvent::Failed, Some(CAPTURE_ERROR_MESSAGE));
                return CycleOutcome::CaptureFailed(e);
            }
            Some(CaptureEvent::Final(text)) if text.trim().is_empty() => {
                self.fail(PhaseEvent::Failed, Some(CAPTURE_ERROR_MESSAGE));
                return CycleOutcome::CaptureFailed(CaptureError::NoSpeech);
            }
            Some(CaptureEvent::Final(text)) => text,
        };

        self.session.transcript_text = Some(text.clone());
        self.fire(PhaseEvent::Captured);
        self.respond(text).await
    }

    /// `start` followed by `complete_cycle`.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        match self.start().await {
            StartOutcome::Started => self.complete_cycle().await,
            other => CycleOutcome::NotStarted(other),
        }
    }

    async fn respond(&mut self, utterance: String) -> CycleOutcome {
        self.fire(PhaseEvent::Dispatch);

        // Voice turns carry no history.
        let request = ChatRequest::single(utterance, self.profile.clone());
        let reply = match self.gateway.chat_turn(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                return self.absorb_reply_failure(GatewayError::EmptyResponse(
                    "model returned blank text".to_owned(),
                ));
            }
            Err(e) => return self.absorb_reply_failure(e),
        };

        self.session.response_text = Some(reply.clone());
        self.fire(PhaseEvent::Replied);

        let audio = match self.gateway.synthesize_speech(&reply, self.voice()).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("speech synthesis failed: {e}");
                self.session.response_text = Some(VOICE_APOLOGY.to_owned());
                self.fail(PhaseEvent::Failed, None);
                return CycleOutcome::SynthesisFailed(e);
            }
        };
        self.session.audio = Some(audio.clone());

        let handle = match self.ensure_output() {
            Ok(output) => output.play(&audio).await,
            Err(e) => Err(e),
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                warn!("playback failed: {e}");
                self.fail(PhaseEvent::Failed, Some(PLAYBACK_ERROR_MESSAGE));
                return CycleOutcome::PlaybackFailed(e);
            }
        };

        self.fire(PhaseEvent::AudioReady);
        handle.finished().await;
        self.fire(PhaseEvent::Ended);
        CycleOutcome::Completed
    }

    fn absorb_reply_failure(&mut self, error: GatewayError) -> CycleOutcome {
        warn!("voice chat turn failed: {error}");
        self.session.response_text = Some(VOICE_APOLOGY.to_owned());
        self.fail(PhaseEvent::Failed, None);
        CycleOutcome::ReplyFailed(error)
    }

    fn ensure_output(&mut self) -> Result<&mut B::Output, PlaybackError> {
        if self.output.is_none() {
            info!("opening audio output");
            self.output = Some(self.backend.open()?);
        }
        self.output
            .as_mut()
            .ok_or_else(|| PlaybackError::Device("output not open".to_owned()))
    }

    /// Release the capture device and the output context.
    pub fn shutdown(&mut self) {
        self.release_capture();
        if let Some(mut output) = self.output.take() {
            output.close();
            info!("audio output released");
        }
        if self.session.phase == VoicePhase::Listening {
            self.fire(PhaseEvent::Stop);
        }
    }
}

impl<G, R, B> Drop for VoiceOrchestrator<G, R, B>
where
    G: AiGateway + ?Sized,
    R: SpeechRecognizer,
    B: OutputBackend,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
