//! Shared test doubles used across unit test modules.
//!
//! Every double records what it was asked to do so tests can assert on the
//! traffic, and answers from a script queued up front.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::gateway::{AiGateway, ChatRequest, GatewayError, SpeechAudio, Voice};
use crate::profile::{Gender, UserProfile};
use crate::voice::device::{
    AudioOutput, CaptureError, CaptureEvent, CaptureSession, DeviceSlot, OutputBackend,
    PlaybackError, PlaybackHandle, RecognitionRequest, SpeechRecognizer,
};

/// A completed profile: Ahmed, male, Riyadh.
pub fn sample_profile() -> UserProfile {
    UserProfile {
        name: "أحمد".into(),
        gender: Gender::Male,
        country: "المملكة العربية السعودية".into(),
        city: "الرياض".into(),
    }
}

fn unscripted(call: &str) -> GatewayError {
    GatewayError::EmptyResponse(format!("no scripted response for {call}"))
}

// ── Gateway ───────────────────────────────────────────────────

type Scripted<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

/// [`AiGateway`] answering from queued results. Unscripted calls fail.
#[derive(Default)]
pub struct ScriptedGateway {
    chat: Scripted<String>,
    text: Scripted<String>,
    speech: Scripted<SpeechAudio>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    text_prompts: Mutex<Vec<String>>,
    speech_calls: Mutex<Vec<(String, Voice)>>,
    chat_gate: Option<Arc<Semaphore>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose `chat_turn` records the request, then blocks until
    /// a permit is added to the returned semaphore.
    pub fn with_chat_gate() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let gateway = Self {
            chat_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (gateway, gate)
    }

    pub fn push_chat(&self, result: Result<String, GatewayError>) {
        self.chat.lock().unwrap().push_back(result);
    }

    pub fn push_text(&self, result: Result<String, GatewayError>) {
        self.text.lock().unwrap().push_back(result);
    }

    pub fn push_speech(&self, result: Result<SpeechAudio, GatewayError>) {
        self.speech.lock().unwrap().push_back(result);
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn text_prompts(&self) -> Vec<String> {
        self.text_prompts.lock().unwrap().clone()
    }

    pub fn speech_calls(&self) -> Vec<(String, Voice)> {
        self.speech_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn chat_turn(&self, request: ChatRequest) -> Result<String, GatewayError> {
        self.chat_requests.lock().unwrap().push(request);
        if let Some(gate) = &self.chat_gate {
            gate.acquire().await.expect("chat gate closed").forget();
        }
        let next = self.chat.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted("chat_turn")))
    }

    async fn generate_text(&self, prompt: String) -> Result<String, GatewayError> {
        self.text_prompts.lock().unwrap().push(prompt);
        let next = self.text.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted("generate_text")))
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<SpeechAudio, GatewayError> {
        self.speech_calls.lock().unwrap().push((text.to_owned(), voice));
        let next = self.speech.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted("synthesize_speech")))
    }
}

// ── Capture ───────────────────────────────────────────────────

#[derive(Default)]
struct RecognizerScript {
    events: VecDeque<CaptureEvent>,
    start_error: Option<CaptureError>,
}

/// [`SpeechRecognizer`] replaying one queued event per capture.
///
/// With nothing queued the capture stays open until cancelled. Uses its own
/// [`DeviceSlot`] so parallel tests never contend.
#[derive(Clone)]
pub struct ScriptedRecognizer {
    script: Arc<Mutex<RecognizerScript>>,
    slot: DeviceSlot,
    starts: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            script: Arc::default(),
            slot: DeviceSlot::new("scripted capture"),
            starts: Arc::default(),
        }
    }

    /// A recognizer whose every `start` fails with `error`.
    pub fn failing(error: CaptureError) -> Self {
        let rec = Self::new();
        rec.script.lock().unwrap().start_error = Some(error);
        rec
    }

    pub fn push(&self, event: CaptureEvent) {
        self.script.lock().unwrap().events.push_back(event);
    }

    pub fn slot(&self) -> DeviceSlot {
        self.slot.clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&mut self, _request: &RecognitionRequest) -> Result<CaptureSession, CaptureError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (event, start_error) = {
            let mut script = self.script.lock().unwrap();
            (script.events.pop_front(), script.start_error.clone())
        };
        if let Some(e) = start_error {
            return Err(e);
        }
        let lease = self.slot.try_acquire().ok_or(CaptureError::DeviceBusy)?;

        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        match event {
            Some(event) => tx.try_send(event).unwrap(),
            None => {
                let token = cancel.clone();
                tokio::spawn(async move {
                    token.cancelled().await;
                    drop(tx);
                });
            }
        }
        Ok(CaptureSession::new(rx, cancel, Some(lease)))
    }
}

// ── Playback ──────────────────────────────────────────────────

#[derive(Default)]
struct BackendState {
    played: Vec<Vec<u8>>,
    next_play_error: Option<PlaybackError>,
    open_error: Option<PlaybackError>,
    opens: usize,
    closes: usize,
}

/// [`OutputBackend`] whose outputs record played buffers and finish at once.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_play(&self, error: PlaybackError) {
        self.state.lock().unwrap().next_play_error = Some(error);
    }

    pub fn fail_open(&self, error: PlaybackError) {
        self.state.lock().unwrap().open_error = Some(error);
    }

    pub fn played(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().played.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl OutputBackend for ScriptedBackend {
    type Output = ScriptedOutput;

    fn open(&mut self) -> Result<ScriptedOutput, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.open_error.take() {
            return Err(e);
        }
        state.opens += 1;
        Ok(ScriptedOutput {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct ScriptedOutput {
    state: Arc<Mutex<BackendState>>,
}

#[async_trait]
impl AudioOutput for ScriptedOutput {
    async fn play(&mut self, audio: &SpeechAudio) -> Result<PlaybackHandle, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.next_play_error.take() {
            return Err(e);
        }
        state.played.push(audio.bytes.clone());
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        Ok(PlaybackHandle::new(rx))
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
    }
}
