//! Shared helpers for integration tests.
//!
//! A wiremock-backed Gemini gateway plus in-memory capture and playback
//! devices, so full flows run without network or audio hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use ecosmart::config::GatewayConfig;
use ecosmart::gateway::{GeminiGateway, SpeechAudio};
use ecosmart::profile::{Gender, UserProfile};
use ecosmart::voice::{
    AudioOutput, CaptureError, CaptureEvent, CaptureSession, DeviceSlot, OutputBackend,
    PhaseChange, PlaybackError, PlaybackHandle, RecognitionRequest, SpeechRecognizer,
};
use serde_json::json;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const CHAT_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
pub(crate) const SPEECH_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

pub(crate) fn profile() -> UserProfile {
    UserProfile {
        name: "خالد".into(),
        gender: Gender::Male,
        country: "المملكة العربية السعودية".into(),
        city: "جدة".into(),
    }
}

/// Gateway pointed at `server` with a fixed test key.
pub(crate) fn gemini(server: &MockServer) -> Arc<GeminiGateway> {
    let config = GatewayConfig {
        base_url: server.uri(),
        api_key: Some("integration-key".to_owned()),
        request_timeout_secs: 5,
        ..GatewayConfig::default()
    };
    Arc::new(GeminiGateway::new(config).expect("build gateway"))
}

pub(crate) async fn mount_text(server: &MockServer, route: &str, text: &str) {
    Mock::given(method("POST"))
        .and(path(route.to_owned()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })))
        .mount(server)
        .await;
}

pub(crate) async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(route.to_owned()))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "error": {"code": status, "message": "backend unavailable"}
        })))
        .mount(server)
        .await;
}

pub(crate) async fn mount_audio(server: &MockServer, bytes: &[u8]) {
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{
                "inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": data}
            }]}}]
        })))
        .mount(server)
        .await;
}

/// Number of requests `server` received on `route`.
pub(crate) async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

/// Drain all pending phase changes into the phases reached.
pub(crate) fn drain_phases(rx: &mut broadcast::Receiver<PhaseChange>) -> Vec<String> {
    let mut phases = Vec::new();
    while let Ok(change) = rx.try_recv() {
        phases.push(change.to.to_string());
    }
    phases
}

/// Recognizer that hears one queued utterance per capture.
#[derive(Clone)]
pub(crate) struct QueuedRecognizer {
    utterances: Arc<Mutex<VecDeque<CaptureEvent>>>,
    slot: DeviceSlot,
}

impl QueuedRecognizer {
    pub(crate) fn new(events: impl IntoIterator<Item = CaptureEvent>) -> Self {
        Self {
            utterances: Arc::new(Mutex::new(events.into_iter().collect())),
            slot: DeviceSlot::new("integration capture"),
        }
    }

    pub(crate) fn slot(&self) -> DeviceSlot {
        self.slot.clone()
    }
}

#[async_trait]
impl SpeechRecognizer for QueuedRecognizer {
    async fn start(&mut self, _request: &RecognitionRequest) -> Result<CaptureSession, CaptureError> {
        let lease = self.slot.try_acquire().ok_or(CaptureError::DeviceBusy)?;
        let (tx, rx) = mpsc::channel(1);
        let next = self.utterances.lock().expect("utterances lock").pop_front();
        if let Some(event) = next {
            tx.try_send(event).expect("fresh channel has room");
        }
        Ok(CaptureSession::new(rx, CancellationToken::new(), Some(lease)))
    }
}

/// Output that records every buffer it is asked to play.
#[derive(Clone, Default)]
pub(crate) struct RecordingBackend {
    played: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<Mutex<usize>>,
}

impl RecordingBackend {
    pub(crate) fn played(&self) -> Vec<Vec<u8>> {
        self.played.lock().expect("played lock").clone()
    }

    pub(crate) fn opens(&self) -> usize {
        *self.opens.lock().expect("opens lock")
    }
}

impl OutputBackend for RecordingBackend {
    type Output = RecordingOutput;

    fn open(&mut self) -> Result<RecordingOutput, PlaybackError> {
        *self.opens.lock().expect("opens lock") += 1;
        Ok(RecordingOutput {
            played: Arc::clone(&self.played),
        })
    }
}

pub(crate) struct RecordingOutput {
    played: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&mut self, audio: &SpeechAudio) -> Result<PlaybackHandle, PlaybackError> {
        self.played
            .lock()
            .expect("played lock")
            .push(audio.bytes.clone());
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        Ok(PlaybackHandle::new(rx))
    }

    fn close(&mut self) {}
}
