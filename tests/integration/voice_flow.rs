//! Full voice cycles against the mocked Gemini service.

use ecosmart::voice::{
    CAPTURE_ERROR_MESSAGE, CaptureError, CaptureEvent, CycleOutcome, VOICE_APOLOGY,
    VoiceOrchestrator, VoicePhase,
};
use wiremock::MockServer;

use crate::helpers::{
    CHAT_PATH, QueuedRecognizer, RecordingBackend, SPEECH_PATH, drain_phases, gemini, hits,
    mount_audio, mount_status, mount_text, profile,
};

#[tokio::test]
async fn spoken_question_is_answered_aloud() {
    let server = MockServer::start().await;
    mount_text(&server, CHAT_PATH, "الجو مشمس").await;
    mount_audio(&server, &[7u8; 200]).await;

    let recognizer = QueuedRecognizer::new([CaptureEvent::Final("كيف الجو اليوم".into())]);
    let backend = RecordingBackend::default();
    let mut voice = VoiceOrchestrator::new(
        gemini(&server),
        recognizer.clone(),
        backend.clone(),
        Some(profile()),
        "ar-SA",
    );
    let mut phases = voice.subscribe();

    let outcome = voice.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Completed), "{outcome:?}");
    assert_eq!(voice.phase(), VoicePhase::Idle);
    assert_eq!(voice.session().response_text.as_deref(), Some("الجو مشمس"));

    let played = backend.played();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].len(), 200);
    assert_eq!(
        drain_phases(&mut phases),
        vec![
            "listening",
            "transcribed",
            "processing",
            "speaking",
            "speaking(playing)",
            "idle"
        ]
    );
    assert!(!recognizer.slot().is_held());
}

#[tokio::test]
async fn voice_turns_carry_no_history() {
    let server = MockServer::start().await;
    mount_text(&server, CHAT_PATH, "نعم").await;
    mount_audio(&server, &[0u8; 4]).await;

    let recognizer = QueuedRecognizer::new([
        CaptureEvent::Final("السؤال الأول".into()),
        CaptureEvent::Final("السؤال الثاني".into()),
    ]);
    let backend = RecordingBackend::default();
    let mut voice = VoiceOrchestrator::new(
        gemini(&server),
        recognizer,
        backend.clone(),
        Some(profile()),
        "ar-SA",
    );

    voice.run_cycle().await;
    voice.run_cycle().await;

    let requests = server.received_requests().await.expect("recording enabled");
    let chats: Vec<serde_json::Value> = requests
        .iter()
        .filter(|r| r.url.path() == CHAT_PATH)
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect();
    assert_eq!(chats.len(), 2);
    for chat in &chats {
        assert_eq!(chat["contents"].as_array().map(Vec::len), Some(1));
    }
    assert_eq!(backend.opens(), 1);
    assert_eq!(backend.played().len(), 2);
}

#[tokio::test]
async fn service_failure_is_spoken_as_apology_text_only() {
    let server = MockServer::start().await;
    mount_status(&server, CHAT_PATH, 503).await;

    let recognizer = QueuedRecognizer::new([CaptureEvent::Final("مرحبا".into())]);
    let backend = RecordingBackend::default();
    let mut voice = VoiceOrchestrator::new(
        gemini(&server),
        recognizer,
        backend.clone(),
        None,
        "ar-SA",
    );

    let outcome = voice.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::ReplyFailed(_)));
    assert_eq!(voice.phase(), VoicePhase::Idle);
    assert_eq!(voice.session().response_text.as_deref(), Some(VOICE_APOLOGY));
    assert_eq!(hits(&server, SPEECH_PATH).await, 0);
    assert!(backend.played().is_empty());
}

#[tokio::test]
async fn unheard_speech_reports_capture_message() {
    let server = MockServer::start().await;
    let recognizer = QueuedRecognizer::new([CaptureEvent::Failed(CaptureError::NoSpeech)]);
    let mut voice = VoiceOrchestrator::new(
        gemini(&server),
        recognizer,
        RecordingBackend::default(),
        None,
        "ar-SA",
    );

    let outcome = voice.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::CaptureFailed(CaptureError::NoSpeech)));
    assert_eq!(
        voice.session().last_error.as_deref(),
        Some(CAPTURE_ERROR_MESSAGE)
    );
    assert_eq!(hits(&server, CHAT_PATH).await, 0);
}
