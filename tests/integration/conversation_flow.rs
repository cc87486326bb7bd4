//! Text chat flows against the mocked Gemini service.

use ecosmart::conversation::{CHAT_APOLOGY, ConversationSession, ReplyOutcome, Role};
use serde_json::Value;
use wiremock::MockServer;

use crate::helpers::{CHAT_PATH, gemini, hits, mount_status, mount_text, profile};

#[tokio::test]
async fn greeting_then_reply_builds_transcript() {
    let server = MockServer::start().await;
    mount_text(&server, CHAT_PATH, "أهلاً بك").await;
    let session = ConversationSession::new(gemini(&server), None);

    let outcome = session.send("مرحبا").await.expect("message accepted");
    assert!(matches!(outcome, ReplyOutcome::Replied(_)));

    let transcript: Vec<(Role, String)> = session
        .transcript()
        .into_iter()
        .map(|t| (t.role, t.text))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Role::User, "مرحبا".to_owned()),
            (Role::Model, "أهلاً بك".to_owned()),
        ]
    );
}

#[tokio::test]
async fn gateway_failure_becomes_fixed_apology() {
    let server = MockServer::start().await;
    mount_status(&server, CHAT_PATH, 500).await;
    let session = ConversationSession::new(gemini(&server), Some(profile()));

    let outcome = session.send("مرحبا").await.expect("message accepted");
    assert!(matches!(outcome, ReplyOutcome::Apologized { .. }));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].role, Role::Model);
    assert_eq!(transcript[1].text, CHAT_APOLOGY);
    assert!(!transcript[1].text.contains("backend unavailable"));
    assert!(!session.is_busy());
}

#[tokio::test]
async fn greeting_is_sent_as_history() {
    let server = MockServer::start().await;
    mount_text(&server, CHAT_PATH, "بالتأكيد").await;
    let session = ConversationSession::with_greeting(gemini(&server), profile());
    assert_eq!(session.len(), 1);

    session.send("هل تساعدني؟").await.expect("message accepted");
    session.send("شكراً").await.expect("message accepted");
    assert_eq!(session.len(), 5);
    assert_eq!(hits(&server, CHAT_PATH).await, 2);

    let requests = server.received_requests().await.expect("recording enabled");
    let last: Value = serde_json::from_slice(&requests[1].body).expect("json body");
    let contents = last["contents"].as_array().expect("contents array");
    let roles: Vec<&str> = contents
        .iter()
        .map(|c| c["role"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(roles, vec!["model", "user", "model", "user"]);
    assert_eq!(contents[3]["parts"][0]["text"], "شكراً");
}

#[tokio::test]
async fn blank_message_never_reaches_the_service() {
    let server = MockServer::start().await;
    let session = ConversationSession::new(gemini(&server), None);

    assert!(session.send("   ").await.is_none());
    assert!(session.is_empty());
    assert_eq!(hits(&server, CHAT_PATH).await, 0);
}
