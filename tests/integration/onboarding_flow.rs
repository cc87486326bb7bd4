//! Onboarding, profile persistence and config round-trips on disk.

use ecosmart::EcoConfig;
use ecosmart::conversation::{ConversationSession, greeting_for};
use ecosmart::profile::{Gender, PROFILE_STORAGE_KEY, ProfileDraft, ProfileStore};
use wiremock::MockServer;

use crate::helpers::gemini;

#[test]
fn onboard_persist_reload_and_logout() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = ProfileStore::new(dir.path());
    assert!(store.load().expect("load").is_none());

    let profile = ProfileDraft {
        name: " نورة ".into(),
        gender: Gender::Female,
        country: "الكويت".into(),
        city: "مدينة الكويت".into(),
    }
    .build()
    .expect("valid draft");
    store.save(&profile).expect("save");
    assert!(dir.path().join(PROFILE_STORAGE_KEY).exists());

    let reloaded = store.load().expect("load").expect("profile present");
    assert_eq!(reloaded, profile);
    assert_eq!(reloaded.name, "نورة");

    store.clear().expect("clear");
    assert!(store.load().expect("load").is_none());
    store.clear().expect("clearing twice is fine");
}

#[test]
fn corrupt_profile_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join(PROFILE_STORAGE_KEY), "{not json").expect("write");
    assert!(ProfileStore::new(dir.path()).load().is_err());
}

#[tokio::test]
async fn reloaded_profile_seeds_greeting() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = ProfileStore::new(dir.path());
    let profile = ProfileDraft {
        name: "عمر".into(),
        gender: Gender::Male,
        country: "مصر".into(),
        city: "الإسكندرية".into(),
    }
    .build()
    .expect("valid draft");
    store.save(&profile).expect("save");

    let server = MockServer::start().await;
    let reloaded = store.load().expect("load").expect("profile present");
    let session = ConversationSession::with_greeting(gemini(&server), reloaded);
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, greeting_for(&profile));
    assert!(transcript[0].text.contains("الإسكندرية"));
}

#[test]
fn config_round_trips_through_toml() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("nested").join("config.toml");

    let mut config = EcoConfig::default();
    config.gateway.max_speech_chars = 300;
    config.voice.output_device = Some("USB Speaker".into());
    config.insight.weather_refresh_secs = 900;
    config.save_to_file(&path).expect("save config");

    let loaded = EcoConfig::load_or_default(Some(&path)).expect("load config");
    assert_eq!(loaded.gateway.max_speech_chars, 300);
    assert_eq!(loaded.voice.output_device.as_deref(), Some("USB Speaker"));
    assert_eq!(loaded.insight.weather_refresh_secs, 900);
    assert_eq!(loaded.gateway.chat_model, "gemini-2.5-flash");
}
