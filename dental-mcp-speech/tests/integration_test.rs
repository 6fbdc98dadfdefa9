//! Live integration tests for dental-mcp-speech.
//!
//! Run with: `cargo test --package dental-mcp-speech --test integration_test`
//!
//! These tests require ELEVENLABS_API_KEY and spend synthesis credits.
//! Set SKIP_INTEGRATION_TESTS to skip them.

use dental_mcp_common::config::SpeechConfig;
use dental_mcp_common::error::Error;
use dental_mcp_speech::SpeechConverter;
use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize environment from .env file once
fn init_env() {
    INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

fn get_test_config() -> Option<SpeechConfig> {
    init_env();
    if env::var("SKIP_INTEGRATION_TESTS").is_ok() {
        return None;
    }
    SpeechConfig::from_env().ok()
}

/// Macro to skip test if integration tests are disabled.
macro_rules! skip_if_no_integration {
    () => {
        match get_test_config() {
            Some(config) => config,
            None => {
                eprintln!("Skipping integration test: ELEVENLABS_API_KEY not set");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_synthesize_default_voice() {
    let config = skip_if_no_integration!();

    let converter = SpeechConverter::new(config);
    let audio = converter
        .synthesize("Your appointment is tomorrow at 3pm.", None)
        .await
        .expect("synthesis should succeed with a valid key");

    assert!(!audio.is_empty(), "audio should not be empty");
}

#[tokio::test]
async fn test_synthesize_and_persist() {
    let config = skip_if_no_integration!();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reminder.mp3");

    let converter = SpeechConverter::new(config);
    let written = converter
        .synthesize_to_file("Tot morgen om drie uur.", None, &out)
        .await
        .expect("synthesis should succeed with a valid key");

    assert_eq!(std::fs::metadata(&out).unwrap().len() as usize, written);
}

#[tokio::test]
async fn test_invalid_key_is_rejected_remotely() {
    let _ = skip_if_no_integration!();

    let converter = SpeechConverter::new(SpeechConfig::new("definitely-not-a-key"));
    let err = converter.synthesize("Hello", None).await.unwrap_err();

    match err {
        Error::Synthesis(inner) => assert_eq!(inner.status_code(), Some(401)),
        other => panic!("expected synthesis error, got {:?}", other),
    }
}
