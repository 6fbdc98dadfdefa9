//! Text-to-speech conversion against the ElevenLabs API.
//!
//! [`SpeechConverter`] turns a piece of text into encoded audio with one HTTP
//! request and can write the result to disk. It keeps no state between calls
//! apart from the credentials and HTTP client it was built with.

use dental_mcp_common::config::{SpeechConfig, SynthesisProfile};
use dental_mcp_common::error::{Error, SynthesisError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// MIME type requested from and returned by the synthesis endpoint.
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Header carrying the ElevenLabs API key.
pub const API_KEY_HEADER: &str = "xi-api-key";

/// Voice quality parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    /// Voice stability in [0, 1]
    pub stability: f32,
    /// Similarity boost in [0, 1]
    pub similarity_boost: f32,
}

/// JSON body of a synthesis request.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest<'a> {
    /// Text to narrate
    pub text: &'a str,
    /// Synthesis model
    pub model_id: &'a str,
    /// Voice quality parameters
    pub voice_settings: VoiceSettings,
}

impl<'a> SynthesisRequest<'a> {
    /// Build a request for `text` using the given profile.
    pub fn new(text: &'a str, profile: &'a SynthesisProfile) -> Self {
        Self {
            text,
            model_id: &profile.model_id,
            voice_settings: VoiceSettings {
                stability: profile.stability,
                similarity_boost: profile.similarity_boost,
            },
        }
    }
}

/// Check that a voice id can be placed in the endpoint path as-is.
pub fn validate_voice_id(voice_id: &str) -> Result<(), Error> {
    if voice_id.trim().is_empty() {
        return Err(Error::validation("voice_id cannot be empty"));
    }
    if !voice_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!(
            "voice_id '{}' may only contain letters, digits, '-' and '_'",
            voice_id
        )));
    }
    Ok(())
}

/// Converts text to speech and optionally stores the audio.
pub struct SpeechConverter {
    config: SpeechConfig,
    http: reqwest::Client,
}

impl SpeechConverter {
    /// Create a converter. Credentials are not checked until the first request.
    pub fn new(config: SpeechConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a converter with an explicit HTTP client.
    pub fn with_client(config: SpeechConfig, http: reqwest::Client) -> Self {
        debug!(base_url = %config.base_url, "Initializing SpeechConverter");
        Self { config, http }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Synthesize `text` and return the encoded audio exactly as received.
    ///
    /// `voice_id` falls back to the configured default voice.
    ///
    /// # Errors
    /// - `Error::Validation` for empty text or an unusable voice id; no request is sent
    /// - `Error::Synthesis` when the request fails, the endpoint answers non-2xx,
    ///   or the body cannot be read. The failure is logged before it is returned.
    #[instrument(level = "info", name = "synthesize_speech", skip(self, text), fields(text_len = text.len()))]
    pub async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>, Error> {
        if text.trim().is_empty() {
            return Err(Error::validation("text cannot be empty"));
        }
        let voice_id = voice_id.unwrap_or(&self.config.default_voice_id);
        validate_voice_id(voice_id)?;

        let endpoint = self.config.synthesis_endpoint(voice_id);
        let request = SynthesisRequest::new(text, &self.config.profile);

        info!(voice_id = %voice_id, model_id = %request.model_id, "Synthesizing speech");
        debug!(endpoint = %endpoint, "Calling text-to-speech API");

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(ACCEPT, AUDIO_MIME_TYPE)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| report(SynthesisError::request(&endpoint, e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(report(SynthesisError::status(&endpoint, status.as_u16(), body)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| report(SynthesisError::body(&endpoint, e.to_string())))?;

        info!(bytes = audio.len(), "Received audio from text-to-speech API");
        Ok(audio.to_vec())
    }

    /// Write `payload` to `filename`, replacing any existing file.
    ///
    /// The path is used as given: parent directories are not created and the
    /// path is not checked for traversal.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be written.
    #[instrument(level = "info", name = "persist_audio", skip(self, payload, filename))]
    pub async fn persist(&self, payload: &[u8], filename: impl AsRef<Path>) -> Result<(), Error> {
        let path = filename.as_ref();
        tokio::fs::write(path, payload).await?;
        info!(path = %path.display(), bytes = payload.len(), "Audio saved");
        Ok(())
    }

    /// Synthesize `text` and write the audio to `filename`.
    ///
    /// Nothing is written if synthesis fails.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        voice_id: Option<&str>,
        filename: impl AsRef<Path>,
    ) -> Result<usize, Error> {
        let audio = self.synthesize(text, voice_id).await?;
        self.persist(&audio, filename).await?;
        Ok(audio.len())
    }
}

fn report(err: SynthesisError) -> Error {
    error!(
        endpoint = %err.endpoint(),
        status = ?err.status_code(),
        error = %err,
        "Speech synthesis failed"
    );
    err.into()
}
