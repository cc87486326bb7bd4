//! Gemini REST adapter for [`AiGateway`].
//!
//! Every operation is a single `POST {base_url}/v1beta/models/{model}:generateContent`
//! exchange. Requests and responses are modelled as typed serde structs so
//! the wire shape is explicit:
//!
//! - chat: `{systemInstruction?, contents: [...history, message]}` → text parts
//! - single-shot: `{contents: [prompt]}` → text parts
//! - synthesis: `{contents: [text], generationConfig: {responseModalities: ["AUDIO"], speechConfig}}`
//!   → `inlineData.data` (base64)

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::GatewayError;
use super::{AiGateway, ChatRequest, HistoryEntry, SpeechAudio, Voice, prompts, truncate_for_speech};
use crate::config::GatewayConfig;

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_owned),
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate, if any non-blank text exists.
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn inline_audio(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }
}

// ── Request builders ──────────────────────────────────────────

fn history_to_contents(history: &[HistoryEntry]) -> Vec<Content> {
    history
        .iter()
        .map(|entry| Content::text(Some(entry.role.as_str()), entry.text.clone()))
        .collect()
}

fn build_chat_body(request: &ChatRequest) -> GenerateContentRequest {
    let mut contents = history_to_contents(&request.history);
    contents.push(Content::text(Some("user"), request.message.clone()));
    GenerateContentRequest {
        system_instruction: Some(Content::text(
            None,
            prompts::system_instruction(request.profile.as_ref()),
        )),
        contents,
        generation_config: None,
    }
}

fn build_prompt_body(prompt: String) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![Content::text(Some("user"), prompt)],
        generation_config: None,
    }
}

fn build_speech_body(text: String, voice_name: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![Content::text(None, text)],
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice_name.to_owned(),
                    },
                },
            },
        }),
    }
}

/// Extract an error message from a Gemini error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

// ── Adapter ───────────────────────────────────────────────────

/// [`AiGateway`] backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiGateway {
    config: GatewayConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("base_url", &self.config.base_url)
            .field("chat_model", &self.config.chat_model)
            .field("speech_model", &self.config.speech_model)
            .finish()
    }
}

impl GeminiGateway {
    /// Build a gateway from config, resolving the API key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when no API key is configured or the
    /// HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            GatewayError::Config(
                "no API key: set gateway.api_key or GEMINI_API_KEY".to_owned(),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| GatewayError::Config(format!("cannot build HTTP client: {e}")))?;

        info!(
            "Gemini gateway configured: {} chat={} speech={}",
            config.base_url, config.chat_model, config.speech_model
        );
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Provider voice identifier for `voice`.
    #[must_use]
    pub fn voice_name(&self, voice: Voice) -> &str {
        match voice {
            Voice::MaleVoice => &self.config.male_voice,
            Voice::FemaleVoice => &self.config.female_voice,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/v1beta/models/{model}:generateContent")
    }

    /// Map an HTTP error status to the appropriate GatewayError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => GatewayError::Auth(format!("Gemini authentication failed: {message}")),
            code => GatewayError::Provider {
                status: code,
                message,
            },
        }
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = self.endpoint(model);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GatewayError::Request(format!("invalid response body: {e}")))
    }

    async fn generate_text_body(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<String, GatewayError> {
        let response = self.generate(&self.config.chat_model, body).await?;
        response
            .text()
            .ok_or_else(|| GatewayError::EmptyResponse("model returned no text".to_owned()))
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn chat_turn(&self, request: ChatRequest) -> Result<String, GatewayError> {
        info!(
            "chat turn: {} prior turns, personalised={}",
            request.history.len(),
            request.profile.is_some()
        );
        let body = build_chat_body(&request);
        self.generate_text_body(&body).await
    }

    async fn generate_text(&self, prompt: String) -> Result<String, GatewayError> {
        let body = build_prompt_body(prompt);
        self.generate_text_body(&body).await
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<SpeechAudio, GatewayError> {
        let to_speak = truncate_for_speech(text, self.config.max_speech_chars);
        let voice_name = self.voice_name(voice);
        info!(
            "synthesizing {} chars with voice {voice_name}",
            to_speak.chars().count()
        );

        let body = build_speech_body(to_speak.into_owned(), voice_name);
        let response = self.generate(&self.config.speech_model, &body).await?;
        let inline = response.inline_audio().ok_or(GatewayError::SynthesisEmpty)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.trim())
            .map_err(|e| GatewayError::AudioDecode(format!("invalid base64 audio: {e}")))?;
        debug!("received {} audio bytes", bytes.len());

        Ok(SpeechAudio {
            bytes,
            mime_type: inline.mime_type.clone(),
        })
    }
}
