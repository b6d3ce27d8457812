//! Gemini `generateContent` REST client
//!
//! Used for both the reaction text and Gemini speech synthesis.

use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Gemini API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-request timeout (TTS on long lines can take a while)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters for a text generation call
#[derive(Debug, Clone)]
pub struct TextRequest<'a> {
    pub model: &'a str,
    pub system_instruction: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
}

/// Audio returned inline by a speech call
#[derive(Debug, Clone)]
pub struct InlineAudio {
    /// MIME type reported by the API (e.g. `audio/L16;codec=pcm;rate=24000`)
    pub mime_type: Option<String>,
    /// Decoded audio bytes
    pub data: Vec<u8>,
}

/// Thin client over the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client against the public API
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a new client against a custom base URL
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Gemini API key required for generation".to_string()));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Generate text; `None` when the model returned no text parts
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API reports an error
    pub async fn generate_text(&self, request: &TextRequest<'_>) -> Result<Option<String>> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(request.prompt)],
            system_instruction: Some(Content::text(request.system_instruction)),
            generation_config: Some(GenerationConfig {
                temperature: Some(request.temperature),
                response_modalities: None,
                speech_config: None,
            }),
        };

        let response = self
            .generate_content(request.model, &body, Error::Generation)
            .await?;

        Ok(response.text())
    }

    /// Synthesize `text` with a prebuilt voice; `None` when no audio came back
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the API reports an error, or the
    /// inline audio is not valid base64
    pub async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<Option<InlineAudio>> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
            }),
        };

        let response = self.generate_content(model, &body, Error::Tts).await?;

        let Some(inline) = response.inline_data() else {
            return Ok(None);
        };

        let data = base64::engine::general_purpose::STANDARD.decode(inline.data.as_bytes())?;
        Ok(Some(InlineAudio {
            mime_type: inline.mime_type.clone(),
            data,
        }))
    }

    /// POST a `generateContent` request; non-2xx statuses map through `api_error`
    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest<'_>,
        api_error: fn(String) -> Error,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(format!("Gemini API error {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if non-blank
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let trimmed = text.trim();

        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// First inline data part of the first candidate
    fn inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_serializes_in_api_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content::text("react")],
            system_instruction: Some(Content::text("be funny")),
            generation_config: Some(GenerationConfig {
                temperature: Some(1.1),
                response_modalities: None,
                speech_config: None,
            }),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "react");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be funny");
        assert!(json["generationConfig"]["temperature"].as_f64().unwrap() > 1.0);
        assert!(json["generationConfig"].get("speechConfig").is_none());
    }

    #[test]
    fn speech_request_names_voice() {
        let body = GenerateContentRequest {
            contents: vec![Content::text("hello")],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_modalities: Some(vec!["AUDIO"]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Puck".to_string(),
                        },
                    },
                }),
            }),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hey "}, {"text": "chat!"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hey chat!"));
    }

    #[test]
    fn blank_or_missing_text_is_none() {
        let blank: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#,
        )
        .unwrap();
        assert!(blank.text().is_none());

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(blocked.text().is_none());

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn inline_audio_is_found() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAABAA=="}}
            ]}}]}"#,
        )
        .unwrap();

        let inline = response.inline_data().unwrap();
        assert_eq!(inline.mime_type.as_deref(), Some("audio/L16;codec=pcm;rate=24000"));
        assert_eq!(inline.data, "AAABAA==");
    }
}
