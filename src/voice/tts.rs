//! Text-to-speech (TTS) processing

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::{AudioClip, GEMINI_SAMPLE_RATE, decode_mp3, pcm16le_to_f32, sample_rate_from_mime};
use crate::generation::gemini::GeminiClient;
use crate::{Error, Result};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Per-request timeout for OpenAI speech
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// TTS provider backend
#[derive(Clone)]
enum Backend {
    /// Gemini speech model returning raw 16-bit PCM
    Gemini(GeminiClient),
    /// `OpenAI` speech endpoint returning MP3
    OpenAi {
        client: reqwest::Client,
        api_key: SecretString,
    },
}

/// Synthesizes speech from text
#[derive(Clone)]
pub struct TextToSpeech {
    backend: Backend,
    model: String,
    voice: String,
    speed: f32,
}

impl TextToSpeech {
    /// Create a TTS instance backed by a Gemini speech model
    #[must_use]
    pub fn new_gemini(client: GeminiClient, model: String, voice: String) -> Self {
        Self {
            backend: Backend::Gemini(client),
            model,
            voice,
            speed: 1.0,
        }
    }

    /// Create a TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, model: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            backend: Backend::OpenAi {
                client,
                api_key,
            },
            model,
            voice,
            speed,
        })
    }

    /// Provider name for logs
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        match self.backend {
            Backend::Gemini(_) => "gemini",
            Backend::OpenAi { .. } => "openai",
        }
    }

    /// Synthesize text to a playable clip
    ///
    /// Returns `Ok(None)` when the provider answered without audio.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or decoding fails
    pub async fn synthesize(&self, text: &str) -> Result<Option<AudioClip>> {
        let clip = match &self.backend {
            Backend::Gemini(client) => self.synthesize_gemini(client, text).await?,
            Backend::OpenAi { client, api_key } => {
                self.synthesize_openai(client, api_key, text).await?
            }
        };

        Ok(clip.filter(|c| !c.is_empty()))
    }

    async fn synthesize_gemini(&self, client: &GeminiClient, text: &str) -> Result<Option<AudioClip>> {
        let Some(audio) = client.synthesize_speech(&self.model, &self.voice, text).await? else {
            return Ok(None);
        };

        let rate = audio
            .mime_type
            .as_deref()
            .and_then(sample_rate_from_mime)
            .unwrap_or(GEMINI_SAMPLE_RATE);

        Ok(Some(AudioClip::new(pcm16le_to_f32(&audio.data), rate)))
    }

    async fn synthesize_openai(
        &self,
        client: &reqwest::Client,
        api_key: &SecretString,
        text: &str,
    ) -> Result<Option<AudioClip>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = client
            .post(OPENAI_SPEECH_URL)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Ok(None);
        }

        decode_mp3(&audio).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_requires_key() {
        let result = TextToSpeech::new_openai(
            SecretString::from(String::new()),
            "tts-1".to_string(),
            "fable".to_string(),
            1.0,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn provider_names() {
        let gemini = GeminiClient::new(SecretString::from("key".to_string())).unwrap();
        let tts = TextToSpeech::new_gemini(gemini, "tts-model".to_string(), "Puck".to_string());
        assert_eq!(tts.provider(), "gemini");

        let openai = TextToSpeech::new_openai(
            SecretString::from("sk-test".to_string()),
            "tts-1".to_string(),
            "fable".to_string(),
            1.0,
        )
        .unwrap();
        assert_eq!(openai.provider(), "openai");
    }
}
