//! Reaction generation: chat context in, spoken line out

pub mod gemini;
pub mod prompt;

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::Result;
use crate::config::GenerationConfig;
use crate::voice::{AudioClip, TextToSpeech};

pub use gemini::{GeminiClient, TextRequest};

/// Chat lines remembered across reactions
pub const HISTORY_LIMIT: usize = 20;

/// What the character will say
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    /// Synthesized speech; `None` when TTS produced nothing
    pub audio: Option<AudioClip>,
}

/// Turns a context into an utterance
///
/// `context` is a list of `author: text` lines; empty means idle chatter.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate one reaction
    ///
    /// # Errors
    ///
    /// Returns error if the text or speech request fails
    async fn generate(&self, context: &[String]) -> Result<Utterance>;
}

/// Gemini text plus a TTS voice, with a rolling chat history
pub struct ReactionGenerator {
    llm: GeminiClient,
    tts: TextToSpeech,
    config: GenerationConfig,
    history: Mutex<VecDeque<String>>,
}

impl ReactionGenerator {
    #[must_use]
    pub fn new(llm: GeminiClient, tts: TextToSpeech, config: GenerationConfig) -> Self {
        Self {
            llm,
            tts,
            config,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
        }
    }

    /// Snapshot of remembered lines, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn remember(&self, context: &[String]) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        remember_lines(&mut history, context);
    }
}

/// Append `lines`, keeping only the newest [`HISTORY_LIMIT`]
fn remember_lines(history: &mut VecDeque<String>, lines: &[String]) {
    history.extend(lines.iter().cloned());
    while history.len() > HISTORY_LIMIT {
        history.pop_front();
    }
}

#[async_trait]
impl Generator for ReactionGenerator {
    async fn generate(&self, context: &[String]) -> Result<Utterance> {
        let earlier = self.history();
        let prompt = prompt::build_prompt(context, &earlier);

        let request = TextRequest {
            model: &self.config.model,
            system_instruction: &self.config.system_instruction,
            prompt: &prompt,
            temperature: self.config.temperature,
        };

        let text = match self.llm.generate_text(&request).await? {
            Some(text) => text,
            None => {
                tracing::debug!("model returned no text, using fallback line");
                prompt::fallback_line(context).to_string()
            }
        };

        self.remember(context);

        let audio = self.tts.synthesize(&text).await?;

        tracing::debug!(
            context = context.len(),
            chars = text.len(),
            has_audio = audio.is_some(),
            "reaction generated"
        );

        Ok(Utterance { text, audio })
    }
}
