//! Reactor daemon: wires feed, reaction loop, voice and overlay together

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{ApiState, OverlayServer};
use crate::config::{Config, TtsProvider};
use crate::feed::{FeedPoller, PollPolicy, YouTubeChatClient};
use crate::generation::{GeminiClient, ReactionGenerator};
use crate::reaction::{PlaybackController, Presence, Reactor};
use crate::voice::{AudioSink, SilentSink, SpeakerSink, TextToSpeech};
use crate::{Error, Result};

/// Feed batches buffered between the poller and the reaction loop
const FEED_CHANNEL_CAPACITY: usize = 32;

/// Main reactor daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if a required key is missing, the video has no active
    /// live chat, or a client cannot be built
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        let youtube = youtube_client(&config)?;
        let handle = youtube
            .resolve_live_chat(&config.feed.video_id)
            .await?
            .ok_or_else(|| {
                Error::Feed(format!(
                    "video {} has no active live chat",
                    config.feed.video_id
                ))
            })?;
        tracing::info!(video_id = %config.feed.video_id, "live chat found");

        let gemini = gemini_client(&config)?;
        let tts = text_to_speech(&config, &gemini)?;
        tracing::info!(provider = tts.provider(), voice = %config.voice.tts_voice, "speech synthesis ready");

        let generator = Arc::new(ReactionGenerator::new(
            gemini,
            tts,
            config.generation.clone(),
        ));
        let playback = PlaybackController::new(audio_sink(&config));
        let reactor = Reactor::new(&config.reaction, generator, playback);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                shutdown_tx.send_replace(true);
            }
        });

        let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let poller = FeedPoller::new(
            Arc::new(youtube),
            handle,
            PollPolicy::from(&config.feed),
        );
        let poller_handle = tokio::spawn(poller.run(feed_tx, shutdown_rx.clone()));

        if config.overlay.enabled {
            let state = ApiState {
                video_id: config.feed.video_id.clone(),
                presence: reactor.presence(),
                cycle_state: reactor.cycle_state(),
            };
            let overlay = OverlayServer::new(state, config.overlay.port)
                .static_dir(config.overlay.static_dir.clone())
                .spawn(shutdown_rx.clone());
            tokio::spawn(supervise_overlay(overlay));
        }

        tokio::spawn(print_subtitles(reactor.presence()));

        tracing::info!("reactor ready");
        reactor.run(feed_rx, shutdown_rx).await;

        if let Err(e) = poller_handle.await {
            tracing::warn!(error = %e, "poller task ended abnormally");
        }

        tracing::info!("daemon stopped");
        Ok(())
    }
}

/// Build the chat feed client
///
/// # Errors
///
/// Returns error if the YouTube key is missing
pub fn youtube_client(config: &Config) -> Result<YouTubeChatClient> {
    let key = require_key(config.api_keys.youtube.as_ref(), "YOUTUBE_API_KEY")?;
    YouTubeChatClient::with_base_url(key, config.feed.base_url.clone())
}

/// Build the Gemini client
///
/// # Errors
///
/// Returns error if the Gemini key is missing
pub fn gemini_client(config: &Config) -> Result<GeminiClient> {
    let key = require_key(config.api_keys.gemini.as_ref(), "GEMINI_API_KEY")?;
    GeminiClient::with_base_url(key, config.generation.base_url.clone())
}

/// Build the configured TTS backend
///
/// # Errors
///
/// Returns error if the provider's key is missing
pub fn text_to_speech(config: &Config, gemini: &GeminiClient) -> Result<TextToSpeech> {
    let voice = &config.voice;
    match voice.provider {
        TtsProvider::Gemini => Ok(TextToSpeech::new_gemini(
            gemini.clone(),
            voice.tts_model.clone(),
            voice.tts_voice.clone(),
        )),
        TtsProvider::OpenAi => {
            let key = require_key(config.api_keys.openai.as_ref(), "OPENAI_API_KEY")?;
            TextToSpeech::new_openai(
                key,
                voice.tts_model.clone(),
                voice.tts_voice.clone(),
                voice.tts_speed,
            )
        }
    }
}

/// Speaker output, or silent timing-only playback
///
/// Falls back to silent playback when no output device is usable.
#[must_use]
pub fn audio_sink(config: &Config) -> Arc<dyn AudioSink> {
    if !config.voice.enabled {
        tracing::info!("speaker disabled, playback is silent");
        return Arc::new(SilentSink);
    }

    match SpeakerSink::new() {
        Ok(speaker) => {
            tracing::info!(device = speaker.device_name(), "speaker output ready");
            Arc::new(speaker)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no usable speaker, playback is silent");
            Arc::new(SilentSink)
        }
    }
}

fn require_key(key: Option<&SecretString>, var: &str) -> Result<SecretString> {
    key.cloned()
        .ok_or_else(|| Error::Config(format!("{var} is not set")))
}

/// Wait on the overlay task and log how it ended
///
/// The reactor keeps running without an overlay.
///
/// # Errors
///
/// Returns the overlay's bind or serve error, or a config error if the task
/// panicked
pub async fn supervise_overlay(handle: JoinHandle<Result<()>>) -> Result<()> {
    let result = handle
        .await
        .unwrap_or_else(|e| Err(Error::Config(format!("overlay task failed: {e}"))));

    match &result {
        Ok(()) => tracing::debug!("overlay server stopped"),
        Err(e) => tracing::error!(error = %e, "overlay server failed, continuing without overlay"),
    }
    result
}

/// Echo each new subtitle to stdout
async fn print_subtitles(mut presence: watch::Receiver<Presence>) {
    while presence.changed().await.is_ok() {
        let current = presence.borrow_and_update().clone();
        if current.is_speaking {
            println!("> {}", current.subtitle);
        }
    }
}
