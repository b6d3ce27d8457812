//! Configuration management for the live chat reactor

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

pub use crate::reaction::OverflowPolicy;
use crate::{Error, Result};
use file::ReactorConfigFile;

/// Video followed when none is configured
pub const DEFAULT_VIDEO_ID: &str = "fZqITgdQX_8";

/// Default character description sent as the system instruction
const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a funny stick figure bot.";

/// Live chat reactor configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Chat feed configuration
    pub feed: FeedConfig,

    /// Reaction loop timing
    pub reaction: ReactionConfig,

    /// Text generation configuration
    pub generation: GenerationConfig,

    /// Voice output configuration
    pub voice: VoiceConfig,

    /// Overlay HTTP server configuration
    pub overlay: OverlayConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Chat feed polling configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Video whose live chat is followed
    pub video_id: String,

    /// YouTube Data API base URL
    pub base_url: String,

    /// Floor applied to the feed's suggested poll interval
    pub min_interval: Duration,

    /// Interval used when the feed suggests none
    pub default_interval: Duration,

    /// Retry delay after a failed poll
    pub fallback_interval: Duration,

    /// Ceiling for the backoff applied after repeated failures
    pub max_backoff: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            video_id: DEFAULT_VIDEO_ID.to_string(),
            base_url: crate::feed::youtube::DEFAULT_BASE_URL.to_string(),
            min_interval: Duration::from_millis(5000),
            default_interval: Duration::from_millis(5000),
            fallback_interval: Duration::from_millis(10_000),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Reaction loop configuration
#[derive(Debug, Clone)]
pub struct ReactionConfig {
    /// Period of the trigger's decision tick
    pub tick_interval: Duration,

    /// Silence after which the character speaks without new messages
    pub idle_timeout: Duration,

    /// Longest a generation call may run before its cycle counts as failed
    pub generation_timeout: Duration,

    /// Optional cap on pending messages (`None` = unbounded)
    pub max_pending: Option<usize>,

    /// What to do when the cap is hit
    pub overflow: OverflowPolicy,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(90),
            max_pending: None,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Gemini model used for reaction text
    pub model: String,

    /// Sampling temperature (higher = more random)
    pub temperature: f32,

    /// Character description
    pub system_instruction: String,

    /// Gemini API base URL
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            temperature: 1.1,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            base_url: crate::generation::gemini::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Which service synthesizes speech
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    /// Gemini TTS (raw PCM)
    Gemini,
    /// `OpenAI` TTS (MP3)
    OpenAi,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Play through the speaker (false = silent timing-only playback)
    pub enabled: bool,

    /// TTS backend
    pub provider: TtsProvider,

    /// TTS model identifier
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (`OpenAI` only)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: TtsProvider::Gemini,
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            tts_voice: "Puck".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Overlay HTTP server configuration
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Serve presence state over HTTP
    pub enabled: bool,

    /// Port to listen on
    pub port: u16,

    /// Path to static files for the overlay page
    pub static_dir: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 18790,
            static_dir: None,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// YouTube Data API key
    pub youtube: Option<SecretString>,

    /// Gemini API key (text generation and Gemini TTS)
    pub gemini: Option<SecretString>,

    /// `OpenAI` API key (`OpenAI` TTS)
    pub openai: Option<SecretString>,
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or fails validation
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with CLI overrides applied last
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or fails validation
    pub fn load_with_options(video_id: Option<&str>, disable_audio: bool) -> Result<Self> {
        let fc = file::load_config_file();
        let mut config = Self::from_sources(fc, |key| std::env::var(key).ok())?;

        if let Some(video_id) = video_id {
            config.feed.video_id = video_id.to_string();
        }
        if disable_audio {
            tracing::info!("speaker output disabled via --disable-audio");
            config.voice.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Precedence is env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if an environment value cannot be parsed
    pub fn from_sources<F>(fc: ReactorConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str, file: Option<u64>, default: Duration| -> Result<Duration> {
            match env(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| Error::Config(format!("{key} must be milliseconds, got {raw:?}"))),
                None => Ok(file.map_or(default, Duration::from_millis)),
            }
        };

        let feed = FeedConfig {
            video_id: env("REACTOR_VIDEO_ID")
                .or(fc.feed.video_id)
                .unwrap_or(defaults.feed.video_id),
            base_url: fc.feed.base_url.unwrap_or(defaults.feed.base_url),
            min_interval: millis(
                "REACTOR_MIN_POLL_MS",
                fc.feed.min_interval_ms,
                defaults.feed.min_interval,
            )?,
            default_interval: fc
                .feed
                .default_interval_ms
                .map_or(defaults.feed.default_interval, Duration::from_millis),
            fallback_interval: millis(
                "REACTOR_FALLBACK_POLL_MS",
                fc.feed.fallback_interval_ms,
                defaults.feed.fallback_interval,
            )?,
            max_backoff: millis(
                "REACTOR_MAX_BACKOFF_MS",
                fc.feed.max_backoff_ms,
                defaults.feed.max_backoff,
            )?,
        };

        let max_pending = match env("REACTOR_MAX_PENDING") {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                Error::Config(format!("REACTOR_MAX_PENDING must be a count, got {raw:?}"))
            })?),
            None => fc.reaction.max_pending,
        };

        let reaction = ReactionConfig {
            tick_interval: millis(
                "REACTOR_TICK_MS",
                fc.reaction.tick_ms,
                defaults.reaction.tick_interval,
            )?,
            idle_timeout: millis(
                "REACTOR_IDLE_TIMEOUT_MS",
                fc.reaction.idle_timeout_ms,
                defaults.reaction.idle_timeout,
            )?,
            generation_timeout: millis(
                "REACTOR_GENERATION_TIMEOUT_MS",
                fc.reaction.generation_timeout_ms,
                defaults.reaction.generation_timeout,
            )?,
            max_pending,
            overflow: fc.reaction.overflow.unwrap_or(defaults.reaction.overflow),
        };

        let generation = GenerationConfig {
            model: env("REACTOR_TEXT_MODEL")
                .or(fc.generation.model)
                .unwrap_or(defaults.generation.model),
            temperature: fc
                .generation
                .temperature
                .unwrap_or(defaults.generation.temperature),
            system_instruction: fc
                .generation
                .system_instruction
                .unwrap_or(defaults.generation.system_instruction),
            base_url: fc.generation.base_url.unwrap_or(defaults.generation.base_url),
        };

        let provider = match env("REACTOR_TTS_PROVIDER").or(fc.voice.provider) {
            Some(raw) => raw.parse()?,
            None => defaults.voice.provider,
        };

        // OpenAI has no "Puck" voice, so provider-specific defaults apply
        let (default_model, default_voice) = match provider {
            TtsProvider::Gemini => (defaults.voice.tts_model, defaults.voice.tts_voice),
            TtsProvider::OpenAi => ("tts-1".to_string(), "fable".to_string()),
        };

        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(defaults.voice.enabled),
            provider,
            tts_model: env("REACTOR_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(default_model),
            tts_voice: env("REACTOR_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(default_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(defaults.voice.tts_speed),
        };

        let port = match env("REACTOR_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("REACTOR_PORT must be a port, got {raw:?}")))?,
            None => fc.overlay.port.unwrap_or(defaults.overlay.port),
        };

        let overlay = OverlayConfig {
            enabled: fc.overlay.enabled.unwrap_or(defaults.overlay.enabled),
            port,
            static_dir: env("REACTOR_STATIC_DIR")
                .or(fc.overlay.static_dir)
                .map(PathBuf::from),
        };

        let api_keys = ApiKeys {
            youtube: env("YOUTUBE_API_KEY")
                .or(fc.api_keys.youtube)
                .map(SecretString::from),
            gemini: env("GEMINI_API_KEY")
                .or_else(|| env("API_KEY"))
                .or(fc.api_keys.gemini)
                .map(SecretString::from),
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
        };

        Ok(Self {
            feed,
            reaction,
            generation,
            voice,
            overlay,
            api_keys,
        })
    }

    /// Check invariants the reaction loop relies on
    ///
    /// # Errors
    ///
    /// Returns error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.feed.video_id.trim().is_empty() {
            return Err(Error::Config("video id must not be empty".to_string()));
        }
        if self.feed.min_interval.is_zero() {
            return Err(Error::Config("minimum poll interval must be positive".to_string()));
        }
        if self.feed.fallback_interval.is_zero() {
            return Err(Error::Config("fallback poll interval must be positive".to_string()));
        }
        if self.feed.max_backoff < self.feed.fallback_interval {
            return Err(Error::Config(
                "max backoff must be at least the fallback interval".to_string(),
            ));
        }
        if self.reaction.tick_interval.is_zero() {
            return Err(Error::Config("tick interval must be positive".to_string()));
        }
        if self.reaction.generation_timeout.is_zero() {
            return Err(Error::Config("generation timeout must be positive".to_string()));
        }
        if self.reaction.max_pending == Some(0) {
            return Err(Error::Config("max pending must be at least 1".to_string()));
        }
        Ok(())
    }
}
