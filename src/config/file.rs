//! TOML configuration file loading
//!
//! Supports `~/.config/livechat-reactor/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::OverflowPolicy;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ReactorConfigFile {
    /// Chat feed configuration
    #[serde(default)]
    pub feed: FeedFileConfig,

    /// Reaction loop timing
    #[serde(default)]
    pub reaction: ReactionFileConfig,

    /// Text generation configuration
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Overlay server configuration
    #[serde(default)]
    pub overlay: OverlayFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Chat feed configuration
#[derive(Debug, Default, Deserialize)]
pub struct FeedFileConfig {
    /// Video whose live chat is followed
    pub video_id: Option<String>,

    /// Override for the YouTube Data API base URL
    pub base_url: Option<String>,

    /// Poll interval floor in milliseconds
    pub min_interval_ms: Option<u64>,

    /// Interval used when the feed suggests none
    pub default_interval_ms: Option<u64>,

    /// Retry delay after a failed poll
    pub fallback_interval_ms: Option<u64>,

    /// Ceiling for backoff after repeated failures
    pub max_backoff_ms: Option<u64>,
}

/// Reaction loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct ReactionFileConfig {
    pub tick_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
    pub generation_timeout_ms: Option<u64>,
    pub max_pending: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
}

/// Text generation configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    /// Model identifier (e.g. "gemini-3-flash-preview")
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// System instruction describing the character
    pub system_instruction: Option<String>,

    /// Override for the Gemini API base URL
    pub base_url: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable speaker output
    pub enabled: Option<bool>,

    /// TTS provider ("gemini" or "openai")
    pub provider: Option<String>,

    /// TTS model (e.g. "gemini-2.5-flash-preview-tts")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "Puck")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier (`OpenAI` only)
    pub tts_speed: Option<f32>,
}

/// Overlay server configuration
#[derive(Debug, Default, Deserialize)]
pub struct OverlayFileConfig {
    pub enabled: Option<bool>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub youtube: Option<String>,
    pub gemini: Option<String>,
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ReactorConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ReactorConfigFile {
    let Some(path) = config_file_path() else {
        return ReactorConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path, falling back to defaults
pub fn load_config_file_from(path: &Path) -> ReactorConfigFile {
    if !path.exists() {
        return ReactorConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ReactorConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ReactorConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/livechat-reactor/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("livechat-reactor").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc: ReactorConfigFile = toml::from_str(
            r#"
            [feed]
            video_id = "abc123"
            min_interval_ms = 7000

            [reaction]
            idle_timeout_ms = 20000
            overflow = "reject-newest"
            "#,
        )
        .unwrap();

        assert_eq!(fc.feed.video_id.as_deref(), Some("abc123"));
        assert_eq!(fc.feed.min_interval_ms, Some(7000));
        assert_eq!(fc.reaction.idle_timeout_ms, Some(20000));
        assert_eq!(fc.reaction.overflow, Some(OverflowPolicy::RejectNewest));
        assert!(fc.voice.enabled.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let fc = load_config_file_from(Path::new("/nonexistent/livechat-reactor.toml"));
        assert!(fc.feed.video_id.is_none());
        assert!(fc.api_keys.youtube.is_none());
    }

    #[test]
    fn broken_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!(
            "livechat-reactor-broken-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[reaction\ntick_ms = \"fast\"").unwrap();

        let fc = load_config_file_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(fc.reaction.tick_ms.is_none());
        assert!(fc.feed.video_id.is_none());
    }
}
