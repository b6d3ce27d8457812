//! Error types for the live chat reactor

use thiserror::Error;

/// Result type alias for reactor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the live chat reactor
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat feed error (API-level failure reported by the feed)
    #[error("feed error: {0}")]
    Feed(String),

    /// Reaction text generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device or decoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error (overlay socket)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}
