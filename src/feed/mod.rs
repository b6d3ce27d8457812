//! Chat feed access
//!
//! The feed is polled with an opaque continuation token. Each fetch returns a
//! page of messages, the token for the next page, and the delay the server
//! would like before the next request.

pub mod backoff;
pub mod poller;
pub mod youtube;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

pub use poller::{FeedPoller, PollOutcome, PollPolicy};
pub use youtube::YouTubeChatClient;

/// Handle identifying a single chat feed (e.g. a YouTube live chat id)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedHandle(String);

impl FeedHandle {
    /// Wrap a raw feed identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier as sent to the feed API
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque cursor marking the last-read position in the feed
///
/// Only ever threaded back into the next fetch, never inspected.
#[derive(Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} chars)", self.0.len())
    }
}

/// A chat message as returned by the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Display name of the sender
    pub author: String,

    /// Message text
    pub text: String,

    /// When the feed says the message was published
    pub published_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            published_at: None,
        }
    }
}

/// One successful fetch from the feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Messages in feed order
    pub messages: Vec<ChatMessage>,

    /// Token for the next fetch (`None` = feed gave none)
    pub next_token: Option<ContinuationToken>,

    /// Server-suggested delay before the next fetch
    pub suggested_interval: Option<Duration>,
}

/// Source of chat messages
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the page after `token` (`None` = start of stream)
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or an API-level error response.
    /// The poller absorbs these; they never reach the reaction loop.
    async fn fetch(
        &self,
        handle: &FeedHandle,
        token: Option<&ContinuationToken>,
    ) -> Result<FeedPage>;
}
