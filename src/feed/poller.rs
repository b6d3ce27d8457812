//! Feed poller: the self-rescheduling fetch loop
//!
//! Owns the continuation token and the next poll delay. Fetch failures never
//! escape: they become an empty outcome with a fallback delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::backoff::{BackoffPolicy, delay_for_failures};
use super::{ChatMessage, ContinuationToken, FeedClient, FeedHandle};
use crate::config::FeedConfig;

/// Timing rules for the poll loop
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Floor applied to the feed's suggested interval
    pub min_interval: Duration,

    /// Interval used when the feed suggests none
    pub default_interval: Duration,

    /// Delays after failed polls
    pub backoff: BackoffPolicy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

impl From<&FeedConfig> for PollPolicy {
    fn from(config: &FeedConfig) -> Self {
        Self {
            min_interval: config.min_interval,
            default_interval: config.default_interval,
            backoff: BackoffPolicy {
                base_delay: config.fallback_interval,
                max_delay: config.max_backoff,
            },
        }
    }
}

/// Result of one poll, always usable by the caller
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// New messages in feed order (empty on failure)
    pub messages: Vec<ChatMessage>,

    /// How long to wait before the next poll
    pub delay: Duration,

    /// Whether the fetch failed
    pub failed: bool,
}

/// Repeatedly fetches new chat messages from a feed
pub struct FeedPoller {
    client: Arc<dyn FeedClient>,
    handle: FeedHandle,
    token: Option<ContinuationToken>,
    policy: PollPolicy,
    consecutive_failures: u32,
}

impl FeedPoller {
    /// Create a poller positioned at the start of the stream
    #[must_use]
    pub fn new(client: Arc<dyn FeedClient>, handle: FeedHandle, policy: PollPolicy) -> Self {
        Self {
            client,
            handle,
            token: None,
            policy,
            consecutive_failures: 0,
        }
    }

    /// Current continuation token (`None` = start of stream)
    #[must_use]
    pub const fn token(&self) -> Option<&ContinuationToken> {
        self.token.as_ref()
    }

    /// Number of failed polls since the last success
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Fetch the next page and compute the delay before the following poll
    ///
    /// On success the delay is `max(suggested, min_interval)`. On failure the
    /// token is kept, no messages are returned, and the delay follows the
    /// backoff policy.
    pub async fn poll(&mut self) -> PollOutcome {
        match self.client.fetch(&self.handle, self.token.as_ref()).await {
            Ok(page) => {
                self.consecutive_failures = 0;

                // A page without a token keeps the current position
                if let Some(next) = page.next_token {
                    self.token = Some(next);
                }

                let suggested = page.suggested_interval.unwrap_or(self.policy.default_interval);
                let delay = suggested.max(self.policy.min_interval);

                tracing::trace!(
                    messages = page.messages.len(),
                    delay_ms = delay.as_millis(),
                    "feed polled"
                );

                PollOutcome {
                    messages: page.messages,
                    delay,
                    failed: false,
                }
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let delay = delay_for_failures(&self.policy.backoff, self.consecutive_failures);

                tracing::warn!(
                    error = %e,
                    failures = self.consecutive_failures,
                    retry_ms = delay.as_millis(),
                    "chat feed poll failed"
                );

                PollOutcome {
                    messages: Vec::new(),
                    delay,
                    failed: true,
                }
            }
        }
    }

    /// Run the poll loop until shutdown or until the receiver goes away
    ///
    /// Each non-empty page is forwarded as one batch, preserving feed order.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<Vec<ChatMessage>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(feed = %self.handle, "chat feed polling started");

        loop {
            let outcome = tokio::select! {
                _ = shutdown.changed() => break,
                outcome = self.poll() => outcome,
            };

            if !outcome.messages.is_empty() {
                tracing::debug!(count = outcome.messages.len(), "new chat messages");
                if tx.send(outcome.messages).await.is_err() {
                    tracing::debug!("reaction loop closed, stopping poller");
                    break;
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                () = tokio::time::sleep(outcome.delay) => {}
            }
        }

        tracing::info!(feed = %self.handle, "chat feed polling stopped");
    }
}
