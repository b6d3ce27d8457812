//! Pending batch of chat messages not yet reacted to

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::feed::ChatMessage;

/// What happens when a capped batch is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending message to make room
    #[default]
    DropOldest,
    /// Discard the incoming message
    RejectNewest,
}

/// A chat message queued for the next reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Display name of the sender
    pub author: String,

    /// Message text
    pub text: String,

    /// Feed publish time, if known
    pub published_at: Option<DateTime<Utc>>,

    /// Position in the overall arrival sequence (strictly increasing)
    pub arrival_order: u64,
}

impl fmt::Display for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}

/// Ordered queue filled by the poller and drained whole by the trigger
#[derive(Debug, Default)]
pub struct PendingBatch {
    messages: VecDeque<IncomingMessage>,
    next_order: u64,
    cap: Option<usize>,
    overflow: OverflowPolicy,
    dropped: u64,
}

impl PendingBatch {
    /// Create an unbounded batch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch holding at most `cap` messages
    #[must_use]
    pub fn with_cap(cap: Option<usize>, overflow: OverflowPolicy) -> Self {
        Self {
            cap,
            overflow,
            ..Self::default()
        }
    }

    /// Append messages in the order given
    ///
    /// Returns how many were accepted. Every accepted message gets the next
    /// arrival number, so order survives across drains.
    pub fn append<I>(&mut self, messages: I) -> usize
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        let mut accepted = 0;

        for message in messages {
            if self.cap.is_some_and(|cap| self.messages.len() >= cap) {
                self.dropped += 1;
                match self.overflow {
                    OverflowPolicy::DropOldest => {
                        self.messages.pop_front();
                    }
                    OverflowPolicy::RejectNewest => continue,
                }
            }

            let arrival_order = self.next_order;
            self.next_order += 1;
            self.messages.push_back(IncomingMessage {
                author: message.author,
                text: message.text,
                published_at: message.published_at,
                arrival_order,
            });
            accepted += 1;
        }

        accepted
    }

    /// Take every pending message, leaving the batch empty
    pub fn drain_all(&mut self) -> Vec<IncomingMessage> {
        std::mem::take(&mut self.messages).into()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages lost to the overflow policy since creation
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}
