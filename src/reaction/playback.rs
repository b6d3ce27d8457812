//! Playback controller: owns the UI-visible speaking state
//!
//! `is_speaking` and `subtitle` change only here. They are set when audio
//! starts and cleared when the sink reports that playback ended, just before
//! the reaction loop is told the cycle is over.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use super::trigger::Speech;
use crate::voice::AudioSink;

/// What the UI layer shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Presence {
    /// Audio is currently playing
    pub is_speaking: bool,
    /// Text of the utterance being spoken (empty when silent)
    pub subtitle: String,
}

impl Presence {
    fn speaking(text: &str) -> Self {
        Self {
            is_speaking: true,
            subtitle: text.to_string(),
        }
    }
}

/// Completion signal sent back to the reaction loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFinished {
    /// Cycle whose audio ended
    pub cycle: u64,
    /// Whether the sink played to the end without error
    pub completed: bool,
}

/// Starts audio playback and tracks its lifetime
pub struct PlaybackController {
    sink: Arc<dyn AudioSink>,
    presence: watch::Sender<Presence>,
    finished_tx: mpsc::Sender<PlaybackFinished>,
    finished_rx: mpsc::Receiver<PlaybackFinished>,
}

impl PlaybackController {
    #[must_use]
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        let (presence, _) = watch::channel(Presence::default());
        let (finished_tx, finished_rx) = mpsc::channel(4);

        Self {
            sink,
            presence,
            finished_tx,
            finished_rx,
        }
    }

    /// Subscribe to presence updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Presence> {
        self.presence.subscribe()
    }

    /// Current presence snapshot
    #[must_use]
    pub fn presence(&self) -> Presence {
        self.presence.borrow().clone()
    }

    /// Begin playing `speech` and return immediately
    ///
    /// Presence flips to speaking now. When the sink finishes, presence is
    /// cleared and a [`PlaybackFinished`] is queued for [`Self::finished`].
    pub fn play(&self, speech: Speech) {
        let Speech { cycle, text, clip } = speech;

        self.presence.send_replace(Presence::speaking(&text));
        tracing::debug!(cycle, duration_ms = clip.duration().as_millis(), "playback started");

        let sink = Arc::clone(&self.sink);
        let presence = self.presence.clone();
        let finished_tx = self.finished_tx.clone();

        tokio::spawn(async move {
            let completed = match sink.play(clip).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(cycle, error = %e, "audio playback failed");
                    false
                }
            };

            presence.send_replace(Presence::default());
            tracing::debug!(cycle, completed, "playback ended");

            if finished_tx
                .send(PlaybackFinished { cycle, completed })
                .await
                .is_err()
            {
                tracing::debug!(cycle, "reaction loop gone before playback ended");
            }
        });
    }

    /// Wait for the next playback completion
    pub async fn finished(&mut self) -> Option<PlaybackFinished> {
        self.finished_rx.recv().await
    }
}
