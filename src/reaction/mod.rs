//! Reaction loop
//!
//! Ties the pending batch, the trigger, the generation client and the
//! playback controller into one control flow. All loop state lives in the
//! [`Reactor`]; it is driven by a single `select!` so every mutation happens
//! on one task. Generation and playback run as spawned tasks whose results
//! come back into the loop, so neither ever blocks a tick or a feed append.

pub mod batch;
pub mod playback;
pub mod trigger;

use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ReactionConfig;
use crate::feed::ChatMessage;
use crate::generation::{Generator, Utterance};
use crate::{Error, Result};

pub use batch::{IncomingMessage, OverflowPolicy, PendingBatch};
pub use playback::{PlaybackController, PlaybackFinished, Presence};
pub use trigger::{CycleStart, CycleState, ReactionTrigger, Speech, TriggerReason};

/// Drives reaction cycles from incoming chat
pub struct Reactor {
    batch: PendingBatch,
    trigger: ReactionTrigger,
    generator: Arc<dyn Generator>,
    playback: PlaybackController,
    tick_interval: Duration,
    generation_timeout: Duration,
    state_tx: watch::Sender<CycleState>,
}

impl Reactor {
    /// Create a reactor whose idle clock starts now
    #[must_use]
    pub fn new(
        config: &ReactionConfig,
        generator: Arc<dyn Generator>,
        playback: PlaybackController,
    ) -> Self {
        let (state_tx, _) = watch::channel(CycleState::Idle);

        Self {
            batch: PendingBatch::with_cap(config.max_pending, config.overflow),
            trigger: ReactionTrigger::new(config.idle_timeout, Instant::now()),
            generator,
            playback,
            tick_interval: config.tick_interval,
            generation_timeout: config.generation_timeout,
            state_tx,
        }
    }

    /// Subscribe to the UI-visible speaking state
    #[must_use]
    pub fn presence(&self) -> watch::Receiver<Presence> {
        self.playback.subscribe()
    }

    /// Subscribe to cycle state changes
    #[must_use]
    pub fn cycle_state(&self) -> watch::Receiver<CycleState> {
        self.state_tx.subscribe()
    }

    /// Run until `shutdown` flips or its sender is dropped
    ///
    /// Batches from `feed` are appended as they arrive. If the feed closes,
    /// the loop keeps running on idle chatter alone.
    pub async fn run(
        mut self,
        mut feed: mpsc::Receiver<Vec<ChatMessage>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut generation: Option<JoinHandle<Result<Utterance>>> = None;
        let mut feed_open = true;

        tracing::info!(tick_ms = self.tick_interval.as_millis(), "reaction loop started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                batch = feed.recv(), if feed_open => match batch {
                    Some(messages) => self.enqueue(messages),
                    None => {
                        tracing::warn!("chat feed closed, continuing with idle chatter only");
                        feed_open = false;
                    }
                },

                Some(joined) = OptionFuture::from(generation.as_mut()) => {
                    generation = None;
                    let result = joined.unwrap_or_else(|e| {
                        Err(Error::Generation(format!("generation task failed: {e}")))
                    });
                    self.on_generated(result);
                }

                Some(finished) = self.playback.finished() => {
                    self.on_playback_finished(finished);
                }

                _ = ticker.tick() => {
                    if let Some(start) = self.trigger.tick(Instant::now(), &mut self.batch) {
                        self.publish_state();
                        generation = Some(self.spawn_generation(start));
                    }
                }
            }
        }

        tracing::info!(
            cycles = self.trigger.cycles(),
            pending = self.batch.len(),
            "reaction loop stopped"
        );
    }

    fn enqueue(&mut self, messages: Vec<ChatMessage>) {
        let dropped_before = self.batch.dropped();
        let accepted = self.batch.append(messages);
        let dropped = self.batch.dropped() - dropped_before;

        if dropped > 0 {
            tracing::warn!(
                accepted,
                dropped,
                dropped_total = self.batch.dropped(),
                "pending batch full"
            );
        }
        tracing::trace!(pending = self.batch.len(), "messages queued");
    }

    /// A call that outlives `generation_timeout` fails its cycle
    fn spawn_generation(&self, start: CycleStart) -> JoinHandle<Result<Utterance>> {
        let generator = Arc::clone(&self.generator);
        let context: Vec<String> = start.context.iter().map(ToString::to_string).collect();
        let limit = self.generation_timeout;

        tokio::spawn(async move {
            tokio::time::timeout(limit, generator.generate(&context))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Generation(format!(
                        "generation timed out after {}ms",
                        limit.as_millis()
                    )))
                })
        })
    }

    fn on_generated(&mut self, result: Result<Utterance>) {
        if let Some(speech) = self.trigger.complete_generation(result, Instant::now()) {
            self.playback.play(speech);
        }
        self.publish_state();
    }

    fn on_playback_finished(&mut self, finished: PlaybackFinished) {
        self.trigger.finish_speaking(Instant::now());
        self.publish_state();
        tracing::debug!(
            cycle = finished.cycle,
            completed = finished.completed,
            pending = self.batch.len(),
            "ready for next reaction"
        );
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.trigger.state());
    }
}
