//! Reaction trigger: decides when a reaction cycle starts
//!
//! ```text
//!            tick: pending || idle timeout
//!   Idle ─────────────────────────────────▶ Generating
//!    ▲  ▲                                      │
//!    │  └──── failure / no audio ──────────────┤
//!    │                                         │ utterance with audio
//!    └──── playback finished ──── Speaking ◀───┘
//! ```
//!
//! The trigger never starts a cycle unless it is `Idle`. A failed idle
//! cycle holds off the next idle attempt for another full idle timeout;
//! pending chat is never held back.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::batch::{IncomingMessage, PendingBatch};
use crate::Result;
use crate::generation::Utterance;
use crate::voice::AudioClip;

/// Phase of the current reaction cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// No cycle in flight
    Idle,
    /// Waiting on the generation client
    Generating,
    /// Audio is playing
    Speaking,
}

/// Why a cycle started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Messages were pending
    Content,
    /// Nothing arrived within the idle timeout
    Idle,
}

/// A cycle the caller must now run generation for
#[derive(Debug)]
pub struct CycleStart {
    /// Sequence number of the cycle
    pub cycle: u64,
    /// Why it started
    pub reason: TriggerReason,
    /// Drained messages (empty for idle chatter)
    pub context: Vec<IncomingMessage>,
}

/// A generated utterance that has audio and should be played
#[derive(Debug)]
pub struct Speech {
    pub cycle: u64,
    pub text: String,
    pub clip: AudioClip,
}

/// State machine guarding the one-cycle-at-a-time rule
#[derive(Debug)]
pub struct ReactionTrigger {
    state: CycleState,
    last_reaction: Instant,
    idle_timeout: Duration,
    cycles: u64,
    reason: TriggerReason,
    failures: u32,
    idle_retry_at: Option<Instant>,
}

impl ReactionTrigger {
    /// Create an idle trigger whose idle clock starts at `now`
    #[must_use]
    pub const fn new(idle_timeout: Duration, now: Instant) -> Self {
        Self {
            state: CycleState::Idle,
            last_reaction: now,
            idle_timeout,
            cycles: 0,
            reason: TriggerReason::Idle,
            failures: 0,
            idle_retry_at: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// When the character last started or finished speaking
    #[must_use]
    pub const fn last_reaction(&self) -> Instant {
        self.last_reaction
    }

    /// Number of cycles started so far
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Consecutive cycles that ended without speech
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Evaluate one tick
    ///
    /// Starts a cycle when idle and either messages are pending or the idle
    /// timeout has elapsed. Starting a cycle drains the whole batch.
    pub fn tick(&mut self, now: Instant, batch: &mut PendingBatch) -> Option<CycleStart> {
        if self.state != CycleState::Idle {
            return None;
        }

        let has_pending = !batch.is_empty();
        let idle_elapsed = now.saturating_duration_since(self.last_reaction) > self.idle_timeout
            && self.idle_retry_at.is_none_or(|at| now >= at);

        let reason = if has_pending {
            TriggerReason::Content
        } else if idle_elapsed {
            TriggerReason::Idle
        } else {
            return None;
        };

        self.state = CycleState::Generating;
        self.cycles += 1;
        self.reason = reason;
        let context = batch.drain_all();

        tracing::debug!(
            cycle = self.cycles,
            ?reason,
            messages = context.len(),
            "reaction cycle started"
        );

        Some(CycleStart {
            cycle: self.cycles,
            reason,
            context,
        })
    }

    /// Record the generation result for the current cycle
    ///
    /// Returns the speech to play when generation produced audio; the trigger
    /// is then `Speaking`. Otherwise the cycle is dropped and the trigger goes
    /// back to `Idle`. The drained messages are never re-queued.
    ///
    /// A failed idle cycle pushes the next idle attempt out by one idle
    /// timeout from `now`.
    pub fn complete_generation(&mut self, result: Result<Utterance>, now: Instant) -> Option<Speech> {
        if self.state != CycleState::Generating {
            tracing::warn!(state = ?self.state, "generation result outside a generating cycle");
            return None;
        }

        match result {
            Ok(Utterance {
                text,
                audio: Some(clip),
            }) => {
                self.state = CycleState::Speaking;
                self.last_reaction = now;
                self.failures = 0;
                self.idle_retry_at = None;
                tracing::info!(cycle = self.cycles, text = %text, "reacting");
                Some(Speech {
                    cycle: self.cycles,
                    text,
                    clip,
                })
            }
            Ok(Utterance { text, audio: None }) => {
                self.record_failure(now);
                tracing::warn!(
                    cycle = self.cycles,
                    failures = self.failures,
                    text = %text,
                    "generation returned no audio, cycle dropped"
                );
                None
            }
            Err(e) => {
                self.record_failure(now);
                tracing::error!(
                    cycle = self.cycles,
                    failures = self.failures,
                    error = %e,
                    "reaction generation failed"
                );
                None
            }
        }
    }

    fn record_failure(&mut self, now: Instant) {
        self.state = CycleState::Idle;
        self.failures = self.failures.saturating_add(1);
        if self.reason == TriggerReason::Idle {
            self.idle_retry_at = Some(now + self.idle_timeout);
        }
    }

    /// Playback of the current utterance ended
    pub fn finish_speaking(&mut self, now: Instant) {
        if self.state != CycleState::Speaking {
            tracing::warn!(state = ?self.state, "playback finished outside a speaking cycle");
            return;
        }

        self.state = CycleState::Idle;
        self.last_reaction = now;
        tracing::debug!(cycle = self.cycles, "reaction cycle finished");
    }
}
