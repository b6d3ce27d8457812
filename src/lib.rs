//! Live chat reactor: a virtual character that talks back to a livestream chat
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  batches  ┌───────────────────────────────┐
//! │ Feed poller  │──────────▶│ Reactor (single task)         │
//! │ (YouTube)    │   mpsc    │  PendingBatch ─▶ Trigger      │
//! └──────────────┘           │        │ Idle/Generating/     │
//!                            │        │ Speaking             │
//!                            └────────┼──────────────────────┘
//!                                     │ spawn
//!                 ┌───────────────────┴─────────────┐
//!                 ▼                                 ▼
//!        ┌─────────────────┐              ┌──────────────────┐
//!        │ Generator       │  utterance   │ Playback         │
//!        │ Gemini + TTS    │─────────────▶│ controller       │──▶ speaker
//!        └─────────────────┘              └────────┬─────────┘
//!                                                  │ presence (watch)
//!                                                  ▼
//!                                         overlay API / stdout
//! ```

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod feed;
pub mod generation;
pub mod reaction;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use feed::{ChatMessage, FeedClient, FeedHandle, FeedPage, FeedPoller};
pub use generation::{Generator, ReactionGenerator, Utterance};
pub use reaction::{CycleState, PlaybackController, Presence, Reactor};
pub use voice::{AudioClip, AudioSink, SilentSink, SpeakerSink};
