//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use livechat_reactor::config::ReactionConfig;
use livechat_reactor::feed::{ChatMessage, ContinuationToken, FeedClient, FeedHandle, FeedPage};
use livechat_reactor::reaction::{CycleState, PlaybackController, Presence, Reactor};
use livechat_reactor::voice::{AudioClip, AudioSink};
use livechat_reactor::{Error, Generator, Result, Utterance};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Silent clip lasting `millis` at 24 kHz
#[must_use]
pub fn clip(millis: u64) -> AudioClip {
    let samples = usize::try_from(24 * millis).unwrap();
    AudioClip::new(vec![0.0; samples], 24_000)
}

/// Utterance with audio of the given length
#[must_use]
pub fn spoken(text: &str, millis: u64) -> Result<Utterance> {
    Ok(Utterance {
        text: text.to_string(),
        audio: Some(clip(millis)),
    })
}

#[must_use]
pub fn msg(author: &str, text: &str) -> ChatMessage {
    ChatMessage::new(author, text)
}

/// Counts overlapping work across fakes
#[derive(Default)]
pub struct Activity {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Activity {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Most things that were ever active at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Generator that replays scripted results after a fixed latency
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Utterance>>>,
    latency: Duration,
    clip_millis: u64,
    calls: Mutex<Vec<Vec<String>>>,
    activity: Arc<Activity>,
}

impl ScriptedGenerator {
    /// Unscripted calls answer "ok" with a clip of `clip_millis`
    pub fn new(latency: Duration, clip_millis: u64, activity: Arc<Activity>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            latency,
            clip_millis,
            calls: Mutex::new(Vec::new()),
            activity,
        })
    }

    pub fn push(&self, result: Result<Utterance>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Contexts received, in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, context: &[String]) -> Result<Utterance> {
        self.calls.lock().unwrap().push(context.to_vec());
        self.activity.enter();

        tokio::time::sleep(self.latency).await;

        self.activity.exit();
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| spoken("ok", self.clip_millis))
    }
}

/// Generator whose first call never returns; later calls answer at once
pub struct StalledGenerator {
    calls: AtomicUsize,
    clip_millis: u64,
}

impl StalledGenerator {
    pub fn new(clip_millis: u64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            clip_millis,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for StalledGenerator {
    async fn generate(&self, _context: &[String]) -> Result<Utterance> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::future::pending::<()>().await;
        }
        spoken("back", self.clip_millis)
    }
}

/// Sink that takes the clip's duration and records each play
pub struct TimedSink {
    plays: AtomicUsize,
    activity: Arc<Activity>,
}

impl TimedSink {
    pub fn new(activity: Arc<Activity>) -> Arc<Self> {
        Arc::new(Self {
            plays: AtomicUsize::new(0),
            activity,
        })
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for TimedSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.activity.enter();
        tokio::time::sleep(clip.duration()).await;
        self.activity.exit();
        Ok(())
    }
}

/// Feed client that replays pages, then returns empty pages forever
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<Result<FeedPage>>>,
    tokens_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedFeed {
    pub fn new(pages: Vec<Result<FeedPage>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            tokens_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.tokens_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch(&self, _handle: &FeedHandle, token: Option<&ContinuationToken>) -> Result<FeedPage> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.map(|t| t.as_str().to_string()));

        self.pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(FeedPage {
                messages: Vec::new(),
                next_token: None,
                suggested_interval: None,
            })
        })
    }
}

/// Page with messages and a next token
pub fn page(messages: Vec<ChatMessage>, next: &str) -> Result<FeedPage> {
    Ok(FeedPage {
        messages,
        next_token: Some(ContinuationToken::new(next)),
        suggested_interval: Some(Duration::ZERO),
    })
}

pub fn feed_error(message: &str) -> Result<FeedPage> {
    Err(Error::Feed(message.to_string()))
}

/// A reactor running on its own task
pub struct Harness {
    pub feed: mpsc::Sender<Vec<ChatMessage>>,
    pub shutdown: watch::Sender<bool>,
    pub presence: watch::Receiver<Presence>,
    pub state: watch::Receiver<CycleState>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(generator: Arc<dyn Generator>, sink: Arc<dyn AudioSink>) -> Self {
        Self::start_with(&ReactionConfig::default(), generator, sink)
    }

    pub fn start_with(
        config: &ReactionConfig,
        generator: Arc<dyn Generator>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let reactor = Reactor::new(config, generator, PlaybackController::new(sink));
        let presence = reactor.presence();
        let state = reactor.cycle_state();

        let (feed, feed_rx) = mpsc::channel(32);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(reactor.run(feed_rx, shutdown_rx));

        Self {
            feed,
            shutdown,
            presence,
            state,
            task,
        }
    }

    pub async fn send(&self, messages: Vec<ChatMessage>) {
        self.feed.send(messages).await.unwrap();
    }

    pub fn is_speaking(&self) -> bool {
        self.presence.borrow().is_speaking
    }

    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }
}

/// Advance paused time
pub async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
