//! Reaction loop integration tests
//!
//! All tests run on a paused clock: the runtime jumps straight to the next
//! timer whenever every task is waiting.

use std::sync::Arc;
use std::time::Duration;

use livechat_reactor::config::{OverflowPolicy, ReactionConfig};
use livechat_reactor::reaction::{CycleState, Presence};
use livechat_reactor::{Error, Utterance};

mod common;
use common::{Activity, Harness, ScriptedGenerator, StalledGenerator, TimedSink, advance, msg};

const GEN_LATENCY: Duration = Duration::from_millis(500);

fn rig(clip_millis: u64) -> (Arc<Activity>, Arc<ScriptedGenerator>, Arc<TimedSink>) {
    let activity = Arc::new(Activity::default());
    let generator = ScriptedGenerator::new(GEN_LATENCY, clip_millis, Arc::clone(&activity));
    let sink = TimedSink::new(Arc::clone(&activity));
    (activity, generator, sink)
}

#[tokio::test(start_paused = true)]
async fn pending_messages_start_a_cycle_within_one_tick() {
    let (_, generator, sink) = rig(1000);
    let harness = Harness::start(generator.clone(), sink);

    harness.send(vec![msg("A", "hi"), msg("B", "lol")]).await;
    advance(1100).await;

    assert_eq!(generator.calls(), vec![vec!["A: hi", "B: lol"]]);
}

#[tokio::test(start_paused = true)]
async fn silence_triggers_idle_chatter_after_timeout() {
    let (_, generator, sink) = rig(1000);
    let _harness = Harness::start(generator.clone(), sink);

    advance(14_500).await;
    assert!(generator.calls().is_empty(), "too early for idle chatter");

    advance(2_500).await;
    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_empty(), "idle chatter has no context");
}

#[tokio::test(start_paused = true)]
async fn idle_clock_restarts_after_speaking() {
    let (_, generator, sink) = rig(1000);
    let harness = Harness::start(generator.clone(), sink);

    // Cycle ends by 2.5s, so idle chatter is due after 17.5s at the earliest
    harness.send(vec![msg("A", "hi")]).await;
    advance(16_000).await;
    assert_eq!(generator.calls().len(), 1);

    advance(3_000).await;
    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].is_empty());
}

#[tokio::test(start_paused = true)]
async fn messages_during_speech_form_the_next_batch() {
    let (_, generator, sink) = rig(3000);
    let harness = Harness::start(generator.clone(), sink);

    harness.send(vec![msg("A", "first")]).await;
    advance(2000).await;
    assert_eq!(harness.state(), CycleState::Speaking);

    harness.send(vec![msg("B", "second")]).await;
    harness.send(vec![msg("C", "third")]).await;
    advance(1500).await;
    assert_eq!(generator.calls().len(), 1, "no new cycle while speaking");

    advance(3000).await;
    assert_eq!(
        generator.calls(),
        vec![vec!["A: first"], vec!["B: second", "C: third"]]
    );
}

#[tokio::test(start_paused = true)]
async fn generation_and_playback_never_overlap() {
    let activity = Arc::new(Activity::default());
    let generator =
        ScriptedGenerator::new(Duration::from_millis(700), 1300, Arc::clone(&activity));
    let sink = TimedSink::new(Arc::clone(&activity));
    let harness = Harness::start(generator.clone(), sink.clone());

    let mut sent = Vec::new();
    for i in 0..60 {
        let line = msg("viewer", &format!("message {i}"));
        sent.push(format!("viewer: message {i}"));
        harness.send(vec![line]).await;
        advance(300).await;
    }
    advance(5000).await;

    assert_eq!(activity.peak(), 1, "at most one generation or playback at a time");

    let calls = generator.calls();
    assert!(calls.len() >= 5);
    assert_eq!(sink.plays(), calls.len());

    let received: Vec<String> = calls.into_iter().flatten().collect();
    assert_eq!(received, sent, "every message delivered once, in order");
}

#[tokio::test(start_paused = true)]
async fn failed_generation_drops_batch_and_recovers() {
    let (_, generator, sink) = rig(1000);
    generator.push(Err(Error::Generation("model overloaded".to_string())));
    let harness = Harness::start(generator.clone(), sink.clone());

    harness.send(vec![msg("A", "hi")]).await;
    advance(2000).await;

    assert_eq!(harness.state(), CycleState::Idle);
    assert_eq!(sink.plays(), 0);
    assert!(!harness.is_speaking());

    harness.send(vec![msg("B", "again")]).await;
    advance(1100).await;

    assert_eq!(generator.calls(), vec![vec!["A: hi"], vec!["B: again"]]);
}

#[tokio::test(start_paused = true)]
async fn hung_generation_times_out_and_frees_the_loop() {
    let generator = StalledGenerator::new(1000);
    let sink = TimedSink::new(Arc::new(Activity::default()));
    let config = ReactionConfig {
        generation_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(60),
        ..ReactionConfig::default()
    };
    let harness = Harness::start_with(&config, generator.clone(), sink.clone());

    harness.send(vec![msg("A", "anyone?")]).await;
    advance(4_000).await;
    assert_eq!(harness.state(), CycleState::Generating, "still waiting on the model");

    advance(2_500).await;
    assert_eq!(harness.state(), CycleState::Idle);
    assert_eq!(sink.plays(), 0);

    harness.send(vec![msg("B", "hello")]).await;
    advance(1_100).await;
    assert_eq!(generator.calls(), 2);
    assert!(harness.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn utterance_without_audio_is_not_played() {
    let (_, generator, sink) = rig(1000);
    generator.push(Ok(Utterance {
        text: "So quiet...".to_string(),
        audio: None,
    }));
    let harness = Harness::start(generator.clone(), sink.clone());

    harness.send(vec![msg("A", "hi")]).await;
    advance(2000).await;

    assert_eq!(sink.plays(), 0);
    assert_eq!(harness.state(), CycleState::Idle);
    assert_eq!(*harness.presence.borrow(), Presence::default());

    harness.send(vec![msg("B", "hello?")]).await;
    advance(2000).await;
    assert_eq!(sink.plays(), 1);
}

#[tokio::test(start_paused = true)]
async fn presence_follows_playback() {
    let (_, generator, sink) = rig(2000);
    generator.push(common::spoken("Hey chat!", 2000));
    let harness = Harness::start(generator.clone(), sink);

    assert!(!harness.is_speaking());

    harness.send(vec![msg("A", "hi")]).await;
    advance(2000).await;

    assert_eq!(
        *harness.presence.borrow(),
        Presence {
            is_speaking: true,
            subtitle: "Hey chat!".to_string(),
        }
    );

    advance(2000).await;
    assert_eq!(*harness.presence.borrow(), Presence::default());
    assert_eq!(harness.state(), CycleState::Idle);
}

#[tokio::test(start_paused = true)]
async fn capped_batch_keeps_newest_messages() {
    let (_, generator, sink) = rig(5000);
    let config = ReactionConfig {
        max_pending: Some(2),
        overflow: OverflowPolicy::DropOldest,
        ..ReactionConfig::default()
    };
    let harness = Harness::start_with(&config, generator.clone(), sink);

    harness.send(vec![msg("A", "first")]).await;
    advance(2000).await;

    harness
        .send(vec![
            msg("B", "2"),
            msg("C", "3"),
            msg("D", "4"),
            msg("E", "5"),
            msg("F", "6"),
        ])
        .await;
    advance(6000).await;

    assert_eq!(generator.calls()[1], vec!["E: 5", "F: 6"]);
}

#[tokio::test(start_paused = true)]
async fn closed_feed_still_allows_idle_chatter() {
    let (_, generator, sink) = rig(1000);
    let harness = Harness::start(generator.clone(), sink);

    drop(harness.feed);
    advance(17_000).await;

    assert_eq!(generator.calls(), vec![Vec::<String>::new()]);
    assert!(!harness.task.is_finished());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_loop() {
    let (_, generator, sink) = rig(1000);
    let harness = Harness::start(generator, sink);

    harness.shutdown.send_replace(true);

    tokio::time::timeout(Duration::from_secs(1), harness.task)
        .await
        .expect("loop did not stop")
        .unwrap();
}
