//! Audio playback to speakers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::{AudioClip, AudioSink};
use crate::{Error, Result};

/// Slack past the clip length before giving up on the device
const COMPLETION_GRACE: Duration = Duration::from_millis(500);

/// Tail kept open so the last buffer drains
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Plays clips on the default output device
///
/// The device is re-acquired per clip since cpal streams are not `Send`.
#[derive(Debug, Clone)]
pub struct SpeakerSink {
    device_name: String,
}

impl SpeakerSink {
    /// Check that an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let device = default_device()?;
        let device_name = device.name().unwrap_or_default();

        tracing::debug!(device = %device_name, "audio playback initialized");

        Ok(Self { device_name })
    }

    /// Name of the output device found at startup
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

#[async_trait]
impl AudioSink for SpeakerSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        tokio::task::spawn_blocking(move || play_blocking(&clip))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

fn default_device() -> Result<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Pick a mono config at `rate`, else stereo
fn stream_config(device: &Device, rate: u32) -> Result<StreamConfig> {
    let supports = |channels: u16| -> Result<Option<StreamConfig>> {
        Ok(device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(rate)
                    && c.max_sample_rate() >= SampleRate(rate)
            })
            .map(|c| c.with_sample_rate(SampleRate(rate)).config()))
    };

    match supports(1)? {
        Some(config) => Ok(config),
        None => supports(2)?.ok_or_else(|| {
            Error::Audio(format!("no output config supports {rate} Hz"))
        }),
    }
}

fn play_blocking(clip: &AudioClip) -> Result<()> {
    if clip.is_empty() {
        return Ok(());
    }

    let device = default_device()?;
    let config = stream_config(&device, clip.sample_rate())?;
    let channels = usize::from(config.channels);

    let samples: Arc<[f32]> = Arc::from(clip.samples());
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);

        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);

                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or_else(|| {
                            finished.store(true, Ordering::Release);
                            0.0
                        });
                        frame.fill(sample);
                        pos = pos.saturating_add(1).min(samples.len());
                    }

                    position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let deadline = Instant::now() + clip.duration() + COMPLETION_GRACE;
    while !finished.load(Ordering::Acquire) {
        if Instant::now() > deadline {
            tracing::warn!("audio device stalled, ending playback early");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    std::thread::sleep(DRAIN_DELAY);
    drop(stream);

    tracing::debug!(samples = samples.len(), rate = clip.sample_rate(), "playback complete");
    Ok(())
}
