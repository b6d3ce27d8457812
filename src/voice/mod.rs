//! Voice output
//!
//! Speech synthesis, decoding into playable clips, and audio sinks.

mod decode;
mod playback;
mod tts;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use decode::{decode_mp3, pcm16le_to_f32, sample_rate_from_mime};
pub use playback::SpeakerSink;
pub use tts::TextToSpeech;

/// Sample rate of Gemini speech output when the MIME type does not say
pub const GEMINI_SAMPLE_RATE: u32 = 24_000;

/// Decoded mono audio ready for a sink
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length at the clip's sample rate
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let micros = self.samples.len() as u64 * 1_000_000 / u64::from(self.sample_rate);
        Duration::from_micros(micros)
    }
}

/// Something that can play a clip to completion
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play `clip`, resolving once playback has ended
    ///
    /// # Errors
    ///
    /// Returns error if the clip could not be played
    async fn play(&self, clip: AudioClip) -> Result<()>;
}

/// Sink that plays nothing but takes as long as the clip would
///
/// Used with `--disable-audio` so the reaction rhythm stays the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

#[async_trait]
impl AudioSink for SilentSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        tokio::time::sleep(clip.duration()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_follows_sample_rate() {
        let clip = AudioClip::new(vec![0.0; 36_000], 24_000);
        assert_eq!(clip.duration(), Duration::from_millis(1500));

        let broken = AudioClip::new(vec![0.0; 10], 0);
        assert_eq!(broken.duration(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_sink_waits_for_clip_length() {
        let started = tokio::time::Instant::now();
        SilentSink
            .play(AudioClip::new(vec![0.0; 48_000], 24_000))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
