use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use livechat_reactor::config::file::config_file_path;
use livechat_reactor::voice::{AudioClip, AudioSink, SpeakerSink};
use livechat_reactor::{Config, Daemon, daemon};

/// Reactor - a stick figure that reacts to YouTube live chat out loud
#[derive(Parser)]
#[command(name = "reactor", version, about)]
struct Cli {
    /// YouTube video ID of the livestream
    #[arg(long, env = "REACTOR_VIDEO_ID")]
    video: Option<String>,

    /// Overlay server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Play silently (keeps timing, skips the speaker)
    #[arg(long, env = "REACTOR_DISABLE_AUDIO")]
    disable_audio: bool,

    /// Do not start the overlay server
    #[arg(long)]
    no_overlay: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the live chat ID for the video
    Resolve,
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello chat! Can you hear me?")]
        text: String,
    },
    /// Print where the config file is read from
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,livechat_reactor=info",
        1 => "info,livechat_reactor=debug",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::ConfigPath) = cli.command {
        match config_file_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("no config directory on this platform"),
        }
        return Ok(());
    }
    if let Some(Command::TestSpeaker) = cli.command {
        return test_speaker().await;
    }

    let mut config = Config::load_with_options(cli.video.as_deref(), cli.disable_audio)?;
    if let Some(port) = cli.port {
        config.overlay.port = port;
    }
    if cli.no_overlay {
        config.overlay.enabled = false;
    }

    match cli.command {
        Some(Command::Resolve) => return resolve(&config).await,
        Some(Command::TestTts { text }) => return test_tts(&config, &text).await,
        Some(Command::ConfigPath | Command::TestSpeaker) | None => {}
    }

    tracing::info!(
        video_id = %config.feed.video_id,
        overlay = config.overlay.enabled,
        audio = config.voice.enabled,
        "starting reactor"
    );
    tracing::debug!(?config, "loaded configuration");

    Daemon::new(config).run().await?;

    Ok(())
}

/// Print the live chat ID for the configured video
async fn resolve(config: &Config) -> anyhow::Result<()> {
    let client = daemon::youtube_client(config)?;

    match client.resolve_live_chat(&config.feed.video_id).await? {
        Some(handle) => println!("{handle}"),
        None => anyhow::bail!("video {} has no active live chat", config.feed.video_id),
    }

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let speaker = SpeakerSink::new()?;

    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples on {}...", samples.len(), speaker.device_name());

    speaker.play(AudioClip::new(samples, sample_rate)).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Synthesize one line and play it
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let gemini = daemon::gemini_client(config)?;
    let tts = daemon::text_to_speech(config, &gemini)?;

    println!("Synthesizing with {} ({})...", tts.provider(), config.voice.tts_voice);

    let Some(clip) = tts.synthesize(text).await? else {
        anyhow::bail!("TTS returned no audio");
    };

    println!(
        "Got {:.1}s of audio at {} Hz, playing...",
        clip.duration().as_secs_f32(),
        clip.sample_rate()
    );

    daemon::audio_sink(config).play(clip).await?;

    println!("Done.");
    Ok(())
}
