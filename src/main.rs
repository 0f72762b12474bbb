use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lia_companion::assistant::AssistantSettings;
use lia_companion::phone::PhoneLinkState;
use lia_companion::repl::Repl;
use lia_companion::voice::{
    AudioBuffer, AudioPlayback, AudioSink, CaptureRecognizer, MicCapture, SpeechInput,
    SpeechInputSettings, SpeechOutput, TTS_SAMPLE_RATE, rms,
};
use lia_companion::{
    Assistant, Config, GeminiClient, LinkOpener, NullOpener, Session, SystemOpener, ToolRegistry,
    ambient,
};

/// Lia - an elegant conversational companion
#[derive(Parser)]
#[command(name = "lia", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/lia/config.toml)
    #[arg(short, long, env = "LIA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Start with spoken replies off
    #[arg(long)]
    mute: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat interactively (default)
    Chat,
    /// Speak text through Gemini TTS
    Say {
        /// Text to speak
        #[arg(default_value = "Hello, madam. This is a test of my voice.")]
        text: String,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Print the tool schema sent to the model
    Tools,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,lia_companion=info",
        1 => "info,lia_companion=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(config, cli.mute).await,
        Command::Say { text } => say(config, &text).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::Tools => print_tools(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Run the interactive REPL
async fn chat(config: Config, mute: bool) -> anyhow::Result<()> {
    let Config {
        gemini,
        voice,
        conversation,
        phone,
        ambient: ambient_config,
    } = config;

    let client = Arc::new(GeminiClient::new(gemini));
    let session = Arc::new(Session::new(
        PhoneLinkState::new(phone.model, phone.battery),
        voice.audio_enabled && !mute,
    ));

    let opener: Arc<dyn LinkOpener> = if conversation.open_links {
        Arc::new(SystemOpener::new())
    } else {
        Arc::new(NullOpener)
    };

    let speech = match AudioPlayback::new() {
        Ok(playback) => Some(Arc::new(SpeechOutput::new(
            Arc::clone(&client) as _,
            Arc::new(playback),
            voice.speech_char_limit,
        ))),
        Err(e) => {
            tracing::warn!(error = %e, "no audio output, replies will not be spoken");
            None
        }
    };

    let settings = AssistantSettings {
        context: conversation.context,
        overlap: conversation.overlap,
        phone_commands: conversation.phone_commands,
        link_origin: conversation.link_origin,
    };
    let tools = ToolRegistry::with_builtins(Arc::clone(&opener));
    let mut assistant = Assistant::new(Arc::clone(&session), Arc::clone(&client) as _, tools, settings);
    if let Some(speech) = &speech {
        assistant = assistant.with_speech(Arc::clone(speech));
    }

    let _ambient = ambient::spawn(&ambient_config, Arc::clone(&session), speech.clone());

    let (recognizer, recognition) =
        CaptureRecognizer::new(Arc::clone(&client) as _, client.has_credential());
    let input = SpeechInput::new(
        recognizer,
        SpeechInputSettings {
            wake_word: voice.wake_word,
            language: voice.language,
            resume_after: voice.wake_resume,
        },
    );

    tracing::info!(credential = client.has_credential(), "lia ready");

    Repl::new(Arc::new(assistant), input, opener)
        .run(recognition)
        .await?;

    Ok(())
}

/// Speak text through the full output pipeline
async fn say(config: Config, text: &str) -> anyhow::Result<()> {
    let client = Arc::new(GeminiClient::new(config.gemini));
    if !client.has_credential() {
        anyhow::bail!("GEMINI_API_KEY is not set");
    }

    let speech = SpeechOutput::new(
        client,
        Arc::new(AudioPlayback::new()?),
        config.voice.speech_char_limit,
    );

    println!("Speaking: \"{text}\"");
    if !speech.speak(text).await {
        anyhow::bail!("no audio was played, run with -v for details");
    }
    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let num_samples = TTS_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / TTS_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {num_samples} samples at {TTS_SAMPLE_RATE} Hz...");
    playback
        .play(AudioBuffer::mono(samples, TTS_SAMPLE_RATE))
        .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = MicCapture::new()?;
    capture.start()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}

/// Print the tool declarations as JSON
fn print_tools() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_builtins(Arc::new(NullOpener));
    let tools: Vec<_> = registry
        .declarations()
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "name": d.name,
                "description": d.description,
                "parameters": d.parameters,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
