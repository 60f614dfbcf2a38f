use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use vesper_app::orchestrator::{Orchestrator, Speaker};
use vesper_audio::chunker::{ChunkerConfig, FrameChunker};
use vesper_audio::ring_buffer::SampleRingBuffer;
use vesper_audio::{AudioFrame, CaptureThread};
use vesper_brain::{ConversationEngine, HttpReasoningClient};
use vesper_foundation::{Settings, ShutdownHandler};
use vesper_stt::{HttpSttClient, TranscriptionClient, TranscriptionOutcome};
use vesper_tts::HttpTtsClient;
use vesper_wake::{CaptureConfig, EnergyBurstDetector, UtteranceCapturer};

/// Frames buffered between the chunker and the coordination task.
/// Oldest frames are dropped on overflow.
const FRAME_QUEUE_CAPACITY: usize = 64;

#[derive(Parser)]
#[command(name = "vesper", about = "Wake-word voice assistant", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the assistant loop (default)
    Run,
    /// List available audio input devices
    ListDevices,
    /// Synthesize and play the given text once
    Say { text: String },
    /// Capture one utterance from the microphone and print the transcript
    TranscribeOnce,
}

fn init_logging(default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "vesper.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Device enumeration needs no credentials or log files.
    if matches!(&cli.command, Some(Command::ListDevices)) {
        return list_devices().map_err(Into::into);
    }

    let settings = Settings::load()?;
    init_logging(&settings.log_level)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_assistant(settings).await?,
        Command::ListDevices => unreachable!("handled above"),
        Command::Say { text } => say_once(&settings, &text).await?,
        Command::TranscribeOnce => transcribe_once(settings).await?,
    }
    Ok(())
}

/// Real synthesizer plus blocking playback, behind the loop's speaker
/// seam.
struct LiveSpeaker {
    synth: HttpTtsClient,
}

#[async_trait::async_trait]
impl Speaker for LiveSpeaker {
    async fn speak(&self, text: &str) -> Result<(), vesper_tts::TtsError> {
        vesper_tts::speak(&self.synth, text).await
    }
}

/// Spawn the capture thread and chunker, returning the frame feed.
fn start_audio_pipeline(
    settings: &Settings,
) -> anyhow::Result<(CaptureThread, tokio::task::JoinHandle<()>, broadcast::Sender<AudioFrame>)> {
    let (producer, consumer) = SampleRingBuffer::new(16384 * 4).split();
    let (capture, device_config) =
        CaptureThread::spawn(producer, settings.input_device.clone())
            .context("failed to start audio capture")?;
    tracing::info!(
        sample_rate = device_config.sample_rate,
        channels = device_config.channels,
        "Audio capture started"
    );

    let (frame_tx, _) = broadcast::channel::<AudioFrame>(FRAME_QUEUE_CAPACITY);
    let chunker = FrameChunker::new(
        consumer,
        frame_tx.clone(),
        device_config,
        ChunkerConfig::default(),
    );
    let chunker_handle = chunker.spawn();
    Ok((capture, chunker_handle, frame_tx))
}

async fn run_assistant(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        assistant = %settings.assistant_name,
        wake_word = %settings.wake_word,
        "Starting Vesper"
    );

    let shutdown = ShutdownHandler::new().install().await;
    let (capture, chunker_handle, frame_tx) = start_audio_pipeline(&settings)?;

    let wake = EnergyBurstDetector::new(&settings.wake_word, settings.wake_sensitivity);
    let capture_config = CaptureConfig {
        silence_timeout_ms: settings.silence_timeout_ms,
        max_utterance_ms: settings.max_utterance_ms,
        energy_threshold_dbfs: settings.energy_threshold_dbfs,
    };
    let stt = HttpSttClient::new(settings.speech_key.clone(), &settings.speech_region);
    let reasoning = HttpReasoningClient::new(
        settings.reasoning_api_key.clone(),
        settings.model.clone(),
    );
    let brain = ConversationEngine::new(
        Box::new(reasoning),
        &settings.assistant_name,
        settings.history_limit,
    );
    let speaker = LiveSpeaker {
        synth: HttpTtsClient::new(
            settings.speech_key.clone(),
            &settings.speech_region,
            settings.voice_name.clone(),
        ),
    };

    let mut orchestrator = Orchestrator::new(
        frame_tx.subscribe(),
        Box::new(wake),
        capture_config,
        Box::new(stt),
        brain,
        Box::new(speaker),
        Box::new(capture),
        shutdown,
        settings.ack_on_wake,
    );

    let result = orchestrator.run().await;
    chunker_handle.abort();
    tracing::info!("Vesper stopped");
    result.map_err(Into::into)
}

fn list_devices() -> anyhow::Result<()> {
    let devices = vesper_audio::device::list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(());
    }
    for name in devices {
        println!("{name}");
    }
    Ok(())
}

async fn say_once(settings: &Settings, text: &str) -> anyhow::Result<()> {
    let synth = HttpTtsClient::new(
        settings.speech_key.clone(),
        &settings.speech_region,
        settings.voice_name.clone(),
    );
    vesper_tts::speak(&synth, text)
        .await
        .context("synthesis test failed")
}

/// Capture a single utterance (no wake gate) and print its transcript.
async fn transcribe_once(settings: Settings) -> anyhow::Result<()> {
    let (mut capture, chunker_handle, frame_tx) = start_audio_pipeline(&settings)?;
    let mut frames = frame_tx.subscribe();

    let mut capturer = UtteranceCapturer::new(CaptureConfig {
        silence_timeout_ms: settings.silence_timeout_ms,
        max_utterance_ms: settings.max_utterance_ms,
        energy_threshold_dbfs: settings.energy_threshold_dbfs,
    });

    println!("Speak now...");
    let utterance = loop {
        let frame = match frames.recv().await {
            Ok(frame) => frame,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => {
                return Err(anyhow!("audio pipeline stopped"));
            }
        };
        if capturer.state() == vesper_wake::CaptureState::Idle {
            // Hold in Idle until the user actually starts talking.
            if vesper_wake::energy::dbfs(&frame.samples) >= settings.energy_threshold_dbfs {
                capturer.begin(&frame);
            }
            continue;
        }
        if let Some(utterance) = capturer.push(&frame) {
            break utterance;
        }
    };

    capture.stop();
    chunker_handle.abort();

    if !utterance.has_speech() {
        println!("(no speech detected)");
        return Ok(());
    }

    let stt = HttpSttClient::new(settings.speech_key.clone(), &settings.speech_region);
    match stt.transcribe(&utterance).await {
        TranscriptionOutcome::Transcript(text) => println!("{text}"),
        TranscriptionOutcome::NoMatch(cause) => println!("(no match: {cause:?})"),
    }
    Ok(())
}
