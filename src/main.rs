use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use speechflow::{
    AudioSource, BackendEvent, Config, ConnectionScript, EventCategory, FileReadMode, Hypothesis,
    RecognitionEvent, RecognizedOutcome, RecognizerConfig, ScriptedBackend, SessionController,
    SharedAudioSource, SilenceSource, WavFileSource,
};

#[derive(Parser, Debug)]
#[command(name = "speechflow", about = "Streaming speech recognition session demo")]
struct Args {
    /// Input source: "mic" or a path to a 16-bit PCM WAV file
    #[arg(long, default_value = "mic")]
    input: String,

    /// Read the input file frame-by-frame instead of buffering it up front
    #[arg(long)]
    stream_file: bool,

    /// Authenticate with an authorization token instead of a subscription key
    #[arg(long)]
    use_token: bool,

    /// Credential value (subscription key, or token with --use-token)
    #[arg(long, default_value = "demo-key")]
    credential: String,

    /// Run a continuous session instead of a single-shot one
    #[arg(long)]
    continuous: bool,

    /// Seconds to run a continuous session before stopping
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Config file path (optional; built-in defaults apply when absent)
    #[arg(long, default_value = "config/speechflow")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).unwrap_or_else(|_| {
        info!("no config file at {}, using defaults", args.config);
        Config::default()
    });

    info!("{} starting", cfg.service.name);

    let mut recognizer = if args.use_token {
        RecognizerConfig::from_auth_token(&args.credential, &cfg.recognition.region)?
    } else {
        RecognizerConfig::from_subscription(&args.credential, &cfg.recognition.region)
    };
    recognizer.set_language(&cfg.recognition.language);

    let source: Box<dyn AudioSource> = match args.input.as_str() {
        "mic" => {
            // No capture device in the demo; an open mic in a quiet room is
            // a silence stream, and the scripted backend keys off frame
            // counts rather than content.
            info!("using a silent microphone stand-in; pass --input <file.wav> for file audio");
            Box::new(SilenceSource::new(16000, 1, cfg.recognition.frame_ms))
        }
        path => {
            let mode = if args.stream_file {
                FileReadMode::Streamed
            } else {
                FileReadMode::Buffered
            };
            Box::new(WavFileSource::new(path, mode, cfg.recognition.frame_ms))
        }
    };
    let source = SharedAudioSource::new(source);
    let backend = Arc::new(demo_backend());

    let controller = SessionController::new(recognizer);
    register_console_observers(&controller);

    if args.continuous {
        controller.start_continuous(&source, backend).await?;
        tokio::time::sleep(Duration::from_secs(args.duration_secs)).await;
        controller.stop().await?;
    } else {
        controller.start_single_shot(&source, backend).await?;
        let terminal = controller
            .recognize_once_timeout(Duration::from_secs(30))
            .await?;
        info!("terminal event: {}", serde_json::to_string(&terminal)?);
    }

    let stats = controller.stats();
    info!(
        "session finished: {} frames sent, {} events dispatched, {} reconnects",
        stats.frames_sent, stats.events_dispatched, stats.reconnects
    );
    Ok(())
}

/// Console logging is a facade concern; the controller ships with no
/// observers of its own.
fn register_console_observers(controller: &SessionController) {
    let dispatcher = controller.dispatcher();

    dispatcher.subscribe(EventCategory::Connection, |event| {
        info!("connection event: {:?}", event);
    });
    dispatcher.subscribe(EventCategory::Session, |event| {
        info!("session event: {:?}", event);
    });
    dispatcher.subscribe(EventCategory::Recognizing, |event| {
        if let RecognitionEvent::Recognizing { hypothesis, .. } = event {
            print!("\r{}", hypothesis.text);
            std::io::Write::flush(&mut std::io::stdout()).ok();
        }
    });
    dispatcher.subscribe(EventCategory::Recognized, |event| {
        if let RecognitionEvent::Recognized { outcome, .. } = event {
            match outcome {
                RecognizedOutcome::Phrase(hypothesis) => println!("\n{}", hypothesis.text),
                RecognizedOutcome::NoMatch(reason) => println!("\n(no match: {:?})", reason),
            }
        }
    });
    dispatcher.subscribe(EventCategory::Canceled, |event| {
        if let RecognitionEvent::Canceled {
            reason, details, ..
        } = event
        {
            eprintln!("canceled ({:?}): {}", reason, details);
        }
    });
}

/// Scripted backend so the demo produces output without a live service.
fn demo_backend() -> ScriptedBackend {
    let hypothesis = |text: &str, ms: u64| Hypothesis {
        text: text.to_string(),
        offset: Duration::from_millis(200),
        duration: Duration::from_millis(ms),
        latency: Some(Duration::from_millis(90)),
    };

    let script = ConnectionScript::new()
        .emit_after(
            1,
            BackendEvent::SpeechStart {
                offset: Duration::from_millis(200),
            },
        )
        .emit_after(2, BackendEvent::Recognizing(hypothesis("hello", 300)))
        .emit_after(3, BackendEvent::Recognizing(hypothesis("hello world", 600)))
        .emit_after(
            4,
            BackendEvent::SpeechEnd {
                offset: Duration::from_millis(900),
            },
        )
        .emit_after(5, BackendEvent::Recognized(hypothesis("Hello, world.", 900)))
        .emit_after(6, BackendEvent::SessionStopped);

    ScriptedBackend::new(vec![script])
}
