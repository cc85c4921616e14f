use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;
use tutor_core::answering::{AnsweringClient, AnsweringService};
use tutor_core::language::Locale;
use tutor_core::offline_tutor::OfflineTutor;
use tutor_core::runtime::run_session;
use tutor_core::session_state::TutorSession;
use tutor_core::{Command, SessionInput};
use tutor_service::commands::HELP;
use tutor_service::config::{AnsweringProvider, Config};
use tutor_service::console::{
    ConsoleCamera, ConsoleObserver, ConsoleRecognizer, ConsoleSynthesizer, DictationSlot,
    WORD_DURATION, read_console_input,
};
use tutor_service::lesson_loader;

#[derive(Parser)]
#[command(version, about = "Voice-synchronized lesson tutor for the terminal")]
struct Cli {
    /// Path to the lesson JSON file
    lesson: PathBuf,
    /// Language code to start in, e.g. "hi" (overrides TUTOR_LANGUAGE)
    #[arg(long)]
    language: Option<String>,
    /// Start with speech output muted
    #[arg(long)]
    muted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 2. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 3. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting tutor service...");

    let language = args
        .language
        .as_deref()
        .map(|code| {
            Locale::from_code(code).with_context(|| format!("Unsupported language code: {code}"))
        })
        .transpose()?;

    // --- 4. Load the Lesson ---
    let lesson = lesson_loader::load_lesson(&args.lesson).context("Failed to load lesson")?;
    tracing::info!(
        "Loaded lesson {:?} with {} sections.",
        lesson.title.as_deref().unwrap_or("untitled"),
        lesson.sections.len()
    );

    // --- 5. Initialize the Answering Service ---
    let answering: Arc<dyn AnsweringService> = match config.provider {
        AnsweringProvider::Http => {
            let url = config
                .answering_url
                .as_deref()
                .context("ANSWERING_URL is not set")?;
            tracing::info!("Sending turns to {}", url);
            Arc::new(
                AnsweringClient::new(
                    url,
                    config.answering_api_key.take(),
                    config.answering_timeout,
                )
                .context("Failed to build answering client")?,
            )
        }
        AnsweringProvider::Offline => {
            tracing::info!("Using the offline tutor");
            Arc::new(OfflineTutor::new(lesson.sections.clone()))
        }
    };

    // --- 6. Session Setup ---
    // The session talks to the runtime through commands; everything else
    // (console, engines, network, timers) talks to the session through inputs.
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel::<Command>();
    let (input_tx, input_rx) = tokio::sync::mpsc::unbounded_channel::<SessionInput>();

    let dictation = DictationSlot::default();
    let session = TutorSession::new(
        lesson.sections.clone(),
        ConsoleRecognizer::new(dictation.clone()),
        ConsoleSynthesizer::new(input_tx.clone(), WORD_DURATION),
        config.session_config(language, args.muted),
        command_tx,
    )
    .with_camera(Box::new(ConsoleCamera));

    println!("{HELP}");

    let mut session_handle = tokio::spawn(run_session(
        session,
        command_rx,
        input_tx.clone(),
        input_rx,
        answering,
        ConsoleObserver::new(&lesson.sections),
    ));
    let console_handle = tokio::spawn(read_console_input(input_tx.clone(), dictation));

    tokio::select! {
        finished = &mut session_handle => {
            finished.context("Session task failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
            if input_tx.send(SessionInput::Shutdown).is_ok() {
                session_handle.await.context("Session task failed")?;
            }
        }
    }
    console_handle.abort();
    tracing::info!("Shutting down...");
    Ok(())
}
