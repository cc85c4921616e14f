//! Console stand-ins for the browser speech engines and camera, plus the stdin
//! reader that turns typed lines into session inputs.

use crate::commands::{self, ConsoleLine, HELP};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tutor_core::SessionInput;
use tutor_core::answering::{ChatEntry, ChatRole};
use tutor_core::error::MediaError;
use tutor_core::generic_types::{
    CaptureSessionId, RecognitionRequest, RecognizerEvent, RecognizerEventKind,
    SynthesizerEvent, SynthesizerEventKind, Utterance, Voice,
};
use tutor_core::language::{ALL_LOCALES, Locale};
use tutor_core::lesson::Section;
use tutor_core::media::CameraDevice;
use tutor_core::runtime::SessionObserver;
use tutor_core::session_state::Mode;
use tutor_core::speech_api::{SpeechRecognizer, SpeechSynthesizer};

/// Simulated reading speed of the console voice.
pub const WORD_DURATION: Duration = Duration::from_millis(250);

/// The capture session currently waiting for a typed "spoken" line, if any.
///
/// Shared between the [`ConsoleRecognizer`] and the stdin reader.
#[derive(Debug, Clone, Default)]
pub struct DictationSlot(Arc<AtomicU64>);

impl DictationSlot {
    pub fn active(&self) -> Option<CaptureSessionId> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            id => Some(CaptureSessionId(id)),
        }
    }

    fn open(&self, session: CaptureSessionId) {
        self.0.store(session.0, Ordering::SeqCst);
    }

    fn close(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Recognizer that takes the next typed line as the learner's speech.
pub struct ConsoleRecognizer {
    dictation: DictationSlot,
}

impl ConsoleRecognizer {
    pub fn new(dictation: DictationSlot) -> Self {
        Self { dictation }
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, request: RecognitionRequest) -> Result<(), String> {
        self.dictation.open(request.session);
        println!(
            "(listening in {}; type what you would say, or press Enter to give up)",
            request.locale_tag
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.dictation.close();
    }

    fn abort(&mut self) {
        self.dictation.close();
    }
}

#[derive(Default)]
struct VoiceState {
    // 0 when nothing is playing.
    current: AtomicU64,
    paused: AtomicBool,
}

/// Synthesizer that "speaks" by pacing through the words of an utterance and
/// reporting start and end back to the session.
pub struct ConsoleSynthesizer {
    inputs: UnboundedSender<SessionInput>,
    state: Arc<VoiceState>,
    word_duration: Duration,
}

impl ConsoleSynthesizer {
    pub fn new(inputs: UnboundedSender<SessionInput>, word_duration: Duration) -> Self {
        Self {
            inputs,
            state: Arc::new(VoiceState::default()),
            word_duration,
        }
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        ALL_LOCALES
            .iter()
            .map(|locale| Voice::new(&format!("console-{}", locale.code()), locale.speech_tag()))
            .collect()
    }

    fn speak(&mut self, utterance: Utterance) {
        let id = utterance.id;
        self.state.current.store(id.0, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
        tracing::debug!(
            "Speaking utterance {} ({}, voice {:?})",
            id,
            utterance.locale_tag,
            utterance.voice.as_ref().map(|v| v.name.as_str())
        );

        let words = utterance.text.split_whitespace().count();
        let state = self.state.clone();
        let inputs = self.inputs.clone();
        let word_duration = self.word_duration;
        tokio::spawn(async move {
            let send = |kind| {
                let event = SynthesizerEvent {
                    utterance: id,
                    kind,
                };
                inputs.send(SessionInput::Synthesizer(event)).is_ok()
            };
            if !send(SynthesizerEventKind::Start) {
                return;
            }
            let mut remaining = words;
            while remaining > 0 {
                tokio::time::sleep(word_duration).await;
                if state.current.load(Ordering::SeqCst) != id.0 {
                    return;
                }
                if !state.paused.load(Ordering::SeqCst) {
                    remaining -= 1;
                }
            }
            if state.current.load(Ordering::SeqCst) == id.0 {
                send(SynthesizerEventKind::End);
            }
        });
    }

    fn cancel(&mut self) {
        self.state.current.store(0, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.state.paused.store(true, Ordering::SeqCst);
        println!("(paused)");
    }

    fn resume(&mut self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }
}

/// Pretend camera that only reports its state.
pub struct ConsoleCamera;

impl CameraDevice for ConsoleCamera {
    fn acquire(&mut self) -> Result<(), MediaError> {
        println!("(camera on)");
        Ok(())
    }

    fn release(&mut self) {
        println!("(camera off)");
    }
}

/// Prints session changes to stdout.
pub struct ConsoleObserver {
    titles: Vec<String>,
}

impl ConsoleObserver {
    pub fn new(sections: &[Section]) -> Self {
        Self {
            titles: sections.iter().map(|s| s.title.clone()).collect(),
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn language_changed(&mut self, locale: Locale) {
        tracing::info!("Active language is now {}", locale.display_name());
    }

    fn chat_appended(&mut self, entry: &ChatEntry) {
        match entry.role {
            ChatRole::Assistant => println!("\ntutor> {}\n", entry.content),
            ChatRole::User => tracing::debug!("Learner message recorded"),
        }
    }

    fn chat_cleared(&mut self) {
        println!("(conversation cleared)");
    }

    fn notice_changed(&mut self, notice: Option<&str>) {
        if let Some(text) = notice {
            println!("[{text}]");
        }
    }

    fn mode_changed(&mut self, mode: Mode) {
        match mode {
            Mode::Thinking { .. } => println!("(thinking...)"),
            other => tracing::debug!("Mode: {:?}", other),
        }
    }

    fn section_changed(&mut self, index: usize, section_id: &str) {
        let title = self.titles.get(index).map(String::as_str).unwrap_or(section_id);
        println!("\n== Section {}/{}: {} ==", index + 1, self.titles.len(), title);
    }
}

/// Maps a classified console line onto a session input. Text typed while a
/// capture session is open is delivered as that session's final transcript.
pub fn line_to_input(line: ConsoleLine, dictation: &DictationSlot) -> Option<SessionInput> {
    match line {
        ConsoleLine::Command(input) => Some(input),
        ConsoleLine::Help => {
            println!("{HELP}");
            None
        }
        ConsoleLine::Text(text) => Some(match dictation.active() {
            Some(session) => SessionInput::Recognizer(RecognizerEvent {
                session,
                kind: RecognizerEventKind::Transcript {
                    text,
                    is_final: true,
                },
            }),
            None => SessionInput::Ask(text),
        }),
        ConsoleLine::Blank => dictation.active().map(|session| {
            SessionInput::Recognizer(RecognizerEvent {
                session,
                kind: RecognizerEventKind::End,
            })
        }),
    }
}

/// Reads stdin until `/quit` or end of input, forwarding each line to the session.
pub async fn read_console_input(
    inputs: UnboundedSender<SessionInput>,
    dictation: DictationSlot,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        let line = match commands::parse_line(&line) {
            Ok(line) => line,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        let Some(input) = line_to_input(line, &dictation) else {
            continue;
        };
        let quit = input == SessionInput::Shutdown;
        if inputs.send(input).is_err() || quit {
            return Ok(());
        }
    }

    tracing::info!("End of input");
    inputs.send(SessionInput::Shutdown).ok();
    Ok(())
}
