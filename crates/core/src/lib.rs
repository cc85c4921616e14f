pub mod answering;
pub mod capture;
pub mod config;
pub mod error;
pub mod generic_types;
pub mod language;
pub mod lesson;
pub mod media;
pub mod offline_tutor;
pub mod playback;
pub mod reply;
pub mod runtime;
pub mod session_state;
pub mod speech_api;
pub mod text;

use crate::answering::{ChatEntry, TurnRequest};
use crate::error::TransportError;
use crate::generic_types::{NoticeId, RecognizerEvent, SynthesizerEvent, TurnId};
use crate::language::Locale;
use crate::session_state::Mode;
use std::time::Duration;

/// Represents commands that the core logic (`TutorSession`) issues to the runtime.
///
/// The session decides; the runtime performs the side effects (network calls,
/// timers, UI callbacks) and reports back through [`SessionInput`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send a turn to the answering service and report the outcome as
    /// [`SessionInput::TurnCompleted`].
    SendTurn { turn: TurnId, request: TurnRequest },
    /// The active language changed after a detected language request.
    LanguageChanged(Locale),
    /// Post [`SessionInput::NoticeExpired`] after the delay.
    ScheduleNoticeExpiry { notice: NoticeId, after: Duration },
    /// Post [`SessionInput::NarrationDue`] after the delay.
    ScheduleNarration { section_id: String, after: Duration },
    ChatAppended(ChatEntry),
    ChatCleared,
    NoticeChanged(Option<String>),
    ModeChanged(Mode),
    SectionChanged { index: usize, section_id: String },
}

/// Everything that can happen to a session: learner actions, engine callbacks,
/// network completions and timers. All of it funnels through one queue.
#[derive(Debug, PartialEq)]
pub enum SessionInput {
    Ask(String),
    StartListening,
    StopListening,
    Next,
    Previous,
    Jump(usize),
    Pause,
    Resume,
    StopSpeaking,
    ToggleMute,
    ToggleCamera,
    NarrateSection,
    Reset,
    Recognizer(RecognizerEvent),
    Synthesizer(SynthesizerEvent),
    TurnCompleted {
        turn: TurnId,
        outcome: Result<String, TransportError>,
    },
    NoticeExpired(NoticeId),
    NarrationDue { section_id: String },
    Shutdown,
}
