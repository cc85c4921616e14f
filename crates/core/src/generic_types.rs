//! Engine-neutral types shared by the speech adapters and whatever engines sit
//! behind them (browser bridge, console, test fakes).

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// One outbound request to the answering service.
    TurnId
);
id_type!(
    /// One start..stop run of the speech recognizer.
    CaptureSessionId
);
id_type!(
    /// One utterance handed to the speech synthesizer.
    UtteranceId
);
id_type!(NoticeId);

/// Everything the recognizer needs to begin a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    pub session: CaptureSessionId,
    pub locale_tag: String,
    pub continuous: bool,
    pub interim_results: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEventKind {
    Transcript { text: String, is_final: bool },
    /// Engine-specific code, e.g. `no-speech` or `not-allowed`.
    Error { code: String },
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerEvent {
    pub session: CaptureSessionId,
    pub kind: RecognizerEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub name: String,
    /// Language tag as reported by the engine, e.g. `hi-IN`.
    pub lang: String,
}

impl Voice {
    pub fn new(name: &str, lang: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub locale_tag: String,
    /// `None` means the engine default.
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizerEventKind {
    Start,
    End,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesizerEvent {
    pub utterance: UtteranceId,
    pub kind: SynthesizerEventKind,
}
