use crate::language::{FALLBACK_LOCALE, Locale};
use std::time::Duration;

/// How many chat entries travel with each request by default.
pub const DEFAULT_HISTORY_TAIL: usize = 6;
/// How long transient notices (language switch, capture errors) stay visible.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);
/// Pause between asking for narration and the synthesizer starting.
pub const DEFAULT_NARRATION_DELAY: Duration = Duration::from_millis(800);

/// Tunables for a tutoring session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub history_tail: usize,
    pub notice_ttl: Duration,
    pub narration_delay: Duration,
    pub speech_rate: f32,
    pub speech_pitch: f32,
    pub language: Locale,
    pub start_muted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_tail: DEFAULT_HISTORY_TAIL,
            notice_ttl: DEFAULT_NOTICE_TTL,
            narration_delay: DEFAULT_NARRATION_DELAY,
            speech_rate: 1.0,
            speech_pitch: 1.0,
            language: FALLBACK_LOCALE,
            start_muted: false,
        }
    }
}
