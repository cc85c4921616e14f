use crate::generic_types::{SynthesizerEvent, SynthesizerEventKind, Utterance, UtteranceId, Voice};
use crate::language::Locale;
use crate::speech_api::SpeechSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackUpdate {
    Started(UtteranceId),
    Finished(UtteranceId),
}

/// Wraps a [`SpeechSynthesizer`]: one utterance at a time, newest wins.
pub struct PlaybackAdapter<S: SpeechSynthesizer> {
    engine: S,
    current: Option<UtteranceId>,
    paused: bool,
    last_utterance: UtteranceId,
    rate: f32,
    pitch: f32,
}

/// Picks the first voice whose language tag starts with the locale's code.
pub fn select_voice(voices: &[Voice], locale: Locale) -> Option<Voice> {
    let code = locale.code();
    voices
        .iter()
        .find(|voice| {
            let lang = voice.lang.to_ascii_lowercase().replace('_', "-");
            lang == code || lang.starts_with(&format!("{code}-"))
        })
        .cloned()
}

impl<S: SpeechSynthesizer> PlaybackAdapter<S> {
    pub fn new(engine: S, rate: f32, pitch: f32) -> Self {
        Self {
            engine,
            current: None,
            paused: false,
            last_utterance: UtteranceId(0),
            rate,
            pitch,
        }
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.current.is_some() && self.paused
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current
    }

    /// Cancels whatever is playing and speaks `text` in `locale`.
    pub fn speak(&mut self, text: &str, locale: Locale) -> UtteranceId {
        self.stop();

        let voice = select_voice(&self.engine.voices(), locale);
        if voice.is_none() {
            tracing::debug!("No voice for {}; using engine default", locale);
        }
        let id = self.last_utterance.next();
        self.last_utterance = id;
        self.engine.speak(Utterance {
            id,
            text: text.to_string(),
            locale_tag: locale.speech_tag().to_string(),
            voice,
            rate: self.rate,
            pitch: self.pitch,
        });
        self.current = Some(id);
        self.paused = false;
        id
    }

    pub fn pause(&mut self) -> bool {
        if self.current.is_some() && !self.paused {
            self.engine.pause();
            self.paused = true;
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.current.is_some() && self.paused {
            self.engine.resume();
            self.paused = false;
            true
        } else {
            false
        }
    }

    /// Safe to call at any time; only cancels when something is playing.
    pub fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(id) => {
                tracing::debug!("Cancelling utterance {}", id);
                self.engine.cancel();
                self.paused = false;
                true
            }
            None => false,
        }
    }

    pub fn handle_event(&mut self, event: SynthesizerEvent) -> Option<PlaybackUpdate> {
        if self.current != Some(event.utterance) {
            tracing::debug!("Ignoring synthesizer event for utterance {}", event.utterance);
            return None;
        }
        match event.kind {
            SynthesizerEventKind::Start => Some(PlaybackUpdate::Started(event.utterance)),
            SynthesizerEventKind::End | SynthesizerEventKind::Error => {
                if event.kind == SynthesizerEventKind::Error {
                    tracing::warn!("Synthesizer failed on utterance {}", event.utterance);
                }
                self.current = None;
                self.paused = false;
                Some(PlaybackUpdate::Finished(event.utterance))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech_api::MockSpeechSynthesizer;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Samantha", "en-US"),
            Voice::new("Lekha", "hi_IN"),
            Voice::new("Thomas", "fr-FR"),
        ]
    }

    fn engine() -> MockSpeechSynthesizer {
        let mut engine = MockSpeechSynthesizer::new();
        engine.expect_voices().returning(voices);
        engine
    }

    fn event(id: u64, kind: SynthesizerEventKind) -> SynthesizerEvent {
        SynthesizerEvent {
            utterance: UtteranceId(id),
            kind,
        }
    }

    #[test]
    fn selects_voice_by_prefix() {
        assert_eq!(select_voice(&voices(), Locale::Hindi).unwrap().name, "Lekha");
        assert_eq!(select_voice(&voices(), Locale::French).unwrap().name, "Thomas");
        assert_eq!(select_voice(&voices(), Locale::Tamil), None);
    }

    #[test]
    fn speak_uses_matching_voice_and_tag() {
        let mut engine = engine();
        engine
            .expect_speak()
            .withf(|u| {
                u.text == "Namaste"
                    && u.locale_tag == "hi-IN"
                    && u.voice.as_ref().map(|v| v.name.as_str()) == Some("Lekha")
            })
            .times(1)
            .return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        let id = playback.speak("Namaste", Locale::Hindi);
        assert_eq!(id, UtteranceId(1));
        assert!(playback.is_speaking());
    }

    #[test]
    fn missing_voice_falls_back_to_default() {
        let mut engine = engine();
        engine
            .expect_speak()
            .withf(|u| u.voice.is_none() && u.locale_tag == "ta-IN")
            .times(1)
            .return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        playback.speak("Vanakkam", Locale::Tamil);
    }

    #[test]
    fn speaking_again_cancels_previous_utterance() {
        let mut engine = engine();
        engine.expect_speak().times(2).return_const(());
        engine.expect_cancel().times(1).return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        playback.speak("first", Locale::English);
        let second = playback.speak("second", Locale::English);
        assert_eq!(playback.current(), Some(second));
        assert_eq!(playback.handle_event(event(1, SynthesizerEventKind::End)), None);
        assert!(playback.is_speaking());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut engine = engine();
        engine.expect_speak().return_const(());
        engine.expect_cancel().times(1).return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        assert!(!playback.stop());
        playback.speak("hello", Locale::English);
        assert!(playback.stop());
        assert!(!playback.stop());
    }

    #[test]
    fn pause_and_resume_only_while_speaking() {
        let mut engine = engine();
        engine.expect_speak().return_const(());
        engine.expect_pause().times(1).return_const(());
        engine.expect_resume().times(1).return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        assert!(!playback.pause());
        playback.speak("hello", Locale::English);
        assert!(playback.pause());
        assert!(!playback.pause());
        assert!(playback.is_paused());
        assert!(playback.resume());
        assert!(!playback.resume());
    }

    #[test]
    fn end_and_error_finish_the_current_utterance() {
        let mut engine = engine();
        engine.expect_speak().return_const(());

        let mut playback = PlaybackAdapter::new(engine, 1.0, 1.0);
        let id = playback.speak("a", Locale::English);
        assert_eq!(
            playback.handle_event(event(id.0, SynthesizerEventKind::Start)),
            Some(PlaybackUpdate::Started(id))
        );
        assert_eq!(
            playback.handle_event(event(id.0, SynthesizerEventKind::End)),
            Some(PlaybackUpdate::Finished(id))
        );
        assert!(!playback.is_speaking());

        let id = playback.speak("b", Locale::English);
        assert_eq!(
            playback.handle_event(event(id.0, SynthesizerEventKind::Error)),
            Some(PlaybackUpdate::Finished(id))
        );
    }
}
