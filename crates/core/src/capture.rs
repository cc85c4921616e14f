use crate::error::{CaptureError, CaptureErrorKind};
use crate::generic_types::{
    CaptureSessionId, RecognitionRequest, RecognizerEvent, RecognizerEventKind,
};
use crate::language::Locale;
use crate::speech_api::SpeechRecognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Active(CaptureSessionId),
    /// The engine is missing; capture stays off for the rest of the session.
    Disabled,
}

/// What the controller hears back from the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureUpdate {
    Interim(String),
    /// The single final transcript of a capture session. The adapter is idle again.
    Final(String),
    /// The engine ended the session without a final transcript.
    Ended,
    Failed(CaptureErrorKind),
}

/// Wraps a [`SpeechRecognizer`] so the controller sees one capture session at a
/// time, one final transcript per session, and a fixed error taxonomy.
pub struct CaptureAdapter<R: SpeechRecognizer> {
    engine: R,
    state: CaptureState,
    last_session: CaptureSessionId,
}

impl<R: SpeechRecognizer> CaptureAdapter<R> {
    pub fn new(engine: R) -> Self {
        Self {
            engine,
            state: CaptureState::Idle,
            last_session: CaptureSessionId(0),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, CaptureState::Active(_))
    }

    pub fn engine(&self) -> &R {
        &self.engine
    }

    /// Starts a capture session in the given language.
    ///
    /// Returns `Ok(false)` when a session is already running.
    pub fn start(&mut self, language: &str) -> Result<bool, CaptureError> {
        match self.state {
            CaptureState::Disabled => return Err(CaptureError::EngineUnavailable),
            CaptureState::Active(session) => {
                tracing::debug!("Capture session {} already active; ignoring start", session);
                return Ok(false);
            }
            CaptureState::Idle => {}
        }

        if !self.engine.is_available() {
            tracing::warn!("Speech recognition engine unavailable; disabling capture");
            self.state = CaptureState::Disabled;
            return Err(CaptureError::EngineUnavailable);
        }

        let session = self.last_session.next();
        self.last_session = session;
        let request = RecognitionRequest {
            session,
            locale_tag: Locale::resolve(language).speech_tag().to_string(),
            continuous: true,
            interim_results: true,
        };
        tracing::debug!("Starting capture session {} ({})", session, request.locale_tag);

        match self.engine.start(request) {
            Ok(()) => {
                self.state = CaptureState::Active(session);
                Ok(true)
            }
            Err(code) => {
                let kind = CaptureErrorKind::from_engine_code(&code);
                tracing::warn!("Recognizer refused to start: {} ({})", code, kind);
                self.state = CaptureState::Idle;
                Err(CaptureError::Failed(kind))
            }
        }
    }

    /// Abandons the current session without producing a final transcript.
    pub fn stop(&mut self) -> bool {
        if let CaptureState::Active(session) = self.state {
            tracing::debug!("Aborting capture session {}", session);
            self.engine.abort();
            self.state = CaptureState::Idle;
            true
        } else {
            false
        }
    }

    pub fn handle_event(&mut self, event: RecognizerEvent) -> Option<CaptureUpdate> {
        let CaptureState::Active(active) = self.state else {
            tracing::debug!("Dropping recognizer event for inactive session {}", event.session);
            return None;
        };
        if event.session != active {
            tracing::debug!(
                "Dropping recognizer event for stale session {} (active {})",
                event.session,
                active
            );
            return None;
        }

        match event.kind {
            RecognizerEventKind::Transcript { text, is_final: false } => {
                Some(CaptureUpdate::Interim(text))
            }
            RecognizerEventKind::Transcript { text, is_final: true } => {
                self.state = CaptureState::Idle;
                self.engine.stop();
                Some(CaptureUpdate::Final(text.trim().to_string()))
            }
            RecognizerEventKind::Error { code } => {
                let kind = CaptureErrorKind::from_engine_code(&code);
                tracing::warn!("Recognizer error in session {}: {} ({})", active, code, kind);
                self.state = CaptureState::Idle;
                self.engine.abort();
                Some(CaptureUpdate::Failed(kind))
            }
            RecognizerEventKind::End => {
                self.state = CaptureState::Idle;
                Some(CaptureUpdate::Ended)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech_api::MockSpeechRecognizer;

    fn transcript(session: u64, text: &str, is_final: bool) -> RecognizerEvent {
        RecognizerEvent {
            session: CaptureSessionId(session),
            kind: RecognizerEventKind::Transcript {
                text: text.to_string(),
                is_final,
            },
        }
    }

    fn available_engine() -> MockSpeechRecognizer {
        let mut engine = MockSpeechRecognizer::new();
        engine.expect_is_available().return_const(true);
        engine
    }

    #[test]
    fn start_sets_locale_from_language_code() {
        let mut engine = available_engine();
        engine
            .expect_start()
            .withf(|req| req.locale_tag == "hi-IN" && req.continuous && req.interim_results)
            .times(1)
            .returning(|_| Ok(()));

        let mut capture = CaptureAdapter::new(engine);
        assert_eq!(capture.start("hi"), Ok(true));
        assert_eq!(capture.state(), CaptureState::Active(CaptureSessionId(1)));
    }

    #[test]
    fn unknown_language_falls_back_to_default_tag() {
        let mut engine = available_engine();
        engine
            .expect_start()
            .withf(|req| req.locale_tag == "en-US")
            .times(1)
            .returning(|_| Ok(()));

        let mut capture = CaptureAdapter::new(engine);
        assert_eq!(capture.start("zz"), Ok(true));
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut engine = available_engine();
        engine.expect_start().times(1).returning(|_| Ok(()));

        let mut capture = CaptureAdapter::new(engine);
        assert_eq!(capture.start("en"), Ok(true));
        assert_eq!(capture.start("en"), Ok(false));
    }

    #[test]
    fn unavailable_engine_disables_capture() {
        let mut engine = MockSpeechRecognizer::new();
        engine.expect_is_available().times(1).return_const(false);
        engine.expect_start().never();

        let mut capture = CaptureAdapter::new(engine);
        assert_eq!(capture.start("en"), Err(CaptureError::EngineUnavailable));
        assert_eq!(capture.state(), CaptureState::Disabled);
        assert_eq!(capture.start("en"), Err(CaptureError::EngineUnavailable));
    }

    #[test]
    fn start_failure_is_mapped() {
        let mut engine = available_engine();
        engine
            .expect_start()
            .returning(|_| Err("not-allowed".to_string()));

        let mut capture = CaptureAdapter::new(engine);
        assert_eq!(
            capture.start("en"),
            Err(CaptureError::Failed(CaptureErrorKind::DeviceDenied))
        );
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn emits_interims_then_exactly_one_final() {
        let mut engine = available_engine();
        engine.expect_start().returning(|_| Ok(()));
        engine.expect_stop().times(1).return_const(());

        let mut capture = CaptureAdapter::new(engine);
        capture.start("en").unwrap();

        assert_eq!(
            capture.handle_event(transcript(1, "what is", false)),
            Some(CaptureUpdate::Interim("what is".into()))
        );
        assert_eq!(
            capture.handle_event(transcript(1, " what is light ", true)),
            Some(CaptureUpdate::Final("what is light".into()))
        );
        assert!(!capture.is_listening());
        assert_eq!(capture.handle_event(transcript(1, "more", true)), None);
    }

    #[test]
    fn stop_suppresses_the_final_result() {
        let mut engine = available_engine();
        engine.expect_start().returning(|_| Ok(()));
        engine.expect_abort().times(1).return_const(());

        let mut capture = CaptureAdapter::new(engine);
        capture.start("en").unwrap();
        assert!(capture.stop());
        assert!(!capture.stop());
        assert_eq!(capture.handle_event(transcript(1, "late", true)), None);
    }

    #[test]
    fn events_from_an_old_session_are_ignored() {
        let mut engine = available_engine();
        engine.expect_start().times(2).returning(|_| Ok(()));
        engine.expect_abort().return_const(());

        let mut capture = CaptureAdapter::new(engine);
        capture.start("en").unwrap();
        capture.stop();
        capture.start("en").unwrap();

        assert_eq!(capture.handle_event(transcript(1, "old", true)), None);
        assert_eq!(
            capture.handle_event(transcript(2, "new", false)),
            Some(CaptureUpdate::Interim("new".into()))
        );
    }

    #[test]
    fn engine_error_returns_to_idle_with_kind() {
        let mut engine = available_engine();
        engine.expect_start().returning(|_| Ok(()));
        engine.expect_abort().return_const(());

        let mut capture = CaptureAdapter::new(engine);
        capture.start("en").unwrap();
        let update = capture.handle_event(RecognizerEvent {
            session: CaptureSessionId(1),
            kind: RecognizerEventKind::Error {
                code: "no-speech".into(),
            },
        });
        assert_eq!(update, Some(CaptureUpdate::Failed(CaptureErrorKind::NoInput)));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn end_without_final_reports_ended() {
        let mut engine = available_engine();
        engine.expect_start().returning(|_| Ok(()));

        let mut capture = CaptureAdapter::new(engine);
        capture.start("en").unwrap();
        let update = capture.handle_event(RecognizerEvent {
            session: CaptureSessionId(1),
            kind: RecognizerEventKind::End,
        });
        assert_eq!(update, Some(CaptureUpdate::Ended));
        assert!(!capture.is_listening());
    }
}
