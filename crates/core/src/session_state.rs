use crate::{
    Command, SessionInput,
    answering::{ChatEntry, ChatRole, TurnRequest},
    capture::{CaptureAdapter, CaptureUpdate},
    config::SessionConfig,
    error::{CaptureError, MediaError, SessionError, TransportError},
    generic_types::{NoticeId, RecognizerEvent, SynthesizerEvent, TurnId},
    language::{self, Locale},
    lesson::{LessonNavigator, Section},
    media::{CameraDevice, CameraToggle},
    playback::{PlaybackAdapter, PlaybackUpdate},
    reply::{self, ReplyVerdict},
    speech_api::{SpeechRecognizer, SpeechSynthesizer},
    text,
};
use tokio::sync::mpsc::UnboundedSender;

/// Added to the chat when a request fails for any reason other than an outage.
pub const TRANSPORT_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't get an answer just now. Please try again.";
/// Added to the chat when the answering service is down.
pub const UPSTREAM_FALLBACK_MESSAGE: &str = text::SERVICE_UNAVAILABLE_MESSAGE;

const TURN_IN_FLIGHT_NOTICE: &str = "Still working on the last answer. Please wait a moment.";
const CAPTURE_UNAVAILABLE_NOTICE: &str =
    "Voice input isn't available here. You can still type your questions.";

/// What the session is doing right now. Only one activity at a time; `paused`
/// only exists while speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Listening,
    /// Waiting on the reply to `turn`.
    Thinking { turn: TurnId },
    Speaking { paused: bool },
}

impl Mode {
    pub fn is_listening(&self) -> bool {
        matches!(self, Mode::Listening)
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Mode::Thinking { .. })
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, Mode::Speaking { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Mode::Speaking { paused: true })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub text: String,
}

/// The tutoring session controller.
///
/// Owns the lesson position, the chat log and both speech adapters, and
/// sequences capture → send → parse → sanitize → display → speak. It never
/// blocks: network calls and timers are requested through [`Command`]s and
/// their results come back as [`SessionInput`]s.
pub struct TutorSession<R: SpeechRecognizer, S: SpeechSynthesizer> {
    mode: Mode,
    navigator: LessonNavigator,
    chat_log: Vec<ChatEntry>,
    active_language: Locale,
    muted: bool,
    capture: CaptureAdapter<R>,
    playback: PlaybackAdapter<S>,
    camera: Option<CameraToggle>,
    config: SessionConfig,
    command_tx: UnboundedSender<Command>,
    last_turn: TurnId,
    // Turns at or below this id were abandoned by a reset.
    turn_floor: TurnId,
    notice: Option<Notice>,
    last_notice: NoticeId,
    interim_transcript: Option<String>,
    capture_unavailable_reported: bool,
}

impl<R: SpeechRecognizer, S: SpeechSynthesizer> TutorSession<R, S> {
    pub fn new(
        sections: Vec<Section>,
        recognizer: R,
        synthesizer: S,
        config: SessionConfig,
        command_tx: UnboundedSender<Command>,
    ) -> Self {
        Self {
            mode: Mode::Idle,
            navigator: LessonNavigator::new(sections),
            chat_log: vec![],
            active_language: config.language,
            muted: config.start_muted,
            capture: CaptureAdapter::new(recognizer),
            playback: PlaybackAdapter::new(synthesizer, config.speech_rate, config.speech_pitch),
            camera: None,
            config,
            command_tx,
            last_turn: TurnId(0),
            turn_floor: TurnId(0),
            notice: None,
            last_notice: NoticeId(0),
            interim_transcript: None,
            capture_unavailable_reported: false,
        }
    }

    pub fn with_camera(mut self, device: Box<dyn CameraDevice>) -> Self {
        self.camera = Some(CameraToggle::new(device));
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn chat_log(&self) -> &[ChatEntry] {
        &self.chat_log
    }

    pub fn active_language(&self) -> Locale {
        self.active_language
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// True only while a spoken question is being captured.
    pub fn is_hand_raised(&self) -> bool {
        self.mode.is_listening()
    }

    pub fn is_camera_on(&self) -> bool {
        self.camera.as_ref().is_some_and(CameraToggle::is_on)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn interim_transcript(&self) -> Option<&str> {
        self.interim_transcript.as_deref()
    }

    pub fn navigator(&self) -> &LessonNavigator {
        &self.navigator
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.navigator.current_section()
    }

    /// Routes one input to its handler.
    pub fn handle(&mut self, input: SessionInput) {
        let result = match input {
            SessionInput::Ask(text) => self.ask(&text),
            SessionInput::StartListening => self.start_listening(),
            SessionInput::StopListening => {
                self.stop_listening();
                Ok(())
            }
            SessionInput::Next => {
                self.next();
                Ok(())
            }
            SessionInput::Previous => {
                self.previous();
                Ok(())
            }
            SessionInput::Jump(index) => {
                self.jump(index);
                Ok(())
            }
            SessionInput::Pause => {
                self.pause();
                Ok(())
            }
            SessionInput::Resume => {
                self.resume();
                Ok(())
            }
            SessionInput::StopSpeaking => {
                self.stop_speaking();
                Ok(())
            }
            SessionInput::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
            SessionInput::ToggleCamera => self.toggle_camera().map(|_| ()),
            SessionInput::NarrateSection => {
                self.narrate_section();
                Ok(())
            }
            SessionInput::Reset => {
                self.reset();
                Ok(())
            }
            SessionInput::Recognizer(event) => {
                self.on_recognizer_event(event);
                Ok(())
            }
            SessionInput::Synthesizer(event) => {
                self.on_synthesizer_event(event);
                Ok(())
            }
            SessionInput::TurnCompleted { turn, outcome } => {
                self.on_turn_completed(turn, outcome);
                Ok(())
            }
            SessionInput::NoticeExpired(id) => {
                self.on_notice_expired(id);
                Ok(())
            }
            SessionInput::NarrationDue { section_id } => {
                self.on_narration_due(&section_id);
                Ok(())
            }
            SessionInput::Shutdown => {
                self.shutdown();
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!("Input rejected: {}", e);
        }
    }

    /// Renders the opening section. Called once when the session starts.
    pub fn begin(&mut self) {
        self.render_current_section();
    }

    /// Sends a typed question.
    pub fn ask(&mut self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if self.mode.is_thinking() {
            self.raise_notice(TURN_IN_FLIGHT_NOTICE);
            return Err(SessionError::TurnInFlight);
        }
        if self.capture.stop() {
            self.interim_transcript = None;
        }
        self.playback.stop();
        self.submit_user_message(text);
        Ok(())
    }

    pub fn start_listening(&mut self) -> Result<(), SessionError> {
        match self.mode {
            Mode::Thinking { .. } => {
                self.raise_notice(TURN_IN_FLIGHT_NOTICE);
                return Err(SessionError::TurnInFlight);
            }
            Mode::Listening => {
                tracing::debug!("Already listening");
                return Ok(());
            }
            Mode::Speaking { .. } => {
                self.playback.stop();
                self.set_mode(Mode::Idle);
            }
            Mode::Idle => {}
        }

        match self.capture.start(self.active_language.code()) {
            Ok(_) => {
                self.interim_transcript = None;
                self.set_mode(Mode::Listening);
                Ok(())
            }
            Err(CaptureError::EngineUnavailable) => {
                if !self.capture_unavailable_reported {
                    self.capture_unavailable_reported = true;
                    self.raise_notice(CAPTURE_UNAVAILABLE_NOTICE);
                }
                Err(SessionError::CaptureDisabled)
            }
            Err(err @ CaptureError::Failed(kind)) => {
                self.raise_notice(kind.user_message());
                Err(err.into())
            }
        }
    }

    /// Drops the question being captured, if any.
    pub fn stop_listening(&mut self) {
        if self.capture.stop() {
            self.interim_transcript = None;
            if self.mode.is_listening() {
                self.set_mode(Mode::Idle);
            }
        }
    }

    pub fn next(&mut self) -> bool {
        let moved = self.navigator.next();
        self.after_navigation(moved);
        moved
    }

    pub fn previous(&mut self) -> bool {
        let moved = self.navigator.previous();
        self.after_navigation(moved);
        moved
    }

    pub fn jump(&mut self, index: usize) -> bool {
        let moved = self.navigator.jump(index);
        self.after_navigation(moved);
        moved
    }

    pub fn pause(&mut self) -> bool {
        if self.mode == (Mode::Speaking { paused: false }) && self.playback.pause() {
            self.set_mode(Mode::Speaking { paused: true });
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.mode.is_paused() && self.playback.resume() {
            self.set_mode(Mode::Speaking { paused: false });
            true
        } else {
            false
        }
    }

    pub fn stop_speaking(&mut self) {
        self.playback.stop();
        if self.mode.is_speaking() {
            self.set_mode(Mode::Idle);
        }
    }

    /// Flips mute and returns the new value. Muting cuts off current speech.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        tracing::info!("Muted: {}", self.muted);
        if self.muted {
            self.stop_speaking();
        }
        self.muted
    }

    pub fn toggle_camera(&mut self) -> Result<bool, SessionError> {
        let result = match self.camera.as_mut() {
            Some(camera) => camera.toggle(),
            None => Err(MediaError::Unavailable("no camera configured".to_string())),
        };
        match result {
            Ok(on) => Ok(on),
            Err(e) => {
                tracing::warn!("Camera toggle failed: {}", e);
                self.raise_notice(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Schedules the current section's narration after the configured delay.
    pub fn narrate_section(&mut self) -> bool {
        if self.muted {
            tracing::debug!("Muted; not narrating");
            return false;
        }
        let Some(section_id) = self.navigator.current_id().map(str::to_string) else {
            return false;
        };
        self.stop_speaking();
        self.emit(Command::ScheduleNarration {
            section_id,
            after: self.config.narration_delay,
        });
        true
    }

    /// Clears the chat and abandons anything still in flight.
    pub fn reset(&mut self) {
        tracing::info!("Resetting session");
        self.cancel_activity();
        self.turn_floor = self.last_turn;
        if self.mode.is_thinking() {
            self.set_mode(Mode::Idle);
        }
        self.chat_log.clear();
        self.emit(Command::ChatCleared);
    }

    /// Releases every device the session holds.
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down session");
        self.cancel_activity();
        if let Some(camera) = self.camera.as_mut() {
            camera.release();
        }
        self.set_mode(Mode::Idle);
    }

    pub fn on_recognizer_event(&mut self, event: RecognizerEvent) {
        let Some(update) = self.capture.handle_event(event) else {
            return;
        };
        match update {
            CaptureUpdate::Interim(text) => {
                self.interim_transcript = Some(text);
            }
            CaptureUpdate::Final(text) => {
                self.interim_transcript = None;
                if !self.mode.is_listening() {
                    tracing::debug!("Final transcript arrived outside Listening; dropping");
                    return;
                }
                if text.is_empty() {
                    self.set_mode(Mode::Idle);
                } else {
                    tracing::info!("Learner said: \"{}\"", text);
                    self.submit_user_message(&text);
                }
            }
            CaptureUpdate::Ended => {
                self.interim_transcript = None;
                if self.mode.is_listening() {
                    self.set_mode(Mode::Idle);
                }
            }
            CaptureUpdate::Failed(kind) => {
                self.interim_transcript = None;
                self.raise_notice(kind.user_message());
                if self.mode.is_listening() {
                    self.set_mode(Mode::Idle);
                }
            }
        }
    }

    pub fn on_synthesizer_event(&mut self, event: SynthesizerEvent) {
        match self.playback.handle_event(event) {
            Some(PlaybackUpdate::Started(id)) => {
                tracing::debug!("Utterance {} started", id);
            }
            Some(PlaybackUpdate::Finished(id)) => {
                tracing::debug!("Utterance {} finished", id);
                if self.mode.is_speaking() {
                    self.set_mode(Mode::Idle);
                }
            }
            None => {}
        }
    }

    pub fn on_turn_completed(&mut self, turn: TurnId, outcome: Result<String, TransportError>) {
        if turn <= self.turn_floor {
            tracing::debug!("Dropping reply for abandoned turn {}", turn);
            return;
        }
        let is_current = self.mode == Mode::Thinking { turn };

        let payload = match outcome {
            Ok(payload) => payload,
            Err(err) => {
                if !is_current {
                    tracing::warn!("Stale turn {} failed: {}", turn, err);
                    return;
                }
                tracing::error!("Turn {} failed: {}", turn, err);
                let message = if err.is_upstream_unavailable() {
                    UPSTREAM_FALLBACK_MESSAGE
                } else {
                    TRANSPORT_FALLBACK_MESSAGE
                };
                self.append(ChatEntry::assistant(message));
                self.set_mode(Mode::Idle);
                return;
            }
        };

        // Checked against the section on screen now, not when the turn was sent.
        let active = self.navigator.current_id().map(str::to_string);
        match reply::interpret_reply(&payload, active.as_deref()) {
            ReplyVerdict::Mismatch { declared, active } => {
                tracing::warn!(
                    "Discarding reply for turn {}: declared section {:?}, active section {:?}",
                    turn,
                    declared,
                    active
                );
                if is_current {
                    self.set_mode(Mode::Idle);
                }
            }
            ReplyVerdict::Empty => {
                tracing::warn!("Discarding empty reply for turn {}", turn);
                if is_current {
                    self.set_mode(Mode::Idle);
                }
            }
            ReplyVerdict::Accepted(reply) => {
                let content = text::reflow_bullets(&text::sanitize(&reply.content));
                self.append(ChatEntry::assistant(&content));
                if !is_current {
                    tracing::debug!("Showing stale reply for turn {} without speaking it", turn);
                } else if self.muted {
                    self.set_mode(Mode::Idle);
                } else {
                    self.speak(&content);
                }
            }
        }
    }

    pub fn on_notice_expired(&mut self, id: NoticeId) {
        if self.notice.as_ref().is_some_and(|n| n.id == id) {
            self.notice = None;
            self.emit(Command::NoticeChanged(None));
        }
    }

    pub fn on_narration_due(&mut self, section_id: &str) {
        if self.navigator.current_id() != Some(section_id) {
            tracing::debug!("Narration for {} is stale; skipping", section_id);
            return;
        }
        if self.mode != Mode::Idle || self.muted {
            tracing::debug!("Session busy or muted; skipping narration for {}", section_id);
            return;
        }
        let narration = self
            .navigator
            .current_section()
            .map(|s| s.narration_text().to_string())
            .unwrap_or_default();
        self.speak(&narration);
    }

    fn submit_user_message(&mut self, text: &str) {
        self.apply_language_intent(text);
        let history_tail = self.history_tail();
        self.append(ChatEntry::user(text));
        self.dispatch_turn(text.to_string(), history_tail, false);
    }

    fn render_current_section(&mut self) {
        let Some(section) = self.navigator.current_section() else {
            tracing::debug!("Lesson is empty; nothing to render");
            return;
        };
        let message = format!("Present section \"{}\" ({}).", section.title, section.id);
        let section_id = section.id.clone();
        self.emit(Command::SectionChanged {
            index: self.navigator.current_index(),
            section_id,
        });
        let history_tail = self.history_tail();
        self.dispatch_turn(message, history_tail, true);
    }

    fn dispatch_turn(&mut self, user_message: String, history_tail: Vec<ChatEntry>, silent: bool) {
        let turn = self.last_turn.next();
        self.last_turn = turn;
        let request = TurnRequest {
            section_id: self.navigator.current_id().map(str::to_string),
            section_index: self.navigator.current_index(),
            total_sections: self.navigator.len(),
            user_message,
            history_tail,
            language: self.active_language,
            silent,
        };
        tracing::debug!("Dispatching turn {} for section {:?}", turn, request.section_id);
        self.emit(Command::SendTurn { turn, request });
        self.set_mode(Mode::Thinking { turn });
    }

    fn apply_language_intent(&mut self, text: &str) {
        let Some(locale) = language::detect(text) else {
            return;
        };
        if locale == self.active_language {
            return;
        }
        tracing::info!("Switching language {} -> {}", self.active_language, locale);
        self.active_language = locale;
        self.emit(Command::LanguageChanged(locale));
        self.raise_notice(&format!("Switched to {}", locale.display_name()));
    }

    fn after_navigation(&mut self, moved: bool) {
        self.cancel_activity();
        if moved {
            self.render_current_section();
        }
    }

    // Stops speech and capture. A pending turn is left to finish.
    fn cancel_activity(&mut self) {
        self.playback.stop();
        if self.capture.stop() {
            self.interim_transcript = None;
        }
        if self.mode.is_speaking() || self.mode.is_listening() {
            self.set_mode(Mode::Idle);
        }
    }

    fn speak(&mut self, content: &str) {
        let spoken = text::strip_for_speech(content);
        if spoken.is_empty() {
            self.set_mode(Mode::Idle);
            return;
        }
        self.playback.speak(&spoken, self.active_language);
        self.set_mode(Mode::Speaking { paused: false });
    }

    fn history_tail(&self) -> Vec<ChatEntry> {
        let skip = self.chat_log.len().saturating_sub(self.config.history_tail);
        self.chat_log[skip..].to_vec()
    }

    fn append(&mut self, entry: ChatEntry) {
        if entry.role == ChatRole::Assistant {
            tracing::info!("Tutor: {}", entry.content);
        }
        self.chat_log.push(entry.clone());
        self.emit(Command::ChatAppended(entry));
    }

    fn raise_notice(&mut self, text: &str) {
        let id = self.last_notice.next();
        self.last_notice = id;
        self.notice = Some(Notice {
            id,
            text: text.to_string(),
        });
        self.emit(Command::NoticeChanged(Some(text.to_string())));
        self.emit(Command::ScheduleNoticeExpiry {
            notice: id,
            after: self.config.notice_ttl,
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!("Mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.emit(Command::ModeChanged(mode));
        }
    }

    fn emit(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            tracing::warn!("Command receiver dropped; runtime is gone");
        }
    }
}
