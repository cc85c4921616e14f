//! Drives a [`TutorSession`]: feeds it inputs one at a time and carries out the
//! commands it emits.

use crate::answering::{AnsweringService, ChatEntry};
use crate::language::Locale;
use crate::session_state::{Mode, TutorSession};
use crate::speech_api::{SpeechRecognizer, SpeechSynthesizer};
use crate::{Command, SessionInput};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinSet;

/// Receives the state changes a UI needs to redraw. Every method defaults to a no-op.
pub trait SessionObserver: Send {
    fn language_changed(&mut self, _locale: Locale) {}
    fn chat_appended(&mut self, _entry: &ChatEntry) {}
    fn chat_cleared(&mut self) {}
    fn notice_changed(&mut self, _notice: Option<&str>) {}
    fn mode_changed(&mut self, _mode: Mode) {}
    fn section_changed(&mut self, _index: usize, _section_id: &str) {}
}

/// Runs the session until [`SessionInput::Shutdown`] arrives or every other
/// input sender is dropped, then hands the session back.
///
/// `input_tx` must feed `inputs`; the runtime keeps only a weak handle to it
/// and gives strong clones to the tasks it spawns.
pub async fn run_session<R, S, O>(
    mut session: TutorSession<R, S>,
    mut commands: UnboundedReceiver<Command>,
    input_tx: UnboundedSender<SessionInput>,
    mut inputs: UnboundedReceiver<SessionInput>,
    answering: Arc<dyn AnsweringService>,
    mut observer: O,
) -> TutorSession<R, S>
where
    R: SpeechRecognizer,
    S: SpeechSynthesizer,
    O: SessionObserver,
{
    let input_tx = input_tx.downgrade();
    let mut tasks = JoinSet::new();

    tracing::info!("Session started with {} sections", session.navigator().len());
    session.begin();

    loop {
        while let Ok(command) = commands.try_recv() {
            execute(command, &input_tx, &answering, &mut observer, &mut tasks);
        }
        while tasks.try_join_next().is_some() {}

        let Some(input) = inputs.recv().await else {
            tracing::info!("Session inputs closed");
            session.shutdown();
            break;
        };
        let shutdown = matches!(input, SessionInput::Shutdown);
        session.handle(input);
        if shutdown {
            break;
        }
    }

    // Final UI updates only; no new side effects after shutdown.
    while let Ok(command) = commands.try_recv() {
        notify(&mut observer, command);
    }
    tasks.shutdown().await;
    tracing::info!("Session finished");
    session
}

fn execute<O: SessionObserver>(
    command: Command,
    input_tx: &WeakUnboundedSender<SessionInput>,
    answering: &Arc<dyn AnsweringService>,
    observer: &mut O,
    tasks: &mut JoinSet<()>,
) {
    match command {
        Command::SendTurn { turn, request } => {
            let Some(tx) = input_tx.upgrade() else {
                tracing::debug!("Session closing; not sending turn {}", turn);
                return;
            };
            let answering = answering.clone();
            tasks.spawn(async move {
                let outcome = answering.answer(&request).await;
                if tx.send(SessionInput::TurnCompleted { turn, outcome }).is_err() {
                    tracing::debug!("Session closed before turn {} completed", turn);
                }
            });
        }
        Command::ScheduleNoticeExpiry { notice, after } => {
            schedule(tasks, input_tx, after, SessionInput::NoticeExpired(notice));
        }
        Command::ScheduleNarration { section_id, after } => {
            schedule(tasks, input_tx, after, SessionInput::NarrationDue { section_id });
        }
        other => notify(observer, other),
    }
}

fn schedule(
    tasks: &mut JoinSet<()>,
    input_tx: &WeakUnboundedSender<SessionInput>,
    after: Duration,
    input: SessionInput,
) {
    let Some(tx) = input_tx.upgrade() else {
        return;
    };
    tasks.spawn(async move {
        tokio::time::sleep(after).await;
        if tx.send(input).is_err() {
            tracing::debug!("Session closed before timer fired");
        }
    });
}

fn notify<O: SessionObserver>(observer: &mut O, command: Command) {
    match command {
        Command::LanguageChanged(locale) => observer.language_changed(locale),
        Command::ChatAppended(entry) => observer.chat_appended(&entry),
        Command::ChatCleared => observer.chat_cleared(),
        Command::NoticeChanged(notice) => observer.notice_changed(notice.as_deref()),
        Command::ModeChanged(mode) => observer.mode_changed(mode),
        Command::SectionChanged { index, section_id } => {
            observer.section_changed(index, &section_id)
        }
        Command::SendTurn { turn, .. } => {
            tracing::debug!("Dropping turn {} issued during shutdown", turn);
        }
        Command::ScheduleNoticeExpiry { .. } | Command::ScheduleNarration { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answering::MockAnsweringService;
    use crate::config::{DEFAULT_NARRATION_DELAY, DEFAULT_NOTICE_TTL, SessionConfig};
    use crate::error::TransportError;
    use crate::generic_types::{RecognitionRequest, Utterance, Voice};
    use crate::lesson::{Section, SectionKind};
    use crate::session_state::UPSTREAM_FALLBACK_MESSAGE;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    struct NoRecognizer;

    impl SpeechRecognizer for NoRecognizer {
        fn is_available(&self) -> bool {
            false
        }

        fn start(&mut self, _request: RecognitionRequest) -> Result<(), String> {
            Err("service-not-allowed".into())
        }

        fn stop(&mut self) {}

        fn abort(&mut self) {}
    }

    struct RecordingSynthesizer {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechSynthesizer for RecordingSynthesizer {
        fn voices(&self) -> Vec<Voice> {
            vec![]
        }

        fn speak(&mut self, utterance: Utterance) {
            self.spoken.lock().unwrap().push(utterance.text);
        }

        fn cancel(&mut self) {}

        fn pause(&mut self) {}

        fn resume(&mut self) {}
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Chat(ChatEntry),
        Cleared,
        Notice(Option<String>),
        Mode(Mode),
        Language(Locale),
        Section(usize, String),
    }

    struct ChannelObserver(mpsc::UnboundedSender<Seen>);

    impl ChannelObserver {
        fn push(&self, seen: Seen) {
            let _ = self.0.send(seen);
        }
    }

    impl SessionObserver for ChannelObserver {
        fn language_changed(&mut self, locale: Locale) {
            self.push(Seen::Language(locale));
        }

        fn chat_appended(&mut self, entry: &ChatEntry) {
            self.push(Seen::Chat(entry.clone()));
        }

        fn chat_cleared(&mut self) {
            self.push(Seen::Cleared);
        }

        fn notice_changed(&mut self, notice: Option<&str>) {
            self.push(Seen::Notice(notice.map(str::to_string)));
        }

        fn mode_changed(&mut self, mode: Mode) {
            self.push(Seen::Mode(mode));
        }

        fn section_changed(&mut self, index: usize, section_id: &str) {
            self.push(Seen::Section(index, section_id.to_string()));
        }
    }

    struct Running {
        inputs: mpsc::UnboundedSender<SessionInput>,
        seen: mpsc::UnboundedReceiver<Seen>,
        spoken: Arc<Mutex<Vec<String>>>,
        handle: JoinHandle<TutorSession<NoRecognizer, RecordingSynthesizer>>,
    }

    impl Running {
        async fn wait_for(&mut self, wanted: Seen) {
            loop {
                match self.seen.recv().await {
                    Some(seen) if seen == wanted => return,
                    Some(_) => continue,
                    None => panic!("observer closed before {wanted:?}"),
                }
            }
        }

        fn send(&self, input: SessionInput) {
            self.inputs.send(input).unwrap();
        }
    }

    fn welcome_then(reply: Result<String, TransportError>) -> MockAnsweringService {
        let mut answering = MockAnsweringService::new();
        answering.expect_answer().returning(move |request| {
            if request.silent {
                Ok("SECTION_ID: s1\nSECTION_CONTENT: Welcome".into())
            } else {
                reply.clone()
            }
        });
        answering
    }

    fn start(answering: MockAnsweringService) -> Running {
        let sections = vec![
            Section::new("s1", "Light", SectionKind::Content, "Light is energy.")
                .with_narration("Light travels fast."),
            Section::new("s2", "Lenses", SectionKind::Activity, "Try a magnifier."),
        ];
        let spoken = Arc::new(Mutex::new(vec![]));
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (input_tx, inputs) = mpsc::unbounded_channel();
        let (seen_tx, seen) = mpsc::unbounded_channel();

        let session = TutorSession::new(
            sections,
            NoRecognizer,
            RecordingSynthesizer {
                spoken: spoken.clone(),
            },
            SessionConfig::default(),
            command_tx,
        );
        let handle = tokio::spawn(run_session(
            session,
            commands,
            input_tx.clone(),
            inputs,
            Arc::new(answering),
            ChannelObserver(seen_tx),
        ));
        Running {
            inputs: input_tx,
            seen,
            spoken,
            handle,
        }
    }

    #[tokio::test]
    async fn turns_round_trip_through_the_answering_service() {
        // Arrange
        let mut running = start(welcome_then(Ok(
            "SECTION_ID: s1\nSECTION_CONTENT: Because light is fast.".into(),
        )));
        running.wait_for(Seen::Section(0, "s1".into())).await;
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;

        // Act
        running.send(SessionInput::Ask("why?".into()));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Because light is fast.")))
            .await;
        running.send(SessionInput::Shutdown);
        let session = running.handle.await.unwrap();

        // Assert
        assert_eq!(
            session.chat_log(),
            &[
                ChatEntry::assistant("Welcome"),
                ChatEntry::user("why?"),
                ChatEntry::assistant("Because light is fast."),
            ]
        );
        assert_eq!(
            *running.spoken.lock().unwrap(),
            vec!["Welcome", "Because light is fast."]
        );
        assert_eq!(session.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn upstream_failure_becomes_fallback_message() {
        let mut running = start(welcome_then(Err(TransportError::UpstreamUnavailable {
            status: Some(503),
        })));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;

        running.send(SessionInput::Ask("hello?".into()));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant(UPSTREAM_FALLBACK_MESSAGE)))
            .await;
        running.wait_for(Seen::Mode(Mode::Idle)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn language_notice_expires_after_ttl() {
        let mut running = start(welcome_then(Ok("theek hai".into())));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;

        let asked_at = Instant::now();
        running.send(SessionInput::Ask("please switch to hindi".into()));
        running.wait_for(Seen::Language(Locale::Hindi)).await;
        running.wait_for(Seen::Notice(None)).await;

        assert!(asked_at.elapsed() >= DEFAULT_NOTICE_TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn narration_starts_after_delay() {
        let mut running = start(welcome_then(Ok("ok".into())));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;
        running
            .wait_for(Seen::Mode(Mode::Speaking { paused: false }))
            .await;

        let requested_at = Instant::now();
        running.send(SessionInput::NarrateSection);
        running.wait_for(Seen::Mode(Mode::Idle)).await;
        running
            .wait_for(Seen::Mode(Mode::Speaking { paused: false }))
            .await;

        assert!(requested_at.elapsed() >= DEFAULT_NARRATION_DELAY);
        assert_eq!(
            running.spoken.lock().unwrap().last().map(String::as_str),
            Some("Light travels fast.")
        );
    }

    #[tokio::test]
    async fn reset_clears_the_chat() {
        let mut running = start(welcome_then(Ok("ok".into())));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;

        running.send(SessionInput::Reset);
        running.wait_for(Seen::Cleared).await;
        running.send(SessionInput::Shutdown);

        let session = running.handle.await.unwrap();
        assert!(session.chat_log().is_empty());
    }

    #[tokio::test]
    async fn run_ends_when_inputs_close() {
        let mut running = start(welcome_then(Ok("ok".into())));
        running
            .wait_for(Seen::Chat(ChatEntry::assistant("Welcome")))
            .await;

        let Running { inputs, handle, .. } = running;
        drop(inputs);

        let session = handle.await.unwrap();
        assert_eq!(session.chat_log().len(), 1);
        assert_eq!(session.mode(), Mode::Idle);
    }
}
