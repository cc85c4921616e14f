use crate::generic_types::{RecognitionRequest, Utterance, Voice};
#[cfg(test)]
use mockall::automock;

/// A speech-to-text engine.
///
/// Engines are callback driven: results come back later as
/// [`RecognizerEvent`](crate::generic_types::RecognizerEvent)s tagged with the
/// session id from the request. Implementations must not block.
#[cfg_attr(test, automock)]
pub trait SpeechRecognizer: Send {
    /// False when the environment has no recognizer at all.
    fn is_available(&self) -> bool;

    /// Begins capturing. `Err` carries the engine's error code.
    fn start(&mut self, request: RecognitionRequest) -> Result<(), String>;

    /// Ends the session, letting the engine flush a final result.
    fn stop(&mut self);

    /// Ends the session immediately, discarding anything pending.
    fn abort(&mut self);
}

/// A text-to-speech engine. Progress is reported through
/// [`SynthesizerEvent`](crate::generic_types::SynthesizerEvent)s.
#[cfg_attr(test, automock)]
pub trait SpeechSynthesizer: Send {
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, utterance: Utterance);

    fn cancel(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);
}
