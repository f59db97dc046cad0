use thiserror::Error;

use super::session_event::EventSink;
use crate::shared::language::Language;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    /// The user or platform refused microphone access.
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    Other(String),
}

/// Parameters for a single native recognition pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
    pub language: Language,
}

impl RecognitionOptions {
    /// One utterance, final result only, best alternative only.
    pub fn single_shot(language: Language) -> Self {
        Self {
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
            language,
        }
    }
}

/// Domain interface for an on-device speech recognizer.
///
/// Results are delivered asynchronously through the sink as
/// `TranscriptReceived` or `RecognizerFailed`, tagged with `generation`.
pub trait SpeechRecognizer: Send {
    fn start(
        &mut self,
        options: &RecognitionOptions,
        generation: u64,
        sink: EventSink,
    ) -> Result<(), RecognizerError>;

    /// Best-effort; stopping an idle recognizer is a no-op.
    fn stop(&mut self);
}
