use crate::recognition::domain::session_event::{EventSink, SessionEvent};
use crate::recognition::domain::speech_recognizer::{
    RecognitionOptions, RecognizerError, SpeechRecognizer,
};

/// Recognizer whose "speech" is text the learner typed.
///
/// Each pass reports the same transcript. Useful where no speech engine
/// is available but the native flow should still be exercised.
#[derive(Debug, Clone)]
pub struct TypedTranscriptRecognizer {
    transcript: String,
    passes: usize,
}

impl TypedTranscriptRecognizer {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            passes: 0,
        }
    }

    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl SpeechRecognizer for TypedTranscriptRecognizer {
    fn start(
        &mut self,
        options: &RecognitionOptions,
        generation: u64,
        sink: EventSink,
    ) -> Result<(), RecognizerError> {
        log::debug!("Typed recognition pass ({})", options.language);
        self.passes += 1;
        let event = if self.transcript.trim().is_empty() {
            SessionEvent::RecognizerFailed {
                generation,
                error: RecognizerError::Other("no-speech".to_string()),
            }
        } else {
            SessionEvent::TranscriptReceived {
                generation,
                text: self.transcript.clone(),
            }
        };
        sink.send(event)
            .map_err(|_| RecognizerError::Other("session closed".to_string()))
    }

    fn stop(&mut self) {}
}
