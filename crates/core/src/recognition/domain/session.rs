use crate::scoring::domain::transcript::Transcript;
use crate::scoring::domain::verdict::Verdict;

/// How speech is captured. Picked once from platform capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// On-device recognizer produces the transcript.
    Native,
    /// Audio is recorded and uploaded for server-side recognition.
    Fallback,
}

impl RecognitionMode {
    pub fn detect(native_available: bool) -> Self {
        if native_available {
            RecognitionMode::Native
        } else {
            RecognitionMode::Fallback
        }
    }
}

/// Scored result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PronunciationOutcome {
    pub expected: String,
    pub spoken: Transcript,
    pub accuracy: f64,
    /// True when the score came from the local scorer instead of the server.
    pub scored_locally: bool,
}

impl PronunciationOutcome {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_accuracy(self.accuracy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    /// Waiting for speech, either from the native recognizer or a recording.
    Listening,
    /// Recorded audio was uploaded; waiting for its transcript.
    Recognizing,
    /// Waiting for the pronunciation check of `spoken`.
    Comparing { spoken: Transcript },
    Succeeded(PronunciationOutcome),
    Failed { message: String },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded(_) | Phase::Failed { .. })
    }
}

/// Fallback recorder lifecycle within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Acquiring,
    Recording,
    /// Stop was requested; waiting for the last fragment.
    Finalizing,
}

/// One pronunciation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSession {
    target_word: String,
    phase: Phase,
    recorder: RecorderState,
    recognizer_active: bool,
    fragments: Vec<Vec<u8>>,
}

impl RecognitionSession {
    pub fn idle() -> Self {
        Self {
            target_word: String::new(),
            phase: Phase::Idle,
            recorder: RecorderState::Inactive,
            recognizer_active: false,
            fragments: Vec::new(),
        }
    }

    pub fn listening(target_word: &str) -> Self {
        Self {
            target_word: target_word.to_string(),
            phase: Phase::Listening,
            ..Self::idle()
        }
    }

    pub fn target_word(&self) -> &str {
        &self.target_word
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn recorder(&self) -> RecorderState {
        self.recorder
    }

    pub fn recognizer_active(&self) -> bool {
        self.recognizer_active
    }

    pub fn fragments(&self) -> &[Vec<u8>] {
        &self.fragments
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_recorder(&mut self, recorder: RecorderState) {
        self.recorder = recorder;
    }

    pub(crate) fn set_recognizer_active(&mut self, active: bool) {
        self.recognizer_active = active;
    }

    pub(crate) fn push_fragment(&mut self, fragment: Vec<u8>) {
        self.fragments.push(fragment);
    }

    /// Concatenates buffered fragments in arrival order into one payload.
    pub(crate) fn take_payload(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.fragments).concat()
    }
}

impl Default for RecognitionSession {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_detect() {
        assert_eq!(RecognitionMode::detect(true), RecognitionMode::Native);
        assert_eq!(RecognitionMode::detect(false), RecognitionMode::Fallback);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Listening.is_terminal());
        assert!(!Phase::Recognizing.is_terminal());
        assert!(Phase::Failed {
            message: "x".into()
        }
        .is_terminal());
    }

    #[test]
    fn test_payload_concatenates_in_order() {
        let mut session = RecognitionSession::listening("cup");
        session.push_fragment(vec![1, 2]);
        session.push_fragment(vec![]);
        session.push_fragment(vec![3]);
        assert_eq!(session.take_payload(), vec![1, 2, 3]);
        assert!(session.fragments().is_empty());
    }

    #[test]
    fn test_outcome_verdict() {
        let outcome = PronunciationOutcome {
            expected: "cat".into(),
            spoken: Transcript::from_raw(Some("kat")),
            accuracy: 2.0 / 3.0,
            scored_locally: true,
        };
        assert_eq!(outcome.verdict(), Verdict::TryAgain);
    }
}
