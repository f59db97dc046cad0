use crate::shared::backend_error::BackendError;

/// Remote speech-to-text and pronunciation comparison.
pub trait PronunciationBackend: Send {
    /// Server-side accuracy in `[0, 1]` for `spoken` against `expected`.
    fn check_pronunciation(&self, spoken: &str, expected: &str) -> Result<f64, BackendError>;

    /// Transcribes a recorded audio payload.
    fn recognize_speech(&self, audio: &[u8]) -> Result<String, BackendError>;
}
