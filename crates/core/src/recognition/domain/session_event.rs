use std::time::Duration;

use super::speech_recognizer::{RecognitionOptions, RecognizerError};
use crate::scoring::domain::transcript::Transcript;

/// Channel end that collaborators use to report completions.
pub type EventSink = crossbeam_channel::Sender<SessionEvent>;

/// Everything that can happen to a recognition session.
///
/// Completions from the recognizer and recorder carry the generation they
/// were started with.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A pronunciation test was opened for `word`.
    StartTest { word: String },
    /// Try the current word again.
    Retry,
    RecognizerStartDue { generation: u64 },
    TranscriptReceived {
        generation: u64,
        text: String,
    },
    RecognizerFailed {
        generation: u64,
        error: RecognizerError,
    },
    RecordRequested,
    StreamAcquired,
    AcquisitionFailed { message: String },
    AudioFragment {
        generation: u64,
        bytes: Vec<u8>,
    },
    StopRequested,
    RecordingTimeout { generation: u64 },
    RecorderStopped { generation: u64 },
    SpeechRecognized { text: String },
    SpeechRecognitionFailed { message: String },
    PronunciationChecked { accuracy: f64 },
    PronunciationCheckFailed { message: String },
    /// The test surface was closed.
    Close,
}

/// Side effects requested by the controller. The controller never
/// performs I/O itself; a runner executes these and reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StopRecognizer,
    ScheduleRecognizerStart { after: Duration, generation: u64 },
    StartRecognizer {
        options: RecognitionOptions,
        generation: u64,
    },
    AcquireAudioStream,
    StartRecording { generation: u64 },
    ScheduleRecordingTimeout { after: Duration, generation: u64 },
    StopRecording,
    ReleaseAudioStream,
    RecognizeAudio { payload: Vec<u8> },
    CheckPronunciation {
        spoken: Transcript,
        expected: String,
    },
}
