use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::recognition::domain::audio_recorder::AudioRecorder;
use crate::recognition::domain::pronunciation_backend::PronunciationBackend;
use crate::recognition::domain::recognition_controller::{
    ControllerTimings, RecognitionController,
};
use crate::recognition::domain::session::{Phase, RecognitionMode};
use crate::recognition::domain::session_event::{Effect, EventSink, SessionEvent};
use crate::recognition::domain::speech_recognizer::{RecognizerError, SpeechRecognizer};
use crate::shared::language::Language;

const NO_AUDIO_INPUT: &str = "no audio input available";

/// Drives a [`RecognitionController`] against real collaborators.
///
/// Synchronous effects (backend calls, stream acquisition) run inline and
/// their results are dispatched right away. Asynchronous completions
/// (recognizer results, audio fragments, timers) arrive on an event
/// channel and are processed by [`pump`] or [`wait_for_outcome`], one
/// event at a time.
///
/// [`pump`]: PronunciationTestRunner::pump
/// [`wait_for_outcome`]: PronunciationTestRunner::wait_for_outcome
pub struct PronunciationTestRunner {
    controller: RecognitionController,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    recorder: Option<Box<dyn AudioRecorder>>,
    backend: Box<dyn PronunciationBackend>,
    events_tx: EventSink,
    events_rx: Receiver<SessionEvent>,
}

impl PronunciationTestRunner {
    /// Native mode is used when a recognizer is supplied, fallback
    /// recording otherwise. Without a recorder, recording attempts fail
    /// with an acquisition error.
    pub fn new(
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        recorder: Option<Box<dyn AudioRecorder>>,
        backend: Box<dyn PronunciationBackend>,
        language: Language,
        timings: ControllerTimings,
    ) -> Self {
        let mode = RecognitionMode::detect(recognizer.is_some());
        log::info!("Speech recognition mode: {mode:?}");
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            controller: RecognitionController::new(mode, language).with_timings(timings),
            recognizer,
            recorder,
            backend,
            events_tx,
            events_rx,
        }
    }

    pub fn controller(&self) -> &RecognitionController {
        &self.controller
    }

    pub fn phase(&self) -> &Phase {
        self.controller.phase()
    }

    pub fn set_language(&mut self, language: Language) {
        self.controller.set_language(language);
    }

    pub fn start_test(&mut self, word: &str) {
        self.pump();
        self.handle(SessionEvent::StartTest {
            word: word.to_string(),
        });
    }

    pub fn retry(&mut self) {
        self.pump();
        self.handle(SessionEvent::Retry);
    }

    pub fn request_recording(&mut self) {
        self.pump();
        self.handle(SessionEvent::RecordRequested);
    }

    pub fn stop_recording(&mut self) {
        self.pump();
        self.handle(SessionEvent::StopRequested);
    }

    pub fn close(&mut self) {
        self.pump();
        self.handle(SessionEvent::Close);
    }

    /// Processes every event already queued without blocking.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
        }
    }

    /// Processes events until the attempt finishes or `timeout` elapses.
    ///
    /// Returns the terminal phase, or `None` on timeout or when no attempt
    /// is running.
    pub fn wait_for_outcome(&mut self, timeout: Duration) -> Option<Phase> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            match self.controller.phase() {
                phase if phase.is_terminal() => return Some(phase.clone()),
                Phase::Idle => return None,
                _ => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("No pronunciation result within {timeout:?}");
                    return None;
                }
                // The runner holds a sender, so this cannot disconnect.
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn handle(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for effect in self.controller.dispatch(event) {
                if let Some(follow_up) = self.execute(effect) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn execute(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::StopRecognizer => {
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                None
            }
            Effect::ScheduleRecognizerStart { after, generation } => {
                self.schedule(after, SessionEvent::RecognizerStartDue { generation });
                None
            }
            Effect::StartRecognizer {
                options,
                generation,
            } => {
                let started = match self.recognizer.as_mut() {
                    Some(recognizer) => {
                        recognizer.start(&options, generation, self.events_tx.clone())
                    }
                    None => Err(RecognizerError::Other(
                        "native recognition unavailable".to_string(),
                    )),
                };
                started
                    .err()
                    .map(|error| SessionEvent::RecognizerFailed { generation, error })
            }
            Effect::AcquireAudioStream => match self.recorder.as_mut() {
                Some(recorder) => match recorder.acquire() {
                    Ok(()) => Some(SessionEvent::StreamAcquired),
                    Err(e) => Some(SessionEvent::AcquisitionFailed {
                        message: e.to_string(),
                    }),
                },
                None => Some(SessionEvent::AcquisitionFailed {
                    message: NO_AUDIO_INPUT.to_string(),
                }),
            },
            Effect::StartRecording { generation } => match self.recorder.as_mut() {
                Some(recorder) => recorder
                    .start(generation, self.events_tx.clone())
                    .err()
                    .map(|e| SessionEvent::AcquisitionFailed {
                        message: e.to_string(),
                    }),
                None => Some(SessionEvent::AcquisitionFailed {
                    message: NO_AUDIO_INPUT.to_string(),
                }),
            },
            Effect::ScheduleRecordingTimeout { after, generation } => {
                self.schedule(after, SessionEvent::RecordingTimeout { generation });
                None
            }
            Effect::StopRecording => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.stop();
                }
                None
            }
            Effect::ReleaseAudioStream => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.release();
                }
                None
            }
            Effect::RecognizeAudio { payload } => {
                log::info!("Uploading {} bytes for recognition", payload.len());
                Some(match self.backend.recognize_speech(&payload) {
                    Ok(text) => SessionEvent::SpeechRecognized { text },
                    Err(e) => SessionEvent::SpeechRecognitionFailed {
                        message: e.to_string(),
                    },
                })
            }
            Effect::CheckPronunciation { spoken, expected } => {
                Some(match self.backend.check_pronunciation(spoken.as_str(), &expected) {
                    Ok(accuracy) => SessionEvent::PronunciationChecked { accuracy },
                    Err(e) => SessionEvent::PronunciationCheckFailed {
                        message: e.to_string(),
                    },
                })
            }
        }
    }

    fn schedule(&self, after: Duration, event: SessionEvent) {
        let tx = self.events_tx.clone();
        thread::spawn(move || {
            thread::sleep(after);
            let _ = tx.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::audio_recorder::AcquisitionError;
    use crate::recognition::domain::speech_recognizer::RecognitionOptions;
    use crate::scoring::domain::similarity::accuracy;
    use crate::shared::backend_error::BackendError;
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};

    const WAIT: Duration = Duration::from_secs(5);

    // ─── Stubs ───

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn log_call(calls: &CallLog, call: &str) {
        calls.lock().unwrap().push(call.to_string());
    }

    struct StubRecognizer {
        reply: Result<String, RecognizerError>,
        calls: CallLog,
    }

    impl SpeechRecognizer for StubRecognizer {
        fn start(
            &mut self,
            options: &RecognitionOptions,
            generation: u64,
            sink: EventSink,
        ) -> Result<(), RecognizerError> {
            log_call(&self.calls, &format!("recognizer.start {}", options.language));
            let event = match self.reply.clone() {
                Ok(text) => SessionEvent::TranscriptReceived { generation, text },
                Err(error) => SessionEvent::RecognizerFailed { generation, error },
            };
            sink.send(event).unwrap();
            Ok(())
        }

        fn stop(&mut self) {
            log_call(&self.calls, "recognizer.stop");
        }
    }

    struct StubRecorder {
        fragments: Vec<Vec<u8>>,
        fail_acquire: bool,
        sink: Option<(u64, EventSink)>,
        calls: CallLog,
    }

    impl AudioRecorder for StubRecorder {
        fn acquire(&mut self) -> Result<(), AcquisitionError> {
            log_call(&self.calls, "recorder.acquire");
            if self.fail_acquire {
                return Err(AcquisitionError("Permission dismissed".to_string()));
            }
            Ok(())
        }

        fn start(&mut self, generation: u64, sink: EventSink) -> Result<(), AcquisitionError> {
            log_call(&self.calls, "recorder.start");
            for bytes in &self.fragments {
                sink.send(SessionEvent::AudioFragment {
                    generation,
                    bytes: bytes.clone(),
                })
                .unwrap();
            }
            self.sink = Some((generation, sink));
            Ok(())
        }

        fn stop(&mut self) {
            log_call(&self.calls, "recorder.stop");
            if let Some((generation, sink)) = self.sink.take() {
                sink.send(SessionEvent::RecorderStopped { generation })
                    .unwrap();
            }
        }

        fn release(&mut self) {
            log_call(&self.calls, "recorder.release");
        }
    }

    struct StubBackend {
        transcript: Option<String>,
        server_accuracy: Option<f64>,
        uploads: Arc<Mutex<Vec<Vec<u8>>>>,
        calls: CallLog,
    }

    fn unavailable(path: &str) -> BackendError {
        BackendError::Status {
            url: path.to_string(),
            status: 503,
        }
    }

    impl PronunciationBackend for StubBackend {
        fn check_pronunciation(&self, spoken: &str, expected: &str) -> Result<f64, BackendError> {
            log_call(&self.calls, &format!("backend.check {spoken}/{expected}"));
            self.server_accuracy
                .ok_or_else(|| unavailable("/check-pronunciation"))
        }

        fn recognize_speech(&self, audio: &[u8]) -> Result<String, BackendError> {
            log_call(&self.calls, "backend.recognize");
            self.uploads.lock().unwrap().push(audio.to_vec());
            self.transcript
                .clone()
                .ok_or_else(|| unavailable("/recognize-speech"))
        }
    }

    fn fast_timings() -> ControllerTimings {
        ControllerTimings {
            restart_delay: Duration::from_millis(1),
            max_recording: Duration::from_millis(20),
        }
    }

    fn recorder(
        calls: &CallLog,
        fragments: Vec<Vec<u8>>,
        fail_acquire: bool,
    ) -> Option<Box<dyn AudioRecorder>> {
        Some(Box::new(StubRecorder {
            fragments,
            fail_acquire,
            sink: None,
            calls: calls.clone(),
        }))
    }

    fn backend(
        calls: &CallLog,
        transcript: Option<&str>,
        server_accuracy: Option<f64>,
    ) -> (Box<StubBackend>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let uploads = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(StubBackend {
                transcript: transcript.map(str::to_string),
                server_accuracy,
                uploads: uploads.clone(),
                calls: calls.clone(),
            }),
            uploads,
        )
    }

    fn succeeded(phase: Option<Phase>) -> crate::recognition::domain::session::PronunciationOutcome {
        match phase {
            Some(Phase::Succeeded(outcome)) => outcome,
            other => panic!("expected success, got {other:?}"),
        }
    }

    // ─── Native mode ───

    #[test]
    fn test_native_flow_uses_server_accuracy() {
        let calls = CallLog::default();
        let recognizer = StubRecognizer {
            reply: Ok("Banana.".to_string()),
            calls: calls.clone(),
        };
        let (backend, _) = backend(&calls, None, Some(0.9));
        let mut runner = PronunciationTestRunner::new(
            Some(Box::new(recognizer)),
            recorder(&calls, vec![], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("banana");
        let outcome = succeeded(runner.wait_for_outcome(WAIT));
        assert_eq!(outcome.spoken.as_str(), "banana");
        assert_relative_eq!(outcome.accuracy, 0.9);
        assert!(!outcome.scored_locally);

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], "recognizer.stop");
        assert_eq!(calls[1], "recognizer.start en-US");
        assert_eq!(calls[2], "backend.check banana/banana");
    }

    #[test]
    fn test_native_check_failure_scores_locally() {
        let calls = CallLog::default();
        let recognizer = StubRecognizer {
            reply: Ok("kat".to_string()),
            calls: calls.clone(),
        };
        let (backend, _) = backend(&calls, None, None);
        let mut runner = PronunciationTestRunner::new(
            Some(Box::new(recognizer)),
            recorder(&calls, vec![], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("cat");
        let outcome = succeeded(runner.wait_for_outcome(WAIT));
        assert_relative_eq!(outcome.accuracy, accuracy("kat", "cat"));
        assert!(outcome.scored_locally);
    }

    #[test]
    fn test_native_permission_denied_waits_for_recording() {
        let calls = CallLog::default();
        let recognizer = StubRecognizer {
            reply: Err(RecognizerError::PermissionDenied),
            calls: calls.clone(),
        };
        let (backend, uploads) = backend(&calls, Some("cup"), Some(1.0));
        let mut runner = PronunciationTestRunner::new(
            Some(Box::new(recognizer)),
            recorder(&calls, vec![vec![7, 7]], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("cup");
        assert!(runner.wait_for_outcome(Duration::from_millis(100)).is_none());
        assert_eq!(runner.controller().mode(), RecognitionMode::Fallback);
        assert_eq!(*runner.phase(), Phase::Listening);

        runner.request_recording();
        runner.stop_recording();
        let outcome = succeeded(runner.wait_for_outcome(WAIT));
        assert_relative_eq!(outcome.accuracy, 1.0);
        assert_eq!(uploads.lock().unwrap()[0], vec![7, 7]);
    }

    // ─── Fallback mode ───

    #[test]
    fn test_without_recognizer_start_does_not_touch_recognition() {
        let calls = CallLog::default();
        let (backend, _) = backend(&calls, None, None);
        let mut runner = PronunciationTestRunner::new(
            None,
            recorder(&calls, vec![], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("fork");
        assert_eq!(runner.controller().mode(), RecognitionMode::Fallback);
        assert_eq!(*runner.phase(), Phase::Listening);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recording_auto_stops_at_ceiling() {
        let calls = CallLog::default();
        let (backend, uploads) = backend(&calls, Some("Glass!"), None);
        let mut runner = PronunciationTestRunner::new(
            None,
            recorder(&calls, vec![vec![1, 2], vec![3]], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("glass");
        runner.request_recording();
        let outcome = succeeded(runner.wait_for_outcome(WAIT));
        assert_eq!(outcome.spoken.as_str(), "glass");
        assert_relative_eq!(outcome.accuracy, 1.0);
        assert!(outcome.scored_locally);
        assert_eq!(uploads.lock().unwrap().as_slice(), &[vec![1, 2, 3]]);

        let calls = calls.lock().unwrap();
        let release = calls.iter().position(|c| c == "recorder.release").unwrap();
        let recognize = calls.iter().position(|c| c == "backend.recognize").unwrap();
        assert!(recognize < release, "stream released before upload: {calls:?}");
    }

    #[test]
    fn test_recognition_failure_scores_zero() {
        let calls = CallLog::default();
        let (backend, _) = backend(&calls, None, Some(1.0));
        let mut runner = PronunciationTestRunner::new(
            None,
            recorder(&calls, vec![vec![0]], false),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("pen");
        runner.request_recording();
        runner.stop_recording();
        let outcome = succeeded(runner.wait_for_outcome(WAIT));
        assert!(outcome.spoken.is_empty());
        assert_eq!(outcome.accuracy, 0.0);
    }

    #[test]
    fn test_acquisition_failure_fails_session() {
        let calls = CallLog::default();
        let (backend, _) = backend(&calls, None, None);
        let mut runner = PronunciationTestRunner::new(
            None,
            recorder(&calls, vec![], true),
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("pen");
        runner.request_recording();
        assert_eq!(
            runner.wait_for_outcome(WAIT),
            Some(Phase::Failed {
                message: "Permission dismissed".to_string()
            })
        );
        assert!(calls
            .lock()
            .unwrap()
            .contains(&"recorder.release".to_string()));
    }

    #[test]
    fn test_close_while_recording_cancels() {
        let calls = CallLog::default();
        let (backend, uploads) = backend(&calls, Some("pen"), None);
        let mut runner = PronunciationTestRunner::new(
            None,
            recorder(&calls, vec![vec![1]], false),
            backend,
            Language::EnglishUs,
            ControllerTimings {
                max_recording: Duration::from_secs(60),
                ..fast_timings()
            },
        );

        runner.start_test("pen");
        runner.request_recording();
        runner.close();
        assert_eq!(*runner.phase(), Phase::Idle);
        assert!(runner.wait_for_outcome(Duration::from_millis(50)).is_none());
        assert!(uploads.lock().unwrap().is_empty());

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"recorder.stop".to_string()));
        assert!(calls.contains(&"recorder.release".to_string()));
    }

    #[test]
    fn test_missing_recorder_fails_recording() {
        let calls = CallLog::default();
        let (backend, _) = backend(&calls, None, None);
        let mut runner = PronunciationTestRunner::new(
            None,
            None,
            backend,
            Language::EnglishUs,
            fast_timings(),
        );

        runner.start_test("cup");
        runner.request_recording();
        assert_eq!(
            runner.wait_for_outcome(WAIT),
            Some(Phase::Failed {
                message: NO_AUDIO_INPUT.to_string()
            })
        );
    }
}
