use std::time::Duration;

use super::session::{
    Phase, PronunciationOutcome, RecognitionMode, RecognitionSession, RecorderState,
};
use super::session_event::{Effect, SessionEvent};
use super::speech_recognizer::{RecognitionOptions, RecognizerError};
use crate::scoring::domain::similarity::accuracy;
use crate::scoring::domain::transcript::Transcript;
use crate::shared::constants::{MAX_RECORDING_DURATION, RECOGNIZER_RESTART_DELAY};
use crate::shared::language::Language;

/// Delays applied by the controller's scheduled effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTimings {
    /// Wait between stopping and starting the native recognizer.
    pub restart_delay: Duration,
    /// Recording is force-stopped after this long.
    pub max_recording: Duration,
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            restart_delay: RECOGNIZER_RESTART_DELAY,
            max_recording: MAX_RECORDING_DURATION,
        }
    }
}

/// State machine for pronunciation attempts.
///
/// Pure: every input is a [`SessionEvent`] fed to [`dispatch`], every
/// output is a list of [`Effect`]s for the caller to execute. Events that
/// do not apply to the current phase are dropped.
///
/// The generation counter increases whenever an attempt starts or the
/// surface closes. Timers, recognizer passes and recordings are tagged with
/// the generation that armed them, so anything left over from an earlier
/// attempt is ignored.
///
/// [`dispatch`]: RecognitionController::dispatch
#[derive(Debug, Clone)]
pub struct RecognitionController {
    mode: RecognitionMode,
    language: Language,
    timings: ControllerTimings,
    session: RecognitionSession,
    generation: u64,
}

impl RecognitionController {
    pub fn new(mode: RecognitionMode, language: Language) -> Self {
        Self {
            mode,
            language,
            timings: ControllerTimings::default(),
            session: RecognitionSession::idle(),
            generation: 0,
        }
    }

    pub fn with_timings(mut self, timings: ControllerTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Applies to the next native recognition pass.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn session(&self) -> &RecognitionSession {
        &self.session
    }

    pub fn phase(&self) -> &Phase {
        self.session.phase()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outcome(&self) -> Option<&PronunciationOutcome> {
        match self.session.phase() {
            Phase::Succeeded(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn start(&mut self, word: &str) -> Vec<Effect> {
        self.dispatch(SessionEvent::StartTest {
            word: word.to_string(),
        })
    }

    pub fn cancel(&mut self) -> Vec<Effect> {
        self.dispatch(SessionEvent::Close)
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Effect> {
        log::debug!(
            "session event {:?} in phase {:?} ({:?} mode)",
            event,
            self.session.phase(),
            self.mode
        );

        match event {
            SessionEvent::StartTest { word } => self.begin_attempt(&word),
            SessionEvent::Retry => self.retry(),
            SessionEvent::RecognizerStartDue { generation } => {
                self.on_recognizer_start_due(generation)
            }
            SessionEvent::TranscriptReceived { generation, text } => {
                self.on_transcript(generation, &text)
            }
            SessionEvent::RecognizerFailed { generation, error } => {
                self.on_recognizer_failed(generation, error)
            }
            SessionEvent::RecordRequested => self.on_record_requested(),
            SessionEvent::StreamAcquired => self.on_stream_acquired(),
            SessionEvent::AcquisitionFailed { message } => self.on_acquisition_failed(message),
            SessionEvent::AudioFragment { generation, bytes } => {
                if generation == self.generation
                    && matches!(
                        self.session.recorder(),
                        RecorderState::Recording | RecorderState::Finalizing
                    )
                {
                    self.session.push_fragment(bytes);
                }
                Vec::new()
            }
            SessionEvent::StopRequested => self.stop_recording(),
            SessionEvent::RecordingTimeout { generation } => {
                if generation != self.generation {
                    return Vec::new();
                }
                log::info!("Recording reached {:?} limit", self.timings.max_recording);
                self.stop_recording()
            }
            SessionEvent::RecorderStopped { generation } => self.on_recorder_stopped(generation),
            SessionEvent::SpeechRecognized { text } => self.on_speech_recognized(&text),
            SessionEvent::SpeechRecognitionFailed { message } => {
                self.on_speech_recognition_failed(&message)
            }
            SessionEvent::PronunciationChecked { accuracy } => self.on_checked(accuracy),
            SessionEvent::PronunciationCheckFailed { message } => self.on_check_failed(&message),
            SessionEvent::Close => self.close(),
        }
    }

    fn begin_attempt(&mut self, word: &str) -> Vec<Effect> {
        let mut effects = self.cancellation_effects();
        self.generation += 1;
        self.session = RecognitionSession::listening(word);

        if self.mode == RecognitionMode::Native {
            if !effects.contains(&Effect::StopRecognizer) {
                effects.push(Effect::StopRecognizer);
            }
            effects.push(Effect::ScheduleRecognizerStart {
                after: self.timings.restart_delay,
                generation: self.generation,
            });
        }
        effects
    }

    fn retry(&mut self) -> Vec<Effect> {
        let word = self.session.target_word().to_string();
        if word.is_empty() {
            return Vec::new();
        }
        match self.mode {
            RecognitionMode::Native => self.begin_attempt(&word),
            RecognitionMode::Fallback => self.on_record_requested(),
        }
    }

    fn on_recognizer_start_due(&mut self, generation: u64) -> Vec<Effect> {
        if generation != self.generation
            || self.mode != RecognitionMode::Native
            || *self.session.phase() != Phase::Listening
            || self.session.recognizer_active()
        {
            return Vec::new();
        }
        self.session.set_recognizer_active(true);
        vec![Effect::StartRecognizer {
            options: RecognitionOptions::single_shot(self.language),
            generation: self.generation,
        }]
    }

    fn on_transcript(&mut self, generation: u64, text: &str) -> Vec<Effect> {
        if !self.accepts_recognizer_result(generation) {
            return Vec::new();
        }
        self.session.set_recognizer_active(false);
        self.compare(Transcript::from_raw(Some(text)))
    }

    fn on_recognizer_failed(&mut self, generation: u64, error: RecognizerError) -> Vec<Effect> {
        if !self.accepts_recognizer_result(generation) {
            return Vec::new();
        }
        self.session.set_recognizer_active(false);
        match error {
            RecognizerError::PermissionDenied => {
                log::warn!("Native recognition denied, switching to recording fallback");
                self.mode = RecognitionMode::Fallback;
                Vec::new()
            }
            RecognizerError::Other(message) => {
                log::error!("Native recognition error: {message}");
                self.fail(message);
                Vec::new()
            }
        }
    }

    fn on_record_requested(&mut self) -> Vec<Effect> {
        if self.mode != RecognitionMode::Fallback
            || self.session.target_word().is_empty()
            || self.session.recorder() != RecorderState::Inactive
        {
            return Vec::new();
        }
        match self.session.phase() {
            Phase::Listening => {}
            Phase::Succeeded(_) | Phase::Failed { .. } => {
                let word = self.session.target_word().to_string();
                self.generation += 1;
                self.session = RecognitionSession::listening(&word);
            }
            _ => return Vec::new(),
        }
        self.session.set_recorder(RecorderState::Acquiring);
        vec![Effect::AcquireAudioStream]
    }

    fn on_stream_acquired(&mut self) -> Vec<Effect> {
        if self.session.recorder() != RecorderState::Acquiring {
            return Vec::new();
        }
        self.session.set_recorder(RecorderState::Recording);
        vec![
            Effect::StartRecording {
                generation: self.generation,
            },
            Effect::ScheduleRecordingTimeout {
                after: self.timings.max_recording,
                generation: self.generation,
            },
        ]
    }

    fn on_acquisition_failed(&mut self, message: String) -> Vec<Effect> {
        if !matches!(
            self.session.recorder(),
            RecorderState::Acquiring | RecorderState::Recording
        ) {
            return Vec::new();
        }
        log::error!("Audio input unavailable: {message}");
        self.session.set_recorder(RecorderState::Inactive);
        self.fail(message);
        vec![Effect::ReleaseAudioStream]
    }

    fn stop_recording(&mut self) -> Vec<Effect> {
        if self.session.recorder() != RecorderState::Recording {
            return Vec::new();
        }
        self.session.set_recorder(RecorderState::Finalizing);
        vec![Effect::StopRecording]
    }

    fn on_recorder_stopped(&mut self, generation: u64) -> Vec<Effect> {
        if generation != self.generation || self.session.recorder() != RecorderState::Finalizing {
            return Vec::new();
        }
        self.session.set_recorder(RecorderState::Inactive);
        let payload = self.session.take_payload();
        self.session.set_phase(Phase::Recognizing);
        vec![
            Effect::RecognizeAudio { payload },
            Effect::ReleaseAudioStream,
        ]
    }

    fn on_speech_recognized(&mut self, text: &str) -> Vec<Effect> {
        if *self.session.phase() != Phase::Recognizing {
            return Vec::new();
        }
        self.compare(Transcript::from_raw(Some(text)))
    }

    fn on_speech_recognition_failed(&mut self, message: &str) -> Vec<Effect> {
        if *self.session.phase() != Phase::Recognizing {
            return Vec::new();
        }
        log::warn!("Remote recognition failed, scoring empty transcript: {message}");
        self.succeed_locally(Transcript::default());
        Vec::new()
    }

    fn on_checked(&mut self, server_accuracy: f64) -> Vec<Effect> {
        let Phase::Comparing { spoken } = self.session.phase() else {
            return Vec::new();
        };
        let spoken = spoken.clone();
        let score = if server_accuracy.is_finite() {
            server_accuracy.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let outcome = PronunciationOutcome {
            expected: self.session.target_word().to_string(),
            spoken,
            accuracy: score,
            scored_locally: false,
        };
        self.session.set_phase(Phase::Succeeded(outcome));
        Vec::new()
    }

    fn on_check_failed(&mut self, message: &str) -> Vec<Effect> {
        let Phase::Comparing { spoken } = self.session.phase() else {
            return Vec::new();
        };
        let spoken = spoken.clone();
        log::warn!("Pronunciation check failed, scoring locally: {message}");
        self.succeed_locally(spoken);
        Vec::new()
    }

    fn close(&mut self) -> Vec<Effect> {
        let effects = self.cancellation_effects();
        self.generation += 1;
        self.session = RecognitionSession::idle();
        effects
    }

    /// Best-effort stop requests for whatever the current attempt holds.
    fn cancellation_effects(&self) -> Vec<Effect> {
        if *self.session.phase() != Phase::Listening {
            return Vec::new();
        }
        match self.session.recorder() {
            RecorderState::Recording | RecorderState::Finalizing => {
                vec![Effect::StopRecording, Effect::ReleaseAudioStream]
            }
            RecorderState::Acquiring => vec![Effect::ReleaseAudioStream],
            RecorderState::Inactive if self.mode == RecognitionMode::Native => {
                vec![Effect::StopRecognizer]
            }
            RecorderState::Inactive => Vec::new(),
        }
    }

    /// Only the pass started for the current attempt may report back.
    fn accepts_recognizer_result(&self, generation: u64) -> bool {
        generation == self.generation
            && self.mode == RecognitionMode::Native
            && *self.session.phase() == Phase::Listening
            && self.session.recognizer_active()
    }

    fn compare(&mut self, spoken: Transcript) -> Vec<Effect> {
        let expected = self.session.target_word().to_string();
        self.session.set_phase(Phase::Comparing {
            spoken: spoken.clone(),
        });
        vec![Effect::CheckPronunciation { spoken, expected }]
    }

    fn succeed_locally(&mut self, spoken: Transcript) {
        let expected = self.session.target_word().to_string();
        let score = accuracy(spoken.as_str(), &expected);
        self.session.set_phase(Phase::Succeeded(PronunciationOutcome {
            expected,
            spoken,
            accuracy: score,
            scored_locally: true,
        }));
    }

    fn fail(&mut self, message: String) {
        self.session.set_phase(Phase::Failed { message });
    }
}
