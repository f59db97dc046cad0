use std::time::Duration;

/// Minimum accuracy for a pronunciation to count as correct.
pub const PRONUNCIATION_THRESHOLD: f64 = 0.7;

/// Hard ceiling on a fallback recording before it is force-stopped.
pub const MAX_RECORDING_DURATION: Duration = Duration::from_millis(5000);

/// Grace period between stopping and restarting the native recognizer.
pub const RECOGNIZER_RESTART_DELAY: Duration = Duration::from_millis(100);

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const CHECK_PRONUNCIATION_PATH: &str = "/check-pronunciation";
pub const RECOGNIZE_SPEECH_PATH: &str = "/recognize-speech";
pub const DETECT_PATH: &str = "/detect";

pub const RECORDING_FILE_NAME: &str = "recording.wav";
pub const IMAGE_FILE_NAME: &str = "image.jpg";

pub const AUDIO_CLIP_DIR: &str = "/static/audio";
