use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use pronounce_core::detection::domain::detection::{audio_clip_path, unique_by_label};
use pronounce_core::detection::domain::object_detector::ObjectDetector;
use pronounce_core::pipeline::pronunciation_test_runner::PronunciationTestRunner;
use pronounce_core::recognition::domain::recognition_controller::ControllerTimings;
use pronounce_core::recognition::domain::session::{Phase, PronunciationOutcome};
use pronounce_core::recognition::infrastructure::file_audio_recorder::FileAudioRecorder;
use pronounce_core::recognition::infrastructure::typed_transcript_recognizer::TypedTranscriptRecognizer;
use pronounce_core::scoring::domain::similarity::accuracy;
use pronounce_core::scoring::domain::transcript::Transcript;
use pronounce_core::scoring::domain::verdict::{format_percent, Verdict};
use pronounce_core::shared::http_backend::HttpBackend;
use pronounce_core::shared::language::Language;
use pronounce_core::shared::settings::Settings;

/// Extra time on top of the recording ceiling before giving up on a result.
const RESULT_GRACE: Duration = Duration::from_secs(5);

/// Pronunciation practice against a detection and speech backend.
#[derive(Parser)]
#[command(name = "pronounce")]
struct Cli {
    /// Backend base URL (overrides settings).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Recognition language: en-US or id-ID (overrides settings).
    #[arg(long, global = true)]
    language: Option<Language>,

    /// HTTP request timeout in seconds (overrides settings).
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Persist the resolved settings, overrides included.
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a transcript locally, without contacting the server.
    Score {
        /// What was said.
        spoken: String,
        /// The word being practised.
        expected: String,
    },
    /// Check a typed transcript through the native recognition flow.
    Check {
        /// The word being practised.
        expected: String,
        /// What was said.
        #[arg(long)]
        said: String,
    },
    /// Upload a recording through the fallback recognition flow.
    Recognize {
        /// The word being practised.
        expected: String,
        /// Recorded audio file.
        audio: PathBuf,
        /// Keep "recording" until the duration ceiling instead of stopping
        /// as soon as the file is streamed.
        #[arg(long)]
        wait_for_ceiling: bool,
    },
    /// Detect objects in an image and list the words to practise.
    Detect {
        /// JPEG or PNG image.
        image: PathBuf,
        /// Display width used to scale bounding boxes.
        #[arg(long)]
        display_width: Option<f64>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli, Settings::load());
    validate(&cli, &settings)?;

    if cli.save {
        let path = settings.save()?;
        log::info!("Saved settings to {}", path.display());
    }

    match cli.command {
        Command::Score { spoken, expected } => run_score(&spoken, &target_word(&expected)),
        Command::Check { expected, said } => {
            run_check(&settings, &target_word(&expected), &said)
        }
        Command::Recognize {
            expected,
            audio,
            wait_for_ceiling,
        } => run_recognize(&settings, &target_word(&expected), &audio, wait_for_ceiling),
        Command::Detect {
            image,
            display_width,
        } => run_detect(&settings, &image, display_width),
    }
}

/// Applies command-line overrides on top of the stored settings.
fn resolve_settings(cli: &Cli, stored: Settings) -> Settings {
    let mut settings = stored;
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    if let Some(language) = cli.language {
        settings.language = language;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = secs;
    }
    settings
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if settings.request_timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".into());
    }
    match &cli.command {
        Command::Score { expected, .. } | Command::Check { expected, .. } => {
            require_word(expected)?;
        }
        Command::Recognize {
            expected, audio, ..
        } => {
            require_word(expected)?;
            if !audio.exists() {
                return Err(format!("Audio file not found: {}", audio.display()).into());
            }
        }
        Command::Detect {
            image,
            display_width,
        } => {
            if !image.exists() {
                return Err(format!("Image file not found: {}", image.display()).into());
            }
            if let Some(w) = display_width {
                if *w <= 0.0 {
                    return Err(format!("Display width must be positive, got {w}").into());
                }
            }
        }
    }
    Ok(())
}

fn require_word(word: &str) -> Result<(), Box<dyn std::error::Error>> {
    if word.trim().is_empty() {
        return Err("Expected word must not be empty".into());
    }
    Ok(())
}

/// Words are compared case-insensitively, so the target is lowercased like
/// the transcript.
fn target_word(expected: &str) -> String {
    expected.trim().to_lowercase()
}

fn score_locally(spoken: &str, expected: &str) -> (Transcript, f64) {
    let spoken = Transcript::from_raw(Some(spoken));
    let score = accuracy(spoken.as_str(), expected);
    (spoken, score)
}

fn run_score(spoken: &str, expected: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (spoken, score) = score_locally(spoken, expected);
    print_result(&spoken, score, Verdict::from_accuracy(score));
    Ok(())
}

fn run_check(
    settings: &Settings,
    expected: &str,
    said: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&settings.server_url, settings.request_timeout())?;
    let mut runner = PronunciationTestRunner::new(
        Some(Box::new(TypedTranscriptRecognizer::new(said))),
        None,
        Box::new(backend),
        settings.language,
        timings(settings),
    );

    runner.start_test(expected);
    let deadline = settings.recognizer_restart_delay() + settings.request_timeout() + RESULT_GRACE;
    report(runner.wait_for_outcome(deadline))
}

fn run_recognize(
    settings: &Settings,
    expected: &str,
    audio: &Path,
    wait_for_ceiling: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(&settings.server_url, settings.request_timeout())?;
    let mut runner = PronunciationTestRunner::new(
        None,
        Some(Box::new(FileAudioRecorder::new(audio))),
        Box::new(backend),
        settings.language,
        timings(settings),
    );

    runner.start_test(expected);
    runner.request_recording();
    if wait_for_ceiling {
        log::info!("Recording until the {}ms ceiling", settings.max_recording_ms);
    } else {
        runner.stop_recording();
    }

    // Recognition and comparison are two sequential requests.
    let deadline = settings.max_recording() + settings.request_timeout() * 2 + RESULT_GRACE;
    report(runner.wait_for_outcome(deadline))
}

fn run_detect(
    settings: &Settings,
    image: &Path,
    display_width: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(image)?;
    let backend = HttpBackend::new(&settings.server_url, settings.request_timeout())?;
    let detections = backend.detect(&bytes)?;
    if detections.is_empty() {
        println!("No objects detected.");
        return Ok(());
    }

    let natural_width = match display_width {
        Some(_) => Some(image::image_dimensions(image)?.0),
        None => None,
    };

    for det in unique_by_label(&detections) {
        println!("{} ({})", det.label, det.translation);
        println!("  audio: {}", audio_clip_path(&det.label));
        let bbox = match (natural_width, display_width) {
            (Some(natural), Some(width)) => det.bbox.scaled(natural, width),
            _ => Some(det.bbox),
        };
        match bbox {
            Some(b) => println!(
                "  box:   [{:.1}, {:.1}, {:.1}, {:.1}]",
                b.x1, b.y1, b.x2, b.y2
            ),
            None => log::warn!("Image dimensions unavailable, cannot scale box for {}", det.label),
        }
    }
    Ok(())
}

fn timings(settings: &Settings) -> ControllerTimings {
    ControllerTimings {
        restart_delay: settings.recognizer_restart_delay(),
        max_recording: settings.max_recording(),
    }
}

fn report(phase: Option<Phase>) -> Result<(), Box<dyn std::error::Error>> {
    match phase {
        Some(Phase::Succeeded(outcome)) => {
            print_outcome(&outcome);
            Ok(())
        }
        Some(Phase::Failed { message }) => Err(format!("Recognition failed: {message}").into()),
        _ => Err("No result before the deadline".into()),
    }
}

fn print_outcome(outcome: &PronunciationOutcome) {
    if outcome.scored_locally {
        log::info!("Server comparison unavailable, scored locally");
    }
    print_result(&outcome.spoken, outcome.accuracy, outcome.verdict());
}

fn print_result(spoken: &Transcript, score: f64, verdict: Verdict) {
    if spoken.is_empty() {
        println!("No speech detected");
    } else {
        println!("You said: \"{spoken}\"");
    }
    println!("{verdict} Accuracy: {}", format_percent(score));
}
