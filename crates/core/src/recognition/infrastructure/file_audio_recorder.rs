use std::fs;
use std::path::{Path, PathBuf};

use crate::recognition::domain::audio_recorder::{AcquisitionError, AudioRecorder};
use crate::recognition::domain::session_event::{EventSink, SessionEvent};

pub const DEFAULT_FRAGMENT_SIZE: usize = 16 * 1024;

/// Recorder that "captures" a pre-recorded audio file.
///
/// Acquiring reads the file; starting streams it as fragments of
/// `fragment_size` bytes. Stands in for a microphone when the shell runs
/// without one.
#[derive(Debug)]
pub struct FileAudioRecorder {
    path: PathBuf,
    fragment_size: usize,
    data: Option<Vec<u8>>,
    generation: u64,
    sink: Option<EventSink>,
}

impl FileAudioRecorder {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            data: None,
            generation: 0,
            sink: None,
        }
    }

    pub fn with_fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size.max(1);
        self
    }

    pub fn is_acquired(&self) -> bool {
        self.data.is_some()
    }
}

impl AudioRecorder for FileAudioRecorder {
    fn acquire(&mut self) -> Result<(), AcquisitionError> {
        let data = fs::read(&self.path).map_err(|e| {
            AcquisitionError(format!("cannot open {}: {e}", self.path.display()))
        })?;
        self.data = Some(data);
        Ok(())
    }

    fn start(&mut self, generation: u64, sink: EventSink) -> Result<(), AcquisitionError> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| AcquisitionError("audio input not acquired".to_string()))?;
        for chunk in data.chunks(self.fragment_size) {
            let _ = sink.send(SessionEvent::AudioFragment {
                generation,
                bytes: chunk.to_vec(),
            });
        }
        self.generation = generation;
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            let _ = sink.send(SessionEvent::RecorderStopped {
                generation: self.generation,
            });
        }
    }

    fn release(&mut self) {
        self.data = None;
        self.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_missing_file_fails() {
        let mut recorder = FileAudioRecorder::new(Path::new("/nonexistent/recording.wav"));
        let err = recorder.acquire().unwrap_err();
        assert!(err.to_string().contains("cannot open"));
        assert!(!recorder.is_acquired());
    }

    #[test]
    fn test_start_without_acquire_fails() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut recorder = FileAudioRecorder::new(Path::new("unused.wav"));
        assert!(recorder.start(1, tx).is_err());
    }

    #[test]
    fn test_streams_fragments_then_stops_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.wav");
        fs::write(&path, [1u8, 2, 3, 4, 5]).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut recorder = FileAudioRecorder::new(&path).with_fragment_size(2);
        recorder.acquire().unwrap();
        recorder.start(4, tx).unwrap();
        recorder.stop();
        recorder.stop();
        recorder.release();

        let events: Vec<SessionEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::AudioFragment {
                    generation: 4,
                    bytes: vec![1, 2],
                },
                SessionEvent::AudioFragment {
                    generation: 4,
                    bytes: vec![3, 4],
                },
                SessionEvent::AudioFragment {
                    generation: 4,
                    bytes: vec![5],
                },
                SessionEvent::RecorderStopped { generation: 4 },
            ]
        );
        assert!(!recorder.is_acquired());
    }
}
