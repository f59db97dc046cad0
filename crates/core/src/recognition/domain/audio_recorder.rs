use thiserror::Error;

use super::session_event::EventSink;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AcquisitionError(pub String);

/// Domain interface for capturing audio in fallback mode.
///
/// While recording, implementations push `AudioFragment` events into the
/// sink. `stop` must flush any buffered fragment and then send
/// `RecorderStopped` exactly once. Every event carries the generation
/// passed to `start`.
pub trait AudioRecorder: Send {
    /// Opens the audio input stream.
    fn acquire(&mut self) -> Result<(), AcquisitionError>;

    fn start(&mut self, generation: u64, sink: EventSink) -> Result<(), AcquisitionError>;

    fn stop(&mut self);

    /// Releases the input stream. Safe to call when nothing is held.
    fn release(&mut self);
}
