use super::detection::Detection;
use crate::shared::backend_error::BackendError;

/// Remote object detection over an encoded image.
pub trait ObjectDetector: Send {
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, BackendError>;
}
