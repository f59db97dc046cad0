use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::backend_error::BackendError;
use super::constants::{
    CHECK_PRONUNCIATION_PATH, DETECT_PATH, IMAGE_FILE_NAME, RECOGNIZE_SPEECH_PATH,
    RECORDING_FILE_NAME,
};
use crate::detection::domain::detection::{Detection, DetectionResponse};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::recognition::domain::pronunciation_backend::PronunciationBackend;

#[derive(Serialize)]
struct CheckRequest<'a> {
    spoken: &'a str,
    expected: &'a str,
}

#[derive(Deserialize)]
struct CheckResponse {
    accuracy: f64,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Blocking HTTP client for the detection and pronunciation server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Request {
                url: base_url.clone(),
                source: e,
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn file_part(
        &self,
        url: &str,
        bytes: &[u8],
        file_name: &'static str,
        mime: &str,
    ) -> Result<Part, BackendError> {
        Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| BackendError::Request {
                url: url.to_string(),
                source: e,
            })
    }

    fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().map_err(|e| BackendError::Request {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().map_err(|e| BackendError::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}

impl PronunciationBackend for HttpBackend {
    fn check_pronunciation(&self, spoken: &str, expected: &str) -> Result<f64, BackendError> {
        let url = self.endpoint(CHECK_PRONUNCIATION_PATH);
        let request = self
            .client
            .post(&url)
            .json(&CheckRequest { spoken, expected });
        let response: CheckResponse = self.send(&url, request)?;
        Ok(response.accuracy)
    }

    fn recognize_speech(&self, audio: &[u8]) -> Result<String, BackendError> {
        let url = self.endpoint(RECOGNIZE_SPEECH_PATH);
        let part = self.file_part(&url, audio, RECORDING_FILE_NAME, "audio/wav")?;
        let request = self.client.post(&url).multipart(Form::new().part("audio", part));
        let response: RecognizeResponse = self.send(&url, request)?;
        Ok(response.text.unwrap_or_default())
    }
}

impl ObjectDetector for HttpBackend {
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, BackendError> {
        let url = self.endpoint(DETECT_PATH);
        let part = self.file_part(&url, image, IMAGE_FILE_NAME, "image/jpeg")?;
        let request = self.client.post(&url).multipart(Form::new().part("image", part));
        let response: DetectionResponse = self.send(&url, request)?;
        Ok(response.detections)
    }
}
