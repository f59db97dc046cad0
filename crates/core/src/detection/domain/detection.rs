use serde::Deserialize;

use crate::shared::constants::AUDIO_CLIP_DIR;

/// Axis-aligned box in source-image pixels, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Rescales from the image's natural width to its displayed width.
    ///
    /// Both axes use the horizontal ratio. Returns `None` when the natural
    /// width is unknown (zero).
    pub fn scaled(&self, natural_width: u32, display_width: f64) -> Option<Self> {
        if natural_width == 0 {
            return None;
        }
        let ratio = display_width / natural_width as f64;
        Some(Self {
            x1: self.x1 * ratio,
            y1: self.y1 * ratio,
            x2: self.x2 * ratio,
            y2: self.y2 * ratio,
        })
    }
}

/// One labelled object returned by the detection service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub label: String,
    #[serde(default)]
    pub translation: String,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// One entry per label for the practice list.
///
/// Each label keeps the position of its first occurrence but carries the
/// last detection seen for it.
pub fn unique_by_label(detections: &[Detection]) -> Vec<Detection> {
    let mut unique: Vec<Detection> = Vec::new();
    for det in detections {
        match unique.iter_mut().find(|d| d.label == det.label) {
            Some(existing) => *existing = det.clone(),
            None => unique.push(det.clone()),
        }
    }
    unique
}

/// Path of the reference recording for a label,
/// e.g. `Hair Comb` -> `/static/audio/hair_comb.mp3`.
pub fn audio_clip_path(label: &str) -> String {
    let mut name = String::with_capacity(label.len());
    let mut in_space = false;
    for c in label.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    format!("{AUDIO_CLIP_DIR}/{name}.mp3")
}
