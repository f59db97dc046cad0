use std::fmt;

/// Punctuation that recognizers append and scoring must ignore.
const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';'];

/// Lowercases, trims, and removes `. , ! ? ;` anywhere in the text.
///
/// Missing input normalizes to the empty string.
pub fn normalize(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => t
            .to_lowercase()
            .trim()
            .chars()
            .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
            .collect(),
        _ => String::new(),
    }
}

/// Recognizer output after normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    pub fn from_raw(raw: Option<&str>) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
