use image::GrayImage;
use std::fmt;
use thiserror::Error;

/// Failure of a single OCR backend call. Never leaves the extraction layer.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// Position of a backend in the extraction order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Cloud engine, tried first
    Primary,
    /// Local engine, tried only while no text has been found
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The processed page handed to every backend: the encoded PNG for engines
/// that take a file, and the bitonal pixels for engines that take a raster.
#[derive(Debug, Clone, Copy)]
pub struct OcrInput<'a> {
    pub png: &'a [u8],
    pub image: &'a GrayImage,
}

/// Trait that all OCR backends must implement
pub trait OcrBackend: Send + Sync {
    /// Returns the backend identifier (e.g., "vision", "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the backend
    fn description(&self) -> &'static str;

    /// Where this backend sits in the extraction order
    fn tier(&self) -> Tier;

    /// Extract the text of the page. An empty string means "nothing found".
    fn detect_text(&self, input: &OcrInput<'_>) -> Result<String, BackendError>;
}
