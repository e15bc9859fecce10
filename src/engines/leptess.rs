//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine, statically linked through tesseract-static
//! (no system dependencies). Downloads tessdata automatically on first use.

use super::cache;
use crate::engine::{BackendError, OcrBackend, OcrInput, Tier};
use crate::error::ScanError;
use image::GrayImage;
use std::io::Cursor;
use tesseract_static::tesseract::Tesseract;

/// Local fallback engine running Tesseract
pub struct LeptessBackend {
    /// Path to tessdata directory
    tessdata_path: String,
    language: String,
}

impl LeptessBackend {
    pub fn new(language: &str) -> Result<Self, ScanError> {
        let tessdata_path = ensure_tessdata_available(language)?;

        // A throwaway instance proves the traineddata loads
        Tesseract::new(Some(&tessdata_path), Some(language)).map_err(|e| {
            ScanError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language: language.to_string(),
        })
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, BackendError> {
        let (width, height) = image.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| BackendError::Recognition(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Processing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| BackendError::Unavailable(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            BackendError::Recognition(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| BackendError::Recognition(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| BackendError::Recognition(format!("Failed to get text: {}", e)))?;

        Ok(text.trim().to_string())
    }
}

impl OcrBackend for LeptessBackend {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn detect_text(&self, input: &OcrInput<'_>) -> Result<String, BackendError> {
        if input.image.width() == 0 || input.image.height() == 0 {
            return Ok(String::new());
        }
        self.recognize(input.image)
    }
}

/// Ensure tessdata for `language` is cached; returns the tessdata directory
/// (Tesseract expects the directory, not the file)
fn ensure_tessdata_available(language: &str) -> Result<String, ScanError> {
    let dir = cache::cache_dir(Some("tessdata"))?;
    cache::ensure_downloaded(
        &tessdata_url(language),
        &dir,
        &format!("{}.traineddata", language),
    )?;

    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ScanError::InitializationError("Invalid tessdata path".to_string()))
}

/// tessdata_fast keeps downloads small
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
