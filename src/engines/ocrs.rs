//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use super::cache;
use crate::engine::{BackendError, OcrBackend, OcrInput, Tier};
use crate::error::ScanError;
use image::{DynamicImage, GrayImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Local fallback engine wrapping the ocrs library
pub struct OcrsBackend {
    engine: OcrsOcrEngine,
}

impl OcrsBackend {
    /// Create a new engine, downloading models if needed
    pub fn new() -> Result<Self, ScanError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let dir = cache::cache_dir(None)?;
        let detection_model_path =
            cache::ensure_downloaded(DETECTION_MODEL_URL, &dir, "text-detection.rten")?;
        let recognition_model_path =
            cache::ensure_downloaded(RECOGNITION_MODEL_URL, &dir, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ScanError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ScanError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ScanError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, BackendError> {
        // ocrs expects 3-channel HWC bytes
        let rgb_img = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            BackendError::Recognition(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| BackendError::Recognition(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| BackendError::Recognition(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| BackendError::Recognition(format!("Failed to recognize text: {}", e)))?;

        let text = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!(
            lines = line_rects.len(),
            chars = text.len(),
            "ocrs recognition finished"
        );

        Ok(text)
    }
}

impl OcrBackend for OcrsBackend {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies"
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
