use crate::config::Config;
use crate::engine::{OcrBackend, OcrInput};
use crate::engines::{self, BackendInfo};
use crate::error::ScanError;
use crate::extraction::TextExtractor;
use crate::preprocessing::{Pipeline, PreprocessingStats};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

/// Normalized page plus the text read from it. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProcessedArtifact {
    png: Vec<u8>,
    text: String,
    engine: Option<&'static str>,
    warnings: Vec<String>,
    rectified: bool,
    width: u32,
    height: u32,
    preprocessing: PreprocessingStats,
}

impl ProcessedArtifact {
    /// Encoded bitonal page (PNG)
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn png_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// Extracted text; empty when no backend found any
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Backend that produced the text
    pub fn engine(&self) -> Option<&'static str> {
        self.engine
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether a document boundary was found and corrected
    pub fn rectified(&self) -> bool {
        self.rectified
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn preprocessing(&self) -> &PreprocessingStats {
        &self.preprocessing
    }
}

/// Runs the normalization pipeline and the text extractor for one upload
pub struct DocumentProcessor {
    pipeline: Pipeline,
    extractor: TextExtractor,
}

impl DocumentProcessor {
    /// Build with the backends available under `config`
    pub fn new(config: &Config) -> Self {
        Self::with_backends(engines::build_backends(config))
    }

    pub fn with_backends(backends: Vec<Arc<dyn OcrBackend>>) -> Self {
        Self {
            pipeline: Pipeline::default(),
            extractor: TextExtractor::new(backends),
        }
    }

    /// Normalize `bytes` and extract text. Only decode and encode failures
    /// are errors; OCR failures end up as warnings on the artifact.
    pub fn process(&self, bytes: &[u8]) -> Result<ProcessedArtifact, ScanError> {
        let processed = self.pipeline.process(bytes)?;

        let input = OcrInput {
            png: &processed.png,
            image: &processed.image,
        };
        let ocr = self.extractor.extract(&input);

        let (width, height) = processed.image.dimensions();
        Ok(ProcessedArtifact {
            png: processed.png,
            text: ocr.text,
            engine: ocr.engine,
            warnings: ocr.warnings,
            rectified: processed.boundary.is_some(),
            width,
            height,
            preprocessing: processed.stats,
        })
    }

    pub fn backends_info(&self) -> Vec<BackendInfo> {
        self.extractor
            .backends()
            .iter()
            .map(|backend| BackendInfo::of(backend.as_ref()))
            .collect()
    }
}
