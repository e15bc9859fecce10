//! Document photo normalization and two-tier OCR
//!
//! A photographed page goes through grayscale conversion, edge-preserving
//! denoising, adaptive binarization, boundary detection with perspective
//! correction, local contrast equalization and a final binarization. The
//! bitonal result is encoded as PNG and handed to an ordered list of OCR
//! backends: Google Cloud Vision first when configured, then local engines.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extraction;
pub mod preprocessing;
pub mod processor;
pub mod server;

pub use config::Config;
pub use engine::{BackendError, OcrBackend, OcrInput, Tier};
pub use error::ScanError;
pub use extraction::{OcrResult, TextExtractor};
pub use processor::{DocumentProcessor, ProcessedArtifact};
