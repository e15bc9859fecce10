//! Document photo normalization
//!
//! Turns a photographed page into a flat, high-contrast bitonal image that
//! OCR engines read reliably.

pub mod codec;
pub mod geometry;
pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, Preprocessed, PreprocessingStats, StepTiming};
