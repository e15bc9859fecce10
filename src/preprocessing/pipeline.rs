use crate::error::ScanError;
use crate::preprocessing::geometry::Quadrilateral;
use image::GrayImage;
use serde::Serialize;
use std::time::Instant;

use super::codec;
use super::steps;
use super::steps::rectify::RectifyOptions;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Timing stats for one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreprocessingStats {
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings, in execution order
    pub steps: Vec<StepTiming>,
}

/// Result of normalizing one photo
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Final bitonal page
    pub image: GrayImage,
    /// `image` encoded as PNG
    pub png: Vec<u8>,
    /// Detected document boundary, if the page was rectified
    pub boundary: Option<Quadrilateral>,
    pub stats: PreprocessingStats,
}

/// Document normalization pipeline:
/// decode, grayscale, denoise, threshold, rectify, contrast, encode
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    rectify: RectifyOptions,
}

impl Pipeline {
    pub fn new(rectify: RectifyOptions) -> Self {
        Self { rectify }
    }

    /// Run the full pipeline over an encoded upload
    pub fn process(&self, bytes: &[u8]) -> Result<Preprocessed, ScanError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        let rgb = run_step("decode", bytes, &mut timings, codec::decode)?;
        let gray = run_step("grayscale", rgb, &mut timings, steps::grayscale::apply)?;
        let smooth = run_step("denoise", &gray, &mut timings, steps::denoise::apply)?;
        let binary = run_step("threshold", smooth, &mut timings, steps::threshold::apply)?;

        let rectified = run_step("rectify", gray, &mut timings, |gray| {
            steps::rectify::apply(gray, &binary, &self.rectify)
        })?;

        let image = run_step(
            "contrast",
            rectified.image,
            &mut timings,
            steps::contrast::apply,
        )?;
        let png = run_step("encode", &image, &mut timings, codec::encode_png)?;

        let stats = PreprocessingStats {
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        };

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            rectified = rectified.boundary.is_some(),
            total_ms = stats.total_time_ms,
            "Preprocessing complete"
        );

        Ok(Preprocessed {
            image,
            png,
            boundary: rectified.boundary,
            stats,
        })
    }
}

fn run_step<I, O, F>(
    name: &str,
    input: I,
    timings: &mut Vec<StepTiming>,
    step_fn: F,
) -> Result<O, ScanError>
where
    F: FnOnce(I) -> Result<O, ScanError>,
{
    let step_start = Instant::now();
    let result = step_fn(input)?;
    let time_ms = step_start.elapsed().as_millis() as u64;

    tracing::debug!(step = name, time_ms, "Preprocessing step finished");
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(result)
}
