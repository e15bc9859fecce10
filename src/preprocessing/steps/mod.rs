//! Individual preprocessing steps, in pipeline order:
//! grayscale, denoise, threshold, rectify, contrast

pub mod contrast;
pub mod denoise;
pub mod grayscale;
pub mod rectify;
pub mod threshold;
