use crate::error::ScanError;
use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Neighbourhood size for the local threshold
pub const BLOCK_SIZE: u32 = 11;
/// Amount subtracted from the local mean
pub const OFFSET: i16 = 2;

/// Adaptive binarization with a Gaussian-weighted local mean
/// Copes with uneven illumination across a photographed page
pub fn apply(image: GrayImage) -> Result<GrayImage, ScanError> {
    Ok(adaptive_threshold(&image, BLOCK_SIZE, OFFSET))
}

/// Per-pixel threshold: white where `pixel > weighted_mean - offset`,
/// black otherwise. The weights are a Gaussian whose sigma is derived from
/// the block size the same way a fixed-size Gaussian kernel would be.
pub fn adaptive_threshold(img: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let mean = gaussian_blur_f32(img, block_sigma(block_size));

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y).0[0] as i16;
        let local = mean.get_pixel(x, y).0[0] as i16;
        if pixel > local - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Gaussian sigma for an odd block size
fn block_sigma(block_size: u32) -> f32 {
    let block_size = block_size.max(3) as f32;
    0.3 * ((block_size - 1.0) * 0.5 - 1.0) + 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sigma_for_default_block() {
        assert!((block_sigma(BLOCK_SIZE) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(img).unwrap();

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_handles_text_pattern() {
        // Dark text on light background
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }

        let result = apply(img).unwrap();

        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 3).0[0], 255);
    }

    #[test]
    fn test_uniform_regions_turn_white_regardless_of_brightness() {
        let dark = apply(GrayImage::from_pixel(20, 20, Luma([30]))).unwrap();
        let light = apply(GrayImage::from_pixel(20, 20, Luma([220]))).unwrap();

        assert!(dark.pixels().all(|p| p.0[0] == 255));
        assert!(light.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_threshold_compensates_uneven_lighting() {
        // Left-to-right illumination ramp with a dark stroke across it
        let mut img = GrayImage::from_fn(120, 30, |x, _| Luma([60 + x as u8]));
        for x in 0..120 {
            img.put_pixel(x, 15, Luma([(60 + x as u8) / 3]));
        }

        let result = apply(img).unwrap();

        // The stroke is found at both ends of the ramp, the paper is kept
        assert_eq!(result.get_pixel(5, 15).0[0], 0);
        assert_eq!(result.get_pixel(115, 15).0[0], 0);
        assert_eq!(result.get_pixel(5, 4).0[0], 255);
        assert_eq!(result.get_pixel(115, 4).0[0], 255);
    }
}
