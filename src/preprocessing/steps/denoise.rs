use crate::error::ScanError;
use image::GrayImage;
use imageproc::filter::bilateral_filter;

/// Square neighbourhood, 9 pixels wide
const WINDOW_SIZE: u32 = 9;
const SIGMA_COLOR: f32 = 75.0;
const SIGMA_SPACE: f32 = 75.0;

/// Edge-preserving smoothing ahead of boundary detection.
/// Flattens paper texture and sensor noise while keeping the page edge sharp.
pub fn apply(image: &GrayImage) -> Result<GrayImage, ScanError> {
    // bilateral_filter panics on an empty buffer
    if image.width() == 0 || image.height() == 0 {
        return Ok(image.clone());
    }

    Ok(bilateral_filter(image, WINDOW_SIZE, SIGMA_COLOR, SIGMA_SPACE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_denoise_reduces_speckle_noise() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([128]));
        img.put_pixel(5, 5, Luma([100]));
        img.put_pixel(6, 5, Luma([156]));

        let result = apply(&img).unwrap();

        let original_variance = calculate_variance(&img);
        let result_variance = calculate_variance(&result);
        assert!(result_variance < original_variance);
    }

    #[test]
    fn test_denoise_keeps_uniform_image() {
        let img = GrayImage::from_pixel(12, 8, Luma([90]));
        assert_eq!(apply(&img).unwrap(), img);
    }

    #[test]
    fn test_denoise_preserves_hard_edges() {
        // Black page border against white paper must stay sharp
        let img = GrayImage::from_fn(40, 20, |x, _| {
            if x < 20 {
                Luma([0])
            } else {
                Luma([255])
            }
        });

        let result = apply(&img).unwrap();

        let dark = result.get_pixel(19, 10).0[0];
        let light = result.get_pixel(20, 10).0[0];
        assert!(dark < 10, "dark side drifted: {}", dark);
        assert!(light > 245, "light side drifted: {}", light);
    }

    #[test]
    fn test_denoise_passes_empty_image_through() {
        let img = GrayImage::new(0, 0);
        assert_eq!(apply(&img).unwrap().dimensions(), (0, 0));
    }

    #[test]
    fn test_denoise_keeps_black_image() {
        let img = GrayImage::new(6, 6);
        assert_eq!(apply(&img).unwrap(), img);
    }

    fn calculate_variance(img: &GrayImage) -> f64 {
        let pixels: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
    }
}
