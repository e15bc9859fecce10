use crate::error::ScanError;
use image::{GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decode an uploaded image (PNG, JPEG, GIF, BMP, WebP, TIFF, ...) into an
/// RGB pixel grid. Alpha, if any, is dropped.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::Decode("empty upload".to_string()));
    }

    let image = image::load_from_memory(bytes).map_err(|e| ScanError::Decode(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::Decode(format!(
            "image has zero size ({}x{})",
            image.width(),
            image.height()
        )));
    }

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Decoded upload"
    );

    Ok(image.into_rgb8())
}

/// Serialize a bitonal page as an 8-bit grayscale PNG
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, ScanError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ScanError::Encode(e.to_string()))?;

    if buffer.is_empty() {
        return Err(ScanError::Encode("PNG writer produced no output".to_string()));
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, Rgba, RgbaImage};

    fn encode_rgba(img: &RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(b"definitely not an image");
        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_empty_buffer() {
        assert!(matches!(decode(&[]), Err(ScanError::Decode(_))));
    }

    #[test]
    fn test_decode_returns_three_channels() {
        let img = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 128]));
        let decoded = decode(&encode_rgba(&img)).unwrap();

        assert_eq!(decoded.dimensions(), (7, 5));
        assert_eq!(decoded.as_raw().len(), 7 * 5 * 3);
        assert_eq!(*decoded.get_pixel(3, 2), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_encode_png_is_decodable() {
        let img = GrayImage::from_fn(16, 9, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
        let png = encode_png(&img).unwrap();

        assert_eq!(&png[..4], b"\x89PNG");
        let back = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_luma8();
        assert_eq!(back, img);
    }
}
