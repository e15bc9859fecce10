use crate::error::ScanError;
use crate::preprocessing::geometry::{self, Quadrilateral};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, Contour};
use imageproc::geometric_transformations::{warp_into, Interpolation};
use imageproc::point::Point;
use tracing::{debug, info};

/// Tuning for boundary detection
#[derive(Debug, Clone, Copy)]
pub struct RectifyOptions {
    /// How many of the largest contours are examined
    pub max_candidates: usize,
    /// Simplification tolerance as a fraction of the contour perimeter
    pub approx_tolerance: f32,
    /// Smallest accepted boundary, as a fraction of the frame area
    pub min_area_ratio: f32,
}

impl Default for RectifyOptions {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            approx_tolerance: 0.02,
            min_area_ratio: 0.1,
        }
    }
}

/// Output of the rectify step
#[derive(Debug, Clone)]
pub struct Rectified {
    pub image: GrayImage,
    /// The boundary that was warped, or `None` when the image passed through
    pub boundary: Option<Quadrilateral>,
}

/// Locate the document in `binary` and warp the matching region of `gray`
/// onto an axis-aligned rectangle. When no usable boundary exists the
/// grayscale image is returned unchanged.
pub fn apply(
    gray: GrayImage,
    binary: &GrayImage,
    options: &RectifyOptions,
) -> Result<Rectified, ScanError> {
    let Some(quad) = find_document(binary, options) else {
        info!("No document boundary found, keeping full frame");
        return Ok(Rectified {
            image: gray,
            boundary: None,
        });
    };

    match warp(&gray, &quad) {
        Some(image) => {
            info!(
                width = image.width(),
                height = image.height(),
                "Perspective correction applied"
            );
            Ok(Rectified {
                image,
                boundary: Some(quad),
            })
        }
        None => {
            info!("Boundary could not be warped, keeping full frame");
            Ok(Rectified {
                image: gray,
                boundary: None,
            })
        }
    }
}

/// Largest four-cornered contour of the thresholded image.
///
/// Contours touching the image border are skipped: after adaptive
/// thresholding a flat background is foreground too, so the frame itself
/// would otherwise always rank first.
pub fn find_document(binary: &GrayImage, options: &RectifyOptions) -> Option<Quadrilateral> {
    let (width, height) = binary.dimensions();
    if width < 3 || height < 3 {
        return None;
    }

    let mut candidates: Vec<(f32, Vec<Point<f32>>)> = find_contours::<u32>(binary)
        .into_iter()
        .filter(|contour| contour.points.len() >= 4 && !touches_frame(contour, width, height))
        .map(|contour| {
            let points: Vec<Point<f32>> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect();
            (geometry::polygon_area(&points), points)
        })
        .collect();

    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    debug!(count = candidates.len(), "Boundary candidates");

    let min_area = width as f32 * height as f32 * options.min_area_ratio;

    for (area, points) in candidates.iter().take(options.max_candidates) {
        let epsilon = options.approx_tolerance * geometry::perimeter(points);
        let simplified = geometry::simplify_closed(points, epsilon);
        debug!(area, vertices = simplified.len(), "Simplified contour");

        let Ok(corners) = <[Point<f32>; 4]>::try_from(simplified) else {
            continue;
        };

        if let Some(quad) = Quadrilateral::from_points(corners, min_area) {
            debug!(?quad, "Document boundary");
            return Some(quad);
        }
    }

    None
}

fn touches_frame(contour: &Contour<u32>, width: u32, height: u32) -> bool {
    contour
        .points
        .iter()
        .any(|p| p.x == 0 || p.y == 0 || p.x + 1 >= width || p.y + 1 >= height)
}

/// Resample the region inside `quad` into a `target_size` rectangle.
/// Pixels that map outside the source are black.
fn warp(gray: &GrayImage, quad: &Quadrilateral) -> Option<GrayImage> {
    let (width, height) = quad.target_size();
    let projection = geometry::to_rectangle(quad, width, height)?;

    let mut output = GrayImage::new(width, height);
    warp_into(
        gray,
        &projection,
        Interpolation::Bilinear,
        Luma([0]),
        &mut output,
    );
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::steps::{denoise, threshold};

    /// 300x400 photo: grey desk, white 160x240 page with a 4px black rim,
    /// rotated 10 degrees about the centre
    fn photographed_page() -> GrayImage {
        let (sin, cos) = 10f32.to_radians().sin_cos();
        GrayImage::from_fn(300, 400, |x, y| {
            let dx = x as f32 - 150.0;
            let dy = y as f32 - 200.0;
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;

            if u.abs() <= 80.0 && v.abs() <= 120.0 {
                Luma([235])
            } else if u.abs() <= 84.0 && v.abs() <= 124.0 {
                Luma([0])
            } else {
                Luma([170])
            }
        })
    }

    fn binarize(gray: &GrayImage) -> GrayImage {
        threshold::apply(denoise::apply(gray).unwrap()).unwrap()
    }

    #[test]
    fn test_rotated_page_is_straightened() {
        let gray = photographed_page();
        let binary = binarize(&gray);

        let result = apply(gray, &binary, &RectifyOptions::default()).unwrap();

        assert!(result.boundary.is_some());
        let (w, h) = result.image.dimensions();
        assert!((150..=175).contains(&w), "width {}", w);
        assert!((230..=255).contains(&h), "height {}", h);

        let ratio = w as f32 / h as f32;
        let expected = 160.0 / 240.0;
        assert!(
            (ratio - expected).abs() / expected < 0.05,
            "aspect ratio {} vs {}",
            ratio,
            expected
        );

        // The page centre lands in the middle of the output
        assert!(result.image.get_pixel(w / 2, h / 2).0[0] > 200);
    }

    #[test]
    fn test_uniform_image_passes_through() {
        let gray = GrayImage::from_pixel(120, 90, Luma([128]));
        let binary = binarize(&gray);

        let result = apply(gray.clone(), &binary, &RectifyOptions::default()).unwrap();

        assert!(result.boundary.is_none());
        assert_eq!(result.image, gray);
    }

    #[test]
    fn test_round_shape_is_not_a_document() {
        let gray = GrayImage::from_fn(300, 300, |x, y| {
            let dx = x as f32 - 150.0;
            let dy = y as f32 - 150.0;
            if dx.hypot(dy) <= 100.0 {
                Luma([230])
            } else {
                Luma([30])
            }
        });
        let binary = binarize(&gray);

        let result = apply(gray.clone(), &binary, &RectifyOptions::default()).unwrap();

        assert!(result.boundary.is_none());
        assert_eq!(result.image, gray);
    }

    #[test]
    fn test_small_quad_is_rejected() {
        // 40x40 square covers ~4% of the frame
        let gray = GrayImage::from_fn(200, 200, |x, y| {
            if (80..120).contains(&x) && (80..120).contains(&y) {
                Luma([0])
            } else {
                Luma([200])
            }
        });
        let binary = binarize(&gray);

        assert!(find_document(&binary, &RectifyOptions::default()).is_none());

        let relaxed = RectifyOptions {
            min_area_ratio: 0.01,
            ..Default::default()
        };
        assert!(find_document(&binary, &relaxed).is_some());
    }

    #[test]
    fn test_frame_contour_is_ignored() {
        let binary = GrayImage::from_pixel(50, 50, Luma([255]));
        assert!(find_document(&binary, &RectifyOptions::default()).is_none());
    }
}
