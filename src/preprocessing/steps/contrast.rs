use super::threshold;
use crate::error::ScanError;
use image::{GrayImage, Luma};

/// Tiles per axis for local equalization
pub const TILE_GRID: u32 = 8;
/// Histogram clip limit, relative to a flat tile histogram
pub const CLIP_LIMIT: f32 = 2.0;

/// Local contrast equalization followed by the final adaptive threshold.
/// Runs after rectification so the boost never feeds boundary detection.
pub fn apply(image: GrayImage) -> Result<GrayImage, ScanError> {
    let enhanced = clahe(&image, TILE_GRID, CLIP_LIMIT);
    Ok(threshold::adaptive_threshold(
        &enhanced,
        threshold::BLOCK_SIZE,
        threshold::OFFSET,
    ))
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid x grid` set of tiles (fewer when the
/// image is narrower than the grid). Each tile gets an equalization table
/// from its clipped histogram, and every pixel is mapped through a bilinear
/// blend of the tables of the four nearest tile centres.
pub fn clahe(img: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tiles_x = grid.clamp(1, width);
    let tiles_y = grid.clamp(1, height);
    let x_bounds = tile_bounds(width, tiles_x);
    let y_bounds = tile_bounds(height, tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            luts.push(tile_lut(
                img,
                (x_bounds[tx], x_bounds[tx + 1]),
                (y_bounds[ty], y_bounds[ty + 1]),
                clip_limit,
            ));
        }
    }

    let tiles_x = tiles_x as usize;
    let x_weights: Vec<(usize, usize, f32)> = (0..width)
        .map(|x| interpolation_weights(x, width, tiles_x))
        .collect();

    GrayImage::from_fn(width, height, |x, y| {
        let (ty1, ty2, ay) = interpolation_weights(y, height, tiles_y as usize);
        let (tx1, tx2, ax) = x_weights[x as usize];
        let value = img.get_pixel(x, y).0[0] as usize;

        let top = (1.0 - ax) * luts[ty1 * tiles_x + tx1][value] as f32
            + ax * luts[ty1 * tiles_x + tx2][value] as f32;
        let bottom = (1.0 - ax) * luts[ty2 * tiles_x + tx1][value] as f32
            + ax * luts[ty2 * tiles_x + tx2][value] as f32;

        Luma([((1.0 - ay) * top + ay * bottom).round().clamp(0.0, 255.0) as u8])
    })
}

/// Split `len` pixels into `tiles` non-empty ranges; returns `tiles + 1` edges
fn tile_bounds(len: u32, tiles: u32) -> Vec<u32> {
    (0..=tiles)
        .map(|i| (i as u64 * len as u64 / tiles as u64) as u32)
        .collect()
}

/// Neighbouring tile indices and blend factor for one coordinate
fn interpolation_weights(pos: u32, len: u32, tiles: usize) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / len as f32 * tiles as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }

    let lower = f.floor() as usize;
    if lower >= tiles - 1 {
        return (tiles - 1, tiles - 1, 0.0);
    }

    (lower, lower + 1, f - lower as f32)
}

/// Equalization table for one tile with the histogram clipped at
/// `clip_limit * area / 256` and the excess spread back over all bins
fn tile_lut(img: &GrayImage, xs: (u32, u32), ys: (u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in ys.0..ys.1 {
        for x in xs.0..xs.1 {
            hist[img.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (xs.1 - xs.0) * (ys.1 - ys.0);
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

        let mut clipped = 0u32;
        for count in hist.iter_mut() {
            if *count > limit {
                clipped += *count - limit;
                *count = limit;
            }
        }

        let batch = clipped / 256;
        let residual = (clipped % 256) as usize;
        for count in hist.iter_mut() {
            *count += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for count in hist.iter_mut().step_by(step).take(residual) {
                *count += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (entry, count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *entry = (cumulative as f32 * scale).round().min(255.0) as u8;
    }

    lut
}
