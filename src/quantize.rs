//! Quantizer (§4.3): reduces the image to <= K colors via a fast frequency-bucket
//! scan, then remaps the full-resolution image by nearest color.

use std::collections::HashMap;

use image::{imageops::FilterType, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::ThreadcraftError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub type Palette = Vec<PaletteEntry>;

pub struct QuantizeResult {
    pub image: RgbaImage,
    pub palette: Palette,
    /// Number of distinct rounded colors seen in the sampled analysis buffer,
    /// before truncating to `k` entries. Used by the warning analyzer (§4.8) to
    /// detect when the requested `maxColors` forced a real reduction — the
    /// published `Palette` itself can never exceed `k`, so that comparison has
    /// to happen against the pre-truncation count.
    pub distinct_colors_before_reduction: usize,
}

const DOWNSCALE_MAX_DIM: u32 = 400;
const SAMPLE_STRIDE: u32 = 4;
const ROUND_STEP: i32 = 16;

/// `2 <= k <= 12`. Returns the quantized image and its palette (`1..=k` entries).
pub fn quantize(image: &RgbaImage, k: u8) -> Result<QuantizeResult, ThreadcraftError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(ThreadcraftError::InvalidInput("empty image".to_string()));
    }
    let k = k.clamp(2, 12) as usize;

    let small = downscale_for_sampling(image);
    let (palette, distinct_colors_before_reduction) = build_palette(&small, k);
    let remapped = remap_nearest(image, &palette);

    Ok(QuantizeResult { image: remapped, palette, distinct_colors_before_reduction })
}

fn downscale_for_sampling(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let max_dim = w.max(h);
    if max_dim <= DOWNSCALE_MAX_DIM {
        return image.clone();
    }
    let scale = DOWNSCALE_MAX_DIM as f64 / max_dim as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(image, nw, nh, FilterType::Nearest)
}

fn round_to(v: u8, step: i32) -> u8 {
    let r = ((v as i32 + step / 2) / step) * step;
    r.clamp(0, 255) as u8
}

fn build_palette(small: &RgbaImage, k: usize) -> (Palette, usize) {
    let (w, h) = small.dimensions();
    let mut order: Vec<(u8, u8, u8, u8)> = Vec::new();
    let mut counts: HashMap<(u8, u8, u8, u8), u64> = HashMap::new();

    let mut y = 0u32;
    while y < h {
        let mut x = 0u32;
        while x < w {
            let Rgba([r, g, b, a]) = *small.get_pixel(x, y);
            let key = (round_to(r, ROUND_STEP), round_to(g, ROUND_STEP), round_to(b, ROUND_STEP), a);
            if !counts.contains_key(&key) {
                order.push(key);
            }
            *counts.entry(key).or_insert(0) += 1;
            x += SAMPLE_STRIDE;
        }
        y += SAMPLE_STRIDE;
    }

    if order.is_empty() {
        // degenerate (e.g. a 1x1-after-stride sample): fall back to the first pixel.
        let Rgba([r, g, b, a]) = *small.get_pixel(0, 0);
        return (vec![PaletteEntry { r, g, b, a }], 1);
    }

    let distinct = order.len();

    // stable sort by descending count, ties broken by insertion order (stable_by
    // preserves `order`'s original order on equal keys).
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(k.max(1));

    let palette = order
        .into_iter()
        .map(|(r, g, b, a)| PaletteEntry { r, g, b, a })
        .collect();
    (palette, distinct)
}

fn remap_nearest(image: &RgbaImage, palette: &Palette) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut out = RgbaImage::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *px;
        let nearest = palette
            .iter()
            .min_by_key(|p| {
                let dr = p.r as i32 - r as i32;
                let dg = p.g as i32 - g as i32;
                let db = p.b as i32 - b as i32;
                dr * dr + dg * dg + db * db
            })
            .expect("palette is never empty");
        out.put_pixel(x, y, Rgba([nearest.r, nearest.g, nearest.b, a]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_image_yields_single_entry_palette() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([200, 20, 20, 255]));
        let result = quantize(&img, 4).unwrap();
        assert_eq!(result.palette.len(), 1);
    }

    #[test]
    fn palette_bounded_by_k() {
        let mut img = RgbaImage::new(32, 32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 8) as u8, (y * 8) as u8, 128, 255]);
        }
        let result = quantize(&img, 6).unwrap();
        assert!(result.palette.len() >= 1 && result.palette.len() <= 6);
    }

    #[test]
    fn quantized_pixels_equal_some_palette_rgb_and_preserve_alpha() {
        let mut img = RgbaImage::new(10, 10);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let a = if x < 5 { 0 } else { 255 };
            *px = Rgba([(x * 20) as u8, (y * 20) as u8, 10, a]);
        }
        let result = quantize(&img, 8).unwrap();
        for (x, y, out_px) in result.image.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *out_px;
            assert!(result.palette.iter().any(|p| p.r == r && p.g == g && p.b == b));
            assert_eq!(a, img.get_pixel(x, y).0[3]);
        }
    }

    #[test]
    fn many_distinct_colors_clamped_reports_pre_reduction_count() {
        let mut img = RgbaImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255]);
        }
        let result = quantize(&img, 6).unwrap();
        assert_eq!(result.palette.len(), 6);
        assert!(result.distinct_colors_before_reduction > 6);
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let img = RgbaImage::new(0, 0);
        let err = quantize(&img, 4).unwrap_err();
        assert!(matches!(err, ThreadcraftError::InvalidInput(_)));
    }
}
