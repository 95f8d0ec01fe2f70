//! EdgeDetector (§4.4): binary edge map (dashed, for the compositor) plus a
//! continuous edge map (for the warning analyzer) and a rim band around alpha
//! transitions.

use image::{imageops::FilterType, GrayImage, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

use crate::numeric;
use crate::options::Mode;

const DOWNSCALE_MAX_DIM: u32 = 600;
const EDGE_BLUR_SIGMA: f32 = 1.0;

pub struct EdgeResult {
    /// Dashed binary edges at input resolution — feeds the compositor overlay.
    pub edges_dashed: GrayImage,
    /// Continuous (non-dashed) binary edges at input resolution — feeds the warning analyzer.
    pub edge_map: GrayImage,
    /// Binary ring around the alpha silhouette, width proportional to `border_width`.
    pub rim_band: GrayImage,
}

pub fn detect(quantized: &RgbaImage, thread_thickness: u32, border_width: u32, mode: Mode) -> EdgeResult {
    let (w, h) = quantized.dimensions();
    if w == 0 || h == 0 {
        return EdgeResult {
            edges_dashed: GrayImage::new(w, h),
            edge_map: GrayImage::new(w, h),
            rim_band: GrayImage::new(w, h),
        };
    }

    let gray_full: GrayImage = image::DynamicImage::ImageRgba8(quantized.clone()).to_luma8();
    let max_dim = w.max(h);
    let (aw, ah) = if max_dim > DOWNSCALE_MAX_DIM {
        let scale = DOWNSCALE_MAX_DIM as f64 / max_dim as f64;
        (
            ((w as f64 * scale).round() as u32).max(1),
            ((h as f64 * scale).round() as u32).max(1),
        )
    } else {
        (w, h)
    };
    let analysis = if (aw, ah) == (w, h) {
        gray_full.clone()
    } else {
        image::imageops::resize(&gray_full, aw, ah, FilterType::Triangle)
    };

    let blurred = gaussian_blur_f32(&analysis, EDGE_BLUR_SIGMA);
    let (gx, gy) = numeric::sobel(blurred.as_raw(), aw, ah);
    let mu = numeric::mean_magnitude(&gx, &gy);
    let tau = match mode {
        Mode::Logo => (8.0f32).max(0.6 * mu),
        Mode::Photo => (20.0f32).max(1.2 * mu),
    };
    let edges_small = numeric::magnitude_threshold(&gx, &gy, tau);

    let edges_full = numeric::nearest_resize(&edges_small, aw, ah, w, h);
    let edge_map = GrayImage::from_raw(w, h, edges_full.clone()).expect("matching buffer size");

    let mut dashed = vec![0u8; edges_full.len()];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            let keep = (x / thread_thickness.max(1)) % 2 == 0;
            dashed[i] = if keep && edges_full[i] != 0 { 255 } else { 0 };
        }
    }
    let edges_dashed = GrayImage::from_raw(w, h, dashed).expect("matching buffer size");

    let rim_band = compute_rim_band(quantized, border_width);

    EdgeResult { edges_dashed, edge_map, rim_band }
}

/// Rim band via a box-filtered difference: for each pixel, sum the alpha-binary
/// value over a `(2W+1)x(2W+1)` window, `W` = `border_width` (computed with a
/// summed-area table). A pixel is "on the rim" when that sum sits strictly
/// between 10% and 90% of the window area — i.e. the window straddles an alpha
/// transition.
fn compute_rim_band(image: &RgbaImage, border_width: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let t = border_width.max(1);
    let half = t as i64;

    let alpha_bin: Vec<u8> = image.pixels().map(|p| if p.0[3] > 0 { 1 } else { 0 }).collect();

    // Integral image, (h+1) x (w+1), zero-padded top/left.
    let stride = (w as usize) + 1;
    let mut integral = vec![0i64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        for x in 0..w as usize {
            let v = alpha_bin[y * w as usize + x] as i64;
            let idx = (y + 1) * stride + (x + 1);
            integral[idx] = v + integral[y * stride + (x + 1)] + integral[(y + 1) * stride + x]
                - integral[y * stride + x];
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - half).max(0) as usize;
            let y0 = (y - half).max(0) as usize;
            let x1 = ((x + half + 1).min(w as i64)) as usize;
            let y1 = ((y + half + 1).min(h as i64)) as usize;
            let area = ((x1 - x0) * (y1 - y0)) as f64;

            let br = integral[y1 * stride + x1];
            let bl = integral[y1 * stride + x0];
            let tr = integral[y0 * stride + x1];
            let tl = integral[y0 * stride + x0];
            let sum = (br - bl - tr + tl) as f64;

            let on_rim = sum > area * 0.1 && sum < area * 0.9;
            out.put_pixel(x as u32, y as u32, Luma([if on_rim { 255 } else { 0 }]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn zero_image_degenerate_is_all_zero() {
        let img = RgbaImage::new(0, 0);
        let result = detect(&img, 3, 3, Mode::Photo);
        assert_eq!(result.edges_dashed.dimensions(), (0, 0));
    }

    #[test]
    fn uniform_opaque_image_has_no_rim_and_few_edges() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([10, 200, 10, 255]));
        let result = detect(&img, 3, 3, Mode::Photo);
        let rim_set = result.rim_band.pixels().filter(|p| p.0[0] != 0).count();
        assert_eq!(rim_set, 0);
    }

    #[test]
    fn rim_band_present_along_alpha_boundary() {
        let mut img = RgbaImage::from_pixel(60, 60, Rgba([0, 0, 0, 0]));
        for y in 15..45 {
            for x in 15..45 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let result = detect(&img, 3, 3, Mode::Photo);
        let rim_set = result.rim_band.pixels().filter(|p| p.0[0] != 0).count();
        assert!(rim_set > 0, "expected a nonempty rim around the square's border");
    }

    #[test]
    fn dashing_respects_thread_thickness_stride() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        let result = detect(&img, 4, 4, Mode::Logo);
        for (x, _, p) in result.edges_dashed.enumerate_pixels() {
            if p.0[0] != 0 {
                assert_eq!((x / 4) % 2, 0);
            }
        }
    }

    #[test]
    fn rim_band_width_tracks_border_width_not_thread_thickness() {
        let mut img = RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 0]));
        for y in 20..60 {
            for x in 20..60 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let narrow = detect(&img, 1, 1, Mode::Photo);
        let wide = detect(&img, 1, 8, Mode::Photo);
        let narrow_rim = narrow.rim_band.pixels().filter(|p| p.0[0] != 0).count();
        let wide_rim = wide.rim_band.pixels().filter(|p| p.0[0] != 0).count();
        assert!(wide_rim > narrow_rim, "a larger border_width must widen the rim band");
    }
}
