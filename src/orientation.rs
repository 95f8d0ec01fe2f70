//! OrientationEstimator (§4.5): per-pixel orientation bin plus a continuous
//! orientation field, computed at a downscaled analysis resolution and then
//! upscaled to input resolution by nearest-neighbor.

use image::{imageops::FilterType, GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

use crate::numeric;
use crate::options::{Mode, OrientationMethod};

const ORIENTATION_BLUR_SIGMA: f32 = 0.5;

pub struct OrientationResult {
    /// Per-pixel orientation bin at input resolution, values in `[0, bin_count)`.
    pub bins: GrayImage,
    /// Continuous orientation in `[0, pi)` at the downscaled analysis resolution.
    pub field: ImageBuffer<Luma<f32>, Vec<f32>>,
    pub bin_count: u8,
}

fn analysis_size(mode: Mode) -> u32 {
    match mode {
        Mode::Logo => 300,
        Mode::Photo => 400,
    }
}

fn bin_count(method: OrientationMethod, mode: Mode) -> u8 {
    match (method, mode) {
        (OrientationMethod::Binned8, Mode::Logo) => 4,
        (OrientationMethod::Binned8, Mode::Photo) => 6,
        (OrientationMethod::Lic, Mode::Logo) => 8,
        (OrientationMethod::Lic, Mode::Photo) => 12,
    }
}

pub fn estimate(quantized: &RgbaImage, method: OrientationMethod, mode: Mode) -> OrientationResult {
    let (w, h) = quantized.dimensions();
    let n = bin_count(method, mode);
    if w == 0 || h == 0 {
        return OrientationResult {
            bins: GrayImage::new(w, h),
            field: ImageBuffer::new(0, 0),
            bin_count: n,
        };
    }

    let target = analysis_size(mode);
    let max_dim = w.max(h);
    let (aw, ah) = if max_dim > target {
        let scale = target as f64 / max_dim as f64;
        (
            ((w as f64 * scale).round() as u32).max(1),
            ((h as f64 * scale).round() as u32).max(1),
        )
    } else {
        (w, h)
    };

    let small = image::imageops::resize(quantized, aw, ah, FilterType::Nearest);
    let gray = image::DynamicImage::ImageRgba8(small).to_luma8();
    let blurred = gaussian_blur_f32(&gray, ORIENTATION_BLUR_SIGMA);

    let (gx, gy) = numeric::sobel(blurred.as_raw(), aw, ah);
    let bins_small = numeric::bins_from_gradients(&gx, &gy, n);
    let bins_full = numeric::nearest_resize(&bins_small, aw, ah, w, h);
    let bins = GrayImage::from_raw(w, h, bins_full).expect("matching buffer size");

    let field_data: Vec<f32> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&x, &y)| {
            let mut a = (y as f32).atan2(x as f32);
            if a < 0.0 {
                a += std::f32::consts::PI;
            }
            a
        })
        .collect();
    let field = ImageBuffer::from_raw(aw, ah, field_data).expect("matching buffer size");

    OrientationResult { bins, field, bin_count: n }
}
