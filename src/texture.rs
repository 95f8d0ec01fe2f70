//! TextureSynthesizer (§4.6): thread tile bank (one tile per bin, pre-rotated)
//! and a hatch texture (none / diagonal / cross). Every pixel is computed by a
//! closed-form analytic pattern rather than drawn stroke-by-stroke, so tiles
//! regenerate byte-identically for the same configuration (§8.7).

use image::{Rgba, RgbaImage};

use crate::options::Hatch;

pub const THREAD_BIN_COUNT: u8 = 6;
pub const THREAD_TILE_SIZE: u32 = 64;
pub const HATCH_TILE_SIZE: u32 = 32;

const STRIPE_DARK: u8 = 0x33;
const STRIPE_LIGHT: u8 = 0x88;

#[derive(Debug, Clone)]
pub struct TextureSet {
    pub threads: Vec<RgbaImage>,
    pub hatch: RgbaImage,
}

/// Generates the full `(thread_thickness, hatch, density_scale)`-keyed texture
/// set. Callers should go through [`crate::cache::Caches`] rather than calling
/// this directly on every request.
pub fn synthesize(thread_thickness: u32, hatch: Hatch, density_scale: f32) -> TextureSet {
    let threads = (0..THREAD_BIN_COUNT)
        .map(|i| thread_tile(i, thread_thickness, density_scale))
        .collect();
    let hatch_tex = hatch_tile(hatch, density_scale);
    TextureSet { threads, hatch: hatch_tex }
}

fn thread_tile(bin: u8, thread_thickness: u32, density_scale: f32) -> RgbaImage {
    let s = THREAD_TILE_SIZE;
    let theta = (bin as f32) * (180.0 / THREAD_BIN_COUNT as f32) * std::f32::consts::PI / 180.0;
    let t = thread_thickness.max(1) as f32;
    let spacing = (t * 1.2 / density_scale.max(0.01)).round().max(2.0);

    let cx = s as f32 / 2.0;
    let cy = s as f32 / 2.0;
    let (sin_t, cos_t) = theta.sin_cos();

    let mut out = RgbaImage::new(s, s);
    for y in 0..s {
        for x in 0..s {
            // Map (x, y) into the unrotated stripe frame: rotate by +theta around
            // the tile center (equivalent to drawing into a frame rotated by theta).
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let xr = dx * cos_t + dy * sin_t + cx;

            let pos = xr.rem_euclid(spacing);
            if pos < t {
                let half = t / 2.0;
                let shade = if pos <= half {
                    lerp_u8(STRIPE_DARK, STRIPE_LIGHT, pos / half.max(1e-6))
                } else {
                    lerp_u8(STRIPE_LIGHT, STRIPE_DARK, (pos - half) / half.max(1e-6))
                };
                out.put_pixel(x, y, Rgba([shade, shade, shade, 255]));
            } else {
                out.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }
    out
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

fn hatch_tile(hatch: Hatch, density_scale: f32) -> RgbaImage {
    let s = HATCH_TILE_SIZE;
    let mut out = RgbaImage::new(s, s);
    if matches!(hatch, Hatch::None) {
        return out;
    }

    let spacing = ((4.0 / density_scale.max(0.01)).round() as i64).max(3);
    let alpha_diagonal = (0.4 * 255.0) as u8;
    let alpha_cross = (0.3 * 255.0) as u8;
    let alpha = if matches!(hatch, Hatch::Cross) { alpha_cross } else { alpha_diagonal };

    for y in 0..s as i64 {
        for x in 0..s as i64 {
            let on_plus45 = (x + y).rem_euclid(spacing) == 0;
            let on_minus45 = matches!(hatch, Hatch::Cross) && (x - y).rem_euclid(spacing) == 0;
            if on_plus45 || on_minus45 {
                out.put_pixel(x as u32, y as u32, Rgba([0x33, 0x33, 0x33, alpha]));
            }
        }
    }
    out
}
