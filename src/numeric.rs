//! Pure, total numeric kernels shared by the analysis stages.
//!
//! Every function here is deterministic for a fixed input and never panics on
//! out-of-range data — indices are saturated rather than rejected.

use image::RgbaImage;

/// `Y = round(0.2126*R + 0.7152*G + 0.0722*B)`, clamped to `[0, 255]`.
pub fn to_grayscale(rgba: &RgbaImage) -> Vec<u8> {
    rgba.pixels()
        .map(|p| {
            let [r, g, b, _a] = p.0;
            let y = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Returns the alpha channel, or all-255 if the raster carries no alpha.
pub fn extract_alpha(rgba: &RgbaImage) -> Vec<u8> {
    rgba.pixels().map(|p| p.0[3]).collect()
}

/// 3x3 convolution with kernel `{1,2,1;2,4,2;1,2,1}/16`, replicate-edge boundary.
pub fn gaussian_blur_3x3(gray: &[u8], width: u32, height: u32) -> Vec<u8> {
    const KERNEL: [[i32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
    convolve_replicate(gray, width, height, &KERNEL, 16)
}

/// Sobel gradients with replicate-edge boundary. Values are signed.
pub fn sobel(gray: &[u8], width: u32, height: u32) -> (Vec<i32>, Vec<i32>) {
    const KX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
    const KY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];
    let gx = convolve_replicate_signed(gray, width, height, &KX);
    let gy = convolve_replicate_signed(gray, width, height, &KY);
    (gx, gy)
}

fn sample_replicate(gray: &[u8], width: u32, height: u32, x: i64, y: i64) -> i32 {
    let w = width as i64;
    let h = height as i64;
    let cx = x.clamp(0, w - 1);
    let cy = y.clamp(0, h - 1);
    gray[(cy * w + cx) as usize] as i32
}

fn convolve_replicate(
    gray: &[u8],
    width: u32,
    height: u32,
    kernel: &[[i32; 3]; 3],
    divisor: i32,
) -> Vec<u8> {
    let w = width as i64;
    let h = height as i64;
    let mut out = vec![0u8; gray.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0i32;
            for (ky, row) in kernel.iter().enumerate() {
                for (kx, &coef) in row.iter().enumerate() {
                    let sx = x + kx as i64 - 1;
                    let sy = y + ky as i64 - 1;
                    acc += coef * sample_replicate(gray, width, height, sx, sy);
                }
            }
            out[(y * w + x) as usize] = (acc / divisor).clamp(0, 255) as u8;
        }
    }
    out
}

fn convolve_replicate_signed(
    gray: &[u8],
    width: u32,
    height: u32,
    kernel: &[[i32; 3]; 3],
) -> Vec<i32> {
    let w = width as i64;
    let h = height as i64;
    let mut out = vec![0i32; gray.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0i32;
            for (ky, row) in kernel.iter().enumerate() {
                for (kx, &coef) in row.iter().enumerate() {
                    let sx = x + kx as i64 - 1;
                    let sy = y + ky as i64 - 1;
                    acc += coef * sample_replicate(gray, width, height, sx, sy);
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

/// `a = atan2(gy, gx); if a < 0 then a += pi; bin = clamp(floor(a*N/pi), 0, N-1)`.
pub fn bins_from_gradients(gx: &[i32], gy: &[i32], n: u8) -> Vec<u8> {
    let n = n.max(1);
    gx.iter()
        .zip(gy.iter())
        .map(|(&x, &y)| {
            let mut a = (y as f32).atan2(x as f32);
            if a < 0.0 {
                a += std::f32::consts::PI;
            }
            let bin = (a * n as f32 / std::f32::consts::PI).floor();
            bin.clamp(0.0, (n - 1) as f32) as u8
        })
        .collect()
}

/// 255 iff `hypot(gx, gy) >= tau`, else 0.
pub fn magnitude_threshold(gx: &[i32], gy: &[i32], tau: f32) -> Vec<u8> {
    gx.iter()
        .zip(gy.iter())
        .map(|(&x, &y)| {
            let mag = ((x * x + y * y) as f32).sqrt();
            if mag >= tau {
                255
            } else {
                0
            }
        })
        .collect()
}

/// Mean gradient magnitude over the whole buffer.
pub fn mean_magnitude(gx: &[i32], gy: &[i32]) -> f32 {
    if gx.is_empty() {
        return 0.0;
    }
    let sum: f64 = gx
        .iter()
        .zip(gy.iter())
        .map(|(&x, &y)| ((x * x + y * y) as f64).sqrt())
        .sum();
    (sum / gx.len() as f64) as f32
}

const ORTHOGONAL_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = 1.4;
const INF: f32 = f32::INFINITY;

/// Two-pass Chamfer distance transform. Input pixels `!= 0` start at distance 0;
/// others start at `+inf`. Forward pass scans top-left -> bottom-right considering
/// `(-1,0),(0,-1),(-1,-1),(1,-1)`; backward pass mirrors the neighborhood.
pub fn distance_transform(binary: &[u8], width: u32, height: u32) -> Vec<f32> {
    let w = width as i64;
    let h = height as i64;
    let mut dist = vec![INF; binary.len()];
    for (i, &v) in binary.iter().enumerate() {
        if v != 0 {
            dist[i] = 0.0;
        }
    }

    let idx = |x: i64, y: i64| -> usize { (y * w + x) as usize };
    let relax = |dist: &mut [f32], x: i64, y: i64, nx: i64, ny: i64, cost: f32| {
        if nx < 0 || ny < 0 || nx >= w || ny >= h {
            return;
        }
        let candidate = dist[idx(nx, ny)] + cost;
        let here = idx(x, y);
        if candidate < dist[here] {
            dist[here] = candidate;
        }
    };

    for y in 0..h {
        for x in 0..w {
            relax(&mut dist, x, y, x - 1, y, ORTHOGONAL_COST);
            relax(&mut dist, x, y, x, y - 1, ORTHOGONAL_COST);
            relax(&mut dist, x, y, x - 1, y - 1, DIAGONAL_COST);
            relax(&mut dist, x, y, x + 1, y - 1, DIAGONAL_COST);
        }
    }
    for y in (0..h).rev() {
        for x in (0..w).rev() {
            relax(&mut dist, x, y, x + 1, y, ORTHOGONAL_COST);
            relax(&mut dist, x, y, x, y + 1, ORTHOGONAL_COST);
            relax(&mut dist, x, y, x + 1, y + 1, DIAGONAL_COST);
            relax(&mut dist, x, y, x - 1, y + 1, DIAGONAL_COST);
        }
    }
    dist
}

/// Nearest-neighbor resampling of a single-channel buffer from `(sw, sh)` to `(dw, dh)`.
pub fn nearest_resize(src: &[u8], sw: u32, sh: u32, dw: u32, dh: u32) -> Vec<u8> {
    let mut out = vec![0u8; (dw as usize) * (dh as usize)];
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return out;
    }
    for y in 0..dh {
        let sy = (y as u64 * sh as u64 / dh as u64).min(sh as u64 - 1) as u32;
        for x in 0..dw {
            let sx = (x as u64 * sw as u64 / dw as u64).min(sw as u64 - 1) as u32;
            out[(y * dw + x) as usize] = src[(sy * sw + sx) as usize];
        }
    }
    out
}

/// Linear-congruential PRNG: `s = (s*1664525 + 1013904223) mod 2^32`.
/// Returns a closure yielding a uniform real in `[0, 1)` from the high bits on each call.
///
/// Not yet called from any stage: it backs `grain.randomness`, which is accepted
/// and clamped on `RequestOptions` but reserved — it doesn't affect pixels in this
/// version of the pipeline (see the options-schema note on `grain_randomness`).
/// Kept (and exercised by its own tests) because grain synthesis is the one
/// remaining consumer once that option stops being a no-op.
#[allow(dead_code)]
pub fn seeded_prng(seed: u32) -> impl FnMut() -> f64 {
    let mut state = seed;
    move || {
        state = state
            .wrapping_mul(1664525)
            .wrapping_add(1013904223);
        (state >> 8) as f64 / (1u64 << 24) as f64
    }
}
