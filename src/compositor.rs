//! Compositor (§4.7): layers the quantized base, hatch, per-bin thread tiles
//! masked by orientation, edge overlay, and dashed rim stitch, in a fixed order.

use image::{GrayImage, Rgba, RgbaImage};

use crate::cache::{Caches, MaskBuffer, MaskKey, TileBuffer, TileKey, TileKind};
use crate::texture::TextureSet;

pub struct CompositorInputs<'a> {
    pub quantized: &'a RgbaImage,
    pub textures: &'a TextureSet,
    pub edges_dashed: &'a GrayImage,
    pub rim_band: &'a GrayImage,
    pub orientation_bins: &'a GrayImage,
    pub border_stitch: bool,
    pub border_width: u32,
    /// Orientation signature used as part of the mask cache key (§4.2); derived
    /// by the caller from the request's orientation configuration.
    pub orientation_signature: &'a str,
}

fn multiply(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32) / 255) as u8
}

fn overlay(a: u8, b: u8) -> u8 {
    if a < 128 {
        ((2 * a as u32 * b as u32) / 255) as u8
    } else {
        (255 - (2 * (255 - a as u32) * (255 - b as u32)) / 255) as u8
    }
}

/// Tiles a small pattern to `(w, h)` by wraparound sampling, or reuses a cached
/// sheet for the same `(kind, angle_bin, w, h)` key.
fn tiled_sheet(caches: &Caches, kind: TileKind, angle_bin: u8, pattern: &RgbaImage, w: u32, h: u32) -> TileBuffer {
    let key = TileKey { kind, angle_bin, width: w, height: h };
    if let Some(cached) = caches.get_tile(&key) {
        return cached;
    }
    let (pw, ph) = pattern.dimensions();
    let mut pixels = vec![0u8; (w as usize) * (h as usize) * 4];
    if pw > 0 && ph > 0 {
        for y in 0..h {
            let sy = y % ph;
            for x in 0..w {
                let sx = x % pw;
                let px = pattern.get_pixel(sx, sy).0;
                let i = ((y * w + x) * 4) as usize;
                pixels[i..i + 4].copy_from_slice(&px);
            }
        }
    }
    let buf = TileBuffer { pixels, width: w, height: h };
    caches.put_tile(key, buf.clone());
    buf
}

fn bin_mask(caches: &Caches, bins: &GrayImage, bin: u8, signature: &str) -> MaskBuffer {
    let (w, h) = bins.dimensions();
    let key = MaskKey { bin, width: w, height: h, signature: signature.to_string() };
    if let Some(cached) = caches.get_mask(&key) {
        return cached;
    }
    let pixels: Vec<u8> = bins.pixels().map(|p| if p.0[0] == bin { 255 } else { 0 }).collect();
    let buf = MaskBuffer { pixels, width: w, height: h };
    caches.put_mask(key, buf.clone());
    buf
}

/// Blends `layer` (RGBA sheet/mask pair) into `base` using `blend`, restricted
/// by `mask` (255 = fully apply, 0 = untouched). `mask` may be smaller logically
/// (e.g. a single-channel buffer) but must match `base`'s dimensions.
fn blend_masked(
    base: &mut RgbaImage,
    layer_rgba: &[u8],
    mask: &[u8],
    blend: impl Fn(u8, u8) -> u8,
) {
    let (w, h) = base.dimensions();
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let m = mask[idx];
            if m == 0 {
                continue;
            }
            let src = &layer_rgba[idx * 4..idx * 4 + 4];
            let src_alpha = src[3] as u32 * m as u32 / 255;
            if src_alpha == 0 {
                continue;
            }
            let dst = base.get_pixel(x, y).0;
            let mut out = [0u8; 4];
            for c in 0..3 {
                let blended = blend(dst[c], src[c]);
                // source-alpha-weighted contribution over the existing destination
                out[c] = (((255 - src_alpha) * dst[c] as u32 + src_alpha * blended as u32) / 255) as u8;
            }
            out[3] = dst[3];
            base.put_pixel(x, y, Rgba(out));
        }
    }
}

fn solid_mask(w: u32, h: u32) -> Vec<u8> {
    vec![255; (w as usize) * (h as usize)]
}

/// Runs the fixed layer stack (§4.7) over the quantized base image.
pub fn composite(inputs: &CompositorInputs, caches: &Caches) -> RgbaImage {
    let (w, h) = inputs.quantized.dimensions();
    let mut out = inputs.quantized.clone();
    if w == 0 || h == 0 {
        return out;
    }

    // 1. Alpha mask extraction, reused by later layers that should stay inside
    //    the base's opaque region.
    let alpha_mask: Vec<u8> = inputs.quantized.pixels().map(|p| p.0[3]).collect();

    // 2. Hatch layer: multiply, restricted to the alpha mask.
    let hatch_sheet = tiled_sheet(caches, TileKind::Hatch, 0, &inputs.textures.hatch, w, h);
    blend_masked(&mut out, &hatch_sheet.pixels, &alpha_mask, multiply);

    // 3. Thread layers: overlay, each restricted to its own bin mask.
    for (bin, tile) in inputs.textures.threads.iter().enumerate() {
        let bin = bin as u8;
        let sheet = tiled_sheet(caches, TileKind::Thread, bin, tile, w, h);
        let mask = bin_mask(caches, inputs.orientation_bins, bin, inputs.orientation_signature);
        blend_masked(&mut out, &sheet.pixels, &mask.pixels, overlay);
    }

    // 4. Edge layer: dashed edge map blended as grayscale overlay.
    let edge_rgba = grayscale_to_rgba(inputs.edges_dashed);
    let full_mask = solid_mask(w, h);
    blend_masked(&mut out, &edge_rgba, &full_mask, overlay);

    // 5. Rim stitch layer.
    if inputs.border_stitch && inputs.border_width > 2 {
        let stride = (2 * inputs.border_width).max(4);
        let mut rim_mask = vec![0u8; (w as usize) * (h as usize)];
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                let on_rim = inputs.rim_band.get_pixel(x, y).0[0] != 0;
                let dashed = (x / stride) % 2 == 0;
                rim_mask[idx] = if on_rim && dashed { 255 } else { 0 };
            }
        }
        let white_rgba = vec![255u8; (w as usize) * (h as usize) * 4];
        blend_masked(&mut out, &white_rgba, &rim_mask, overlay);
    }

    out
}

fn grayscale_to_rgba(gray: &GrayImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(gray.len() * 4);
    for p in gray.pixels() {
        let v = p.0[0];
        out.extend_from_slice(&[v, v, v, v]);
    }
    out
}
