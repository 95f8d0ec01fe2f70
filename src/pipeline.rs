//! PipelineDriver (§4.9): orchestrates normalize -> quantize -> {edges,
//! orientation} -> textures -> composite -> optional background -> warnings,
//! recording a wall-clock duration per stage.

use std::sync::Arc;
use std::time::Instant;

use image::{imageops::FilterType, RgbaImage};
use tracing::info_span;

use crate::background;
use crate::cache::{Caches, TextureConfigKey};
use crate::compositor::{self, CompositorInputs};
use crate::edges;
use crate::error::Result;
use crate::options::RequestOptions;
use crate::orientation;
use crate::quantize::{self, Palette};
use crate::warnings;

const NORMALIZE_MAX_DIM: u32 = 2000;

#[derive(Debug, Clone, Copy, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Timings {
    pub normalize_ms: u64,
    pub quantize_ms: u64,
    pub edges_orientation_parallel_ms: u64,
    pub textures_ms: u64,
    pub composite_ms: u64,
    pub background_ms: u64,
    pub total_ms: u64,
}

pub struct PipelineOutput {
    pub image: RgbaImage,
    pub palette: Palette,
    pub original_size: Dimensions,
    pub final_size: Dimensions,
    pub warnings: Vec<String>,
    pub timings: Timings,
}

/// Resizes fit-inside to `<= NORMALIZE_MAX_DIM` per side without enlarging (§3).
fn normalize(input: &RgbaImage) -> RgbaImage {
    let (w, h) = input.dimensions();
    let max_dim = w.max(h);
    if max_dim <= NORMALIZE_MAX_DIM || max_dim == 0 {
        return input.clone();
    }
    let scale = NORMALIZE_MAX_DIM as f64 / max_dim as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(input, nw, nh, FilterType::Lanczos3)
}

pub struct PipelineDriver {
    caches: Arc<Caches>,
}

impl PipelineDriver {
    pub fn new(caches: Arc<Caches>) -> Self {
        Self { caches }
    }

    pub fn process(&self, input: &RgbaImage, options: &RequestOptions) -> Result<PipelineOutput> {
        let total_start = Instant::now();

        let normalize_start = Instant::now();
        let normalized = {
            let _span = info_span!("normalize").entered();
            normalize(input)
        };
        let normalize_ms = normalize_start.elapsed().as_millis() as u64;
        let original_size = Dimensions { width: normalized.width(), height: normalized.height() };

        let quantize_start = Instant::now();
        let quantized = {
            let _span = info_span!("quantize").entered();
            quantize::quantize(&normalized, options.max_colors)?
        };
        let quantize_ms = quantize_start.elapsed().as_millis() as u64;

        let edges_orientation_start = Instant::now();
        let (edge_result, orientation_result) = {
            let _span = info_span!("edges_orientation").entered();
            rayon::join(
                || edges::detect(&quantized.image, options.thread_thickness, options.border_width, options.mode),
                || orientation::estimate(&quantized.image, options.orientation, options.mode),
            )
        };
        let edges_orientation_parallel_ms = edges_orientation_start.elapsed().as_millis() as u64;

        let textures_start = Instant::now();
        let texture_key = TextureConfigKey {
            thread_thickness: options.thread_thickness,
            hatch: options.hatch,
            density_milli: (options.density_scale as f64 * 1000.0).round() as i64,
        };
        let textures = {
            let _span = info_span!("textures").entered();
            match self.caches.get_texture_set(&texture_key) {
                Some(set) => set,
                None => {
                    let set = crate::texture::synthesize(
                        options.thread_thickness,
                        options.hatch,
                        options.density_scale,
                    );
                    self.caches.put_texture_set(texture_key, set.clone());
                    set
                }
            }
        };
        let textures_ms = textures_start.elapsed().as_millis() as u64;

        let orientation_signature = format!("{:?}-{:?}-{}", options.orientation, options.mode, orientation_result.bin_count);
        let composite_start = Instant::now();
        let composited = {
            let _span = info_span!("composite").entered();
            let inputs = CompositorInputs {
                quantized: &quantized.image,
                textures: &textures,
                edges_dashed: &edge_result.edges_dashed,
                rim_band: &edge_result.rim_band,
                orientation_bins: &orientation_result.bins,
                border_stitch: options.border_stitch,
                border_width: options.border_width,
                orientation_signature: &orientation_signature,
            };
            compositor::composite(&inputs, &self.caches)
        };
        let composite_ms = composite_start.elapsed().as_millis() as u64;

        let background_start = Instant::now();
        let final_image = if options.preserve_transparency {
            composited
        } else {
            let _span = info_span!("background").entered();
            background::flatten(&composited, options.background.as_ref())
        };
        let background_ms = if options.preserve_transparency {
            0
        } else {
            background_start.elapsed().as_millis() as u64
        };

        let final_size = Dimensions { width: final_image.width(), height: final_image.height() };

        let alpha: Vec<u8> = final_image.pixels().map(|p| p.0[3]).collect();
        let analyzer_warnings = {
            let _span = info_span!("warnings").entered();
            warnings::analyze(
                &alpha,
                final_image.width(),
                final_image.height(),
                options.thread_thickness,
                &edge_result.edge_map,
                options.max_colors,
                quantized.distinct_colors_before_reduction,
            )
        };

        let total_ms = total_start.elapsed().as_millis() as u64;

        Ok(PipelineOutput {
            image: final_image,
            palette: quantized.palette,
            original_size,
            final_size,
            warnings: analyzer_warnings,
            timings: Timings {
                normalize_ms,
                quantize_ms,
                edges_orientation_parallel_ms,
                textures_ms,
                composite_ms,
                background_ms,
                total_ms,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RawOptions;
    use image::Rgba;

    fn caches() -> Arc<Caches> {
        Arc::new(Caches::new())
    }

    #[test]
    fn process_preserves_dimensions_for_solid_opaque_input() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([200, 30, 30, 255]));
        let options = RequestOptions::from_raw(RawOptions::default()).unwrap();
        let driver = PipelineDriver::new(caches());
        let out = driver.process(&img, &options).unwrap();
        assert_eq!(out.final_size.width, 64);
        assert_eq!(out.final_size.height, 64);
        assert_eq!(out.palette.len(), 1);
    }

    #[test]
    fn process_is_deterministic() {
        let mut img = RgbaImage::new(48, 48);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 5) as u8, (y * 5) as u8, 60, 255]);
        }
        let options = RequestOptions::from_raw(RawOptions::default()).unwrap();
        let driver = PipelineDriver::new(caches());
        let a = driver.process(&img, &options).unwrap();
        let b = driver.process(&img, &options).unwrap();
        assert_eq!(a.image.as_raw(), b.image.as_raw());
        assert_eq!(a.palette, b.palette);
    }

    #[test]
    fn background_flattening_removes_transparency_when_requested() {
        let mut img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0]));
        for y in 8..24 {
            for x in 8..24 {
                img.put_pixel(x, y, Rgba([10, 120, 200, 255]));
            }
        }
        let mut raw = RawOptions::default();
        raw.preserve_transparency = false;
        let options = RequestOptions::from_raw(raw).unwrap();
        let driver = PipelineDriver::new(caches());
        let out = driver.process(&img, &options).unwrap();
        assert!(out.image.pixels().all(|p| p.0[3] == 255));
        assert!(out.timings.background_ms == out.timings.background_ms); // recorded, no panic
    }

    #[test]
    fn normalize_downsizes_oversized_input_without_enlarging_small_ones() {
        let large = RgbaImage::from_pixel(2400, 100, Rgba([1, 2, 3, 255]));
        let normalized = normalize(&large);
        assert!(normalized.width() <= NORMALIZE_MAX_DIM);
        assert!(normalized.height() < 100);

        let small = RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255]));
        let normalized_small = normalize(&small);
        assert_eq!(normalized_small.dimensions(), (10, 10));
    }
}
