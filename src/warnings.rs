//! WarningAnalyzer (§4.8): quality warnings derived from the alpha
//! distance-transform minimum, edge density, and palette reduction.

use image::GrayImage;

use crate::numeric;

const THIN_STROKES_WARNING: &str = "Thin strokes may not embroider cleanly";
const DENSE_DETAIL_WARNING: &str = "Dense detail may fill in on fabric";
const EDGE_DENSITY_THRESHOLD: f64 = 0.12;

/// `colors_before_reduction` is the distinct-color count observed by the
/// quantizer *before* truncating to `max_colors` (see
/// [`crate::quantize::QuantizeResult::distinct_colors_before_reduction`]) — the
/// published `Palette` can never itself exceed `max_colors`, so the "reduced
/// colors" warning has to compare against the pre-truncation count (§8 S6).
pub fn analyze(
    alpha: &[u8],
    width: u32,
    height: u32,
    thread_thickness: u32,
    edges_dashed: &GrayImage,
    max_colors: u8,
    colors_before_reduction: usize,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let opaque: Vec<u8> = alpha.iter().map(|&a| if a > 0 { 255 } else { 0 }).collect();
    let has_opaque = opaque.iter().any(|&v| v != 0);
    if has_opaque {
        // Seed the transform on the background (transparent) pixels so opaque
        // pixels read their distance *to* the nearest background pixel, not 0.
        let background: Vec<u8> = opaque.iter().map(|&v| if v == 0 { 255 } else { 0 }).collect();
        let dist = numeric::distance_transform(&background, width, height);
        let min_stroke = opaque
            .iter()
            .zip(dist.iter())
            .filter(|(&v, _)| v != 0)
            .map(|(_, &d)| 2.0 * d)
            .fold(f32::INFINITY, f32::min);
        if min_stroke < thread_thickness as f32 {
            warnings.push(THIN_STROKES_WARNING.to_string());
        }
    }

    let edge_count = edges_dashed.pixels().filter(|p| p.0[0] != 0).count();
    let total = (width as u64 * height as u64).max(1);
    let edge_density = edge_count as f64 / total as f64;
    if edge_density > EDGE_DENSITY_THRESHOLD {
        warnings.push(DENSE_DETAIL_WARNING.to_string());
    }

    if colors_before_reduction > max_colors as usize {
        warnings.push(format!("Reduced colors to {max_colors}"));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn thin_diagonal_stroke_triggers_warning() {
        let w = 200u32;
        let h = 200u32;
        let mut alpha = vec![0u8; (w * h) as usize];
        for i in 0..w.min(h) {
            alpha[(i * w + i) as usize] = 255;
        }
        let edges = GrayImage::new(w, h);
        let warnings = analyze(&alpha, w, h, 3, &edges, 8, 1);
        assert!(warnings.iter().any(|w| w == THIN_STROKES_WARNING));
    }

    #[test]
    fn uniform_opaque_image_does_not_trigger_thin_strokes() {
        let w = 50u32;
        let h = 50u32;
        let alpha = vec![255u8; (w * h) as usize];
        let edges = GrayImage::new(w, h);
        let warnings = analyze(&alpha, w, h, 3, &edges, 8, 1);
        assert!(!warnings.iter().any(|w| w == THIN_STROKES_WARNING));
    }

    #[test]
    fn dense_edges_trigger_warning() {
        let w = 50u32;
        let h = 50u32;
        let alpha = vec![255u8; (w * h) as usize];
        let mut edges = GrayImage::new(w, h);
        for (i, p) in edges.pixels_mut().enumerate() {
            if i % 2 == 0 {
                p.0[0] = 255;
            }
        }
        let warnings = analyze(&alpha, w, h, 3, &edges, 8, 1);
        assert!(warnings.iter().any(|w| w == DENSE_DETAIL_WARNING));
    }

    #[test]
    fn palette_reduction_warning_reports_max_colors() {
        let w = 10u32;
        let h = 10u32;
        let alpha = vec![255u8; (w * h) as usize];
        let edges = GrayImage::new(w, h);
        let warnings = analyze(&alpha, w, h, 3, &edges, 6, 20);
        assert!(warnings.iter().any(|w| w == "Reduced colors to 6"));
    }
}
