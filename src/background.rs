//! Background compositing (§6.1): flattens the composite's RGBA output over an
//! opaque background when `preserveTransparency == false`. A missing fabric
//! asset is an `AssetMissing` condition recovered internally — it never reaches
//! the caller as an error (§7).

use image::{Rgba, RgbaImage};

use crate::options::Background;

const DEFAULT_COLOR: [u8; 3] = [0xFF, 0xFF, 0xFF];
const FABRIC_FALLBACK_COLOR: [u8; 3] = [0xE5, 0xE0, 0xD6];

fn fabric_color(name: &str) -> Result<[u8; 3], ()> {
    match name.to_ascii_lowercase().as_str() {
        "linen" => Ok([0xEF, 0xE6, 0xD8]),
        "denim" => Ok([0x3B, 0x5B, 0x7A]),
        "canvas" => Ok([0xD8, 0xCB, 0xA8]),
        "felt" => Ok([0x7A, 0x2E, 0x2E]),
        _ => Err(()),
    }
}

/// Resolves a [`Background`] option to a concrete opaque RGB color, silently
/// falling back to [`FABRIC_FALLBACK_COLOR`] for an unrecognized fabric name.
fn resolve_color(background: Option<&Background>) -> [u8; 3] {
    match background {
        None => DEFAULT_COLOR,
        Some(Background::Color(rgb)) => *rgb,
        Some(Background::Fabric(name)) => fabric_color(name).unwrap_or_else(|_| {
            tracing::warn!(fabric = name.as_str(), "fabric asset missing, falling back to default color");
            FABRIC_FALLBACK_COLOR
        }),
    }
}

/// Flattens `src` (straight, non-premultiplied RGBA) over an opaque background
/// chosen by `background`, producing an opaque image of the same dimensions.
pub fn flatten(src: &RgbaImage, background: Option<&Background>) -> RgbaImage {
    let [br, bg, bb] = resolve_color(background);
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w, h);
    for (x, y, px) in src.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *px;
        let af = a as u32;
        let inv = 255 - af;
        let blend = |s: u8, bgc: u8| -> u8 { ((af * s as u32 + inv * bgc as u32) / 255) as u8 };
        out.put_pixel(x, y, Rgba([blend(r, br), blend(g, bg), blend(b, bb), 255]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_pixels_pass_through_unchanged_rgb() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let out = flatten(&img, None);
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn transparent_pixels_take_background_color() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0]));
        let out = flatten(&img, Some(&Background::Color([1, 2, 3])));
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn unknown_fabric_falls_back_silently() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let out = flatten(&img, Some(&Background::Fabric("nonexistent".to_string())));
        assert_eq!(out.get_pixel(0, 0).0, [0xE5, 0xE0, 0xD6, 255]);
    }

    #[test]
    fn known_fabric_resolves_to_its_color() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let out = flatten(&img, Some(&Background::Fabric("linen".to_string())));
        assert_eq!(out.get_pixel(0, 0).0, [0xEF, 0xE6, 0xD8, 255]);
    }

    #[test]
    fn output_is_always_fully_opaque() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([5, 5, 5, 128]));
        let out = flatten(&img, None);
        assert!(out.pixels().all(|p| p.0[3] == 255));
    }
}
