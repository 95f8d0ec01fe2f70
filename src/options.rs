//! Option parsing boundary (§6, §6.2, §9 "Dynamic typing / unstructured options").
//!
//! [`RawOptions`] mirrors the free-form blob the out-of-scope HTTP ingress hands
//! in, already deserialized by the caller. [`RequestOptions::from_raw`] applies
//! every default and clamp exactly once; no stage past this boundary re-validates.

use serde::{Deserialize, Serialize};

use crate::error::ThreadcraftError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Hatch {
    None,
    Diagonal,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationMethod {
    Binned8,
    Lic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    Canny,
    Xdog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Photo,
    Logo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawBackground {
    Color { hex: String },
    Fabric { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Background {
    Color([u8; 3]),
    Fabric(String),
}

fn default_max_colors() -> u8 {
    8
}
fn default_thread_thickness() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_hatch() -> Hatch {
    Hatch::Diagonal
}
fn default_orientation() -> OrientationMethod {
    OrientationMethod::Binned8
}
fn default_edges() -> EdgeStyle {
    EdgeStyle::Canny
}
fn default_mode() -> Mode {
    Mode::Photo
}
fn default_sheen() -> f32 {
    0.25
}
fn default_density() -> f32 {
    1.0
}
fn default_randomness() -> f32 {
    0.15
}

/// Free-form options record as received at the core boundary, with the same
/// field names/defaults as §6's external interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default = "default_max_colors")]
    pub max_colors: u8,
    #[serde(default = "default_thread_thickness")]
    pub thread_thickness: u32,
    #[serde(default = "default_true")]
    pub preserve_transparency: bool,
    #[serde(default = "default_hatch")]
    pub hatch: Hatch,
    #[serde(default)]
    pub background: Option<RawBackground>,
    #[serde(default = "default_orientation")]
    pub style_orientation: OrientationMethod,
    #[serde(default = "default_edges")]
    pub style_edges: EdgeStyle,
    #[serde(default = "default_mode")]
    pub style_mode: Mode,
    #[serde(default = "default_sheen")]
    pub lighting_sheen: f32,
    #[serde(default = "default_true")]
    pub border_stitch: bool,
    #[serde(default)]
    pub border_width: Option<u32>,
    #[serde(default = "default_density")]
    pub density_scale: f32,
    #[serde(default = "default_randomness")]
    pub grain_randomness: f32,
}

impl Default for RawOptions {
    fn default() -> Self {
        RawOptions {
            max_colors: default_max_colors(),
            thread_thickness: default_thread_thickness(),
            preserve_transparency: default_true(),
            hatch: default_hatch(),
            background: None,
            style_orientation: default_orientation(),
            style_edges: default_edges(),
            style_mode: default_mode(),
            lighting_sheen: default_sheen(),
            border_stitch: default_true(),
            border_width: None,
            density_scale: default_density(),
            grain_randomness: default_randomness(),
        }
    }
}

/// Clamped, typed options consumed by every pipeline stage. Constructed once at
/// the boundary via [`RequestOptions::from_raw`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub max_colors: u8,
    pub thread_thickness: u32,
    pub preserve_transparency: bool,
    pub hatch: Hatch,
    pub background: Option<Background>,
    pub orientation: OrientationMethod,
    pub edges: EdgeStyle,
    pub mode: Mode,
    /// Reserved: clamped but not read by any stage (§9).
    pub lighting_sheen: f32,
    pub border_stitch: bool,
    /// Width of the rim stitch / rim band, independent of `thread_thickness`
    /// (consumed by `edges::detect`'s rim-band sizing and the compositor's
    /// rim-stitch dash stride).
    pub border_width: u32,
    pub density_scale: f32,
    /// Reserved: clamped but not read by any stage (§9) — `numeric::seeded_prng`
    /// is the intended consumer once grain synthesis exists.
    pub grain_randomness: f32,
}

impl RequestOptions {
    pub fn from_raw(raw: RawOptions) -> Result<Self, ThreadcraftError> {
        let max_colors = raw.max_colors.clamp(2, 12);
        let thread_thickness = raw.thread_thickness.clamp(1, 10);
        let border_width = raw.border_width.unwrap_or(thread_thickness).clamp(1, 10);
        let density_scale = raw.density_scale.clamp(0.5, 2.0);
        let lighting_sheen = raw.lighting_sheen.clamp(0.0, 1.0);
        let grain_randomness = raw.grain_randomness.clamp(0.0, 1.0);

        let background = match raw.background {
            None => None,
            Some(RawBackground::Color { hex }) => Some(Background::Color(parse_hex(&hex)?)),
            Some(RawBackground::Fabric { name }) => Some(Background::Fabric(name)),
        };

        Ok(RequestOptions {
            max_colors,
            thread_thickness,
            preserve_transparency: raw.preserve_transparency,
            hatch: raw.hatch,
            background,
            orientation: raw.style_orientation,
            edges: raw.style_edges,
            mode: raw.style_mode,
            lighting_sheen,
            border_stitch: raw.border_stitch,
            border_width,
            density_scale,
            grain_randomness,
        })
    }
}

/// Parses `#RRGGBB` into an `[r,g,b]` triple. Malformed hex is `UnsupportedOption`.
fn parse_hex(hex: &str) -> Result<[u8; 3], ThreadcraftError> {
    let s = hex.strip_prefix('#').unwrap_or(hex);
    if s.len() != 6 {
        return Err(ThreadcraftError::UnsupportedOption(format!(
            "invalid color hex '{hex}'"
        )));
    }
    let byte = |i: usize| -> Result<u8, ThreadcraftError> {
        u8::from_str_radix(&s[i..i + 2], 16)
            .map_err(|_| ThreadcraftError::UnsupportedOption(format!("invalid color hex '{hex}'")))
    };
    Ok([byte(0)?, byte(2)?, byte(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = RequestOptions::from_raw(RawOptions::default()).unwrap();
        assert_eq!(opts.max_colors, 8);
        assert_eq!(opts.thread_thickness, 3);
        assert!(opts.preserve_transparency);
        assert_eq!(opts.hatch, Hatch::Diagonal);
        assert_eq!(opts.border_width, 3);
        assert!((opts.density_scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let mut raw = RawOptions::default();
        raw.max_colors = 99;
        raw.thread_thickness = 0;
        raw.density_scale = 10.0;
        let opts = RequestOptions::from_raw(raw).unwrap();
        assert_eq!(opts.max_colors, 12);
        assert_eq!(opts.thread_thickness, 1);
        assert!((opts.density_scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn border_width_defaults_to_thread_thickness() {
        let mut raw = RawOptions::default();
        raw.thread_thickness = 7;
        raw.border_width = None;
        let opts = RequestOptions::from_raw(raw).unwrap();
        assert_eq!(opts.border_width, 7);
    }

    #[test]
    fn rejects_malformed_hex() {
        let mut raw = RawOptions::default();
        raw.background = Some(RawBackground::Color { hex: "not-a-color".to_string() });
        let err = RequestOptions::from_raw(raw).unwrap_err();
        assert!(matches!(err, ThreadcraftError::UnsupportedOption(_)));
    }

    #[test]
    fn accepts_hex_with_or_without_hash() {
        let mut raw = RawOptions::default();
        raw.background = Some(RawBackground::Color { hex: "#E5E0D6".to_string() });
        let opts = RequestOptions::from_raw(raw).unwrap();
        assert_eq!(opts.background, Some(Background::Color([0xE5, 0xE0, 0xD6])));
    }
}
