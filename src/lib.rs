//! Image-to-embroidery stylization core: color quantization, edge/contour
//! extraction, orientation-field estimation, thread/hatch texture synthesis,
//! and multi-layer compositing (§1–§2).
//!
//! The one public entry point is [`process_embroidery`]. Everything upstream
//! (HTTP ingress, multipart parsing, worker-pool dispatch, option defaults) is
//! an external collaborator and out of scope for this crate.

mod background;
mod cache;
mod compositor;
mod edges;
mod error;
mod numeric;
mod options;
mod orientation;
mod pipeline;
mod quantize;
mod texture;
mod warnings;

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;

pub use cache::Caches;
pub use error::{Result, ThreadcraftError};
pub use options::{Background, EdgeStyle, Hatch, Mode, OrientationMethod, RawBackground, RawOptions};
pub use pipeline::{Dimensions, Timings};
pub use quantize::{Palette, PaletteEntry};

/// Metadata accompanying the stylized output (§6).
#[derive(Debug, Clone)]
pub struct Meta {
    pub palette_size: usize,
    pub palette: Palette,
    pub original_size: Dimensions,
    pub final_size: Dimensions,
    pub warnings: Vec<String>,
    pub timings: Timings,
}

/// Result of [`process_embroidery`]: PNG-encoded output plus metadata.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub output_bytes: Vec<u8>,
    pub output_mime: &'static str,
    pub meta: Meta,
}

/// Decodes `input_bytes`, runs the full pipeline with a fresh, request-scoped
/// cache, and PNG-encodes the result.
///
/// `input_mime` is accepted for parity with §6's external interface but is not
/// otherwise consulted — `image::load_from_memory` sniffs the real format, and
/// a mismatch between the declared mime and the actual bytes is not itself an
/// error as long as the bytes decode.
pub fn process_embroidery(
    input_bytes: &[u8],
    _input_mime: &str,
    options: RawOptions,
) -> Result<ProcessResult> {
    let caches = Arc::new(Caches::new());
    process_embroidery_with_caches(input_bytes, _input_mime, options, caches)
}

/// Like [`process_embroidery`] but reuses a caller-provided [`Caches`] handle,
/// so repeated calls can share the tile/mask/texture caches (§4.2, §4.9).
pub fn process_embroidery_with_caches(
    input_bytes: &[u8],
    _input_mime: &str,
    options: RawOptions,
    caches: Arc<Caches>,
) -> Result<ProcessResult> {
    let decoded = image::load_from_memory(input_bytes)
        .map_err(|e| ThreadcraftError::InvalidInput(format!("could not decode input image: {e}")))?;
    let input = decoded.to_rgba8();
    if input.width() == 0 || input.height() == 0 {
        return Err(ThreadcraftError::InvalidInput("empty image".to_string()));
    }

    let request_options = options::RequestOptions::from_raw(options)?;

    let driver = pipeline::PipelineDriver::new(caches);
    let output = driver.process(&input, &request_options)?;

    let mut output_bytes = Cursor::new(Vec::new());
    output
        .image
        .write_to(&mut output_bytes, ImageFormat::Png)
        .map_err(|e| ThreadcraftError::internal("encode", e.to_string()))?;

    Ok(ProcessResult {
        output_bytes: output_bytes.into_inner(),
        output_mime: "image/png",
        meta: Meta {
            palette_size: output.palette.len(),
            palette: output.palette,
            original_size: output.original_size,
            final_size: output.final_size,
            warnings: output.warnings,
            timings: output.timings,
        },
    })
}
