use base64::{engine::general_purpose, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::error::AnalysisError;

/// Longest edge allowed before the image is downscaled.
pub const MAX_EDGE: u32 = 1024;

/// JPEG re-encode quality (0-100).
const JPEG_QUALITY: u8 = 80;

/// Decode an uploaded image, bound its longer edge to `max_edge` (aspect
/// ratio preserved) and re-encode as JPEG so the upload stays small.
pub fn prepare_image(bytes: &[u8], max_edge: u32) -> Result<Vec<u8>, AnalysisError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AnalysisError::ImageDecode(e.to_string()))?;

    let (width, height) = (img.width(), img.height());
    log::debug!("🖼️ Decoded image: {}x{}", width, height);

    let img = if width.max(height) > max_edge {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| AnalysisError::ImageDecode(format!("re-encode failed: {}", e)))?;

    log::debug!(
        "🖼️ Re-encoded {}x{} JPEG: {} -> {} bytes",
        rgb.width(),
        rgb.height(),
        bytes.len(),
        out.len()
    );

    Ok(out)
}

/// Wrap JPEG bytes in the data URI the completion API expects.
pub fn to_data_url(jpeg_bytes: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(jpeg_bytes)
    )
}
