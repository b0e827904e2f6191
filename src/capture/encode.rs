use crate::error::CaptureError;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use tracing::debug;

/// Encode to JPEG. Alpha is dropped; the exported image is opaque.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::Encoding {
            details: format!("cannot encode empty {}x{} image", width, height),
        });
    }

    let rgb: RgbImage = image.convert();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| CaptureError::Encoding {
            details: e.to_string(),
        })?;

    debug!(
        "Encoded {}x{} JPEG at quality {} ({} bytes)",
        width,
        height,
        quality,
        buf.len()
    );
    Ok(buf)
}
