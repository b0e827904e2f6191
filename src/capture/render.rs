use super::geometry::FrameGeometry;
use crate::error::CaptureError;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, trace};

/// Draw `source` into a fresh buffer following `geometry`.
///
/// The horizontal flip happens before the crop so the captured pixels, and
/// any mask computed from them, line up with what the preview showed.
pub fn render_source(
    source: &RgbaImage,
    geometry: &FrameGeometry,
    upscale: bool,
) -> Result<RgbaImage, CaptureError> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptySource { width, height });
    }

    if (width, height) != (geometry.width, geometry.height) {
        return Err(CaptureError::Processing {
            details: format!(
                "geometry is {}x{} but source is {}x{}",
                geometry.width, geometry.height, width, height
            ),
        });
    }

    let crop = geometry.crop;
    if !crop.fits_within(width, height) || crop.width == 0 || crop.height == 0 {
        return Err(CaptureError::Processing {
            details: format!("crop {:?} outside {}x{} frame", crop, width, height),
        });
    }

    let oriented = if geometry.mirrored {
        imageops::flip_horizontal(source)
    } else {
        source.clone()
    };

    if crop.is_full(width, height) {
        return Ok(oriented);
    }

    let cropped = imageops::crop_imm(&oriented, crop.x, crop.y, crop.width, crop.height).to_image();
    trace!(
        "Cropped {}x{} to {}x{} at ({}, {})",
        width,
        height,
        crop.width,
        crop.height,
        crop.x,
        crop.y
    );

    if upscale {
        Ok(imageops::resize(&cropped, width, height, FilterType::Triangle))
    } else {
        Ok(cropped)
    }
}

/// Soften `image` by blending a blurred copy back with a lighten mode at
/// `amount / 100 * 0.7` opacity. Alpha is left alone.
pub fn apply_glow(image: &mut RgbaImage, amount: f32, radius: f32) {
    if amount <= 0.0 || !radius.is_finite() || radius <= 0.0 || image.width() == 0 {
        return;
    }

    let opacity = (amount.min(100.0) / 100.0) * 0.7;
    let blurred = gaussian_blur_f32(image, radius);

    for (pixel, soft) in image.pixels_mut().zip(blurred.pixels()) {
        for channel in 0..3 {
            let base = pixel.0[channel] as f32;
            let lighter = base.max(soft.0[channel] as f32);
            pixel.0[channel] = (base + (lighter - base) * opacity).round().clamp(0.0, 255.0) as u8;
        }
    }

    debug!(
        "Applied glow (opacity {:.2}, radius {:.1}) to {}x{}",
        opacity,
        radius,
        image.width(),
        image.height()
    );
}
