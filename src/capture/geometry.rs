use crate::session::{SessionState, MIN_ZOOM};
use serde::{Deserialize, Serialize};

/// Region of the (already mirrored) frame that ends up in the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Centered rectangle of `full / zoom`, never smaller than one pixel
    pub fn centered(width: u32, height: u32, zoom: f32) -> Self {
        if !zoom.is_finite() || zoom <= MIN_ZOOM {
            return Self::full(width, height);
        }

        let crop_width = ((width as f32 / zoom).round() as u32).clamp(1.min(width), width);
        let crop_height = ((height as f32 / zoom).round() as u32).clamp(1.min(height), height);

        Self {
            x: (width - crop_width) / 2,
            y: (height - crop_height) / 2,
            width: crop_width,
            height: crop_height,
        }
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        *self == Self::full(width, height)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.saturating_add(self.width) <= width && self.y.saturating_add(self.height) <= height
    }
}

/// Geometry of one capture, resolved from the session at shutter time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub mirrored: bool,
    pub crop: CropRect,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, mirrored: bool, software_zoom: f32) -> Self {
        Self {
            width,
            height,
            mirrored,
            crop: CropRect::centered(width, height, software_zoom),
        }
    }

    /// Mirroring follows the facing direction in camera mode. The crop only
    /// applies when zoom is done in software.
    pub fn resolve(width: u32, height: u32, state: &SessionState) -> Self {
        Self::new(width, height, state.is_mirrored(), state.software_zoom())
    }
}
