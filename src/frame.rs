use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Where a frame's pixels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOrigin {
    /// Live camera stream
    Camera,
    /// Still image picked from the gallery
    Still,
}

/// A pixel-addressable frame with metadata
#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique frame identifier within its source
    pub id: u64,
    /// Timestamp when the frame was captured or decoded
    pub timestamp: SystemTime,
    /// RGBA pixels (shared ownership so preview and capture avoid copies)
    pub image: Arc<RgbaImage>,
    /// Source of the pixels
    pub origin: FrameOrigin,
}

impl Frame {
    /// Create a new frame
    pub fn new(id: u64, timestamp: SystemTime, image: RgbaImage, origin: FrameOrigin) -> Self {
        Self {
            id,
            timestamp,
            image: Arc::new(image),
            origin,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when the frame has no pixels to draw
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
