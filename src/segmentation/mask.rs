use crate::error::SegmentationError;

/// Per-pixel category buffer, one byte per pixel in row-major order.
/// `1` marks hair, anything else is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl SegmentationMask {
    pub const HAIR: u8 = 1;
    pub const BACKGROUND: u8 = 0;

    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SegmentationError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SegmentationError::ClassifyFailed {
                details: format!(
                    "mask has {} bytes, expected {} for {}x{}",
                    data.len(),
                    expected,
                    width,
                    height
                ),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-background mask
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Self::BACKGROUND; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `is_hair` at every coordinate
    pub fn from_fn<F>(width: u32, height: u32, is_hair: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(if is_hair(x, y) {
                    Self::HAIR
                } else {
                    Self::BACKGROUND
                });
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// True when the mask is aligned to a `width`x`height` buffer
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn ensure_matches(&self, width: u32, height: u32) -> Result<(), SegmentationError> {
        if self.matches(width, height) {
            Ok(())
        } else {
            Err(SegmentationError::MaskDimensions {
                mask_width: self.width,
                mask_height: self.height,
                width,
                height,
            })
        }
    }

    pub fn is_hair(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y as usize * self.width as usize + x as usize] == Self::HAIR
    }

    pub fn hair_pixel_count(&self) -> usize {
        self.data.iter().filter(|&&c| c == Self::HAIR).count()
    }
}
