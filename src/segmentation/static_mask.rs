use super::mask::SegmentationMask;
use super::oracle::SegmentationOracle;
use crate::error::SegmentationError;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};
use parking_lot::RwLock;
use std::path::PathBuf;
use tracing::{debug, info};

/// Luma at or above this marks hair
const HAIR_THRESHOLD: u8 = 128;

/// Oracle backed by a precomputed grayscale mask image on disk.
///
/// The stored mask is stretched (nearest neighbour) to the dimensions of the
/// buffer being classified. It must be authored for that buffer's framing:
/// a crop or zoom of the frame is not tracked, so the mask would drift.
pub struct StaticMaskOracle {
    path: PathBuf,
    mask: RwLock<Option<GrayImage>>,
}

impl StaticMaskOracle {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            mask: RwLock::new(None),
        }
    }

    pub fn from_image(mask: GrayImage) -> Self {
        Self {
            path: PathBuf::new(),
            mask: RwLock::new(Some(mask)),
        }
    }
}

#[async_trait]
impl SegmentationOracle for StaticMaskOracle {
    fn name(&self) -> &str {
        "static_mask"
    }

    async fn load(&self) -> Result<(), SegmentationError> {
        if self.mask.read().is_some() {
            return Ok(());
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SegmentationError::LoadFailed {
                details: format!("{}: {}", self.path.display(), e),
            })?;

        let gray = image::load_from_memory(&bytes)
            .map_err(|e| SegmentationError::LoadFailed {
                details: format!("{}: {}", self.path.display(), e),
            })?
            .to_luma8();

        info!(
            "Loaded {}x{} mask from {}",
            gray.width(),
            gray.height(),
            self.path.display()
        );
        *self.mask.write() = Some(gray);
        Ok(())
    }

    async fn classify(&self, image: &RgbaImage) -> Result<SegmentationMask, SegmentationError> {
        let guard = self.mask.read();
        let source = guard.as_ref().ok_or(SegmentationError::Unavailable)?;
        let (width, height) = image.dimensions();

        let resized = if source.dimensions() == (width, height) {
            source.clone()
        } else {
            debug!(
                "Resampling {}x{} mask to {}x{}",
                source.width(),
                source.height(),
                width,
                height
            );
            imageops::resize(source, width, height, FilterType::Nearest)
        };

        let data = resized
            .into_raw()
            .into_iter()
            .map(|luma| {
                if luma >= HAIR_THRESHOLD {
                    SegmentationMask::HAIR
                } else {
                    SegmentationMask::BACKGROUND
                }
            })
            .collect();

        SegmentationMask::new(width, height, data)
    }
}
