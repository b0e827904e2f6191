use super::mask::SegmentationMask;
use crate::error::SegmentationError;
use async_trait::async_trait;
use image::RgbaImage;

/// External binary hair segmentation model.
///
/// Implementations wrap whatever inference runtime hosts the model. The
/// adapter owns all availability, throttling and failure policy, so an
/// oracle only has to load once and classify buffers on request.
#[async_trait]
pub trait SegmentationOracle: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Load model assets. Called at most once per session.
    async fn load(&self) -> Result<(), SegmentationError>;

    /// Classify every pixel of `image`. The returned mask should have the
    /// same dimensions as `image`; the adapter rejects it otherwise.
    async fn classify(&self, image: &RgbaImage) -> Result<SegmentationMask, SegmentationError>;
}
