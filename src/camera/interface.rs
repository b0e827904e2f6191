use crate::error::CameraError;
use crate::frame::Frame;
use crate::session::FacingDirection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Optical zoom range advertised by a frame source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomCapability {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ZoomCapability {
    /// Clamp `level` into range and snap it to the nearest step
    pub fn constrain(&self, level: f32) -> f32 {
        let clamped = level.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }

        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).min(self.max)
    }
}

/// Exclusive handle to an acquired stream. Not `Clone`: whoever holds it
/// owns the device until it is passed back to `release`.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    id: u64,
    facing: FacingDirection,
    width: u32,
    height: u32,
}

impl StreamHandle {
    pub fn new(id: u64, facing: FacingDirection, width: u32, height: u32) -> Self {
        Self {
            id,
            facing,
            width,
            height,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn facing(&self) -> FacingDirection {
        self.facing
    }

    /// Negotiated stream size
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Live camera collaborator
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Open the camera pointing in `facing`
    async fn acquire(&self, facing: FacingDirection) -> Result<StreamHandle, CameraError>;

    /// Give the device back
    async fn release(&self, handle: StreamHandle);

    /// Latest frame of the stream
    async fn current_frame(&self, handle: &StreamHandle) -> Result<Frame, CameraError>;

    /// Optical zoom range, if the device has one
    fn zoom_capability(&self, handle: &StreamHandle) -> Option<ZoomCapability>;

    /// Set the optical zoom level
    async fn apply_zoom(&self, handle: &StreamHandle, level: f32) -> Result<(), CameraError>;
}
