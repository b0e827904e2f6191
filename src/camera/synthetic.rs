use super::interface::{FrameSource, StreamHandle, ZoomCapability};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{Frame, FrameOrigin};
use crate::session::FacingDirection;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Render the synthetic camera image.
///
/// Red rises left to right and green top to bottom, so any flip or crop is
/// visible in the pixels. Blue tags the facing direction. `zoom` magnifies
/// around the center the way an optical zoom would.
pub fn test_pattern(width: u32, height: u32, facing: FacingDirection, zoom: f32) -> RgbaImage {
    let zoom = zoom.max(1.0);
    let blue = match facing {
        FacingDirection::User => 64,
        FacingDirection::Environment => 192,
    };

    RgbaImage::from_fn(width, height, |x, y| {
        let u = 0.5 + ((x as f32 + 0.5) / width as f32 - 0.5) / zoom;
        let v = 0.5 + ((y as f32 + 0.5) / height as f32 - 0.5) / zoom;
        Rgba([
            (u * 255.0).round().clamp(0.0, 255.0) as u8,
            (v * 255.0).round().clamp(0.0, 255.0) as u8,
            blue,
            255,
        ])
    })
}

/// Frame source that generates a test pattern instead of talking to a device.
///
/// Tracks open handles so tests can check that at most one device handle is
/// held at a time, and can be told to fail acquisition for one direction.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    zoom_capability: Option<ZoomCapability>,
    failing_facing: Mutex<Option<FacingDirection>>,
    open: Mutex<Vec<u64>>,
    zoom: Mutex<f32>,
    next_handle: AtomicU64,
    frame_counter: AtomicU64,
    acquire_calls: AtomicUsize,
    release_calls: AtomicUsize,
    peak_open: AtomicUsize,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            zoom_capability: None,
            failing_facing: Mutex::new(None),
            open: Mutex::new(Vec::new()),
            zoom: Mutex::new(1.0),
            next_handle: AtomicU64::new(1),
            frame_counter: AtomicU64::new(0),
            acquire_calls: AtomicUsize::new(0),
            release_calls: AtomicUsize::new(0),
            peak_open: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.width, config.height)
    }

    /// Advertise optical zoom
    pub fn with_hardware_zoom(mut self, capability: ZoomCapability) -> Self {
        self.zoom_capability = Some(capability);
        self
    }

    /// Make acquisition fail for `facing`, or succeed again with `None`
    pub fn set_failing_facing(&self, facing: Option<FacingDirection>) {
        *self.failing_facing.lock() = facing;
    }

    pub fn open_handles(&self) -> usize {
        self.open.lock().len()
    }

    /// Most handles ever held at once
    pub fn peak_open_handles(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub fn hardware_zoom_level(&self) -> f32 {
        *self.zoom.lock()
    }

    fn ensure_open(&self, handle: &StreamHandle) -> Result<(), CameraError> {
        if self.open.lock().contains(&handle.id()) {
            Ok(())
        } else {
            Err(CameraError::NotAcquired)
        }
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn acquire(&self, facing: FacingDirection) -> Result<StreamHandle, CameraError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);

        if *self.failing_facing.lock() == Some(facing) {
            warn!("Synthetic {} camera refusing acquisition", facing);
            return Err(CameraError::AcquisitionFailed {
                facing: facing.to_string(),
                details: "device unavailable".to_string(),
            });
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let open_now = {
            let mut open = self.open.lock();
            open.push(id);
            open.len()
        };
        self.peak_open.fetch_max(open_now, Ordering::SeqCst);
        *self.zoom.lock() = 1.0;

        info!(
            "Synthetic {} camera acquired ({}x{}, handle {})",
            facing, self.width, self.height, id
        );
        Ok(StreamHandle::new(id, facing, self.width, self.height))
    }

    async fn release(&self, handle: StreamHandle) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock();
        match open.iter().position(|&id| id == handle.id()) {
            Some(index) => {
                open.remove(index);
                debug!("Released synthetic camera handle {}", handle.id());
            }
            None => warn!("Release of unknown camera handle {}", handle.id()),
        }
    }

    async fn current_frame(&self, handle: &StreamHandle) -> Result<Frame, CameraError> {
        self.ensure_open(handle)?;

        let zoom = *self.zoom.lock();
        let (width, height) = handle.dimensions();
        let id = self.frame_counter.fetch_add(1, Ordering::Relaxed);

        Ok(Frame::new(
            id,
            SystemTime::now(),
            test_pattern(width, height, handle.facing(), zoom),
            FrameOrigin::Camera,
        ))
    }

    fn zoom_capability(&self, _handle: &StreamHandle) -> Option<ZoomCapability> {
        self.zoom_capability
    }

    async fn apply_zoom(&self, handle: &StreamHandle, level: f32) -> Result<(), CameraError> {
        self.ensure_open(handle)?;
        let capability = self.zoom_capability.ok_or(CameraError::ZoomUnsupported)?;

        if !level.is_finite() {
            return Err(CameraError::ZoomFailed {
                level,
                details: "zoom level is not a number".to_string(),
            });
        }

        let constrained = capability.constrain(level);
        *self.zoom.lock() = constrained;
        debug!("Synthetic hardware zoom set to {:.2}", constrained);
        Ok(())
    }
}
