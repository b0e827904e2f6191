use super::input::UiEvent;
use super::state::{Mode, SessionState, ZoomMode, MAX_SOFTWARE_ZOOM, MIN_ZOOM};
use crate::camera::{FrameSource, StreamHandle, ZoomCapability};
use crate::capture::{CaptureCompositor, CaptureReport};
use crate::color::ColorPipeline;
use crate::config::LuminaConfig;
use crate::error::{CameraError, CaptureError, LuminaError, Result};
use crate::events::{EventBus, LuminaEvent};
use crate::frame::Frame;
use crate::gallery::{decode_still, ImagePicker};
use crate::output::OutputSink;
use crate::preview::{PreviewComposer, PreviewDescriptor};
use crate::segmentation::{SegmentationAdapter, SegmentationMask, SegmentationOracle};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One composed preview frame
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub frame: Frame,
    pub descriptor: PreviewDescriptor,
    /// Streaming mask for this frame's source, when one is ready
    pub mask: Option<Arc<SegmentationMask>>,
}

impl PreviewFrame {
    /// Render the hue-rotated hair layer, if the descriptor asks for one
    pub fn hair_layer(&self) -> Option<image::RgbaImage> {
        let overlay = self.descriptor.hair_overlay?;
        let mask = self.mask.as_ref()?;
        match overlay.render(&self.frame.image, mask) {
            Ok(layer) => Some(layer),
            Err(e) => {
                debug!("Skipping hair overlay: {}", e);
                None
            }
        }
    }
}

/// A capture running in the background
#[derive(Debug)]
pub struct CaptureTask(JoinHandle<std::result::Result<CaptureReport, CaptureError>>);

impl CaptureTask {
    pub async fn wait(self) -> Result<CaptureReport> {
        self.0
            .await
            .map_err(|e| LuminaError::system(format!("capture task failed: {}", e)))?
            .map_err(LuminaError::from)
    }
}

/// Owns the session state, the frame-source handle and the capture path.
///
/// All state changes go through [`SessionStateMachine::handle`]. Nothing
/// else acquires or releases the frame source.
pub struct SessionStateMachine {
    state: SessionState,
    frame_source: Arc<dyn FrameSource>,
    handle: Option<StreamHandle>,
    zoom_capability: Option<ZoomCapability>,
    still: Option<Frame>,
    picker: Arc<dyn ImagePicker>,
    segmentation: Arc<SegmentationAdapter>,
    compositor: Arc<CaptureCompositor>,
    composer: PreviewComposer,
    event_bus: Arc<EventBus>,
    epoch: u64,
    next_still_id: u64,
}

impl SessionStateMachine {
    pub fn new(
        config: &LuminaConfig,
        frame_source: Arc<dyn FrameSource>,
        picker: Arc<dyn ImagePicker>,
        oracle: Option<Arc<dyn SegmentationOracle>>,
        sink: Arc<dyn OutputSink>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let hue_fallback = config.segmentation.hue_fallback;
        let segmentation = Arc::new(SegmentationAdapter::with_event_bus(
            oracle,
            &config.segmentation,
            Arc::clone(&event_bus),
        ));
        let compositor = Arc::new(CaptureCompositor::new(
            config.capture.clone(),
            ColorPipeline::new(hue_fallback),
            Arc::clone(&segmentation),
            sink,
        ));

        Self {
            state: SessionState::new(config.camera.facing, config.adjustments.to_adjustments()),
            frame_source,
            handle: None,
            zoom_capability: None,
            still: None,
            picker,
            segmentation,
            compositor,
            composer: PreviewComposer::new(hue_fallback, config.capture.glow_radius),
            event_bus,
            epoch: 0,
            next_still_id: 0,
        }
    }

    /// Snapshot of the session. `segmentation_available` is read from the
    /// adapter, which may disable the model from a background task.
    pub fn state(&self) -> SessionState {
        let mut state = self.state.clone();
        state.segmentation_available = self.segmentation.is_available();
        state
    }

    pub fn has_source(&self) -> bool {
        self.handle.is_some()
    }

    /// Source identity; bumped on every mode or facing change
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn segmentation(&self) -> &Arc<SegmentationAdapter> {
        &self.segmentation
    }

    pub fn compositor(&self) -> &Arc<CaptureCompositor> {
        &self.compositor
    }

    /// Load the segmentation model and open the camera. A camera failure is
    /// returned, but the session stays usable in camera mode without a source.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting session ({} camera)", self.state.facing);

        match self.segmentation.initialize().await {
            Ok(()) => {
                self.state.segmentation_available = true;
                let oracle = self.segmentation.oracle_name().unwrap_or("unknown").to_string();
                self.emit(LuminaEvent::SegmentationReady { oracle }).await;
            }
            Err(e) => {
                self.state.segmentation_available = false;
                self.emit(LuminaEvent::SegmentationUnavailable {
                    reason: e.to_string(),
                })
                .await;
            }
        }

        self.acquire_source().await?;
        Ok(())
    }

    /// Release the frame source
    pub async fn shutdown(&mut self) {
        self.release_source().await;
        info!("Session stopped");
    }

    /// Apply one UI event. Only `Shutter` returns a task.
    pub async fn handle(&mut self, event: UiEvent) -> Result<Option<CaptureTask>> {
        debug!("Handling UI event: {}", event.name());
        self.state.segmentation_available = self.segmentation.is_available();

        match event {
            UiEvent::AdjustmentChanged { field, value } => {
                self.state.adjustments.set(field, value);
                debug!("{:?} = {}", field, self.state.adjustments.get(field));
            }
            UiEvent::PresetSelected(preset) => {
                self.state.adjustments.set_preset(preset);
                debug!("Preset = {}", preset);
            }
            UiEvent::Reset => {
                self.state.adjustments.reset_sliders();
                debug!("Sliders reset, preset {} kept", self.state.adjustments.preset());
            }
            UiEvent::OpenGallery => self.open_gallery().await?,
            UiEvent::CloseGallery => self.close_gallery().await?,
            UiEvent::ToggleFacing => self.toggle_facing().await?,
            UiEvent::ZoomChanged(level) => self.set_zoom(level).await,
            UiEvent::Shutter => return self.shutter().await,
        }

        Ok(None)
    }

    async fn open_gallery(&mut self) -> Result<()> {
        let Some(bytes) = self.picker.pick_image().await? else {
            debug!("Gallery selection cancelled, staying in {} mode", self.state.mode);
            return Ok(());
        };

        let frame = decode_still(&bytes, self.next_still_id)?;
        self.next_still_id += 1;

        self.release_source().await;
        info!("Showing still image {}x{}", frame.width(), frame.height());
        self.still = Some(frame);
        self.enter_mode(Mode::StillImage).await;
        Ok(())
    }

    async fn close_gallery(&mut self) -> Result<()> {
        if self.state.mode != Mode::StillImage {
            debug!("Close gallery ignored outside still-image mode");
            return Ok(());
        }

        self.still = None;
        self.enter_mode(Mode::Camera).await;
        self.acquire_source().await?;
        Ok(())
    }

    async fn toggle_facing(&mut self) -> Result<()> {
        self.state.facing = self.state.facing.toggle();
        self.bump_epoch();
        self.emit(LuminaEvent::FacingChanged {
            facing: self.state.facing,
            timestamp: SystemTime::now(),
        })
        .await;

        if self.state.mode == Mode::Camera {
            self.acquire_source().await?;
        }
        Ok(())
    }

    async fn enter_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
        self.bump_epoch();
        self.emit(LuminaEvent::ModeChanged {
            mode,
            timestamp: SystemTime::now(),
        })
        .await;
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.segmentation.set_epoch(self.epoch);
    }

    /// Release the current handle, then open one for the current facing.
    /// Two device handles are never held at once.
    async fn acquire_source(&mut self) -> std::result::Result<(), CameraError> {
        self.release_source().await;

        let facing = self.state.facing;
        match self.frame_source.acquire(facing).await {
            Ok(handle) => {
                let (width, height) = handle.dimensions();
                self.zoom_capability = self.frame_source.zoom_capability(&handle);
                self.handle = Some(handle);
                self.emit(LuminaEvent::SourceAcquired {
                    facing,
                    width,
                    height,
                    hardware_zoom: self.zoom_capability.is_some(),
                })
                .await;

                // Carry the session zoom over to the new device
                self.set_zoom(self.state.zoom_level).await;
                Ok(())
            }
            Err(e) => {
                self.emit(LuminaEvent::AcquisitionFailed {
                    facing,
                    error: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn release_source(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Releasing {} camera", handle.facing());
            self.frame_source.release(handle).await;
        }
        self.zoom_capability = None;
    }

    /// Prefer optical zoom when the source has it, otherwise crop in software
    async fn set_zoom(&mut self, level: f32) {
        if !level.is_finite() {
            warn!("Ignoring non-finite zoom level");
            return;
        }

        if let (Some(handle), Some(capability)) = (&self.handle, self.zoom_capability) {
            let constrained = capability.constrain(level);
            match self.frame_source.apply_zoom(handle, constrained).await {
                Ok(()) => {
                    self.state.zoom_level = constrained;
                    self.state.zoom_mode = ZoomMode::Hardware;
                    debug!("Hardware zoom {:.2}", constrained);
                    return;
                }
                Err(e) => warn!("Hardware zoom failed, using software zoom: {}", e),
            }
        }

        self.state.zoom_level = level.clamp(MIN_ZOOM, MAX_SOFTWARE_ZOOM);
        self.state.zoom_mode = ZoomMode::Software;
        debug!("Software zoom {:.2}", self.state.zoom_level);
    }

    /// Latest frame of whatever the session is showing
    async fn current_frame(&self) -> std::result::Result<Option<Frame>, CameraError> {
        match self.state.mode {
            Mode::StillImage => Ok(self.still.clone()),
            Mode::Camera => match &self.handle {
                Some(handle) => self.frame_source.current_frame(handle).await.map(Some),
                None => Ok(None),
            },
        }
    }

    /// Start a capture of the current frame with a snapshot of the state
    async fn shutter(&mut self) -> Result<Option<CaptureTask>> {
        if self.compositor.is_busy() {
            self.emit(LuminaEvent::CaptureIgnored {
                reason: "capture already in progress".to_string(),
            })
            .await;
            return Ok(None);
        }

        let frame = match self.current_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                let error = CameraError::NotAcquired;
                self.emit(LuminaEvent::CaptureFailed {
                    error: error.to_string(),
                })
                .await;
                return Err(error.into());
            }
            Err(e) => {
                self.emit(LuminaEvent::CaptureFailed {
                    error: e.to_string(),
                })
                .await;
                return Err(e.into());
            }
        };

        let snapshot = self.state();
        let compositor = Arc::clone(&self.compositor);
        let event_bus = Arc::clone(&self.event_bus);

        let task = tokio::spawn(async move {
            let result = compositor.capture(&frame, &snapshot).await;
            let event = match &result {
                Ok(report) => LuminaEvent::CaptureCompleted {
                    filename: report.filename.clone(),
                    bytes: report.bytes.len(),
                    mask_applied: report.mask_applied,
                },
                Err(CaptureError::InProgress) => LuminaEvent::CaptureIgnored {
                    reason: "capture already in progress".to_string(),
                },
                Err(e) => LuminaEvent::CaptureFailed {
                    error: e.to_string(),
                },
            };
            if let Err(e) = event_bus.publish(event).await {
                debug!("Capture outcome not delivered: {}", e);
            }
            result
        });

        Ok(Some(CaptureTask(task)))
    }

    /// One display tick: grab the frame, poll streaming segmentation and
    /// compose the display filter. `None` when there is nothing to show.
    pub async fn preview_tick(&self) -> Result<Option<PreviewFrame>> {
        let Some(frame) = self.current_frame().await? else {
            return Ok(None);
        };

        let adjustments = &self.state.adjustments;
        let mask = if adjustments.has_hair_hue() && self.segmentation.is_available() {
            self.segmentation
                .classify_streaming(&frame, self.epoch)
                .mask()
                .cloned()
        } else {
            None
        };

        let descriptor = self.composer.compose(
            adjustments,
            mask.is_some(),
            self.state.is_mirrored(),
            self.state.software_zoom(),
        );

        Ok(Some(PreviewFrame {
            frame,
            descriptor,
            mask,
        }))
    }

    async fn emit(&self, event: LuminaEvent) {
        if let Err(e) = self.event_bus.publish(event).await {
            debug!("Event not delivered: {}", e);
        }
    }
}
