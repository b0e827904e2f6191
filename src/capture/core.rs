use super::encode::encode_jpeg;
use super::geometry::FrameGeometry;
use super::metadata::{save_metadata, CaptureMetadata, CaptureStats};
use super::render::{apply_glow, render_source};
use crate::color::{ColorPipeline, HueScope};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::Frame;
use crate::output::{suggested_filename, OutputSink};
use crate::segmentation::SegmentationAdapter;
use crate::session::SessionState;
use chrono::Utc;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of one successful capture
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub geometry: FrameGeometry,
    pub output_width: u32,
    pub output_height: u32,
    pub hue_scope: HueScope,
    pub mask_applied: bool,
    pub metadata: Option<CaptureMetadata>,
}

/// Clears the busy flag when a capture ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one export: geometry, glow, exact mask, color pipeline, encode, deliver.
///
/// Only one capture runs at a time. A shutter that arrives while one is in
/// progress gets `CaptureError::InProgress` and touches nothing.
pub struct CaptureCompositor {
    config: CaptureConfig,
    pipeline: ColorPipeline,
    segmentation: Arc<SegmentationAdapter>,
    sink: Arc<dyn OutputSink>,
    busy: AtomicBool,
    completed: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

impl CaptureCompositor {
    pub fn new(
        config: CaptureConfig,
        pipeline: ColorPipeline,
        segmentation: Arc<SegmentationAdapter>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            config,
            pipeline,
            segmentation,
            sink,
            busy: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            completed: self.completed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Capture `source` with a snapshot of `state`
    pub async fn capture(
        &self,
        source: &Frame,
        state: &SessionState,
    ) -> Result<CaptureReport, CaptureError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            debug!("Shutter ignored, capture already in progress");
            return Err(CaptureError::InProgress);
        }
        let _guard = BusyGuard(&self.busy);

        let started = Instant::now();
        match self.run(source, state).await {
            Ok(report) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Captured {} ({}x{}, {} bytes, hue {:?}) in {:?}",
                    report.filename,
                    report.output_width,
                    report.output_height,
                    report.bytes.len(),
                    report.hue_scope,
                    started.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!("Capture failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run(&self, source: &Frame, state: &SessionState) -> Result<CaptureReport, CaptureError> {
        let (width, height) = source.dimensions();
        if source.is_empty() {
            return Err(CaptureError::EmptySource { width, height });
        }

        let adjustments = state.adjustments;
        let geometry = FrameGeometry::resolve(width, height, state);
        debug!("Capture geometry: {:?}", geometry);

        // Geometry and glow produce the final base buffer the mask is computed from
        let pixels = Arc::clone(&source.image);
        let upscale = self.config.upscale_software_zoom;
        let glow_radius = self.config.glow_radius;
        let glow_amount = adjustments.glow_amount();
        let base = tokio::task::spawn_blocking(move || {
            let mut buffer = render_source(&pixels, &geometry, upscale)?;
            apply_glow(&mut buffer, glow_amount, glow_radius);
            Ok::<_, CaptureError>(buffer)
        })
        .await
        .map_err(|e| CaptureError::Processing {
            details: format!("render task failed: {}", e),
        })??;

        let base = Arc::new(base);
        let mask = if adjustments.has_hair_hue() && self.segmentation.is_available() {
            let mask = self.segmentation.classify_exact(Arc::clone(&base)).await;
            if mask.is_none() {
                warn!("No exact mask for capture, hue follows fallback policy");
            }
            mask
        } else {
            None
        };
        let mask_applied = mask.is_some();

        let pipeline = self.pipeline;
        let quality = self.config.jpeg_quality;
        let (bytes, hue_scope, (output_width, output_height)) =
            tokio::task::spawn_blocking(move || {
                let mut buffer: RgbaImage =
                    Arc::try_unwrap(base).unwrap_or_else(|shared| (*shared).clone());
                let scope = pipeline.apply(&mut buffer, &adjustments, mask.as_ref());
                let bytes = encode_jpeg(&buffer, quality)?;
                Ok::<_, CaptureError>((bytes, scope, buffer.dimensions()))
            })
            .await
            .map_err(|e| CaptureError::Processing {
                details: format!("color task failed: {}", e),
            })??;

        let filename = suggested_filename(&self.config.filename_prefix, SystemTime::now());
        self.sink
            .deliver(&bytes, &filename)
            .await
            .map_err(|source| CaptureError::Delivery {
                filename: filename.clone(),
                source,
            })?;

        let metadata = if self.config.save_metadata {
            let metadata = CaptureMetadata {
                capture_id: Uuid::new_v4(),
                captured_at: Utc::now(),
                filename: filename.clone(),
                origin: source.origin,
                geometry,
                output_width,
                output_height,
                adjustments,
                hue_scope,
                mask_applied,
                bytes: bytes.len(),
            };
            if let Err(e) = save_metadata(&metadata, self.sink.as_ref()).await {
                warn!("Failed to save metadata for {}: {}", filename, e);
            }
            Some(metadata)
        } else {
            None
        };

        Ok(CaptureReport {
            filename,
            bytes,
            geometry,
            output_width,
            output_height,
            hue_scope,
            mask_applied,
            metadata,
        })
    }
}
