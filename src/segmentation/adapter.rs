use super::mask::SegmentationMask;
use super::oracle::SegmentationOracle;
use crate::config::SegmentationConfig;
use crate::error::SegmentationError;
use crate::events::{EventBus, LuminaEvent};
use crate::frame::Frame;
use image::RgbaImage;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Availability of the segmentation model for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Uninitialized,
    Ready,
    /// Permanently disabled for the rest of the session
    Unavailable,
}

/// Result of one non-blocking streaming request
#[derive(Debug, Clone)]
pub enum StreamingPoll {
    /// Most recent mask for the current source epoch
    Mask(Arc<SegmentationMask>),
    /// Nothing usable yet; a request may be in flight
    Pending,
    /// The model is disabled
    Unavailable,
}

impl StreamingPoll {
    pub fn mask(&self) -> Option<&Arc<SegmentationMask>> {
        match self {
            StreamingPoll::Mask(mask) => Some(mask),
            _ => None,
        }
    }
}

/// Counters describing adapter activity
#[derive(Debug, Clone, Default, Serialize)]
pub struct SegmentationStats {
    pub streaming_requests: u64,
    pub skipped_busy: u64,
    pub skipped_throttle: u64,
    pub stale_discarded: u64,
    pub exact_requests: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    streaming_requests: AtomicU64,
    skipped_busy: AtomicU64,
    skipped_throttle: AtomicU64,
    stale_discarded: AtomicU64,
    exact_requests: AtomicU64,
    failures: AtomicU64,
}

struct StreamingSlot {
    epoch: u64,
    frame_id: u64,
    mask: Arc<SegmentationMask>,
}

/// Clears the in-flight flag when the streaming task finishes or panics
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// State shared with spawned streaming tasks
struct Shared {
    oracle: Option<Arc<dyn SegmentationOracle>>,
    status: RwLock<ModelStatus>,
    consecutive_failures: AtomicU32,
    max_consecutive_failures: u32,
    current_epoch: AtomicU64,
    latest: Mutex<Option<StreamingSlot>>,
    counters: Counters,
    event_bus: Option<Arc<EventBus>>,
}

impl Shared {
    fn is_available(&self) -> bool {
        *self.status.read() == ModelStatus::Ready
    }

    /// Returns true when this call moved the model to `Unavailable`
    fn disable(&self, reason: &str) -> bool {
        let newly_disabled = {
            let mut status = self.status.write();
            let changed = *status != ModelStatus::Unavailable;
            if changed {
                warn!("Disabling hair segmentation for this session: {}", reason);
                *status = ModelStatus::Unavailable;
            }
            changed
        };
        self.latest.lock().take();
        newly_disabled
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Count a failure. The one that reaches the limit disables the model
    /// and publishes `SegmentationUnavailable`.
    async fn record_failure(&self, error: &SegmentationError) {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Segmentation failed ({} in a row): {}", failures, error);

        if self.max_consecutive_failures == 0 || failures < self.max_consecutive_failures {
            return;
        }

        let reason = format!("{} consecutive failures, last: {}", failures, error);
        if self.disable(&reason) {
            if let Some(event_bus) = &self.event_bus {
                if let Err(e) = event_bus
                    .publish(LuminaEvent::SegmentationUnavailable { reason })
                    .await
                {
                    debug!("Segmentation outcome not delivered: {}", e);
                }
            }
        }
    }

    /// Store a streaming result unless the source changed while it ran
    fn store_streaming(&self, epoch: u64, frame_id: u64, mask: SegmentationMask) {
        if self.current_epoch.load(Ordering::SeqCst) != epoch {
            self.counters.stale_discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Discarding mask for frame {} from stale source epoch {}",
                frame_id, epoch
            );
            return;
        }

        *self.latest.lock() = Some(StreamingSlot {
            epoch,
            frame_id,
            mask: Arc::new(mask),
        });
    }
}

/// Isolates the rest of the system from segmentation availability and latency.
///
/// Errors from the oracle never leave this type: they become "no mask" for
/// the call that hit them, and enough of them in a row disable the model.
pub struct SegmentationAdapter {
    shared: Arc<Shared>,
    in_flight: Arc<AtomicBool>,
    tick: AtomicU64,
    stream_every_n_frames: u64,
    exact_timeout: Duration,
}

impl SegmentationAdapter {
    pub fn new(oracle: Option<Arc<dyn SegmentationOracle>>, config: &SegmentationConfig) -> Self {
        Self::build(oracle, config, None)
    }

    /// Adapter that publishes `SegmentationUnavailable` on `event_bus` when
    /// repeated failures disable the model mid-session
    pub fn with_event_bus(
        oracle: Option<Arc<dyn SegmentationOracle>>,
        config: &SegmentationConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::build(oracle, config, Some(event_bus))
    }

    fn build(
        oracle: Option<Arc<dyn SegmentationOracle>>,
        config: &SegmentationConfig,
        event_bus: Option<Arc<EventBus>>,
    ) -> Self {
        let oracle = if config.enabled { oracle } else { None };

        Self {
            shared: Arc::new(Shared {
                oracle,
                status: RwLock::new(ModelStatus::Uninitialized),
                consecutive_failures: AtomicU32::new(0),
                max_consecutive_failures: config.max_consecutive_failures,
                current_epoch: AtomicU64::new(0),
                latest: Mutex::new(None),
                counters: Counters::default(),
                event_bus,
            }),
            in_flight: Arc::new(AtomicBool::new(false)),
            tick: AtomicU64::new(0),
            stream_every_n_frames: config.stream_every_n_frames.max(1) as u64,
            exact_timeout: Duration::from_millis(config.exact_timeout_ms.max(1)),
        }
    }

    /// Adapter with no oracle at all
    pub fn disabled(config: &SegmentationConfig) -> Self {
        Self::new(None, config)
    }

    /// Load the oracle once. A failure disables segmentation for the session
    /// and later calls return `Unavailable` without retrying.
    pub async fn initialize(&self) -> Result<(), SegmentationError> {
        match self.status() {
            ModelStatus::Ready => return Ok(()),
            ModelStatus::Unavailable => return Err(SegmentationError::Unavailable),
            ModelStatus::Uninitialized => {}
        }

        let Some(oracle) = self.shared.oracle.clone() else {
            info!("No segmentation oracle configured; selective hue disabled");
            self.shared.disable("no oracle configured");
            return Err(SegmentationError::Unavailable);
        };

        info!("Loading segmentation oracle '{}'", oracle.name());
        match oracle.load().await {
            Ok(()) => {
                *self.shared.status.write() = ModelStatus::Ready;
                info!("Segmentation oracle '{}' ready", oracle.name());
                Ok(())
            }
            Err(e) => {
                self.shared.disable(&e.to_string());
                Err(e)
            }
        }
    }

    pub fn oracle_name(&self) -> Option<&str> {
        self.shared.oracle.as_deref().map(|oracle| oracle.name())
    }

    pub fn status(&self) -> ModelStatus {
        *self.shared.status.read()
    }

    pub fn is_available(&self) -> bool {
        self.shared.is_available()
    }

    /// Whether a streaming classification is currently running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Mark a new source identity. Masks for older epochs are dropped now
    /// and discarded if they arrive later.
    pub fn set_epoch(&self, epoch: u64) {
        let previous = self.shared.current_epoch.swap(epoch, Ordering::SeqCst);
        if previous != epoch {
            debug!("Segmentation epoch {} -> {}", previous, epoch);
            self.shared.latest.lock().take();
        }
    }

    pub fn epoch(&self) -> u64 {
        self.shared.current_epoch.load(Ordering::SeqCst)
    }

    /// Best-effort, non-blocking classification for live preview.
    ///
    /// Returns the latest mask for `epoch` that matches the frame size, and
    /// starts a new background request when the throttle allows and none is
    /// already running. Busy ticks are skipped, never queued.
    pub fn classify_streaming(&self, frame: &Frame, epoch: u64) -> StreamingPoll {
        if !self.is_available() {
            return StreamingPoll::Unavailable;
        }

        let cached = self.latest_for(epoch, frame.width(), frame.height());
        let poll = || match &cached {
            Some(mask) => StreamingPoll::Mask(Arc::clone(mask)),
            None => StreamingPoll::Pending,
        };

        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        if tick % self.stream_every_n_frames != 0 {
            self.shared
                .counters
                .skipped_throttle
                .fetch_add(1, Ordering::Relaxed);
            return poll();
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.shared
                .counters
                .skipped_busy
                .fetch_add(1, Ordering::Relaxed);
            trace!("Streaming segmentation busy, skipping frame {}", frame.id);
            return poll();
        }

        let Some(oracle) = self.shared.oracle.clone() else {
            self.in_flight.store(false, Ordering::SeqCst);
            return StreamingPoll::Unavailable;
        };

        self.shared
            .counters
            .streaming_requests
            .fetch_add(1, Ordering::Relaxed);

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let shared = Arc::clone(&self.shared);
        let image = Arc::clone(&frame.image);
        let frame_id = frame.id;

        tokio::spawn(async move {
            let _guard = guard;
            let (width, height) = image.dimensions();

            match oracle.classify(&image).await {
                Ok(mask) => match mask.ensure_matches(width, height) {
                    Ok(()) => {
                        shared.record_success();
                        shared.store_streaming(epoch, frame_id, mask);
                        trace!("Streaming mask ready for frame {}", frame_id);
                    }
                    Err(e) => shared.record_failure(&e).await,
                },
                Err(e) => shared.record_failure(&e).await,
            }
        });

        poll()
    }

    /// Latest streaming mask for `epoch` aligned to `width`x`height`
    pub fn latest_for(&self, epoch: u64, width: u32, height: u32) -> Option<Arc<SegmentationMask>> {
        let mut latest = self.shared.latest.lock();
        match latest.as_ref() {
            Some(slot) if slot.epoch != epoch => {
                self.shared
                    .counters
                    .stale_discarded
                    .fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Dropping mask for frame {} (epoch {} != {})",
                    slot.frame_id, slot.epoch, epoch
                );
                latest.take();
                None
            }
            Some(slot) if slot.mask.matches(width, height) => Some(Arc::clone(&slot.mask)),
            _ => None,
        }
    }

    /// One-shot classification of an exact buffer, used at capture time.
    ///
    /// Runs on its own task under a timeout, so oracle errors, panics and
    /// hangs all come back as `None`.
    pub async fn classify_exact(&self, image: Arc<RgbaImage>) -> Option<SegmentationMask> {
        if !self.is_available() {
            return None;
        }

        let oracle = self.shared.oracle.clone()?;
        self.shared
            .counters
            .exact_requests
            .fetch_add(1, Ordering::Relaxed);

        let (width, height) = image.dimensions();
        let task_image = Arc::clone(&image);
        let mut task = tokio::spawn(async move { oracle.classify(&task_image).await });

        let outcome = match tokio::time::timeout(self.exact_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SegmentationError::ClassifyFailed {
                details: format!("oracle task failed: {}", join_error),
            }),
            Err(_) => {
                task.abort();
                Err(SegmentationError::Timeout {
                    millis: self.exact_timeout.as_millis() as u64,
                })
            }
        };

        match outcome.and_then(|mask| mask.ensure_matches(width, height).map(|()| mask)) {
            Ok(mask) => {
                self.shared.record_success();
                debug!(
                    "Exact mask for {}x{}: {} hair pixels",
                    width,
                    height,
                    mask.hair_pixel_count()
                );
                Some(mask)
            }
            Err(e) => {
                self.shared.record_failure(&e).await;
                None
            }
        }
    }

    pub fn stats(&self) -> SegmentationStats {
        let c = &self.shared.counters;
        SegmentationStats {
            streaming_requests: c.streaming_requests.load(Ordering::Relaxed),
            skipped_busy: c.skipped_busy.load(Ordering::Relaxed),
            skipped_throttle: c.skipped_throttle.load(Ordering::Relaxed),
            stale_discarded: c.stale_discarded.load(Ordering::Relaxed),
            exact_requests: c.exact_requests.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
        }
    }
}
