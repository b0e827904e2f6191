use super::mask::SegmentationMask;
use super::oracle::SegmentationOracle;
use crate::error::SegmentationError;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Mock oracle for testing without a real model.
///
/// Marks the top `hair_fraction` of rows as hair. Failure, latency and
/// misaligned output can be injected to exercise the adapter's policies.
pub struct MockSegmentationOracle {
    fail_load: bool,
    fail_classify: AtomicBool,
    wrong_dimensions: bool,
    delay: Duration,
    hair_fraction: f32,
    load_calls: AtomicUsize,
    classify_calls: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl MockSegmentationOracle {
    pub fn new() -> Self {
        Self {
            fail_load: false,
            fail_classify: AtomicBool::new(false),
            wrong_dimensions: false,
            delay: Duration::ZERO,
            hair_fraction: 0.25,
            load_calls: AtomicUsize::new(0),
            classify_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
        }
    }

    /// Oracle whose model never loads
    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new()
        }
    }

    /// Oracle that loads but errors on every classification
    pub fn failing_classify() -> Self {
        let oracle = Self::new();
        oracle.fail_classify.store(true, Ordering::SeqCst);
        oracle
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_hair_fraction(mut self, fraction: f32) -> Self {
        self.hair_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Return masks one pixel narrower than the input
    pub fn with_wrong_dimensions(mut self) -> Self {
        self.wrong_dimensions = true;
        self
    }

    pub fn set_fail_classify(&self, fail: bool) {
        self.fail_classify.store(fail, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    /// Highest number of classifications observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// The mask this oracle produces for a `width`x`height` buffer
    pub fn expected_mask(&self, width: u32, height: u32) -> SegmentationMask {
        let hair_rows = (height as f32 * self.hair_fraction).round() as u32;
        SegmentationMask::from_fn(width, height, |_, y| y < hair_rows)
    }
}

impl Default for MockSegmentationOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentationOracle for MockSegmentationOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self) -> Result<(), SegmentationError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(SegmentationError::LoadFailed {
                details: "mock model asset missing".to_string(),
            });
        }
        Ok(())
    }

    async fn classify(&self, image: &RgbaImage) -> Result<SegmentationMask, SegmentationError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_classify.load(Ordering::SeqCst) {
            debug!("Mock oracle failing classification");
            return Err(SegmentationError::ClassifyFailed {
                details: "mock inference error".to_string(),
            });
        }

        let (width, height) = image.dimensions();
        if self.wrong_dimensions {
            return Ok(self.expected_mask(width.saturating_sub(1), height));
        }

        Ok(self.expected_mask(width, height))
    }
}
