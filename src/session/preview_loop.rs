use super::machine::{PreviewFrame, SessionStateMachine};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreviewLoopStats {
    pub ticks: u64,
    pub frames: u64,
    /// Frames that had a streaming hair mask
    pub masked_frames: u64,
    /// Ticks with nothing to show (no source)
    pub empty_ticks: u64,
    pub errors: u64,
}

/// Recurring preview task bound to the display refresh rate.
///
/// Late ticks are skipped rather than bunched up, and each tick only polls
/// segmentation, so a slow model never backs up the loop.
pub struct PreviewLoop {
    period: Duration,
    max_ticks: Option<u64>,
    cancellation_token: CancellationToken,
}

impl PreviewLoop {
    pub fn new(fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            max_ticks: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Stop by itself after `ticks` ticks
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    /// Run until cancelled or the tick limit is hit, handing every composed
    /// frame to `on_frame`.
    pub async fn run<F>(&self, machine: Arc<Mutex<SessionStateMachine>>, mut on_frame: F) -> PreviewLoopStats
    where
        F: FnMut(&PreviewFrame),
    {
        let mut stats = PreviewLoopStats::default();
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Preview loop started ({:?} per tick)", self.period);

        loop {
            if self.max_ticks.is_some_and(|max| stats.ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    debug!("Preview loop cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            stats.ticks += 1;
            let result = machine.lock().await.preview_tick().await;

            match result {
                Ok(Some(preview)) => {
                    stats.frames += 1;
                    if preview.mask.is_some() {
                        stats.masked_frames += 1;
                    }
                    trace!("Preview frame {}: {}", preview.frame.id, preview.descriptor.css());
                    on_frame(&preview);
                }
                Ok(None) => stats.empty_ticks += 1,
                Err(e) => {
                    stats.errors += 1;
                    warn!("Preview tick failed: {}", e);
                }
            }
        }

        info!(
            "Preview loop stopped after {} ticks ({} frames, {} with mask)",
            stats.ticks, stats.frames, stats.masked_frames
        );
        stats
    }
}
