use super::geometry::FrameGeometry;
use crate::color::{AdjustmentConfig, HueScope};
use crate::error::OutputError;
use crate::frame::FrameOrigin;
use crate::output::OutputSink;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Counters for the capture path
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureStats {
    pub completed: u64,
    pub ignored: u64,
    pub failed: u64,
}

/// Sidecar describing how a capture was produced
#[derive(Debug, Clone, Serialize)]
pub struct CaptureMetadata {
    pub capture_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub filename: String,
    pub origin: FrameOrigin,
    pub geometry: FrameGeometry,
    pub output_width: u32,
    pub output_height: u32,
    pub adjustments: AdjustmentConfig,
    pub hue_scope: HueScope,
    pub mask_applied: bool,
    pub bytes: usize,
}

impl CaptureMetadata {
    /// `<image stem>.json`
    pub fn sidecar_name(&self) -> String {
        let stem = self
            .filename
            .rsplit_once('.')
            .map_or(self.filename.as_str(), |(stem, _)| stem);
        format!("{}.json", stem)
    }
}

/// Deliver the metadata as pretty JSON through the same sink as the image
pub(crate) async fn save_metadata(
    metadata: &CaptureMetadata,
    sink: &dyn OutputSink,
) -> Result<(), OutputError> {
    let name = metadata.sidecar_name();
    let json = serde_json::to_vec_pretty(metadata).map_err(|e| OutputError::Rejected {
        filename: name.clone(),
        details: format!("Failed to serialize metadata: {}", e),
    })?;

    sink.deliver(&json, &name).await?;
    debug!("Saved capture metadata {}", name);
    Ok(())
}
