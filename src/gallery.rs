use crate::error::GalleryError;
use crate::frame::{Frame, FrameOrigin};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, info};

/// File/gallery collaborator
#[async_trait]
pub trait ImagePicker: Send + Sync {
    /// Raw encoded bytes of the chosen image, or `None` if the user cancelled
    async fn pick_image(&self) -> Result<Option<Vec<u8>>, GalleryError>;
}

/// Picker that "chooses" a fixed path. `None` behaves like a cancelled dialog.
pub struct FilePicker {
    path: Option<PathBuf>,
}

impl FilePicker {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl ImagePicker for FilePicker {
    async fn pick_image(&self) -> Result<Option<Vec<u8>>, GalleryError> {
        let Some(path) = &self.path else {
            debug!("Image picker cancelled");
            return Ok(None);
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| GalleryError::Read {
                path: path.display().to_string(),
                source,
            })?;

        info!("Picked {} ({} bytes)", path.display(), bytes.len());
        Ok(Some(bytes))
    }
}

/// Decode picked bytes into a still frame at its natural size
pub fn decode_still(bytes: &[u8], id: u64) -> Result<Frame, GalleryError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| GalleryError::Decode {
            details: e.to_string(),
        })?
        .to_rgba8();

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(GalleryError::Empty { width, height });
    }

    debug!("Decoded still image {}x{}", width, height);
    Ok(Frame::new(id, SystemTime::now(), image, FrameOrigin::Still))
}
