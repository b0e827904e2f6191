use thiserror::Error;

#[derive(Error, Debug)]
pub enum LuminaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Gallery error: {0}")]
    Gallery(#[from] GalleryError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },
}

impl LuminaError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Frame source failures. All of these are reported to the UI and leave the
/// session in camera mode without an active source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Failed to acquire {facing} camera: {details}")]
    AcquisitionFailed { facing: String, details: String },

    #[error("Camera access denied: {details}")]
    PermissionDenied { details: String },

    #[error("No frame source is currently acquired")]
    NotAcquired,

    #[error("Frame unavailable: {details}")]
    FrameUnavailable { details: String },

    #[error("Hardware zoom not supported by this source")]
    ZoomUnsupported,

    #[error("Failed to apply hardware zoom {level}: {details}")]
    ZoomFailed { level: f32, details: String },
}

/// Segmentation oracle failures. These never escape the adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentationError {
    #[error("Segmentation model unavailable")]
    Unavailable,

    #[error("Failed to load segmentation model: {details}")]
    LoadFailed { details: String },

    #[error("Segmentation failed: {details}")]
    ClassifyFailed { details: String },

    #[error("Segmentation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Mask is {mask_width}x{mask_height} but buffer is {width}x{height}")]
    MaskDimensions {
        mask_width: u32,
        mask_height: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("A capture is already in progress")]
    InProgress,

    #[error("Capture source is empty ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("Image processing failed: {details}")]
    Processing { details: String },

    #[error("JPEG encoding failed: {details}")]
    Encoding { details: String },

    #[error("Failed to deliver {filename}: {source}")]
    Delivery {
        filename: String,
        #[source]
        source: OutputError,
    },
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory {path}: {source}")]
    DirectoryCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output sink rejected {filename}: {details}")]
    Rejected { filename: String, details: String },
}

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Failed to read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {details}")]
    Decode { details: String },

    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, LuminaError>;
