mod core;
mod encode;
mod geometry;
mod metadata;
mod render;

pub use self::core::{CaptureCompositor, CaptureReport};
pub use encode::encode_jpeg;
pub use geometry::{CropRect, FrameGeometry};
pub use metadata::{CaptureMetadata, CaptureStats};
pub use render::{apply_glow, render_source};
