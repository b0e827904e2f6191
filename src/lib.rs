pub mod camera;
pub mod capture;
pub mod color;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod gallery;
pub mod output;
pub mod preview;
pub mod segmentation;
pub mod session;

pub use camera::{FrameSource, StreamHandle, SyntheticFrameSource, ZoomCapability};
pub use capture::{CaptureCompositor, CaptureMetadata, CaptureReport, CaptureStats, FrameGeometry};
pub use color::{AdjustmentConfig, AdjustmentField, ColorPipeline, HueFallback, HueScope, Preset};
pub use config::LuminaConfig;
pub use error::{LuminaError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, LuminaEvent};
pub use frame::{Frame, FrameOrigin};
pub use gallery::{FilePicker, ImagePicker};
pub use output::{DirectorySink, MemorySink, OutputSink};
pub use preview::{PreviewComposer, PreviewDescriptor};
pub use segmentation::{
    MockSegmentationOracle, SegmentationAdapter, SegmentationMask, SegmentationOracle,
    StaticMaskOracle,
};
pub use session::{
    CaptureTask, FacingDirection, Mode, PreviewFrame, PreviewLoop, SessionState,
    SessionStateMachine, UiEvent,
};
