mod interface;
mod synthetic;

pub use interface::{FrameSource, StreamHandle, ZoomCapability};
pub use synthetic::{test_pattern, SyntheticFrameSource};
