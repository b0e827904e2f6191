mod adapter;
mod mask;
mod mock;
mod oracle;
mod static_mask;

pub use adapter::{ModelStatus, SegmentationAdapter, SegmentationStats, StreamingPoll};
pub use mask::SegmentationMask;
pub use mock::MockSegmentationOracle;
pub use oracle::SegmentationOracle;
pub use static_mask::StaticMaskOracle;
