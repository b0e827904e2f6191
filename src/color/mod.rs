mod adjustments;
mod matrix;
mod pipeline;
#[cfg(test)]
mod tests;

pub use adjustments::{AdjustmentConfig, AdjustmentField, Preset};
pub use matrix::{
    clamp_channel, contrast_channel, saturate, ColorMatrix, GRAY_WEIGHTS, LUMA_WEIGHTS,
};
pub use pipeline::{isolate_masked, ColorPipeline, HueFallback, HueScope};
