use super::adjustments::{AdjustmentConfig, Preset};
use super::matrix::{
    clamp_channel, contrast_channel, saturate, weighted_sum, ColorMatrix, GRAY_WEIGHTS,
};
use crate::error::SegmentationError;
use crate::segmentation::SegmentationMask;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// What to do with the hair hue when no usable mask exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HueFallback {
    /// Leave the hue untouched (no global discoloration)
    #[default]
    Skip,
    /// Rotate every pixel as a degraded approximation
    Global,
}

/// Where the hue stage ended up being applied for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HueScope {
    /// Hue is identity, or there was no mask and the fallback is `Skip`
    Skipped,
    /// Only mask-selected pixels were rotated
    Masked,
    /// All pixels were rotated
    Global,
}

/// Per-pixel tone and color pipeline. Deterministic and free of I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorPipeline {
    hue_fallback: HueFallback,
}

/// Stage parameters resolved once per pass. Identity stages are `None`.
#[derive(Debug, Clone, Copy)]
struct PixelProgram {
    hue: Option<ColorMatrix>,
    brightness: Option<f32>,
    contrast: Option<f32>,
    saturation: Option<f32>,
    preset: Preset,
}

impl PixelProgram {
    fn compile(config: &AdjustmentConfig) -> Self {
        let factor = |v: f32| if v == 100.0 { None } else { Some(v / 100.0) };

        Self {
            hue: config
                .has_hair_hue()
                .then(|| ColorMatrix::hue_rotation(config.hair_hue_degrees())),
            brightness: factor(config.brightness()),
            contrast: factor(config.contrast()),
            saturation: factor(config.saturation()),
            preset: config.preset(),
        }
    }

    #[inline]
    fn run(&self, mut rgb: [f32; 3], rotate_hue: bool) -> [f32; 3] {
        if rotate_hue {
            if let Some(matrix) = &self.hue {
                rgb = matrix.apply(rgb);
            }
        }

        if let Some(b) = self.brightness {
            rgb = rgb.map(|c| c * b);
        }

        if let Some(c) = self.contrast {
            rgb = rgb.map(|v| contrast_channel(v, c));
        }

        if let Some(s) = self.saturation {
            rgb = saturate(rgb, s);
        }

        apply_preset(self.preset, rgb)
    }
}

fn apply_preset(preset: Preset, rgb: [f32; 3]) -> [f32; 3] {
    match preset {
        Preset::None => rgb,
        Preset::Monochrome => {
            let gray = weighted_sum(rgb, GRAY_WEIGHTS);
            [gray; 3]
        }
        Preset::Sepia => ColorMatrix::SEPIA.apply(rgb),
        Preset::Vintage => {
            let toned = ColorMatrix::SEPIA.blend_with_identity(0.5).apply(rgb);
            toned.map(|v| contrast_channel(v, 0.8) * 1.1)
        }
        Preset::Cyber => {
            let [r, g, b] = rgb;
            let pushed = [
                contrast_channel(r, 1.4),
                contrast_channel(g, 1.4),
                contrast_channel(b, 1.6),
            ];
            saturate(pushed, 2.0)
        }
        Preset::AutoEnhance => saturate(rgb.map(|v| contrast_channel(v, 1.15)), 1.25),
    }
}

impl ColorPipeline {
    pub fn new(hue_fallback: HueFallback) -> Self {
        Self { hue_fallback }
    }

    pub fn hue_fallback(&self) -> HueFallback {
        self.hue_fallback
    }

    /// Decide how the hue stage applies to a `width`x`height` buffer.
    /// A mask whose dimensions differ from the buffer counts as absent.
    pub fn hue_scope(
        &self,
        config: &AdjustmentConfig,
        mask: Option<&SegmentationMask>,
        width: u32,
        height: u32,
    ) -> HueScope {
        if !config.has_hair_hue() {
            return HueScope::Skipped;
        }

        match mask {
            Some(mask) if mask.matches(width, height) => HueScope::Masked,
            Some(mask) => {
                warn!(
                    "Ignoring {}x{} mask for {}x{} buffer",
                    mask.width(),
                    mask.height(),
                    width,
                    height
                );
                self.fallback_scope()
            }
            None => self.fallback_scope(),
        }
    }

    fn fallback_scope(&self) -> HueScope {
        match self.hue_fallback {
            HueFallback::Skip => HueScope::Skipped,
            HueFallback::Global => HueScope::Global,
        }
    }

    /// Run every stage over `image` in place. Alpha is left untouched.
    /// Returns where the hue stage was applied.
    pub fn apply(
        &self,
        image: &mut RgbaImage,
        config: &AdjustmentConfig,
        mask: Option<&SegmentationMask>,
    ) -> HueScope {
        let (width, height) = image.dimensions();
        let scope = self.hue_scope(config, mask, width, height);

        if config.is_identity() {
            trace!("Identity adjustments, skipping {}x{} pass", width, height);
            return scope;
        }

        let program = PixelProgram::compile(config);
        let hair = match scope {
            HueScope::Masked => mask.map(|m| m.as_slice()),
            _ => None,
        };

        for (index, pixel) in image.pixels_mut().enumerate() {
            let rotate_hue = match scope {
                HueScope::Skipped => false,
                HueScope::Global => true,
                HueScope::Masked => hair.map_or(false, |h| h[index] == SegmentationMask::HAIR),
            };

            let [r, g, b, _] = pixel.0;
            let out = program.run([r as f32, g as f32, b as f32], rotate_hue);
            pixel.0[0] = clamp_channel(out[0]);
            pixel.0[1] = clamp_channel(out[1]);
            pixel.0[2] = clamp_channel(out[2]);
        }

        trace!("Applied color pipeline to {}x{} ({:?})", width, height, scope);
        scope
    }

    /// Apply to a copy, leaving `image` untouched
    pub fn apply_to_copy(
        &self,
        image: &RgbaImage,
        config: &AdjustmentConfig,
        mask: Option<&SegmentationMask>,
    ) -> RgbaImage {
        let mut out = image.clone();
        self.apply(&mut out, config, mask);
        out
    }

    /// Transform a single RGB triple
    pub fn apply_pixel(
        &self,
        rgb: [u8; 3],
        config: &AdjustmentConfig,
        rotate_hue: bool,
    ) -> [u8; 3] {
        let program = PixelProgram::compile(config);
        program
            .run(rgb.map(|c| c as f32), rotate_hue)
            .map(clamp_channel)
    }
}

/// Zero the alpha of every pixel outside the mask, leaving only hair opaque.
pub fn isolate_masked(
    image: &mut RgbaImage,
    mask: &SegmentationMask,
) -> Result<(), SegmentationError> {
    let (width, height) = image.dimensions();
    if !mask.matches(width, height) {
        return Err(SegmentationError::MaskDimensions {
            mask_width: mask.width(),
            mask_height: mask.height(),
            width,
            height,
        });
    }

    for (pixel, &class) in image.pixels_mut().zip(mask.as_slice()) {
        if class != SegmentationMask::HAIR {
            pixel.0[3] = 0;
        }
    }

    Ok(())
}
