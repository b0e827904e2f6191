//! Cheap, approximate display filter derived from the adjustment state.
//!
//! The descriptor is an ordered filter chain in the shape a hardware
//! compositor accepts (manual adjustments first, then the preset). It is
//! not pixel-exact. Known divergences from the capture pipeline:
//!
//! - Without a live mask and with `HueFallback::Global`, hue is rotated over
//!   the whole frame, while capture re-segments and rotates only hair.
//! - `cyber` is approximated with a uniform contrast push instead of the
//!   per-channel one.
//! - The hair overlay is hue-rotated from the unfiltered frame, so the
//!   preset and tone stages never reach hair in the preview. Capture runs
//!   every stage over the hair pixels.

use crate::color::{
    contrast_channel, isolate_masked, saturate, AdjustmentConfig, ColorMatrix, HueFallback,
    Preset, GRAY_WEIGHTS,
};
use crate::error::SegmentationError;
use crate::segmentation::SegmentationMask;
use image::RgbaImage;
use serde::Serialize;
use std::fmt;

/// One named effect in the display filter chain. Amounts are fractions
/// (1.0 = identity for brightness/contrast/saturate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "filter", content = "amount", rename_all = "kebab-case")]
pub enum FilterStep {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Grayscale(f32),
    Sepia(f32),
    HueRotate(f32),
}

impl FilterStep {
    /// Approximate effect on one RGB triple in 0..=255 space, unclamped
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match *self {
            FilterStep::Brightness(b) => rgb.map(|c| c * b),
            FilterStep::Contrast(c) => rgb.map(|v| contrast_channel(v, c)),
            FilterStep::Saturate(s) => saturate(rgb, s),
            FilterStep::Grayscale(amount) => {
                let gray = rgb
                    .iter()
                    .zip(GRAY_WEIGHTS)
                    .map(|(c, w)| c * w)
                    .sum::<f32>();
                rgb.map(|c| c + (gray - c) * amount)
            }
            FilterStep::Sepia(amount) => ColorMatrix::SEPIA.blend_with_identity(amount).apply(rgb),
            FilterStep::HueRotate(degrees) => ColorMatrix::hue_rotation(degrees).apply(rgb),
        }
    }
}

fn percent(amount: f32) -> String {
    format!("{}%", (amount * 100.0).round())
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FilterStep::Brightness(v) => write!(f, "brightness({})", percent(v)),
            FilterStep::Contrast(v) => write!(f, "contrast({})", percent(v)),
            FilterStep::Saturate(v) => write!(f, "saturate({})", percent(v)),
            FilterStep::Grayscale(v) => write!(f, "grayscale({})", percent(v)),
            FilterStep::Sepia(v) => write!(f, "sepia({})", percent(v)),
            FilterStep::HueRotate(v) => write!(f, "hue-rotate({}deg)", v),
        }
    }
}

/// Hue-rotated hair layer drawn over the filtered frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HairOverlay {
    pub hue_degrees: f32,
}

impl HairOverlay {
    /// Build the overlay layer: hue-rotated hair pixels, everything else
    /// transparent.
    pub fn render(
        &self,
        frame: &RgbaImage,
        mask: &SegmentationMask,
    ) -> Result<RgbaImage, SegmentationError> {
        let mut layer = frame.clone();
        isolate_masked(&mut layer, mask)?;

        let rotation = ColorMatrix::hue_rotation(self.hue_degrees);
        for pixel in layer.pixels_mut().filter(|p| p.0[3] != 0) {
            let [r, g, b, _] = pixel.0;
            let out = rotation.apply([r as f32, g as f32, b as f32]);
            pixel.0[0] = out[0].round().clamp(0.0, 255.0) as u8;
            pixel.0[1] = out[1].round().clamp(0.0, 255.0) as u8;
            pixel.0[2] = out[2].round().clamp(0.0, 255.0) as u8;
        }

        Ok(layer)
    }
}

/// Blurred copy blended with a lighten mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlowOverlay {
    pub radius: f32,
    pub opacity: f32,
}

/// Geometry shared with capture: flip first, then centered zoom
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewTransform {
    pub mirrored: bool,
    pub scale: f32,
}

impl Default for PreviewTransform {
    fn default() -> Self {
        Self {
            mirrored: false,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewDescriptor {
    pub steps: Vec<FilterStep>,
    pub hair_overlay: Option<HairOverlay>,
    pub glow: Option<GlowOverlay>,
    pub transform: PreviewTransform,
}

impl PreviewDescriptor {
    /// Filter chain as a CSS `filter` value
    pub fn css(&self) -> String {
        if self.steps.is_empty() {
            return "none".to_string();
        }

        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the chain over one pixel, as the display would
    pub fn apply_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        self.steps
            .iter()
            .fold(rgb.map(|c| c as f32), |acc, step| {
                step.apply(acc).map(|c| c.clamp(0.0, 255.0))
            })
            .map(|c| c.round() as u8)
    }
}

/// Maps adjustment state to a display filter descriptor
#[derive(Debug, Clone, Copy)]
pub struct PreviewComposer {
    hue_fallback: HueFallback,
    glow_radius: f32,
}

impl PreviewComposer {
    pub fn new(hue_fallback: HueFallback, glow_radius: f32) -> Self {
        Self {
            hue_fallback,
            glow_radius,
        }
    }

    /// `hair_mask_available` says whether a fresh streaming mask exists for
    /// the frame being shown.
    pub fn compose(
        &self,
        config: &AdjustmentConfig,
        hair_mask_available: bool,
        mirrored: bool,
        zoom_scale: f32,
    ) -> PreviewDescriptor {
        let mut steps = Vec::with_capacity(8);
        let mut hair_overlay = None;

        if config.has_hair_hue() {
            let hue_degrees = config.hair_hue_degrees();
            if hair_mask_available {
                hair_overlay = Some(HairOverlay { hue_degrees });
            } else if self.hue_fallback == HueFallback::Global {
                steps.push(FilterStep::HueRotate(hue_degrees));
            }
        }

        if config.brightness() != 100.0 {
            steps.push(FilterStep::Brightness(config.brightness() / 100.0));
        }
        if config.contrast() != 100.0 {
            steps.push(FilterStep::Contrast(config.contrast() / 100.0));
        }
        if config.saturation() != 100.0 {
            steps.push(FilterStep::Saturate(config.saturation() / 100.0));
        }

        steps.extend(preset_steps(config.preset()));

        let glow = (config.glow_amount() > 0.0).then(|| GlowOverlay {
            radius: self.glow_radius,
            opacity: config.glow_amount() / 100.0 * 0.7,
        });

        PreviewDescriptor {
            steps,
            hair_overlay,
            glow,
            transform: PreviewTransform {
                mirrored,
                scale: zoom_scale.max(1.0),
            },
        }
    }
}

fn preset_steps(preset: Preset) -> Vec<FilterStep> {
    match preset {
        Preset::None => Vec::new(),
        Preset::Monochrome => vec![FilterStep::Grayscale(1.0)],
        Preset::Sepia => vec![FilterStep::Sepia(1.0)],
        Preset::Vintage => vec![
            FilterStep::Sepia(0.5),
            FilterStep::Contrast(0.8),
            FilterStep::Brightness(1.1),
        ],
        Preset::Cyber => vec![FilterStep::Contrast(1.4), FilterStep::Saturate(2.0)],
        Preset::AutoEnhance => vec![FilterStep::Contrast(1.15), FilterStep::Saturate(1.25)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{AdjustmentField, ColorPipeline};
    use image::Rgba;

    fn composer(fallback: HueFallback) -> PreviewComposer {
        PreviewComposer::new(fallback, 8.0)
    }

    #[test]
    fn test_defaults_compose_to_nothing() {
        let descriptor =
            composer(HueFallback::Skip).compose(&AdjustmentConfig::default(), false, false, 1.0);

        assert!(descriptor.steps.is_empty());
        assert!(descriptor.hair_overlay.is_none());
        assert!(descriptor.glow.is_none());
        assert_eq!(descriptor.css(), "none");
        assert_eq!(descriptor.apply_pixel([12, 34, 56]), [12, 34, 56]);
    }

    #[test]
    fn test_manual_before_preset() {
        let config = AdjustmentConfig::default()
            .with(AdjustmentField::Brightness, 120.0)
            .with(AdjustmentField::Saturation, 50.0)
            .with_preset(Preset::Vintage);

        let descriptor = composer(HueFallback::Skip).compose(&config, false, false, 1.0);

        assert_eq!(
            descriptor.css(),
            "brightness(120%) saturate(50%) sepia(50%) contrast(80%) brightness(110%)"
        );
    }

    #[test]
    fn test_hue_uses_overlay_when_mask_available() {
        let config = AdjustmentConfig::default().with(AdjustmentField::HairHue, 90.0);

        let with_mask = composer(HueFallback::Global).compose(&config, true, false, 1.0);
        assert_eq!(with_mask.hair_overlay, Some(HairOverlay { hue_degrees: 90.0 }));
        assert!(with_mask.steps.is_empty());

        let skip = composer(HueFallback::Skip).compose(&config, false, false, 1.0);
        assert!(skip.hair_overlay.is_none());
        assert!(skip.steps.is_empty());

        let global = composer(HueFallback::Global).compose(&config, false, false, 1.0);
        assert_eq!(global.steps, vec![FilterStep::HueRotate(90.0)]);
        assert_eq!(global.css(), "hue-rotate(90deg)");
    }

    #[test]
    fn test_glow_and_transform() {
        let config = AdjustmentConfig::default().with(AdjustmentField::Glow, 50.0);
        let descriptor = composer(HueFallback::Skip).compose(&config, false, true, 2.0);

        let glow = descriptor.glow.unwrap();
        assert!((glow.opacity - 0.35).abs() < 1e-6);
        assert_eq!(glow.radius, 8.0);
        assert_eq!(
            descriptor.transform,
            PreviewTransform {
                mirrored: true,
                scale: 2.0
            }
        );
    }

    #[test]
    fn test_every_preset_has_a_chain() {
        for preset in Preset::ALL {
            let config = AdjustmentConfig::default().with_preset(preset);
            let descriptor = composer(HueFallback::Skip).compose(&config, false, false, 1.0);
            assert_eq!(descriptor.steps.is_empty(), preset == Preset::None);
        }
    }

    #[test]
    fn test_sepia_preview_close_to_capture() {
        let config = AdjustmentConfig::default().with_preset(Preset::Sepia);
        let descriptor = composer(HueFallback::Skip).compose(&config, false, false, 1.0);

        let preview = descriptor.apply_pixel([100, 150, 200]);
        let exact = ColorPipeline::default().apply_pixel([100, 150, 200], &config, false);

        for (p, e) in preview.iter().zip(exact) {
            assert!((*p as i32 - e as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_hair_overlay_render() {
        let frame = RgbaImage::from_pixel(2, 2, Rgba([200, 40, 40, 255]));
        let mask = SegmentationMask::from_fn(2, 2, |x, _| x == 0);
        let overlay = HairOverlay { hue_degrees: 120.0 };

        let layer = overlay.render(&frame, &mask).unwrap();

        assert_eq!(layer.get_pixel(1, 0).0[3], 0);
        let hair = layer.get_pixel(0, 0).0;
        assert_eq!(hair[3], 255);
        assert!(hair[1] > hair[0]);

        let wrong = SegmentationMask::empty(3, 3);
        assert!(overlay.render(&frame, &wrong).is_err());
    }

    #[test]
    fn test_hair_overlay_ignores_preset_unlike_capture() {
        let frame = RgbaImage::from_pixel(2, 1, Rgba([200, 40, 40, 255]));
        let mask = SegmentationMask::from_fn(2, 1, |x, _| x == 0);
        let config = AdjustmentConfig::default()
            .with(AdjustmentField::HairHue, 120.0)
            .with_preset(Preset::Sepia);

        let layer = HairOverlay { hue_degrees: 120.0 }.render(&frame, &mask).unwrap();
        let preview_hair = layer.get_pixel(0, 0).0;

        let pipeline = ColorPipeline::default();
        let hue_only = AdjustmentConfig::default().with(AdjustmentField::HairHue, 120.0);
        let rotated = pipeline.apply_pixel([200, 40, 40], &hue_only, true);
        assert_eq!([preview_hair[0], preview_hair[1], preview_hair[2]], rotated);

        let captured = pipeline.apply_to_copy(&frame, &config, Some(&mask));
        let capture_hair = captured.get_pixel(0, 0).0;
        assert_eq!(
            [capture_hair[0], capture_hair[1], capture_hair[2]],
            pipeline.apply_pixel([200, 40, 40], &config, true)
        );
        assert_ne!(capture_hair, preview_hair);
    }
}
