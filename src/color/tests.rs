use super::*;
use crate::segmentation::SegmentationMask;
use image::{Rgba, RgbaImage};

fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            ((x * 37 + y * 11) % 256) as u8,
            ((x * 13 + y * 53) % 256) as u8,
            ((x * 7 + y * 29 + 100) % 256) as u8,
            ((x + y * 3) % 256) as u8,
        ])
    })
}

#[test]
fn test_default_config_is_identity() {
    let pipeline = ColorPipeline::default();
    let original = gradient_image(32, 24);
    let mut image = original.clone();

    let scope = pipeline.apply(&mut image, &AdjustmentConfig::default(), None);

    assert_eq!(scope, HueScope::Skipped);
    assert_eq!(image, original);
}

#[test]
fn test_default_config_is_identity_with_mask() {
    let pipeline = ColorPipeline::new(HueFallback::Global);
    let original = gradient_image(16, 16);
    let mask = SegmentationMask::from_fn(16, 16, |x, _| x % 2 == 0);
    let mut image = original.clone();

    pipeline.apply(&mut image, &AdjustmentConfig::default(), Some(&mask));

    assert_eq!(image, original);
}

#[test]
fn test_out_of_range_stages_clamp_to_bounds() {
    let pipeline = ColorPipeline::default();

    // Brightness 2.0 then contrast 2.0 on 10: (20 - 128) * 2 + 128 = -88
    let low = contrast_channel(10.0 * 2.0, 2.0);
    assert!(low < 0.0);
    assert_eq!(clamp_channel(low), 0);

    let pushed = AdjustmentConfig::default()
        .with(AdjustmentField::Brightness, 200.0)
        .with(AdjustmentField::Contrast, 200.0);
    assert_eq!(pipeline.apply_pixel([10, 10, 10], &pushed, false)[0], 0);

    // Cyber drives blue past white before the final clamp
    let raw = saturate(
        [
            contrast_channel(100.0, 1.4),
            contrast_channel(150.0, 1.4),
            contrast_channel(200.0, 1.6),
        ],
        2.0,
    );
    assert!(raw[2] > 255.0);
    assert_eq!(clamp_channel(raw[2]), 255);

    let cyber = AdjustmentConfig::default().with_preset(Preset::Cyber);
    assert_eq!(
        pipeline.apply_pixel([100, 150, 200], &cyber, false),
        raw.map(clamp_channel)
    );
}

#[test]
fn test_extreme_settings_preserve_alpha_and_size() {
    let extremes = RgbaImage::from_fn(4, 2, |x, y| {
        let v = [0u8, 1, 254, 255][x as usize];
        Rgba([v, 255 - v, if y == 0 { v } else { 128 }, v / 2 + y as u8])
    });
    let pipeline = ColorPipeline::new(HueFallback::Global);

    for brightness in [0.0, 200.0] {
        for contrast in [0.0, 200.0] {
            for preset in Preset::ALL {
                let config = AdjustmentConfig::default()
                    .with(AdjustmentField::Brightness, brightness)
                    .with(AdjustmentField::Contrast, contrast)
                    .with(AdjustmentField::Saturation, 200.0)
                    .with(AdjustmentField::HairHue, 137.0)
                    .with_preset(preset);

                let out = pipeline.apply_to_copy(&extremes, &config, None);
                assert_eq!(out.dimensions(), extremes.dimensions());
                for (before, after) in extremes.pixels().zip(out.pixels()) {
                    assert_eq!(before.0[3], after.0[3]);
                }
            }
        }
    }
}

#[test]
fn test_zero_contrast_collapses_to_midpoint() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with(AdjustmentField::Contrast, 0.0);

    assert_eq!(pipeline.apply_pixel([0, 90, 255], &config, false), [128, 128, 128]);
}

#[test]
fn test_extreme_brightness_saturates_to_bounds() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default()
        .with(AdjustmentField::Brightness, 200.0)
        .with(AdjustmentField::Contrast, 200.0);

    assert_eq!(pipeline.apply_pixel([200, 10, 128], &config, false), [255, 0, 255]);

    let dark = AdjustmentConfig::default().with(AdjustmentField::Brightness, 0.0);
    assert_eq!(pipeline.apply_pixel([200, 10, 128], &dark, false), [0, 0, 0]);
}

#[test]
fn test_preset_none_is_idempotent() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::None);
    let original = gradient_image(20, 20);

    let once = pipeline.apply_to_copy(&original, &config, None);
    let twice = pipeline.apply_to_copy(&once, &config, None);

    assert_eq!(once, twice);
    assert_eq!(once, original);
}

#[test]
fn test_mask_gates_hue_rotation() {
    let pipeline = ColorPipeline::default();
    let original = gradient_image(24, 16);
    let mask = SegmentationMask::from_fn(24, 16, |x, y| x >= 8 && x < 16 && y < 10);

    let unrotated = pipeline.apply_to_copy(
        &original,
        &AdjustmentConfig::default().with(AdjustmentField::HairHue, 0.0),
        Some(&mask),
    );
    let rotated = pipeline.apply_to_copy(
        &original,
        &AdjustmentConfig::default().with(AdjustmentField::HairHue, 180.0),
        Some(&mask),
    );

    let mut changed_inside = 0;
    for (x, y, pixel) in rotated.enumerate_pixels() {
        let before = unrotated.get_pixel(x, y);
        if mask.is_hair(x, y) {
            if pixel != before {
                changed_inside += 1;
            }
        } else {
            assert_eq!(pixel, before, "pixel ({}, {}) outside mask changed", x, y);
        }
    }

    assert!(changed_inside > 0);
}

#[test]
fn test_sepia_scenario() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::Sepia);

    let [r, g, b] = pipeline.apply_pixel([100, 150, 200], &config, false);

    // .393*100 + .769*150 + .189*200 = 192.45
    assert_eq!(r, 192);
    // .349*100 + .686*150 + .168*200 = 171.4
    assert_eq!(g, 171);
    // .272*100 + .534*150 + .131*200 = 133.5, rounding at the boundary
    assert!((133..=134).contains(&b));
}

#[test]
fn test_vintage_scenario() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::Vintage);

    // Half sepia: r' = .6965*100 + .3845*150 + .0945*200 = 146.225
    // then ((146.225 - 128) * 0.8 + 128) * 1.1 = 156.838
    // g' = 160.7 -> 169.576, b' = 166.75 -> 174.9
    assert_eq!(pipeline.apply_pixel([100, 150, 200], &config, false), [157, 170, 175]);
}

#[test]
fn test_cyber_scenario() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::Cyber);

    // Contrast 1.4/1.4/1.6: [88.8, 158.8, 243.2], luma 147.48272
    // Saturation 2.0: 2c - y = [30.117, 170.117, 338.917]
    assert_eq!(pipeline.apply_pixel([100, 150, 200], &config, false), [30, 170, 255]);
}

#[test]
fn test_auto_enhance_scenario() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::AutoEnhance);

    // Contrast 1.15: [95.8, 153.3, 210.8], luma 142.65292
    // Saturation 1.25: [84.087, 155.962, 227.837]
    assert_eq!(pipeline.apply_pixel([100, 150, 200], &config, false), [84, 156, 228]);
}

#[test]
fn test_sepia_clamps_bright_input() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::Sepia);

    let [r, g, _] = pipeline.apply_pixel([255, 255, 255], &config, false);
    assert_eq!(r, 255);
    assert_eq!(g, 255);
}

#[test]
fn test_monochrome_produces_gray() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default().with_preset(Preset::Monochrome);
    let out = pipeline.apply_to_copy(&gradient_image(8, 8), &config, None);

    for pixel in out.pixels() {
        assert_eq!(pixel.0[0], pixel.0[1]);
        assert_eq!(pixel.0[1], pixel.0[2]);
    }
}

#[test]
fn test_hue_fallback_policy_without_mask() {
    let original = gradient_image(8, 8);
    let config = AdjustmentConfig::default().with(AdjustmentField::HairHue, 90.0);

    let skip = ColorPipeline::new(HueFallback::Skip);
    let mut skipped = original.clone();
    assert_eq!(skip.apply(&mut skipped, &config, None), HueScope::Skipped);
    assert_eq!(skipped, original);

    let global = ColorPipeline::new(HueFallback::Global);
    let mut rotated = original.clone();
    assert_eq!(global.apply(&mut rotated, &config, None), HueScope::Global);
    assert_ne!(rotated, original);
}

#[test]
fn test_mismatched_mask_fails_closed() {
    let pipeline = ColorPipeline::new(HueFallback::Skip);
    let original = gradient_image(10, 10);
    let wrong_size = SegmentationMask::from_fn(5, 5, |_, _| true);
    let config = AdjustmentConfig::default().with(AdjustmentField::HairHue, 120.0);

    let mut image = original.clone();
    let scope = pipeline.apply(&mut image, &config, Some(&wrong_size));

    assert_eq!(scope, HueScope::Skipped);
    assert_eq!(image, original);
}

#[test]
fn test_alpha_is_preserved() {
    let pipeline = ColorPipeline::new(HueFallback::Global);
    let original = gradient_image(12, 12);
    let config = AdjustmentConfig::default()
        .with(AdjustmentField::Brightness, 160.0)
        .with(AdjustmentField::HairHue, 45.0)
        .with_preset(Preset::Cyber);

    let out = pipeline.apply_to_copy(&original, &config, None);

    for (before, after) in original.pixels().zip(out.pixels()) {
        assert_eq!(before.0[3], after.0[3]);
    }
}

#[test]
fn test_hue_rotation_keeps_grays() {
    let pipeline = ColorPipeline::new(HueFallback::Global);
    let config = AdjustmentConfig::default().with(AdjustmentField::HairHue, 200.0);

    for v in [0u8, 64, 128, 200, 255] {
        let [r, g, b] = pipeline.apply_pixel([v, v, v], &config, true);
        assert!((r as i16 - v as i16).abs() <= 1);
        assert!((g as i16 - v as i16).abs() <= 1);
        assert!((b as i16 - v as i16).abs() <= 1);
    }
}

#[test]
fn test_pipeline_is_deterministic() {
    let pipeline = ColorPipeline::new(HueFallback::Global);
    let original = gradient_image(30, 20);
    let mask = SegmentationMask::from_fn(30, 20, |x, y| (x + y) % 3 == 0);
    let config = AdjustmentConfig::default()
        .with(AdjustmentField::Contrast, 140.0)
        .with(AdjustmentField::Saturation, 60.0)
        .with(AdjustmentField::HairHue, 300.0)
        .with_preset(Preset::Vintage);

    let a = pipeline.apply_to_copy(&original, &config, Some(&mask));
    let b = pipeline.apply_to_copy(&original, &config, Some(&mask));
    assert_eq!(a, b);
}

#[test]
fn test_stage_order_brightness_before_contrast() {
    let pipeline = ColorPipeline::default();
    let config = AdjustmentConfig::default()
        .with(AdjustmentField::Brightness, 50.0)
        .with(AdjustmentField::Contrast, 200.0);

    // (100 * 0.5 - 128) * 2 + 128 = -28 -> 0
    assert_eq!(pipeline.apply_pixel([100, 100, 100], &config, false), [0, 0, 0]);
}

#[test]
fn test_isolate_masked_clears_background_alpha() {
    let mut image = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
    let mask = SegmentationMask::from_fn(4, 4, |x, _| x < 2);

    isolate_masked(&mut image, &mask).unwrap();

    for (x, _, pixel) in image.enumerate_pixels() {
        let expected = if x < 2 { 255 } else { 0 };
        assert_eq!(pixel.0[3], expected);
        assert_eq!(&pixel.0[..3], &[10, 20, 30]);
    }

    let wrong = SegmentationMask::empty(3, 4);
    assert!(isolate_masked(&mut image, &wrong).is_err());
}

#[test]
fn test_assignment_clamps_to_domain() {
    let mut config = AdjustmentConfig::default();

    config.set(AdjustmentField::Brightness, 350.0);
    assert_eq!(config.brightness(), 200.0);

    config.set(AdjustmentField::Saturation, -10.0);
    assert_eq!(config.saturation(), 0.0);

    config.set(AdjustmentField::Glow, 120.0);
    assert_eq!(config.glow_amount(), 100.0);

    config.set(AdjustmentField::HairHue, 360.0);
    assert_eq!(config.hair_hue_degrees(), 0.0);

    config.set(AdjustmentField::HairHue, -90.0);
    assert_eq!(config.hair_hue_degrees(), 270.0);

    config.set(AdjustmentField::Contrast, f32::NAN);
    assert_eq!(config.contrast(), 100.0);
}

#[test]
fn test_reset_sliders_keeps_preset() {
    let mut config = AdjustmentConfig::default()
        .with(AdjustmentField::Brightness, 150.0)
        .with(AdjustmentField::Glow, 40.0)
        .with_preset(Preset::Sepia);

    config.reset_sliders();

    assert_eq!(config.brightness(), 100.0);
    assert_eq!(config.glow_amount(), 0.0);
    assert_eq!(config.preset(), Preset::Sepia);
}

#[test]
fn test_preset_and_field_parsing() {
    assert_eq!("sepia".parse::<Preset>().unwrap(), Preset::Sepia);
    assert_eq!("bw".parse::<Preset>().unwrap(), Preset::Monochrome);
    assert_eq!("auto-enhance".parse::<Preset>().unwrap(), Preset::AutoEnhance);
    assert!("lomo".parse::<Preset>().is_err());

    assert_eq!(
        "saturate".parse::<AdjustmentField>().unwrap(),
        AdjustmentField::Saturation
    );
    assert_eq!("hue".parse::<AdjustmentField>().unwrap(), AdjustmentField::HairHue);
    assert!("gamma".parse::<AdjustmentField>().is_err());

    for preset in Preset::ALL {
        assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
    }
}
