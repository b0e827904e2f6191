use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named stylistic presets, applied after the manual adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    #[default]
    None,
    /// Weighted gray average on all channels
    Monochrome,
    /// Fixed sepia color matrix
    Sepia,
    /// Half-strength sepia, softened contrast, lifted brightness
    Vintage,
    /// Cool contrast push with doubled saturation
    Cyber,
    /// Subtle contrast and saturation lift
    AutoEnhance,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::None,
        Preset::Monochrome,
        Preset::Sepia,
        Preset::Vintage,
        Preset::Cyber,
        Preset::AutoEnhance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::None => "none",
            Preset::Monochrome => "monochrome",
            Preset::Sepia => "sepia",
            Preset::Vintage => "vintage",
            Preset::Cyber => "cyber",
            Preset::AutoEnhance => "auto-enhance",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Preset::None),
            "monochrome" | "mono" | "bw" => Ok(Preset::Monochrome),
            "sepia" => Ok(Preset::Sepia),
            "vintage" => Ok(Preset::Vintage),
            "cyber" => Ok(Preset::Cyber),
            "auto-enhance" | "auto_enhance" | "autoenhance" => Ok(Preset::AutoEnhance),
            other => Err(format!("unknown preset '{}'", other)),
        }
    }
}

/// Slider identifiers carried by adjustment input events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentField {
    Brightness,
    Contrast,
    Saturation,
    HairHue,
    Glow,
}

impl AdjustmentField {
    /// Inclusive lower and upper bound of the field's domain
    pub fn range(&self) -> (f32, f32) {
        match self {
            AdjustmentField::Brightness
            | AdjustmentField::Contrast
            | AdjustmentField::Saturation => (0.0, 200.0),
            AdjustmentField::HairHue => (0.0, 360.0),
            AdjustmentField::Glow => (0.0, 100.0),
        }
    }
}

impl FromStr for AdjustmentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brightness" => Ok(AdjustmentField::Brightness),
            "contrast" => Ok(AdjustmentField::Contrast),
            "saturate" | "saturation" => Ok(AdjustmentField::Saturation),
            "hue" | "hair-hue" | "hair_hue" => Ok(AdjustmentField::HairHue),
            "glow" => Ok(AdjustmentField::Glow),
            other => Err(format!("unknown adjustment field '{}'", other)),
        }
    }
}

/// Complete set of user adjustments.
///
/// Fields are private so every assignment goes through [`AdjustmentConfig::set`],
/// which clamps to the field's domain. Defaults are the identity transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdjustmentConfig {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hair_hue_degrees: f32,
    glow_amount: f32,
    preset: Preset,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hair_hue_degrees: 0.0,
            glow_amount: 0.0,
            preset: Preset::None,
        }
    }
}

impl AdjustmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn hair_hue_degrees(&self) -> f32 {
        self.hair_hue_degrees
    }

    pub fn glow_amount(&self) -> f32 {
        self.glow_amount
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn get(&self, field: AdjustmentField) -> f32 {
        match field {
            AdjustmentField::Brightness => self.brightness,
            AdjustmentField::Contrast => self.contrast,
            AdjustmentField::Saturation => self.saturation,
            AdjustmentField::HairHue => self.hair_hue_degrees,
            AdjustmentField::Glow => self.glow_amount,
        }
    }

    /// Assign a field, clamping into its domain. Hue wraps modulo 360.
    /// Non-finite values are ignored and the previous value is kept.
    pub fn set(&mut self, field: AdjustmentField, value: f32) {
        if !value.is_finite() {
            return;
        }

        let (min, max) = field.range();
        match field {
            AdjustmentField::Brightness => self.brightness = value.clamp(min, max),
            AdjustmentField::Contrast => self.contrast = value.clamp(min, max),
            AdjustmentField::Saturation => self.saturation = value.clamp(min, max),
            AdjustmentField::HairHue => {
                // rem_euclid can round up to exactly 360.0 for tiny negatives
                let wrapped = value.rem_euclid(max);
                self.hair_hue_degrees = if wrapped >= max { 0.0 } else { wrapped };
            }
            AdjustmentField::Glow => self.glow_amount = value.clamp(min, max),
        }
    }

    pub fn set_preset(&mut self, preset: Preset) {
        self.preset = preset;
    }

    pub fn with(mut self, field: AdjustmentField, value: f32) -> Self {
        self.set(field, value);
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    /// Reset the manual sliders to identity. The preset is left selected.
    pub fn reset_sliders(&mut self) {
        let preset = self.preset;
        *self = Self::default();
        self.preset = preset;
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_hair_hue(&self) -> bool {
        self.hair_hue_degrees != 0.0
    }
}
