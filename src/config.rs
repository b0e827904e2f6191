use crate::color::{AdjustmentConfig, AdjustmentField, HueFallback, Preset};
use crate::session::FacingDirection;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LuminaConfig {
    pub camera: CameraConfig,
    pub adjustments: AdjustmentSettings,
    pub segmentation: SegmentationConfig,
    pub capture: CaptureConfig,
    pub preview: PreviewConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Ideal capture width requested from the frame source
    #[serde(default = "default_camera_width")]
    pub width: u32,

    /// Ideal capture height requested from the frame source
    #[serde(default = "default_camera_height")]
    pub height: u32,

    /// Facing direction at startup
    #[serde(default)]
    pub facing: FacingDirection,

    /// Frame rate of the synthetic source
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

/// Startup adjustment values. Out-of-range values are clamped on conversion.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdjustmentSettings {
    #[serde(default = "default_tone")]
    pub brightness: f32,

    #[serde(default = "default_tone")]
    pub contrast: f32,

    #[serde(default = "default_tone")]
    pub saturation: f32,

    /// Hair hue rotation in degrees
    #[serde(default)]
    pub hair_hue: f32,

    /// Glow strength 0..=100
    #[serde(default)]
    pub glow: f32,

    #[serde(default)]
    pub preset: Preset,
}

impl AdjustmentSettings {
    pub fn to_adjustments(&self) -> AdjustmentConfig {
        AdjustmentConfig::default()
            .with(AdjustmentField::Brightness, self.brightness)
            .with(AdjustmentField::Contrast, self.contrast)
            .with(AdjustmentField::Saturation, self.saturation)
            .with(AdjustmentField::HairHue, self.hair_hue)
            .with(AdjustmentField::Glow, self.glow)
            .with_preset(self.preset)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SegmentationConfig {
    /// Load the segmentation oracle at startup
    #[serde(default = "default_segmentation_enabled")]
    pub enabled: bool,

    /// Model asset location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Classify every Nth preview tick
    #[serde(default = "default_stream_every_n_frames")]
    pub stream_every_n_frames: u32,

    /// Upper bound on one exact classification at capture time
    #[serde(default = "default_exact_timeout_ms")]
    pub exact_timeout_ms: u64,

    /// Consecutive classification failures before the model is disabled (0 = never)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Hue policy when no mask is available
    #[serde(default)]
    pub hue_fallback: HueFallback,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Directory the output sink writes to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Exported file name prefix
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// JPEG quality 1..=100
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Gaussian sigma of the glow blur in pixels
    #[serde(default = "default_glow_radius")]
    pub glow_radius: f32,

    /// Scale a software-zoom crop back up to the full frame size
    #[serde(default = "default_upscale_software_zoom")]
    pub upscale_software_zoom: bool,

    /// Write a JSON metadata sidecar next to each capture
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreviewConfig {
    /// Display refresh rate for the preview tick
    #[serde(default = "default_preview_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl LuminaConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("lumina.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.width", default_camera_width())?
            .set_default("camera.height", default_camera_height())?
            .set_default("camera.facing", "user")?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("adjustments.brightness", default_tone() as f64)?
            .set_default("adjustments.contrast", default_tone() as f64)?
            .set_default("adjustments.saturation", default_tone() as f64)?
            .set_default("adjustments.hair_hue", 0.0)?
            .set_default("adjustments.glow", 0.0)?
            .set_default("adjustments.preset", "none")?
            .set_default("segmentation.enabled", default_segmentation_enabled())?
            .set_default(
                "segmentation.stream_every_n_frames",
                default_stream_every_n_frames(),
            )?
            .set_default(
                "segmentation.exact_timeout_ms",
                default_exact_timeout_ms() as i64,
            )?
            .set_default(
                "segmentation.max_consecutive_failures",
                default_max_consecutive_failures(),
            )?
            .set_default("segmentation.hue_fallback", "skip")?
            .set_default("capture.output_dir", default_output_dir())?
            .set_default("capture.filename_prefix", default_filename_prefix())?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("capture.glow_radius", default_glow_radius() as f64)?
            .set_default(
                "capture.upscale_software_zoom",
                default_upscale_software_zoom(),
            )?
            .set_default("capture.save_metadata", default_save_metadata())?
            .set_default("preview.fps", default_preview_fps())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // LUMINA_CAPTURE__JPEG_QUALITY=80 style overrides
            .add_source(
                Environment::with_prefix("LUMINA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: LuminaConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.segmentation.stream_every_n_frames == 0 {
            return Err(ConfigError::Message(
                "Segmentation stream_every_n_frames must be greater than 0".to_string(),
            ));
        }

        if self.segmentation.exact_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Segmentation exact_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "JPEG quality must be within 1..=100, got {}",
                self.capture.jpeg_quality
            )));
        }

        if !self.capture.glow_radius.is_finite() || self.capture.glow_radius <= 0.0 {
            return Err(ConfigError::Message(
                "Glow radius must be a positive number".to_string(),
            ));
        }

        if self.capture.output_dir.is_empty() {
            return Err(ConfigError::Message(
                "Capture output_dir cannot be empty".to_string(),
            ));
        }

        if self.preview.fps == 0 {
            return Err(ConfigError::Message(
                "Preview fps must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LuminaConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                width: default_camera_width(),
                height: default_camera_height(),
                facing: FacingDirection::default(),
                fps: default_camera_fps(),
            },
            adjustments: AdjustmentSettings {
                brightness: default_tone(),
                contrast: default_tone(),
                saturation: default_tone(),
                hair_hue: 0.0,
                glow: 0.0,
                preset: Preset::None,
            },
            segmentation: SegmentationConfig {
                enabled: default_segmentation_enabled(),
                model_path: None,
                stream_every_n_frames: default_stream_every_n_frames(),
                exact_timeout_ms: default_exact_timeout_ms(),
                max_consecutive_failures: default_max_consecutive_failures(),
                hue_fallback: HueFallback::default(),
            },
            capture: CaptureConfig {
                output_dir: default_output_dir(),
                filename_prefix: default_filename_prefix(),
                jpeg_quality: default_jpeg_quality(),
                glow_radius: default_glow_radius(),
                upscale_software_zoom: default_upscale_software_zoom(),
                save_metadata: default_save_metadata(),
            },
            preview: PreviewConfig {
                fps: default_preview_fps(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_width() -> u32 {
    1920
}
fn default_camera_height() -> u32 {
    1080
}
fn default_camera_fps() -> u32 {
    30
}

fn default_tone() -> f32 {
    100.0
}

fn default_segmentation_enabled() -> bool {
    true
}
fn default_stream_every_n_frames() -> u32 {
    3
}
fn default_exact_timeout_ms() -> u64 {
    2000
}
fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_output_dir() -> String {
    "./captures".to_string()
}
fn default_filename_prefix() -> String {
    "lumina".to_string()
}
fn default_jpeg_quality() -> u8 {
    95
}
fn default_glow_radius() -> f32 {
    8.0
}
fn default_upscale_software_zoom() -> bool {
    true
}
fn default_save_metadata() -> bool {
    false
}

fn default_preview_fps() -> u32 {
    30
}

fn default_event_bus_capacity() -> usize {
    100
}
