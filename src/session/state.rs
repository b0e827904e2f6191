use crate::color::AdjustmentConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest zoom level; 1.0 shows the full frame
pub const MIN_ZOOM: f32 = 1.0;
/// Largest software zoom level
pub const MAX_SOFTWARE_ZOOM: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Camera,
    StillImage,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Camera => write!(f, "camera"),
            Mode::StillImage => write!(f, "still-image"),
        }
    }
}

/// Which way the camera points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingDirection {
    /// Front camera, shown mirrored
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl FacingDirection {
    pub fn toggle(self) -> Self {
        match self {
            FacingDirection::User => FacingDirection::Environment,
            FacingDirection::Environment => FacingDirection::User,
        }
    }
}

impl fmt::Display for FacingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingDirection::User => write!(f, "user"),
            FacingDirection::Environment => write!(f, "environment"),
        }
    }
}

impl std::str::FromStr for FacingDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(FacingDirection::User),
            "environment" | "rear" | "back" => Ok(FacingDirection::Environment),
            other => Err(format!("unknown facing direction '{}'", other)),
        }
    }
}

/// How the current zoom level is realised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomMode {
    /// Centered crop and scale at preview and capture time
    #[default]
    Software,
    /// The frame source zooms optically; frames arrive already zoomed
    Hardware,
}

/// Everything the session knows. Only `SessionStateMachine` mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub mode: Mode,
    pub facing: FacingDirection,
    pub zoom_level: f32,
    pub zoom_mode: ZoomMode,
    pub adjustments: AdjustmentConfig,
    pub segmentation_available: bool,
}

impl SessionState {
    pub fn new(facing: FacingDirection, adjustments: AdjustmentConfig) -> Self {
        Self {
            mode: Mode::Camera,
            facing,
            zoom_level: MIN_ZOOM,
            zoom_mode: ZoomMode::Software,
            adjustments,
            segmentation_available: false,
        }
    }

    /// Mirrored only for the user-facing camera
    pub fn is_mirrored(&self) -> bool {
        self.mode == Mode::Camera && self.facing == FacingDirection::User
    }

    /// Zoom factor that must be applied in software. Still images and
    /// hardware-zoomed streams need no crop.
    pub fn software_zoom(&self) -> f32 {
        match (self.mode, self.zoom_mode) {
            (Mode::Camera, ZoomMode::Software) => self.zoom_level,
            _ => MIN_ZOOM,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(FacingDirection::default(), AdjustmentConfig::default())
    }
}
