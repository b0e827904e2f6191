use crate::color::{AdjustmentField, Preset};

/// Discrete events from the UI input surface
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Slider moved
    AdjustmentChanged { field: AdjustmentField, value: f32 },
    PresetSelected(Preset),
    /// User picked a file from the gallery
    OpenGallery,
    /// Leave still-image mode and return to the live camera
    CloseGallery,
    ToggleFacing,
    ZoomChanged(f32),
    Shutter,
    /// Reset sliders to their defaults
    Reset,
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::AdjustmentChanged { .. } => "adjustment_changed",
            UiEvent::PresetSelected(_) => "preset_selected",
            UiEvent::OpenGallery => "open_gallery",
            UiEvent::CloseGallery => "close_gallery",
            UiEvent::ToggleFacing => "toggle_facing",
            UiEvent::ZoomChanged(_) => "zoom_changed",
            UiEvent::Shutter => "shutter",
            UiEvent::Reset => "reset",
        }
    }
}
