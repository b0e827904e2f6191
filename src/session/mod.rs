mod input;
mod machine;
mod preview_loop;
mod state;
#[cfg(test)]
mod tests;

pub use input::UiEvent;
pub use machine::{CaptureTask, PreviewFrame, SessionStateMachine};
pub use preview_loop::{PreviewLoop, PreviewLoopStats};
pub use state::{FacingDirection, Mode, SessionState, ZoomMode, MAX_SOFTWARE_ZOOM, MIN_ZOOM};
