use crate::error::EventBusError;
use crate::session::{FacingDirection, Mode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Outcomes reported to the UI collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LuminaEvent {
    /// Session switched between camera and still-image mode
    ModeChanged { mode: Mode, timestamp: SystemTime },
    /// Camera facing direction toggled
    FacingChanged {
        facing: FacingDirection,
        timestamp: SystemTime,
    },
    /// A frame source handle was acquired
    SourceAcquired {
        facing: FacingDirection,
        width: u32,
        height: u32,
        hardware_zoom: bool,
    },
    /// The frame source could not be acquired; the session has no source
    AcquisitionFailed {
        facing: FacingDirection,
        error: String,
    },
    /// Segmentation oracle loaded
    SegmentationReady { oracle: String },
    /// Selective hue is disabled for the session
    SegmentationUnavailable { reason: String },
    /// A capture was encoded and delivered
    CaptureCompleted {
        filename: String,
        bytes: usize,
        mask_applied: bool,
    },
    /// A capture failed in a mandatory stage
    CaptureFailed { error: String },
    /// A shutter trigger arrived while another capture was running
    CaptureIgnored { reason: String },
}

impl LuminaEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            LuminaEvent::ModeChanged { mode, .. } => format!("Mode changed to {}", mode),
            LuminaEvent::FacingChanged { facing, .. } => {
                format!("Facing direction changed to {}", facing)
            }
            LuminaEvent::SourceAcquired {
                facing,
                width,
                height,
                hardware_zoom,
            } => format!(
                "Acquired {} camera at {}x{} (hardware zoom: {})",
                facing, width, height, hardware_zoom
            ),
            LuminaEvent::AcquisitionFailed { facing, error } => {
                format!("Failed to acquire {} camera: {}", facing, error)
            }
            LuminaEvent::SegmentationReady { oracle } => {
                format!("Segmentation oracle '{}' ready", oracle)
            }
            LuminaEvent::SegmentationUnavailable { reason } => {
                format!("Segmentation unavailable: {}", reason)
            }
            LuminaEvent::CaptureCompleted {
                filename,
                bytes,
                mask_applied,
            } => format!(
                "Capture saved: {} ({} bytes, mask: {})",
                filename, bytes, mask_applied
            ),
            LuminaEvent::CaptureFailed { error } => format!("Capture failed: {}", error),
            LuminaEvent::CaptureIgnored { reason } => format!("Capture ignored: {}", reason),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            LuminaEvent::ModeChanged { .. } => "mode_changed",
            LuminaEvent::FacingChanged { .. } => "facing_changed",
            LuminaEvent::SourceAcquired { .. } => "source_acquired",
            LuminaEvent::AcquisitionFailed { .. } => "acquisition_failed",
            LuminaEvent::SegmentationReady { .. } => "segmentation_ready",
            LuminaEvent::SegmentationUnavailable { .. } => "segmentation_unavailable",
            LuminaEvent::CaptureCompleted { .. } => "capture_completed",
            LuminaEvent::CaptureFailed { .. } => "capture_failed",
            LuminaEvent::CaptureIgnored { .. } => "capture_ignored",
        }
    }

    /// True for events describing a failure the user should see
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            LuminaEvent::AcquisitionFailed { .. } | LuminaEvent::CaptureFailed { .. }
        )
    }
}

/// Async event bus for reporting outcomes, backed by a broadcast channel
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LuminaEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<LuminaEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers. Fails when nobody is listening.
    pub async fn publish(&self, event: LuminaEvent) -> Result<usize, EventBusError> {
        match &event {
            LuminaEvent::AcquisitionFailed { .. } | LuminaEvent::CaptureFailed { .. } => {
                error!("{}", event.description());
            }
            LuminaEvent::SegmentationUnavailable { .. } | LuminaEvent::CaptureIgnored { .. } => {
                warn!("{}", event.description());
            }
            LuminaEvent::CaptureCompleted { .. } | LuminaEvent::SegmentationReady { .. } => {
                info!("{}", event.description());
            }
            _ => debug!("Publishing event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    FailuresOnly,
}

impl EventFilter {
    pub fn matches(&self, event: &LuminaEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::FailuresOnly => event.is_failure(),
        }
    }
}

/// Named receiver that only yields events passing its filter
pub struct EventReceiver {
    receiver: broadcast::Receiver<LuminaEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<LuminaEvent>,
        filter: EventFilter,
        name: impl Into<String>,
    ) -> Self {
        Self {
            receiver,
            filter,
            name: name.into(),
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<LuminaEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Drain every queued event that passes the filter
    pub fn drain(&mut self) -> Vec<LuminaEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        events.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(_) => return events,
            }
        }
    }
}
