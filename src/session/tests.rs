use super::*;
use crate::camera::{SyntheticFrameSource, ZoomCapability};
use crate::color::{AdjustmentField, Preset};
use crate::config::LuminaConfig;
use crate::error::LuminaError;
use crate::events::{EventBus, EventFilter, EventReceiver, LuminaEvent};
use crate::gallery::FilePicker;
use crate::output::MemorySink;
use crate::segmentation::{MockSegmentationOracle, SegmentationOracle};
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

struct Harness {
    machine: SessionStateMachine,
    source: Arc<SyntheticFrameSource>,
    sink: Arc<MemorySink>,
    events: EventReceiver,
    _dir: TempDir,
}

fn test_config() -> LuminaConfig {
    let mut config = LuminaConfig::default();
    config.camera.width = 32;
    config.camera.height = 16;
    config.segmentation.stream_every_n_frames = 1;
    config.capture.upscale_software_zoom = false;
    config
}

fn write_still(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("still.png");
    RgbaImage::from_fn(12, 6, |x, _| Rgba([(x * 20) as u8, 80, 160, 255]))
        .save(&path)
        .unwrap();
    path
}

fn harness_with(
    config: LuminaConfig,
    source: SyntheticFrameSource,
    oracle: Option<Arc<MockSegmentationOracle>>,
    sink: MemorySink,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let picker = Arc::new(FilePicker::new(write_still(&dir)));
    let source = Arc::new(source);
    let sink = Arc::new(sink);
    let event_bus = Arc::new(EventBus::new(64));
    let events = EventReceiver::new(event_bus.subscribe(), EventFilter::All, "test");

    let machine = SessionStateMachine::new(
        &config,
        source.clone(),
        picker,
        oracle.map(|o| o as Arc<dyn SegmentationOracle>),
        sink.clone(),
        event_bus,
    );

    Harness {
        machine,
        source,
        sink,
        events,
        _dir: dir,
    }
}

fn harness() -> Harness {
    let config = test_config();
    let source = SyntheticFrameSource::from_config(&config.camera);
    harness_with(
        config,
        source,
        Some(Arc::new(MockSegmentationOracle::new())),
        MemorySink::new(),
    )
}

fn event_types(events: &[LuminaEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.event_type()).collect()
}

#[tokio::test]
async fn test_start_acquires_default_facing() {
    let mut h = harness();
    h.machine.start().await.unwrap();

    let state = h.machine.state();
    assert_eq!(state.mode, Mode::Camera);
    assert_eq!(state.facing, FacingDirection::User);
    assert!(state.segmentation_available);
    assert!(state.is_mirrored());
    assert!(h.machine.has_source());
    assert_eq!(h.source.open_handles(), 1);

    let types = event_types(&h.events.drain());
    assert_eq!(types, vec!["segmentation_ready", "source_acquired"]);
}

#[tokio::test]
async fn test_segmentation_load_failure_is_not_fatal() {
    let config = test_config();
    let source = SyntheticFrameSource::from_config(&config.camera);
    let mut h = harness_with(
        config,
        source,
        Some(Arc::new(MockSegmentationOracle::failing_load())),
        MemorySink::new(),
    );

    h.machine.start().await.unwrap();

    assert!(!h.machine.state().segmentation_available);
    assert!(h.machine.has_source());
    assert!(event_types(&h.events.drain()).contains(&"segmentation_unavailable"));
}

#[tokio::test]
async fn test_classify_failures_mark_segmentation_unavailable() {
    let mut config = test_config();
    config.segmentation.max_consecutive_failures = 3;
    let source = SyntheticFrameSource::from_config(&config.camera);
    let oracle = Arc::new(MockSegmentationOracle::new());
    let mut h = harness_with(config, source, Some(Arc::clone(&oracle)), MemorySink::new());
    h.machine.start().await.unwrap();
    assert!(h.machine.state().segmentation_available);

    oracle.set_fail_classify(true);
    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::HairHue,
            value: 90.0,
        })
        .await
        .unwrap();
    h.events.drain();

    for _ in 0..3 {
        let report = h
            .machine
            .handle(UiEvent::Shutter)
            .await
            .unwrap()
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert!(!report.mask_applied);
    }

    assert!(!h.machine.state().segmentation_available);
    let types = event_types(&h.events.drain());
    assert_eq!(
        types.iter().filter(|t| **t == "segmentation_unavailable").count(),
        1
    );

    // Later captures skip the model and report nothing new
    h.machine
        .handle(UiEvent::Shutter)
        .await
        .unwrap()
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(oracle.classify_calls(), 3);
    assert!(!event_types(&h.events.drain()).contains(&"segmentation_unavailable"));
}

#[tokio::test]
async fn test_toggle_facing_releases_before_acquiring() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    let epoch = h.machine.epoch();

    h.machine.handle(UiEvent::ToggleFacing).await.unwrap();
    h.machine.handle(UiEvent::ToggleFacing).await.unwrap();

    assert_eq!(h.machine.state().facing, FacingDirection::User);
    assert_eq!(h.machine.epoch(), epoch + 2);
    assert_eq!(h.source.acquire_calls(), 3);
    assert_eq!(h.source.release_calls(), 2);
    assert_eq!(h.source.open_handles(), 1);
    assert_eq!(h.source.peak_open_handles(), 1);
}

#[tokio::test]
async fn test_acquisition_failure_keeps_camera_mode() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.source
        .set_failing_facing(Some(FacingDirection::Environment));
    h.events.drain();

    let err = h.machine.handle(UiEvent::ToggleFacing).await.unwrap_err();
    assert!(matches!(err, LuminaError::Camera(_)));
    assert_eq!(h.machine.state().mode, Mode::Camera);
    assert_eq!(h.machine.state().facing, FacingDirection::Environment);
    assert!(!h.machine.has_source());
    assert_eq!(h.source.open_handles(), 0);
    assert!(event_types(&h.events.drain()).contains(&"acquisition_failed"));

    assert!(h.machine.preview_tick().await.unwrap().is_none());

    // Retry by toggling back
    h.machine.handle(UiEvent::ToggleFacing).await.unwrap();
    assert!(h.machine.has_source());
    assert_eq!(h.machine.state().facing, FacingDirection::User);
}

#[tokio::test]
async fn test_gallery_round_trip_preserves_adjustments() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::Contrast,
            value: 140.0,
        })
        .await
        .unwrap();
    h.machine
        .handle(UiEvent::PresetSelected(Preset::Sepia))
        .await
        .unwrap();
    let adjustments = h.machine.state().adjustments;

    h.machine.handle(UiEvent::OpenGallery).await.unwrap();
    assert_eq!(h.machine.state().mode, Mode::StillImage);
    assert!(!h.machine.has_source());
    assert_eq!(h.source.open_handles(), 0);
    assert_eq!(h.machine.state().adjustments, adjustments);
    assert!(!h.machine.state().is_mirrored());

    let preview = h.machine.preview_tick().await.unwrap().unwrap();
    assert_eq!(preview.frame.dimensions(), (12, 6));

    h.machine.handle(UiEvent::CloseGallery).await.unwrap();
    assert_eq!(h.machine.state().mode, Mode::Camera);
    assert!(h.machine.has_source());
    assert_eq!(h.source.peak_open_handles(), 1);
    assert_eq!(h.machine.state().adjustments, adjustments);
}

#[tokio::test]
async fn test_cancelled_gallery_stays_in_camera() {
    let config = test_config();
    let source = Arc::new(SyntheticFrameSource::from_config(&config.camera));
    let mut machine = SessionStateMachine::new(
        &config,
        source.clone(),
        Arc::new(FilePicker::cancelled()),
        None,
        Arc::new(MemorySink::new()),
        Arc::new(EventBus::new(8)),
    );
    machine.start().await.unwrap();

    machine.handle(UiEvent::OpenGallery).await.unwrap();

    assert_eq!(machine.state().mode, Mode::Camera);
    assert!(machine.has_source());
}

#[tokio::test]
async fn test_close_gallery_outside_still_mode_is_noop() {
    let mut h = harness();
    h.machine.start().await.unwrap();

    h.machine.handle(UiEvent::CloseGallery).await.unwrap();

    assert_eq!(h.source.acquire_calls(), 1);
    assert_eq!(h.machine.state().mode, Mode::Camera);
}

#[tokio::test]
async fn test_adjustment_events_clamp_and_reset() {
    let mut h = harness();

    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::Brightness,
            value: 500.0,
        })
        .await
        .unwrap();
    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::HairHue,
            value: 450.0,
        })
        .await
        .unwrap();
    h.machine
        .handle(UiEvent::PresetSelected(Preset::Cyber))
        .await
        .unwrap();

    let adjustments = h.machine.state().adjustments;
    assert_eq!(adjustments.brightness(), 200.0);
    assert_eq!(adjustments.hair_hue_degrees(), 90.0);

    h.machine.handle(UiEvent::Reset).await.unwrap();
    let adjustments = h.machine.state().adjustments;
    assert_eq!(adjustments.brightness(), 100.0);
    assert_eq!(adjustments.hair_hue_degrees(), 0.0);
    assert_eq!(adjustments.preset(), Preset::Cyber);
}

#[tokio::test]
async fn test_software_zoom_without_capability() {
    let mut h = harness();
    h.machine.start().await.unwrap();

    h.machine.handle(UiEvent::ZoomChanged(2.0)).await.unwrap();
    assert_eq!(h.machine.state().zoom_mode, ZoomMode::Software);
    assert_eq!(h.machine.state().software_zoom(), 2.0);

    h.machine.handle(UiEvent::ZoomChanged(50.0)).await.unwrap();
    assert_eq!(h.machine.state().zoom_level, MAX_SOFTWARE_ZOOM);

    h.machine.handle(UiEvent::ZoomChanged(f32::NAN)).await.unwrap();
    assert_eq!(h.machine.state().zoom_level, MAX_SOFTWARE_ZOOM);

    let preview = h.machine.preview_tick().await.unwrap().unwrap();
    assert_eq!(preview.descriptor.transform.scale, MAX_SOFTWARE_ZOOM);
}

#[tokio::test]
async fn test_hardware_zoom_preferred() {
    let config = test_config();
    let source = SyntheticFrameSource::from_config(&config.camera).with_hardware_zoom(
        ZoomCapability {
            min: 1.0,
            max: 3.0,
            step: 0.5,
        },
    );
    let mut h = harness_with(config, source, None, MemorySink::new());
    h.machine.start().await.unwrap();

    h.machine.handle(UiEvent::ZoomChanged(2.0)).await.unwrap();

    let state = h.machine.state();
    assert_eq!(state.zoom_mode, ZoomMode::Hardware);
    assert_eq!(state.zoom_level, 2.0);
    assert_eq!(state.software_zoom(), 1.0);
    assert_eq!(h.source.hardware_zoom_level(), 2.0);

    // The new device gets the session zoom too
    h.machine.handle(UiEvent::ToggleFacing).await.unwrap();
    assert_eq!(h.source.hardware_zoom_level(), 2.0);
}

#[tokio::test]
async fn test_shutter_delivers_capture() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.events.drain();

    let task = h
        .machine
        .handle(UiEvent::Shutter)
        .await
        .unwrap()
        .expect("capture task");
    let report = task.wait().await.unwrap();

    assert!(report.geometry.mirrored);
    assert_eq!(h.sink.delivery_count(), 1);
    assert_eq!(h.sink.deliveries()[0].0, report.filename);
    assert!(event_types(&h.events.drain()).contains(&"capture_completed"));
}

#[tokio::test]
async fn test_still_capture_uses_natural_size() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.machine.handle(UiEvent::OpenGallery).await.unwrap();

    let report = h
        .machine
        .handle(UiEvent::Shutter)
        .await
        .unwrap()
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(!report.geometry.mirrored);
    assert_eq!((report.output_width, report.output_height), (12, 6));
}

#[tokio::test]
async fn test_shutter_without_source_fails() {
    let config = test_config();
    let source = SyntheticFrameSource::from_config(&config.camera);
    source.set_failing_facing(Some(FacingDirection::User));
    let mut h = harness_with(config, source, None, MemorySink::new());

    assert!(h.machine.start().await.is_err());
    let err = h.machine.handle(UiEvent::Shutter).await.err().unwrap();

    assert!(matches!(err, LuminaError::Camera(_)));
    assert_eq!(h.sink.delivery_count(), 0);
    assert!(event_types(&h.events.drain()).contains(&"capture_failed"));
}

#[tokio::test]
async fn test_rapid_shutters_deliver_once() {
    let config = test_config();
    let source = SyntheticFrameSource::from_config(&config.camera);
    let mut h = harness_with(
        config,
        source,
        None,
        MemorySink::new().with_delay(Duration::from_millis(50)),
    );
    h.machine.start().await.unwrap();

    let first = h.machine.handle(UiEvent::Shutter).await.unwrap();
    let second = h.machine.handle(UiEvent::Shutter).await.unwrap();

    let mut completed = 0;
    for task in [first, second].into_iter().flatten() {
        if task.wait().await.is_ok() {
            completed += 1;
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(h.sink.delivery_count(), 1);
    assert_eq!(h.sink.peak_concurrency(), 1);
}

#[tokio::test]
async fn test_preview_uses_streaming_mask() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::HairHue,
            value: 120.0,
        })
        .await
        .unwrap();

    let first = h.machine.preview_tick().await.unwrap().unwrap();
    assert!(first.mask.is_none());
    assert!(first.descriptor.hair_overlay.is_none());

    let mut with_mask = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let preview = h.machine.preview_tick().await.unwrap().unwrap();
        if preview.mask.is_some() {
            with_mask = Some(preview);
            break;
        }
    }

    let preview = with_mask.expect("streaming mask");
    assert!(preview.descriptor.hair_overlay.is_some());
    let layer = preview.hair_layer().unwrap();
    assert_eq!(layer.dimensions(), preview.frame.dimensions());
    // Mock marks the top quarter as hair
    assert_eq!(layer.get_pixel(0, 0).0[3], 255);
    assert_eq!(layer.get_pixel(0, 15).0[3], 0);
}

#[tokio::test]
async fn test_facing_change_drops_stale_mask() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    h.machine
        .handle(UiEvent::AdjustmentChanged {
            field: AdjustmentField::HairHue,
            value: 60.0,
        })
        .await
        .unwrap();

    h.machine.preview_tick().await.unwrap();
    for _ in 0..100 {
        if !h.machine.segmentation().is_busy() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    h.machine.handle(UiEvent::ToggleFacing).await.unwrap();
    let preview = h.machine.preview_tick().await.unwrap().unwrap();

    assert!(preview.mask.is_none());
    assert!(!preview.descriptor.transform.mirrored);
}

#[tokio::test]
async fn test_preview_loop_runs_and_stops() {
    let mut h = harness();
    h.machine.start().await.unwrap();
    let machine = Arc::new(Mutex::new(h.machine));

    let preview_loop = PreviewLoop::new(200).with_max_ticks(5);
    let mut seen = 0;
    let stats = preview_loop
        .run(Arc::clone(&machine), |_| seen += 1)
        .await;

    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.frames, 5);
    assert_eq!(seen, 5);

    let endless = PreviewLoop::new(200);
    endless.stop();
    let stats = endless.run(machine, |_| {}).await;
    assert_eq!(stats.ticks, 0);
}
