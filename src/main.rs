use anyhow::{Context, Result};
use clap::Parser;
use lumina::error::EventBusError;
use lumina::{
    AdjustmentField, DirectorySink, EventBus, EventFilter, EventReceiver, FacingDirection,
    FilePicker, LuminaConfig, PreviewLoop, Preset, SegmentationOracle,
    SessionStateMachine, StaticMaskOracle, SyntheticFrameSource, UiEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "lumina")]
#[command(about = "Camera capture with live color controls, presets and selective hair recolor")]
#[command(version)]
#[command(long_about = "Drives a capture session headlessly: opens the camera (or a still image), \
applies brightness, contrast, saturation, glow, a preset and an optional hair-only hue rotation, \
runs the live preview for a number of frames and exports one JPEG capture.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lumina.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Capture this image instead of the camera
    #[arg(short, long, value_name = "IMAGE")]
    input: Option<PathBuf>,

    /// Directory captures are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Hair mask image standing in for the segmentation model
    #[arg(long, value_name = "MASK")]
    mask: Option<PathBuf>,

    /// Camera facing at startup (user or environment)
    #[arg(long)]
    facing: Option<FacingDirection>,

    #[arg(long, allow_negative_numbers = true)]
    brightness: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    contrast: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    saturation: Option<f32>,

    /// Hair hue rotation in degrees
    #[arg(long, allow_negative_numbers = true)]
    hue: Option<f32>,

    /// Glow strength 0-100
    #[arg(long)]
    glow: Option<f32>,

    /// none, monochrome, sepia, vintage, cyber or auto-enhance
    #[arg(long)]
    preset: Option<Preset>,

    /// Zoom level, hardware when the source supports it
    #[arg(long)]
    zoom: Option<f32>,

    /// Preview ticks to run before the shutter
    #[arg(long, default_value_t = 0)]
    preview_frames: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Lumina v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match LuminaConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(dir) = &args.output_dir {
        config.capture.output_dir = dir.clone();
    }
    if let Some(facing) = args.facing {
        config.camera.facing = facing;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
    let event_logger = spawn_event_logger(&event_bus);

    let machine = build_session(&args, &config, Arc::clone(&event_bus));
    let machine = Arc::new(Mutex::new(machine));

    let exit_code = match run_session(&args, &config, Arc::clone(&machine)).await {
        Ok(filename) => {
            println!("{}", filename);
            0
        }
        Err(e) => {
            error!("Session failed: {:#}", e);
            eprintln!("✗ {:#}", e);
            1
        }
    };

    machine.lock().await.shutdown().await;
    drop(machine);
    drop(event_bus);
    match tokio::time::timeout(Duration::from_millis(500), event_logger).await {
        Ok(Err(e)) => debug!("Event logger ended abnormally: {}", e),
        Err(_) => debug!("Event logger still running at exit"),
        Ok(Ok(())) => {}
    }

    info!("Lumina exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn build_session(args: &Args, config: &LuminaConfig, event_bus: Arc<EventBus>) -> SessionStateMachine {
    let frame_source = Arc::new(SyntheticFrameSource::from_config(&config.camera));

    let picker = match &args.input {
        Some(path) => FilePicker::new(path),
        None => FilePicker::cancelled(),
    };

    let mask_path = args
        .mask
        .clone()
        .or_else(|| config.segmentation.model_path.as_ref().map(PathBuf::from));
    let oracle = mask_path.map(|path| {
        info!("Using static hair mask {}", path.display());
        Arc::new(StaticMaskOracle::new(path)) as Arc<dyn SegmentationOracle>
    });

    let sink = Arc::new(DirectorySink::new(&config.capture.output_dir));

    SessionStateMachine::new(config, frame_source, Arc::new(picker), oracle, sink, event_bus)
}

/// Start, replay the command-line adjustments as UI events, preview, then
/// shoot once. Returns the delivered file name.
async fn run_session(
    args: &Args,
    config: &LuminaConfig,
    machine: Arc<Mutex<SessionStateMachine>>,
) -> Result<String> {
    {
        let mut session = machine.lock().await;
        if let Err(e) = session.start().await {
            // Still usable when a gallery image replaces the camera
            warn!("Camera unavailable: {}", e);
        }

        for event in startup_events(args) {
            session
                .handle(event)
                .await
                .context("Failed to apply startup adjustments")?;
        }
    }

    if args.preview_frames > 0 {
        let preview_loop = PreviewLoop::new(config.preview.fps).with_max_ticks(args.preview_frames);
        let token = preview_loop.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping preview");
                token.cancel();
            }
        });

        let stats = preview_loop
            .run(Arc::clone(&machine), |preview| {
                debug!(
                    "Preview {}x{} filter: {}",
                    preview.frame.width(),
                    preview.frame.height(),
                    preview.descriptor.css()
                );
            })
            .await;
        info!(
            "Preview: {} frames, {} with hair mask, {} empty, {} errors",
            stats.frames, stats.masked_frames, stats.empty_ticks, stats.errors
        );
    }

    let task = machine
        .lock()
        .await
        .handle(UiEvent::Shutter)
        .await
        .context("Shutter failed")?
        .context("Capture already in progress")?;

    let report = task.wait().await.context("Capture failed")?;
    info!(
        "Captured {}x{} (hue {:?}, mask applied: {})",
        report.output_width, report.output_height, report.hue_scope, report.mask_applied
    );
    Ok(report.filename)
}

fn startup_events(args: &Args) -> Vec<UiEvent> {
    let mut events = Vec::new();

    let sliders = [
        (AdjustmentField::Brightness, args.brightness),
        (AdjustmentField::Contrast, args.contrast),
        (AdjustmentField::Saturation, args.saturation),
        (AdjustmentField::HairHue, args.hue),
        (AdjustmentField::Glow, args.glow),
    ];
    for (field, value) in sliders {
        if let Some(value) = value {
            events.push(UiEvent::AdjustmentChanged { field, value });
        }
    }

    if let Some(preset) = args.preset {
        events.push(UiEvent::PresetSelected(preset));
    }
    if let Some(zoom) = args.zoom {
        events.push(UiEvent::ZoomChanged(zoom));
    }
    if args.input.is_some() {
        events.push(UiEvent::OpenGallery);
    }

    events
}

/// Log every session event until the bus closes
fn spawn_event_logger(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut receiver = EventReceiver::new(event_bus.subscribe(), EventFilter::All, "cli");
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) if event.is_failure() => warn!("{}", event.description()),
                Ok(event) => debug!("{}", event.description()),
                Err(EventBusError::ChannelClosed) => break,
                Err(e) => debug!("Event logger skipped events: {}", e),
            }
        }
    })
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lumina={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Lumina Configuration File");
    println!("# Every key is optional; LUMINA_<SECTION>__<KEY> environment variables override it");
    println!();

    let toml = toml::to_string_pretty(&LuminaConfig::default())
        .context("Failed to serialize default configuration")?;
    println!("{}", toml);
    Ok(())
}
