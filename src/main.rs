use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use attendance_kiosk::attendance::{AttendanceEvent, AttendanceOrchestrator};
use attendance_kiosk::capture::{self, FrameSource, StillImageSource};
use attendance_kiosk::config::{AttendanceConfig, DetectorKind};
use attendance_kiosk::detector::{AssumeFaceDetector, FaceDetector};
use attendance_kiosk::identify::HttpIdentificationClient;
use attendance_kiosk::presentation::Overlay;

/// Camera attendance kiosk: samples frames, detects faces, submits them for identification.
#[derive(Parser)]
#[command(name = "attendance-kiosk", version)]
struct Cli {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling period in milliseconds.
    #[arg(long)]
    period_ms: Option<u64>,

    /// How long a result stays on screen, in milliseconds.
    #[arg(long)]
    dwell_ms: Option<u64>,

    /// Identification service URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Serve frames from an image file or directory instead of a camera.
    #[arg(long, conflicts_with = "camera")]
    images: Option<PathBuf>,

    /// Camera index or device id.
    #[arg(long)]
    camera: Option<String>,

    /// List cameras and exit.
    #[arg(long)]
    list_cameras: bool,

    /// Face detector: assume-face or blazeface.
    #[arg(long)]
    detector: Option<DetectorKind>,

    /// BlazeFace ONNX model path.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    run_for: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    attendance_kiosk::init_tracing();
    let cli = Cli::parse();

    tracing::info!("Starting Attendance Kiosk v{}", env!("CARGO_PKG_VERSION"));

    if cli.list_cameras {
        let cameras = capture::list_cameras();
        if cameras.is_empty() {
            println!("No cameras found");
        }
        for camera in cameras {
            println!("{}\t{}", camera.id, camera.name);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    let source = build_source(&cli, &config)?;
    let detector = build_detector(&config)?;
    let identifier = Arc::new(
        HttpIdentificationClient::with_options(config.identification_options())
            .context("Failed to create identification client")?,
    );

    tracing::info!("Submitting face frames to {}", config.endpoint);

    let orchestrator =
        AttendanceOrchestrator::new(source, detector, identifier, config.timeouts());
    let events = orchestrator.subscribe();
    orchestrator.start(config.period(), config.dwell())?;

    let renderer = tokio::spawn(render_overlay(events));

    match cli.run_for {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
        }
    }

    orchestrator.stop();
    renderer.abort();

    let stats = orchestrator.stats();
    tracing::info!(
        "Session summary: {} submissions, {} marked, {} not found, {} transport failures",
        stats.submissions,
        stats.identified,
        stats.not_found,
        stats.transport_failures
    );
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<AttendanceConfig> {
    let mut config = match &cli.config {
        Some(path) => AttendanceConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AttendanceConfig::default(),
    };

    if let Some(period_ms) = cli.period_ms {
        config.period_ms = period_ms;
    }
    if let Some(dwell_ms) = cli.dwell_ms {
        config.dwell_ms = dwell_ms;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(camera) = &cli.camera {
        config.camera.device_id = Some(camera.clone());
    }
    if let Some(kind) = cli.detector {
        config.detector.kind = kind;
    }
    if let Some(model) = &cli.model {
        config.detector.model_path = Some(model.clone());
    }

    config.validate()?;
    Ok(config)
}

fn build_source(cli: &Cli, config: &AttendanceConfig) -> anyhow::Result<Arc<dyn FrameSource>> {
    if let Some(images) = &cli.images {
        let source = StillImageSource::open(images)
            .with_context(|| format!("Failed to load images from {:?}", images))?;
        return Ok(Arc::new(source));
    }

    #[cfg(feature = "webcam")]
    {
        let camera = &config.camera;
        let source = capture::WebcamSource::open(
            camera.device_id.clone(),
            camera.width,
            camera.height,
            camera.jpeg_quality,
        )
        .context("Failed to open camera")?;
        Ok(Arc::new(source))
    }

    #[cfg(not(feature = "webcam"))]
    {
        let _ = config;
        bail!("No --images given and this build has no webcam support (enable the `webcam` feature)")
    }
}

fn build_detector(config: &AttendanceConfig) -> anyhow::Result<Arc<dyn FaceDetector>> {
    match config.detector.kind {
        DetectorKind::AssumeFace => Ok(Arc::new(AssumeFaceDetector)),
        DetectorKind::Blazeface => {
            #[cfg(feature = "onnx")]
            {
                let model_path = config
                    .detector
                    .model_path
                    .clone()
                    .context("blazeface needs a model path")?;
                Ok(Arc::new(attendance_kiosk::detector::BlazefaceDetector::new(
                    model_path,
                    config.detector.confidence,
                )))
            }

            #[cfg(not(feature = "onnx"))]
            {
                bail!("blazeface detector requires the `onnx` feature")
            }
        }
    }
}

/// Print the overlay whenever it changes
async fn render_overlay(mut events: tokio::sync::broadcast::Receiver<AttendanceEvent>) {
    let mut shown = Overlay::Quiescent;

    loop {
        match events.recv().await {
            Ok(AttendanceEvent::StateChanged(state)) => {
                let overlay = Overlay::from_state(&state);
                if overlay != shown {
                    match &overlay {
                        Overlay::Quiescent if shown.is_banner() => println!("[camera]"),
                        Overlay::Quiescent => {}
                        other => println!("[{}]", other),
                    }
                    shown = overlay;
                }
            }
            Ok(AttendanceEvent::Ready) => println!("[camera] ready"),
            Ok(AttendanceEvent::CycleAborted(report)) => {
                tracing::debug!("Cycle aborted: {} ({})", report.message, report.code);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Overlay renderer skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
