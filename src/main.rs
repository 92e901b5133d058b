use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lane_priority::{
    adapters::{
        controller::{http_link::HttpLink, serial_link::SerialLink},
        fs::{folder_source::FolderFrameSource, png_display::PngDisplay},
        onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
        v4l2::camera_source::CameraFrameSource,
    },
    application::{
        compositor::Compositor,
        dto::ScanOptions,
        overlay::Overlay,
        ports::{ControllerLinkPort, DisplayPort, FrameSourcePort, ModelCatalogPort},
        services::{ControllerHandoff, ScanService},
    },
    config::{Config, LaneSource, LinkConfig},
    domain::model::ModelId,
};

#[derive(Parser, Debug)]
#[command(name = "lane-priority", about = "Pick the busiest lane at an intersection")]
struct Args {
    #[arg(long, default_value = "conf.json")]
    config: PathBuf,
    /// Run only this lane set from FOLDER_DETAILS
    #[arg(long)]
    only: Option<String>,
    /// Rank and render, but never contact the controller
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging (RUST_LOG=info by default)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    tracing::info!(config = %args.config.display(), lane_sets = config.lane_sets.len(), "configuration loaded");

    // 2. Detector
    let model = ModelId {
        name: config.model.name.clone(),
        onnx_path: config.model.onnx_path.clone(),
    };
    OnnxModelCatalog::new().validate_model(&model).await?;
    let engine = OnnxYoloEngine::load(&model.onnx_path, config.model.params.clone())
        .with_context(|| format!("loading model {}", model.onnx_path))?;

    // 3. Compositor, display and controller hand-off
    let overlay = match &config.mosaic.font_path {
        Some(path) => Overlay::from_font_file(path)?,
        None => {
            tracing::warn!("no mosaic.font_path configured, status labels will not be drawn");
            Overlay::without_text()
        }
    };
    let mut scanner = ScanService::new(Box::new(engine), Compositor::new(overlay, config.mosaic.size()));
    let display = PngDisplay::new(&config.display.output_dir);

    let link: Arc<dyn ControllerLinkPort> = match &config.controller.link {
        LinkConfig::Serial { port, baudrate, timeout, keep_connection } => {
            Arc::new(SerialLink::new(port, *baudrate, *timeout, *keep_connection))
        }
        LinkConfig::Http { url, timeout } => Arc::new(HttpLink::new(url.as_str(), *timeout)?),
    };
    let handoff = ControllerHandoff::new(link);
    let mut pending = Vec::new();

    // 4. One scan cycle per enabled lane set
    for (i, (name, lanes)) in config.lane_sets.iter().enumerate() {
        if !lanes.run || args.only.as_deref().is_some_and(|only| only != name) {
            tracing::debug!(lane_set = %name, "skipped");
            continue;
        }

        let source: Box<dyn FrameSourcePort> = match lanes.source()? {
            LaneSource::Folder(path) => Box::new(FolderFrameSource::new(path, config.frame)),
            LaneSource::Cameras(devices) => Box::new(CameraFrameSource::new(devices, config.frame)),
        };
        let options = ScanOptions::from_config(lanes, &config.settings, &config.model.params);
        let window = format!("__Vehicle Detection Module {i}__");

        let outcome = match scanner.run_cycle(name, source.as_ref(), &options) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(lane_set = %name, error = %e, "scan cycle failed");
                continue;
            }
        };
        tracing::info!(lane_set = %name, winner = outcome.winner_name(), "priority lane selected");

        if config.settings.controller && lanes.conf.send {
            if args.dry_run || !config.controller.auto_send {
                tracing::info!(lane_set = %name, payload = %outcome.record.to_json()?, "controller send disabled");
            } else {
                pending.push(handoff.dispatch(name, outcome.record.clone()));
            }
        }
        if config.settings.monitor && lanes.conf.show {
            if let Err(e) = display.show(&window, &outcome.mosaic) {
                tracing::error!(window = %window, error = %e, "display failed");
            }
        }
    }

    // 5. Let in-flight controller hand-offs finish
    for task in pending {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "controller task panicked");
        }
    }

    Ok(())
}
