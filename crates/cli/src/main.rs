use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use eyecam_core::detection::infrastructure::detector_loader::read_resource;
use eyecam_core::pipeline::annotate_stream_use_case::AnnotateStreamUseCase;
use eyecam_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use eyecam_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use eyecam_core::pipeline::session::{LoaderStatus, Session};
use eyecam_core::shared::annotator_config::AnnotatorConfig;
use eyecam_core::shared::constants::SYSTEM_CASCADE_PATHS;
use eyecam_core::video::domain::frame_source::FrameSource;
use eyecam_core::video::infrastructure::image_frame_sink::ImageFrameSink;
use eyecam_core::video::infrastructure::image_frame_source::ImageFrameSource;

/// Outline eyes and high-pass filter still images or image-sequence streams.
#[derive(Parser)]
#[command(name = "eyecam")]
struct Cli {
    /// Input image, or a directory of frames ordered by file name.
    input: PathBuf,

    /// Output image, or output directory for a frame stream.
    output: PathBuf,

    /// Haar eye cascade XML. Defaults to the first OpenCV install found.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// JSON annotator config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of largest detections to outline.
    #[arg(long)]
    top_k: Option<usize>,

    /// Skip eye detection and only filter.
    #[arg(long)]
    no_detect: bool,

    /// Where the cascade copy is stored (default: platform data dir).
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Wait up to this many milliseconds for the detector before the
    /// first frame. Without it, early frames may go undetected.
    #[arg(long)]
    wait_for_detector: Option<u64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let mut session = start_session(&cli, config)?;

    if let Some(ms) = cli.wait_for_detector {
        let status = session.wait_for_detector(Duration::from_millis(ms));
        log::info!("Detector status before first frame: {status:?}");
    }

    let mut source: Box<dyn FrameSource> = Box::new(ImageFrameSource::new());
    let metadata = source.open(&cli.input)?;
    let mut logger = StdoutPipelineLogger::new().with_frame_size(metadata.width, metadata.height);

    let total = metadata.total_frames;
    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(move |current, _| {
        if total > 1 {
            eprint!("\rAnnotating frame {current}/{total}");
        }
        true
    });

    let mut use_case = AnnotateStreamUseCase::new(
        source,
        Box::new(ImageFrameSink::new()),
        Box::new(ThreadedPipelineExecutor::new()),
        Some(progress),
        None,
    );
    let written = use_case.execute(&session, &metadata, &cli.output, &mut logger)?;
    if total > 1 {
        eprintln!();
    }

    if let LoaderStatus::Failed(reason) = session.loader_status() {
        log::warn!("No eye detector was available: {reason}");
    }
    log::info!(
        "Wrote {written} annotated frame(s) to {}",
        cli.output.display()
    );
    session.close();
    Ok(())
}

fn build_config(cli: &Cli) -> Result<AnnotatorConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AnnotatorConfig::from_json_file(path)?,
        None => AnnotatorConfig::default(),
    };
    if let Some(k) = cli.top_k {
        config.top_k = k;
    }
    config.validate()?;
    Ok(config)
}

fn start_session(
    cli: &Cli,
    config: AnnotatorConfig,
) -> Result<Session, Box<dyn std::error::Error>> {
    if cli.no_detect {
        log::info!("Eye detection disabled");
        return Ok(Session::without_detector(config));
    }

    let cascade_path = match &cli.cascade {
        Some(path) => path.clone(),
        None => find_system_cascade().ok_or(
            "No eye cascade found; pass --cascade <haarcascade_eye.xml> or --no-detect",
        )?,
    };
    log::info!("Using cascade {}", cascade_path.display());
    let resource = read_resource(&cascade_path)?;

    match &cli.storage_dir {
        Some(dir) => Ok(Session::start(config, resource, dir)),
        None => Ok(Session::start_with_default_storage(config, resource)?),
    }
}

fn find_system_cascade() -> Option<PathBuf> {
    SYSTEM_CASCADE_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if cli.no_detect && cli.cascade.is_some() {
        return Err("--no-detect and --cascade are mutually exclusive".into());
    }
    if let Some(path) = &cli.cascade {
        if !path.is_file() {
            return Err(format!("Cascade file not found: {}", path.display()).into());
        }
    }
    if cli.top_k == Some(0) {
        return Err("--top-k must be at least 1".into());
    }
    Ok(())
}
