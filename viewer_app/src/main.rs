//! Headless scene viewer
//!
//! Mounts a viewer, submits a script and/or a model file, runs a number of
//! frames and writes the last one as PNG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use scene_engine::config::Config;
use scene_engine::prelude::*;
use thiserror::Error;

/// Command line parameters
#[derive(Debug, Parser)]
#[command(name = "scene_viewer", about)]
struct Args {
    #[arg(long, short = 's')]
    /// Scene script to run once the viewer is mounted.
    script: Option<PathBuf>,

    #[arg(long, short = 'm')]
    /// Model file (.obj or .glb) to submit after the script.
    model: Option<PathBuf>,

    #[arg(long, short = 'c')]
    /// Viewer configuration (.toml or .ron).
    config: Option<String>,

    #[arg(long, default_value_t = 120)]
    /// Number of frames to render.
    frames: u32,

    #[arg(long, default_value_t = 16)]
    /// Fixed frame step in milliseconds.
    step_ms: u64,

    #[arg(long)]
    /// Overrides the configured viewport width.
    width: Option<u32>,

    #[arg(long)]
    /// Overrides the configured viewport height.
    height: Option<u32>,

    #[arg(long, short = 'o', default_value = "frame.png")]
    /// Where to write the last frame.
    output: PathBuf,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] scene_engine::config::ConfigError),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error("Nothing to render: pass --script and/or --model")]
    NothingSubmitted,
}

fn read(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(args: &Args) -> Result<ViewerConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), AppError> {
    if args.script.is_none() && args.model.is_none() {
        return Err(AppError::NothingSubmitted);
    }

    let mut viewer = Viewer::new(load_config(args)?);
    viewer.mount()?;

    if let Some(path) = &args.script {
        let source = String::from_utf8_lossy(&read(path)?).into_owned();
        if let Err(e) = viewer.submit(Submission::script(source)) {
            // The session keeps rendering the last good scene.
            log::error!("{}", e.user_message());
        }
    }

    if let Some(path) = &args.model {
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if let Err(e) = viewer.submit(Submission::file(&file_name, read(path)?)) {
            log::error!("{}", e.user_message());
        }
    }

    let session = viewer.mount()?;
    let attached = session.flush_pending_loads(Duration::from_secs(30))?;
    log::info!("{} model(s) attached", attached);

    let step = Duration::from_millis(args.step_ms);
    match viewer.run_frames(args.frames, step) {
        Some(stats) => log::info!(
            "Rendered {} frames, last frame {} meshes / {} triangles",
            args.frames,
            stats.meshes_drawn,
            stats.triangles_drawn
        ),
        None => log::warn!("No frame was rendered"),
    }

    if let Some(message) = viewer.last_error() {
        log::warn!("Last error: {}", message);
    }

    if let Some(session) = viewer.session() {
        session.save_frame(&args.output)?;
    }
    viewer.teardown();
    Ok(())
}

fn main() {
    scene_engine::foundation::logging::init();

    let args = Args::parse();
    log::info!("Starting scene viewer");

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
