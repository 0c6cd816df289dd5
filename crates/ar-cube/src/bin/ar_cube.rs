use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};
use serde::Serialize;

use ar_cube::detect::{load_image, process_image};
use ar_cube::render::{background_texture, JsonReportRenderer, SceneRenderer};
use ar_cube::{ArConfig, ImageSize};

#[derive(Debug, Parser)]
#[command(
    name = "ar-cube",
    version,
    about = "Find the square marker in a photograph and place a cube on it"
)]
struct Cli {
    /// Photograph containing the marker.
    image: PathBuf,

    /// Reference image of the marker. Only its size is recorded.
    reference: Option<PathBuf>,

    /// JSON config with `detector`, `pose` and `calibration` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the scene report; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Emit JSON log lines (needs the `tracing` feature).
    #[arg(long)]
    json_log: bool,
}

#[derive(Debug, Serialize)]
struct Inputs {
    image_path: PathBuf,
    reference_path: Option<PathBuf>,
    reference_size: Option<ImageSize>,
    config_path: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    run(cli)
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    ar_cube::core::init_with_level(cli.log_level)?;
    if cli.json_log {
        log::warn!("--json-log needs the `tracing` feature; using plain logs");
    }
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    ar_cube::core::init_tracing(cli.json_log);
    log::set_max_level(cli.log_level);
    Ok(())
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(cli)))]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ArConfig::load(path)?,
        None => ArConfig::default(),
    };

    let img = load_image(&cli.image)?;
    info!("loaded {} ({}x{})", cli.image.display(), img.width(), img.height());

    let reference_size = match &cli.reference {
        Some(path) => {
            let r = load_image(path)?;
            Some(ImageSize::new(r.width() as usize, r.height() as usize))
        }
        None => None,
    };

    let frame = process_image(&img, &config)?;
    let scene = frame.scene();
    let background = background_texture(&img);

    let mut renderer = JsonReportRenderer::new(cli.output.clone());
    renderer.attach(
        "inputs",
        &Inputs {
            image_path: cli.image.clone(),
            reference_path: cli.reference.clone(),
            reference_size,
            config_path: cli.config.clone(),
        },
    )?;
    renderer.attach("config", &config)?;
    renderer.attach("frame", &frame)?;
    renderer.render(&scene, &background)?;
    Ok(())
}
