use std::{env, fs, path::PathBuf};

use ar_cube_core::GrayImageView;
use ar_cube_quad::{QuadDetector, QuadDetectorParams, Quadrilateral};
use image::ImageReader;
use serde::{Deserialize, Serialize};

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use ar_cube_core::init_tracing;
#[cfg(not(feature = "tracing"))]
use ar_cube_core::init_with_level;

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    detector: QuadDetectorParams,
}

#[derive(Debug, Serialize)]
struct ExampleReport {
    image_path: String,
    config_path: String,
    width: u32,
    height: u32,
    quad: Option<Quadrilateral>,
    error: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    run()
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path();
    let cfg = load_config(&config_path)?;

    let img = ImageReader::open(&cfg.image_path)?.decode()?.to_luma8();
    let view = GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    };

    let detector = QuadDetector::new(cfg.detector.clone());
    let (quad, error) = match detector.detect(&view) {
        Ok(quad) => {
            info!("quad corners: {:?}", quad.corners);
            (Some(quad), None)
        }
        Err(err) => {
            warn!("{err}");
            (None, Some(err.to_string()))
        }
    };

    let report = ExampleReport {
        image_path: cfg.image_path.clone(),
        config_path: config_path.to_string_lossy().into_owned(),
        width: img.width(),
        height: img.height(),
        quad,
        error,
    };
    write_report(cfg.output_path.as_deref(), &report)
}

fn parse_config_path() -> PathBuf {
    env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("testdata/quad_detect_config.json"))
}

fn load_config(path: &PathBuf) -> Result<ExampleConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_report(
    path: Option<&str>,
    report: &ExampleReport,
) -> Result<(), Box<dyn std::error::Error>> {
    let out_path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/quad_detect_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, serde_json::to_string_pretty(report)?)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}
