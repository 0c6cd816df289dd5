//! High-level facade crate for the `ar-cube-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, detector and pose crates
//! - (feature-gated) end-to-end helpers from `image` types
//! - the render boundary: a [`render::SceneDescription`] for an external
//!   renderer and a headless JSON implementation
//!
//! ## Quickstart
//!
//! ```no_run
//! use ar_cube::{detect, ArConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = detect::load_image("photo.jpg".as_ref())?;
//! let (quad, solution) = detect::solve_image(&img, &ArConfig::default())?;
//! println!("quad: {:?}", quad.corners);
//! println!("view: {:?}", solution.view.to_column_major());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ar_cube::core`: image views, homographies, camera model, frame conversion.
//! - `ar_cube::quad`: quadrilateral marker outline detection.
//! - `ar_cube::pose`: single-view calibration, planar PnP, view matrices.
//! - `ar_cube::detect` (feature `image`): end-to-end helpers.
//! - `ar_cube::render` (feature `image`): scene description and renderers.

pub use ar_cube_core as core;
pub use ar_cube_pose as pose;
pub use ar_cube_quad as quad;

pub use ar_cube_core::{ImageSize, ViewMatrix};
pub use ar_cube_pose::{PoseError, PoseSolution, PoseSolverParams};
pub use ar_cube_quad::{DetectError, QuadDetectorParams, Quadrilateral};

mod config;
mod error;

pub use config::ArConfig;
pub use error::ArError;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod render;
