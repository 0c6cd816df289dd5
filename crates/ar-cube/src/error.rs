use std::path::PathBuf;

use ar_cube_pose::PoseError;
use ar_cube_quad::DetectError;

/// Errors produced by the facade helpers and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum ArError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "image")]
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Render(#[from] crate::render::RenderError),
}

impl ArError {
    /// True for "marker not found" and "pose unsolvable": the scene is still
    /// drawn, just without the cube. Everything else is invalid input.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ArError::Detect(DetectError::NoQuadrilateralFound { .. }) => true,
            ArError::Pose(err) => err.is_unsolvable(),
            _ => false,
        }
    }
}
