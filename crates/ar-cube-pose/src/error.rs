use thiserror::Error;

/// Failures of the pose pipeline. Every variant means "pose unsolvable":
/// the caller should render without the cube.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("pose needs at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("mismatched correspondence lengths: image ({image}) != object ({object})")]
    MismatchedLengths { image: usize, object: usize },

    /// Collinear, coincident or non-finite points, or a homography that
    /// could not be estimated.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    #[error("camera calibration failed: {0}")]
    CalibrationFailed(String),

    #[error("recovered pose places the marker behind the camera")]
    BehindCamera,

    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: usize, height: usize },
}

impl PoseError {
    /// True when this view simply has no usable pose, so the scene is drawn
    /// without the cube. Every current variant is in that class; new
    /// variants must be classified here.
    pub fn is_unsolvable(&self) -> bool {
        match self {
            PoseError::InsufficientCorrespondences { .. }
            | PoseError::MismatchedLengths { .. }
            | PoseError::DegenerateGeometry(_)
            | PoseError::CalibrationFailed(_)
            | PoseError::BehindCamera
            | PoseError::InvalidImageSize { .. } => true,
        }
    }
}
