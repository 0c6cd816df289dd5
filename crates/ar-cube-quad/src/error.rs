use thiserror::Error;

/// Why no quadrilateral came out of an image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// No traced contour approximated to four vertices. This is the normal
    /// "marker not visible" outcome.
    #[error("no quadrilateral found among {contours} contours")]
    NoQuadrilateralFound { contours: usize },
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: usize, height: usize },
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
}
