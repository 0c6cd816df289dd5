//! Quadrilateral marker outline detector.
//!
//! Pipeline: 5x5 Gaussian blur, Canny edges, Suzuki–Abe contour tracing with
//! full hierarchy, vertex-only compression, then closed Douglas–Peucker on
//! contours visited from the largest enclosed area down. The first contour
//! that approximates to exactly four vertices is the marker.
//!
//! ```no_run
//! use ar_cube_core::GrayImage;
//! use ar_cube_quad::detect_quad;
//!
//! let img = GrayImage::filled(640, 480, 0);
//! match detect_quad(&img.view()) {
//!     Ok(quad) => println!("corners: {:?}", quad.corners),
//!     Err(err) => println!("{err}"),
//! }
//! ```

pub mod contour;
mod detector;
mod error;
pub mod preprocess;
mod types;

pub use detector::{detect_quad, QuadDetector};
pub use error::DetectError;
pub use types::{clockwise_from_top_left, CornerOrder, QuadDetectorParams, Quadrilateral};
