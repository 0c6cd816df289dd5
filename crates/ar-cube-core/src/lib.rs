//! Core types for planar-marker pose recovery.
//!
//! Purely geometric: grayscale image views, homography estimation, polygon
//! helpers, the pinhole camera model and the vision-to-renderer frame
//! conversion. No detector or image-decoding dependency lives here.

mod camera;
mod convention;
mod geometry;
mod homography;
mod image;
mod logger;

pub use camera::{Camera, CameraIntrinsics, Distortion};
pub use convention::{
    view_matrix_to_vision, vision_to_view_matrix, ViewMatrix, VISION_TO_GL_SIGNS,
};
pub use geometry::{approx_polygon_closed, closed_arc_length, polygon_area, signed_polygon_area};
pub use homography::{estimate_homography, Homography};
pub use image::{GrayImage, GrayImageView, ImageSize};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
