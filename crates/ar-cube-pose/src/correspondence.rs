//! Image-to-marker correspondence sources.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use ar_cube_core::ImageSize;
use ar_cube_quad::Quadrilateral;

/// Object-space marker corners: top-left, top-right, bottom-right,
/// bottom-left of a 2x2 square on the Z = 0 plane.
pub const MARKER_CORNERS: [Point3<f64>; 4] = [
    Point3::new(-1.0, 1.0, 0.0),
    Point3::new(1.0, 1.0, 0.0),
    Point3::new(1.0, -1.0, 0.0),
    Point3::new(-1.0, -1.0, 0.0),
];

/// Paired image points (pixels) and planar object points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Correspondences {
    pub image: Vec<Point2<f64>>,
    pub object: Vec<Point3<f64>>,
}

impl Correspondences {
    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

pub trait CorrespondenceProvider {
    fn correspondences(&self) -> Correspondences;
}

/// A detected quadrilateral bound 1:1, in its given order, to
/// [`MARKER_CORNERS`].
#[derive(Clone, Copy, Debug)]
pub struct QuadCorrespondences<'a> {
    pub quad: &'a Quadrilateral,
}

impl<'a> QuadCorrespondences<'a> {
    pub fn new(quad: &'a Quadrilateral) -> Self {
        Self { quad }
    }
}

impl CorrespondenceProvider for QuadCorrespondences<'_> {
    fn correspondences(&self) -> Correspondences {
        Correspondences {
            image: self.quad.corners_f64().to_vec(),
            object: MARKER_CORNERS.to_vec(),
        }
    }
}

/// Matches between a reference image of the marker and the camera image.
///
/// Reference pixels `(x, y)` become object points
/// `(x / ref_w - 1, y / ref_h - 1, 0)`.
#[derive(Clone, Debug)]
pub struct NormalizedMarkerPoints {
    pub reference_size: ImageSize,
    pub reference_points: Vec<Point2<f64>>,
    pub image_points: Vec<Point2<f64>>,
}

impl NormalizedMarkerPoints {
    pub fn new(
        reference_size: ImageSize,
        reference_points: Vec<Point2<f64>>,
        image_points: Vec<Point2<f64>>,
    ) -> Self {
        Self {
            reference_size,
            reference_points,
            image_points,
        }
    }
}

/// Map a reference-image pixel onto the marker plane.
pub fn normalize_reference_point(p: Point2<f64>, reference_size: ImageSize) -> Point3<f64> {
    Point3::new(
        p.x / reference_size.width as f64 - 1.0,
        p.y / reference_size.height as f64 - 1.0,
        0.0,
    )
}

impl CorrespondenceProvider for NormalizedMarkerPoints {
    fn correspondences(&self) -> Correspondences {
        Correspondences {
            image: self.image_points.clone(),
            object: self
                .reference_points
                .iter()
                .map(|&p| normalize_reference_point(p, self.reference_size))
                .collect(),
        }
    }
}
