use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// How the four detected corners are ordered on output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerOrder {
    /// Keep the order produced by polygon approximation.
    AsTraced,
    /// Clockwise on screen, starting at the corner closest to the image
    /// origin. Matches the marker template (-1,1), (1,1), (1,-1), (-1,-1).
    #[default]
    ClockwiseFromTopLeft,
}

/// Parameters for [`crate::QuadDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadDetectorParams {
    /// Apply the 5x5 binomial blur before edge detection. The Canny stage
    /// smooths again with its own sigma 1.4 Gaussian, so `false` gives a
    /// single smoothing pass.
    pub blur: bool,
    /// Canny hysteresis thresholds on gradient magnitude. Requires
    /// `0 <= canny_low <= canny_high`.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Douglas–Peucker tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
    /// Contours enclosing less area (px^2) are skipped.
    pub min_area: f64,
    pub order_corners: CornerOrder,
}

impl Default for QuadDetectorParams {
    fn default() -> Self {
        Self {
            blur: true,
            canny_low: 100.0,
            canny_high: 200.0,
            epsilon_ratio: 0.02,
            min_area: 0.0,
            order_corners: CornerOrder::default(),
        }
    }
}

impl QuadDetectorParams {
    /// Reject values the edge and approximation stages cannot run with.
    pub fn validate(&self) -> Result<(), DetectError> {
        let (low, high) = (self.canny_low, self.canny_high);
        if !(low.is_finite() && high.is_finite() && low >= 0.0) {
            return Err(DetectError::InvalidParams(format!(
                "canny thresholds must be finite and non-negative (low={low}, high={high})"
            )));
        }
        if low > high {
            return Err(DetectError::InvalidParams(format!(
                "canny_low {low} exceeds canny_high {high}"
            )));
        }
        if !(self.epsilon_ratio.is_finite() && self.epsilon_ratio >= 0.0) {
            return Err(DetectError::InvalidParams(format!(
                "epsilon_ratio {} must be finite and non-negative",
                self.epsilon_ratio
            )));
        }
        if self.min_area.is_nan() {
            return Err(DetectError::InvalidParams("min_area is NaN".into()));
        }
        Ok(())
    }
}

/// Four image-space corners of the detected marker outline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub corners: [Point2<f32>; 4],
    /// Enclosed area of the source contour, in px^2.
    pub contour_area: f64,
    /// Perimeter of the source contour, in px.
    pub contour_perimeter: f64,
}

impl Quadrilateral {
    pub fn from_corners(corners: [Point2<f32>; 4]) -> Self {
        let mut quad = Self {
            corners,
            contour_area: 0.0,
            contour_perimeter: 0.0,
        };
        let pts = quad.corners_f64();
        quad.contour_area = ar_cube_core::polygon_area(&pts);
        quad.contour_perimeter = ar_cube_core::closed_arc_length(&pts);
        quad
    }

    pub fn corners_f64(&self) -> [Point2<f64>; 4] {
        self.corners.map(|p| Point2::new(p.x as f64, p.y as f64))
    }

    /// Area of the quadrilateral itself (not of the source contour).
    pub fn area(&self) -> f64 {
        ar_cube_core::polygon_area(&self.corners_f64())
    }

    pub fn ordered(&self, order: CornerOrder) -> Self {
        match order {
            CornerOrder::AsTraced => *self,
            CornerOrder::ClockwiseFromTopLeft => Self {
                corners: clockwise_from_top_left(self.corners),
                ..*self
            },
        }
    }
}

/// Sort corners clockwise on screen (y down) around their centroid and start
/// the cycle at the smallest `x + y`.
pub fn clockwise_from_top_left(corners: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let cx = corners.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|p| p.y).sum::<f32>() / 4.0;

    let mut sorted = corners;
    sorted.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb)
    });

    let start = sorted
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1.x + a.1.y).total_cmp(&(b.1.x + b.1.y)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    sorted.rotate_left(start);
    sorted
}
