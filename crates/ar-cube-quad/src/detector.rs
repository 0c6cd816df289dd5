use log::debug;
use nalgebra::Point2;

use ar_cube_core::{approx_polygon_closed, closed_arc_length, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::contour::{by_area_descending, trace_contours};
use crate::error::DetectError;
use crate::preprocess::gaussian_blur_5x5;
use crate::types::{QuadDetectorParams, Quadrilateral};

/// Finds the largest contour that approximates to exactly four vertices.
pub struct QuadDetector {
    params: QuadDetectorParams,
}

impl Default for QuadDetector {
    fn default() -> Self {
        Self::new(QuadDetectorParams::default())
    }
}

impl QuadDetector {
    pub fn new(params: QuadDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &QuadDetectorParams {
        &self.params
    }

    /// Run blur, Canny, contour tracing and polygon approximation.
    ///
    /// Contours are visited from the largest enclosed area down; the first
    /// one whose approximation has four vertices wins. No convexity or
    /// aspect check is applied.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Result<Quadrilateral, DetectError> {
        self.params.validate()?;
        if image.is_empty() {
            return Err(DetectError::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }
        let expected = image.width * image.height;
        if image.data.len() != expected {
            return Err(DetectError::InvalidBuffer {
                expected,
                actual: image.data.len(),
            });
        }

        let pixels = if self.params.blur {
            gaussian_blur_5x5(image)
        } else {
            image.data.to_vec()
        };
        let gray = image::GrayImage::from_raw(image.width as u32, image.height as u32, pixels)
            .ok_or(DetectError::InvalidBuffer {
                expected,
                actual: image.data.len(),
            })?;

        let edges = imageproc::edges::canny(&gray, self.params.canny_low, self.params.canny_high);
        let contours = trace_contours(&edges);
        debug!("traced {} contours", contours.len());

        for idx in by_area_descending(&contours) {
            let contour = &contours[idx];
            if contour.area < self.params.min_area {
                // Sorted descending: nothing after this passes either.
                break;
            }
            let perimeter = closed_arc_length(&contour.points);
            let approx = approx_polygon_closed(&contour.points, self.params.epsilon_ratio * perimeter);
            if approx.len() != 4 {
                continue;
            }

            debug!(
                "quad from contour {idx}: area={:.1} perimeter={:.1}",
                contour.area, perimeter
            );
            let corners = [0, 1, 2, 3].map(|i| Point2::new(approx[i].x as f32, approx[i].y as f32));
            let quad = Quadrilateral {
                corners,
                contour_area: contour.area,
                contour_perimeter: perimeter,
            };
            return Ok(quad.ordered(self.params.order_corners));
        }

        Err(DetectError::NoQuadrilateralFound {
            contours: contours.len(),
        })
    }
}

/// Detect with default parameters.
pub fn detect_quad(image: &GrayImageView<'_>) -> Result<Quadrilateral, DetectError> {
    QuadDetector::default().detect(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CornerOrder;
    use ar_cube_core::GrayImage;

    fn square_image(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> GrayImage {
        let mut img = GrayImage::filled(w, h, 0);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.data[y * w + x] = 255;
            }
        }
        img
    }

    #[test]
    fn finds_white_square_on_black() {
        let img = square_image(200, 200, 50, 60, 100);
        let quad = detect_quad(&img.view()).expect("square should be found");

        let area = quad.area();
        assert!(
            (area - 10_000.0).abs() / 10_000.0 < 0.08,
            "area {area} too far from 10000"
        );
        let tl = quad.corners[0];
        assert!((tl.x - 50.0).abs() <= 4.0 && (tl.y - 60.0).abs() <= 4.0, "{tl:?}");
        let br = quad.corners[2];
        assert!((br.x - 149.0).abs() <= 4.0 && (br.y - 159.0).abs() <= 4.0, "{br:?}");
    }

    #[test]
    fn uniform_image_has_no_quad() {
        let img = GrayImage::filled(64, 48, 128);
        let err = detect_quad(&img.view()).unwrap_err();
        assert_eq!(err, DetectError::NoQuadrilateralFound { contours: 0 });
    }

    #[test]
    fn empty_image_is_rejected() {
        let img = GrayImage::filled(0, 10, 0);
        assert_eq!(
            detect_quad(&img.view()).unwrap_err(),
            DetectError::EmptyImage {
                width: 0,
                height: 10
            }
        );
    }

    #[test]
    fn inverted_canny_thresholds_are_an_error() {
        let img = square_image(64, 64, 16, 16, 32);
        let params = QuadDetectorParams {
            canny_low: 250.0,
            canny_high: 200.0,
            ..QuadDetectorParams::default()
        };
        let err = QuadDetector::new(params).detect(&img.view()).unwrap_err();
        assert!(matches!(err, DetectError::InvalidParams(_)), "{err:?}");

        let nan_eps = QuadDetectorParams {
            epsilon_ratio: f64::NAN,
            ..QuadDetectorParams::default()
        };
        assert!(matches!(
            QuadDetector::new(nan_eps).detect(&img.view()),
            Err(DetectError::InvalidParams(_))
        ));
    }

    #[test]
    fn single_smoothing_pass_still_finds_square() {
        let img = square_image(200, 200, 50, 60, 100);
        let params = QuadDetectorParams {
            blur: false,
            ..QuadDetectorParams::default()
        };
        let quad = QuadDetector::new(params).detect(&img.view()).expect("square");
        assert!((quad.area() - 10_000.0).abs() / 10_000.0 < 0.08);
    }

    #[test]
    fn min_area_filters_small_outlines() {
        let img = square_image(120, 120, 40, 40, 20);
        let params = QuadDetectorParams {
            min_area: 5_000.0,
            ..QuadDetectorParams::default()
        };
        let err = QuadDetector::new(params).detect(&img.view()).unwrap_err();
        assert!(matches!(err, DetectError::NoQuadrilateralFound { .. }));
    }

    #[test]
    fn unordered_output_is_same_set_of_corners() {
        let img = square_image(160, 160, 30, 40, 80);
        let ordered = detect_quad(&img.view()).expect("ordered");
        let traced = QuadDetector::new(QuadDetectorParams {
            order_corners: CornerOrder::AsTraced,
            ..QuadDetectorParams::default()
        })
        .detect(&img.view())
        .expect("traced");
        for c in traced.corners {
            assert!(ordered.corners.contains(&c));
        }
    }
}
