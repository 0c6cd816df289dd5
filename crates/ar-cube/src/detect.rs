//! End-to-end helpers from `image` types: detect the marker quad, solve the
//! pose and assemble a scene.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader};
use log::warn;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ArConfig;
use crate::core::{GrayImageView, ImageSize};
use crate::error::ArError;
use crate::pose::{PoseSolution, PoseSolver, QuadCorrespondences, SingleViewCalibration};
use crate::quad::{QuadDetector, Quadrilateral};
use crate::render::SceneDescription;

/// Convert an `image::GrayImage` into the lightweight core view type.
pub fn gray_view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Wrap a raw row-major luma buffer, checking its length.
pub fn gray_view_from_slice(
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<GrayImageView<'_>, ArError> {
    let expected = width as usize * height as usize;
    GrayImageView::new(width as usize, height as usize, data).ok_or(ArError::InvalidGrayBuffer {
        expected,
        got: data.len(),
    })
}

pub fn load_image(path: &Path) -> Result<DynamicImage, ArError> {
    let reader = ImageReader::open(path).map_err(|source| ArError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = reader.with_guessed_format().map_err(|source| ArError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    reader.decode().map_err(|source| ArError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the quad detector on a grayscale image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, config), fields(width = img.width(), height = img.height()))
)]
pub fn detect_quad_image(img: &GrayImage, config: &ArConfig) -> Result<Quadrilateral, ArError> {
    Ok(QuadDetector::new(config.detector.clone()).detect(&gray_view(img))?)
}

/// Solve the view for a detected quad with the configured calibrator.
pub fn solve_quad(
    quad: &Quadrilateral,
    image_size: ImageSize,
    config: &ArConfig,
) -> Result<PoseSolution, ArError> {
    let solver = PoseSolver::with_calibrator(
        SingleViewCalibration::new(config.calibration.clone()),
        config.pose.clone(),
    );
    Ok(solver.solve(&QuadCorrespondences::new(quad), image_size)?)
}

/// Detect and solve; any failure is returned.
pub fn solve_image(
    img: &DynamicImage,
    config: &ArConfig,
) -> Result<(Quadrilateral, PoseSolution), ArError> {
    let gray = img.to_luma8();
    let quad = detect_quad_image(&gray, config)?;
    let size = ImageSize::new(gray.width() as usize, gray.height() as usize);
    let solution = solve_quad(&quad, size, config)?;
    Ok((quad, solution))
}

/// Outcome of one frame, with recoverable failures folded in.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub image_size: ImageSize,
    pub quad: Option<Quadrilateral>,
    pub solution: Option<PoseSolution>,
    /// Set when the marker was not found or the pose was unsolvable.
    pub error: Option<String>,
}

impl FrameReport {
    pub fn scene(&self) -> SceneDescription {
        SceneDescription::for_image(
            self.image_size.width as u32,
            self.image_size.height as u32,
            self.solution.map(|s| s.view),
        )
    }
}

/// Detect and solve, turning "marker not found" and "pose unsolvable" into
/// a background-only report. Invalid input is still an error.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, config), fields(width = img.width(), height = img.height()))
)]
pub fn process_image(img: &DynamicImage, config: &ArConfig) -> Result<FrameReport, ArError> {
    let gray = img.to_luma8();
    let image_size = ImageSize::new(gray.width() as usize, gray.height() as usize);
    let mut report = FrameReport {
        image_size,
        quad: None,
        solution: None,
        error: None,
    };

    let outcome = detect_quad_image(&gray, config).and_then(|quad| {
        report.quad = Some(quad);
        solve_quad(&quad, image_size, config)
    });
    match outcome {
        Ok(solution) => report.solution = Some(solution),
        Err(err) if err.is_recoverable() => {
            warn!("{err}; rendering background only");
            report.error = Some(err.to_string());
        }
        Err(err) => return Err(err),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::DetectError;

    #[test]
    fn slice_view_checks_length() {
        let data = [0u8; 12];
        assert!(gray_view_from_slice(4, 3, &data).is_ok());
        let err = gray_view_from_slice(4, 4, &data).unwrap_err();
        assert!(matches!(
            err,
            ArError::InvalidGrayBuffer {
                expected: 16,
                got: 12
            }
        ));
    }

    #[test]
    fn uniform_image_yields_background_only_report() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 60, image::Luma([90])));
        let report = process_image(&img, &ArConfig::default()).expect("recoverable");
        assert!(report.quad.is_none());
        assert!(report.solution.is_none());
        assert_eq!(
            report.error.as_deref(),
            Some(DetectError::NoQuadrilateralFound { contours: 0 }.to_string().as_str())
        );
        assert!(!report.scene().has_cube());

        let err = solve_image(&img, &ArConfig::default()).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn inverted_canny_thresholds_are_fatal() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 60, image::Luma([90])));
        let config =
            ArConfig::from_json_str(r#"{"detector":{"canny_low":250,"canny_high":200}}"#)
                .expect("parse");
        let err = process_image(&img, &config).unwrap_err();
        assert!(matches!(err, ArError::Detect(DetectError::InvalidParams(_))), "{err:?}");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn empty_image_is_fatal() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = process_image(&img, &ArConfig::default()).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
