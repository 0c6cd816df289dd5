//! Intrinsics estimation from the single view being solved.
//!
//! [`SingleViewCalibration`] uses the planar initialisation of classic
//! calibrators: the principal point is fixed at the image centre and the
//! orthogonality and equal-norm constraints on the first two columns of the
//! plane homography give two linear equations in `(1/fx^2, 1/fy^2)`. One view
//! is a weak constraint; fronto-parallel markers leave the focal length
//! unobservable and fall back to a configured value.

use log::{debug, warn};
use nalgebra::{Matrix2, Matrix3, Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use ar_cube_core::{estimate_homography, Camera, CameraIntrinsics, Distortion, ImageSize};

use crate::error::PoseError;

/// Produces camera intrinsics for one set of plane correspondences.
pub trait IntrinsicsEstimator {
    fn estimate(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        image_size: ImageSize,
    ) -> Result<Camera, PoseError>;
}

/// Parameters for [`SingleViewCalibration`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleViewCalibrationParams {
    /// Focal length used when the view does not constrain it. `None` means
    /// `max(width, height)`.
    pub fallback_focal_px: Option<f64>,
    /// Estimates above `max_focal_ratio * max(width, height)` are treated as
    /// unobservable.
    pub max_focal_ratio: f64,
    /// Relative size of the homography's projective terms below which the
    /// view counts as affine.
    pub affine_tol: f64,
    /// Minimum `|det A| / |A|_F^2` of the 2x2 focal system for separate
    /// `fx`/`fy`. Below it (e.g. a tilt about one image axis) a single shared
    /// focal length is solved instead.
    pub min_conditioning: f64,
}

impl Default for SingleViewCalibrationParams {
    fn default() -> Self {
        Self {
            fallback_focal_px: None,
            max_focal_ratio: 100.0,
            affine_tol: 1e-9,
            min_conditioning: 5e-3,
        }
    }
}

/// Re-estimates intrinsics on every call. Distortion is reported as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleViewCalibration {
    pub params: SingleViewCalibrationParams,
}

impl SingleViewCalibration {
    pub fn new(params: SingleViewCalibrationParams) -> Self {
        Self { params }
    }

    fn fallback_focal(&self, image_size: ImageSize) -> Result<f64, PoseError> {
        let f = self
            .params
            .fallback_focal_px
            .unwrap_or(image_size.width.max(image_size.height) as f64);
        if f.is_finite() && f > 0.0 {
            Ok(f)
        } else {
            Err(PoseError::CalibrationFailed(format!(
                "fallback focal length {f} is not positive"
            )))
        }
    }
}

impl IntrinsicsEstimator for SingleViewCalibration {
    fn estimate(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        image_size: ImageSize,
    ) -> Result<Camera, PoseError> {
        let (cx, cy) = image_size.center();
        let plane: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let h = estimate_homography(&plane, image).ok_or(PoseError::DegenerateGeometry(
            "plane-to-image homography could not be estimated",
        ))?;

        let fallback = self.fallback_focal(image_size)?;
        let max_focal = self.params.max_focal_ratio * image_size.width.max(image_size.height) as f64;

        let (fx, fy) = if h.is_affine(self.params.affine_tol) {
            debug!("affine view, focal length unobservable; using {fallback:.1}px");
            (fallback, fallback)
        } else {
            match focal_from_homography(&h.h, cx, cy, self.params.min_conditioning) {
                Some((fx, fy)) if fx <= max_focal && fy <= max_focal => (fx, fy),
                other => {
                    warn!("single-view focal estimate {other:?} rejected; using {fallback:.1}px");
                    (fallback, fallback)
                }
            }
        };

        let intrinsics = CameraIntrinsics::new(fx, fy, cx, cy);
        if !intrinsics.is_valid() {
            return Err(PoseError::CalibrationFailed(format!(
                "invalid intrinsics {intrinsics:?}"
            )));
        }
        debug!("calibrated fx={fx:.2} fy={fy:.2} cx={cx:.1} cy={cy:.1}");
        Ok(Camera::new(intrinsics, Distortion::NONE))
    }
}

/// Solve the two column constraints of a plane homography for the focal
/// lengths, with the principal point at `(cx, cy)`.
///
/// Solves a single shared focal length instead when the 2x2 system is
/// poorly conditioned (`|det A| / |A|_F^2 < min_conditioning`) or has no
/// positive solution. Returns `None` when no positive finite solution
/// exists.
pub fn focal_from_homography(
    h: &Matrix3<f64>,
    cx: f64,
    cy: f64,
    min_conditioning: f64,
) -> Option<(f64, f64)> {
    let mut hc = *h;
    for c in 0..3 {
        hc[(0, c)] -= cx * h[(2, c)];
        hc[(1, c)] -= cy * h[(2, c)];
    }

    let col0: Vector3<f64> = hc.column(0).into_owned();
    let col1: Vector3<f64> = hc.column(1).into_owned();
    let d1 = (col0 + col1) * 0.5;
    let d2 = (col0 - col1) * 0.5;
    let [h, v, d1, d2] = [col0, col1, d1, d2].map(|x| {
        let n = x.norm();
        if n > 0.0 {
            x / n
        } else {
            x
        }
    });

    let a = Matrix2::new(
        h[0] * v[0], h[1] * v[1], //
        d1[0] * d2[0], d1[1] * d2[1],
    );
    let b = Vector2::new(-h[2] * v[2], -d1[2] * d2[2]);

    let scale = a.norm_squared();
    let conditioning = if scale > 0.0 {
        a.determinant().abs() / scale
    } else {
        0.0
    };
    if conditioning >= min_conditioning {
        if let Some(w) = a.lu().solve(&b) {
            if w.iter().all(|x| x.is_finite() && *x > 0.0) {
                return Some((1.0 / w[0].sqrt(), 1.0 / w[1].sqrt()));
            }
        }
    } else {
        debug!("focal system conditioning {conditioning:.2e}; solving a shared focal");
    }

    // Shared focal: least squares on a single unknown 1/f^2.
    let s = Vector2::new(a[(0, 0)] + a[(0, 1)], a[(1, 0)] + a[(1, 1)]);
    let denom = s.norm_squared();
    if denom < 1e-24 {
        return None;
    }
    let w = s.dot(&b) / denom;
    (w.is_finite() && w > 0.0).then(|| {
        let f = 1.0 / w.sqrt();
        (f, f)
    })
}

/// Known-good intrinsics supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedIntrinsics {
    pub camera: Camera,
}

impl FixedIntrinsics {
    pub fn new(camera: Camera) -> Self {
        Self { camera }
    }
}

impl IntrinsicsEstimator for FixedIntrinsics {
    fn estimate(
        &self,
        _object: &[Point3<f64>],
        _image: &[Point2<f64>],
        _image_size: ImageSize,
    ) -> Result<Camera, PoseError> {
        if self.camera.intrinsics.is_valid() {
            Ok(self.camera)
        } else {
            Err(PoseError::CalibrationFailed(format!(
                "invalid fixed intrinsics {:?}",
                self.camera.intrinsics
            )))
        }
    }
}
