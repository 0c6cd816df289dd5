use log::{debug, info};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use ar_cube_core::{vision_to_view_matrix, CameraIntrinsics, Distortion, ImageSize, ViewMatrix};
use ar_cube_quad::Quadrilateral;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::calibration::{IntrinsicsEstimator, SingleViewCalibration};
use crate::correspondence::{CorrespondenceProvider, QuadCorrespondences};
use crate::error::PoseError;
use crate::pnp::{solve_planar_pnp, LmParams, Pose};

/// Minimum number of correspondences for a planar pose.
pub const MIN_CORRESPONDENCES: usize = 4;

/// Depth offset the reference-image feature path applies to `t.z`.
pub const FEATURE_PATH_DEPTH_OFFSET: f64 = 11.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSolverParams {
    /// Added to the recovered `t.z` before the view matrix is built.
    pub depth_offset: f64,
    pub lm: LmParams,
}

impl Default for PoseSolverParams {
    fn default() -> Self {
        Self {
            depth_offset: 0.0,
            lm: LmParams::default(),
        }
    }
}

impl PoseSolverParams {
    /// Defaults for correspondences from a reference image of the marker.
    pub fn for_reference_features() -> Self {
        Self {
            depth_offset: FEATURE_PATH_DEPTH_OFFSET,
            ..Self::default()
        }
    }
}

/// Everything recovered from one solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSolution {
    /// Renderer view matrix built from `pose`.
    pub view: ViewMatrix,
    /// Pose with the depth offset applied.
    pub pose: Pose,
    pub intrinsics: CameraIntrinsics,
    pub distortion: Distortion,
    /// Pixel RMSE of the refined pose, before the depth offset.
    pub reprojection_rmse: f64,
    pub iterations: usize,
}

/// Calibrate, solve PnP and build the view matrix for one view.
///
/// The calibration step is pluggable through [`IntrinsicsEstimator`].
#[derive(Clone, Debug, Default)]
pub struct PoseSolver<C = SingleViewCalibration> {
    calibrator: C,
    params: PoseSolverParams,
}

impl PoseSolver<SingleViewCalibration> {
    pub fn new(params: PoseSolverParams) -> Self {
        Self::with_calibrator(SingleViewCalibration::default(), params)
    }
}

impl<C: IntrinsicsEstimator> PoseSolver<C> {
    pub fn with_calibrator(calibrator: C, params: PoseSolverParams) -> Self {
        Self { calibrator, params }
    }

    pub fn params(&self) -> &PoseSolverParams {
        &self.params
    }

    pub fn calibrator(&self) -> &C {
        &self.calibrator
    }

    pub fn solve<P: CorrespondenceProvider + ?Sized>(
        &self,
        provider: &P,
        image_size: ImageSize,
    ) -> Result<PoseSolution, PoseError> {
        let c = provider.correspondences();
        self.solve_correspondences(&c.image, &c.object, image_size)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image, object),
            fields(n = image.len(), width = image_size.width, height = image_size.height)
        )
    )]
    pub fn solve_correspondences(
        &self,
        image: &[Point2<f64>],
        object: &[Point3<f64>],
        image_size: ImageSize,
    ) -> Result<PoseSolution, PoseError> {
        validate(image, object, image_size)?;

        let camera = self.calibrator.estimate(object, image, image_size)?;
        let pnp = solve_planar_pnp(&camera, object, image, &self.params.lm)?;

        let mut pose = pnp.pose;
        pose.tvec.z += self.params.depth_offset;
        let view = vision_to_view_matrix(&pose.rotation_matrix(), &pose.tvec);
        if !view.to_column_major().iter().all(|v| v.is_finite()) {
            return Err(PoseError::DegenerateGeometry("non-finite view matrix"));
        }

        info!(
            "pose: rvec={:?} tvec={:?} rmse={:.3}px",
            pose.rvec.as_slice(),
            pose.tvec.as_slice(),
            pnp.rmse
        );
        Ok(PoseSolution {
            view,
            pose,
            intrinsics: camera.intrinsics,
            distortion: camera.distortion,
            reprojection_rmse: pnp.rmse,
            iterations: pnp.iterations,
        })
    }
}

fn validate(
    image: &[Point2<f64>],
    object: &[Point3<f64>],
    image_size: ImageSize,
) -> Result<(), PoseError> {
    if image_size.is_empty() {
        return Err(PoseError::InvalidImageSize {
            width: image_size.width,
            height: image_size.height,
        });
    }
    if image.len() != object.len() {
        return Err(PoseError::MismatchedLengths {
            image: image.len(),
            object: object.len(),
        });
    }
    if image.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: image.len(),
        });
    }
    let finite = image.iter().all(|p| p.x.is_finite() && p.y.is_finite())
        && object.iter().all(|p| p.coords.iter().all(|v| v.is_finite()));
    if !finite {
        return Err(PoseError::DegenerateGeometry("non-finite coordinates"));
    }
    debug!("{} correspondences in a {}x{} image", image.len(), image_size.width, image_size.height);
    Ok(())
}

/// Pose of the fixed square marker from a detected quadrilateral, using
/// single-view calibration.
pub fn solve_pose(
    quad: &Quadrilateral,
    image_size: ImageSize,
    params: &PoseSolverParams,
) -> Result<PoseSolution, PoseError> {
    PoseSolver::new(params.clone()).solve(&QuadCorrespondences::new(quad), image_size)
}

/// Pose from arbitrary image / marker-plane correspondences (N >= 4).
///
/// Use [`PoseSolverParams::for_reference_features`] for the depth offset the
/// reference-image path expects.
pub fn solve_pose_from_correspondences(
    points_image: &[Point2<f64>],
    points_marker_normalized: &[Point3<f64>],
    image_size: ImageSize,
    params: &PoseSolverParams,
) -> Result<PoseSolution, PoseError> {
    PoseSolver::new(params.clone()).solve_correspondences(
        points_image,
        points_marker_normalized,
        image_size,
    )
}
