//! Camera pose of a square marker from a single view.
//!
//! The pipeline binds the detected quadrilateral to the fixed marker
//! template, estimates intrinsics from that one view, solves planar PnP and
//! converts the result into a renderer view matrix:
//!
//! ```no_run
//! use ar_cube_core::ImageSize;
//! use ar_cube_pose::{solve_pose, PoseSolverParams};
//! use ar_cube_quad::Quadrilateral;
//! use nalgebra::Point2;
//!
//! let quad = Quadrilateral::from_corners([
//!     Point2::new(110.0, 70.0),
//!     Point2::new(300.0, 85.0),
//!     Point2::new(290.0, 230.0),
//!     Point2::new(95.0, 215.0),
//! ]);
//! let solution = solve_pose(&quad, ImageSize::new(400, 300), &PoseSolverParams::default())?;
//! println!("{:?}", solution.view.to_column_major());
//! # Ok::<(), ar_cube_pose::PoseError>(())
//! ```

mod calibration;
mod correspondence;
mod error;
mod pnp;
mod solver;

pub use calibration::{
    focal_from_homography, FixedIntrinsics, IntrinsicsEstimator, SingleViewCalibration,
    SingleViewCalibrationParams,
};
pub use correspondence::{
    normalize_reference_point, CorrespondenceProvider, Correspondences, NormalizedMarkerPoints,
    QuadCorrespondences, MARKER_CORNERS,
};
pub use error::PoseError;
pub use pnp::{
    pose_from_normalized_homography, refine_pose_lm, solve_planar_pnp, LmParams, PnpSolution,
    Pose,
};
pub use solver::{
    solve_pose, solve_pose_from_correspondences, PoseSolution, PoseSolver, PoseSolverParams,
    FEATURE_PATH_DEPTH_OFFSET, MIN_CORRESPONDENCES,
};
