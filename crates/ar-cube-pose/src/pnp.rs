//! Planar Perspective-n-Point: homography decomposition followed by
//! Levenberg–Marquardt refinement of the pixel reprojection error.

use log::debug;
use nalgebra::{Matrix3, Matrix6, Point2, Point3, Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use ar_cube_core::{estimate_homography, Camera};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::PoseError;

/// Parameters controlling the LM pose refinement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    pub max_iters: usize,
    /// Stop once an accepted step lowers the squared error sum by less.
    pub eps: f64,
    pub lambda_init: f64,
    pub lambda_mul: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-6,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// Marker-to-camera pose in the vision frame (X right, Y down, Z forward).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Axis-angle rotation; direction is the axis, norm the angle in radians.
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation(rotation: &Rotation3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rotation.scaled_axis(),
            tvec,
        }
    }

    /// Exponential map of `rvec`.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rvec)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation().matrix()
    }

    pub fn transform(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation() * p + self.tvec
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PnpSolution {
    pub pose: Pose,
    /// Pixel RMSE over all residual components after refinement.
    pub rmse: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Recover the pose of a plane (Z = 0) from a homography that maps plane
/// coordinates to undistorted normalised image coordinates.
///
/// The scale comes from the mean norm of the first two columns and its sign
/// is chosen so the plane origin lies in front of the camera. The rotation
/// is projected onto SO(3) by SVD.
pub fn pose_from_normalized_homography(h: &Matrix3<f64>) -> Result<Pose, PoseError> {
    let h1: Vector3<f64> = h.column(0).into_owned();
    let h2: Vector3<f64> = h.column(1).into_owned();
    let h3: Vector3<f64> = h.column(2).into_owned();

    let mean_norm = 0.5 * (h1.norm() + h2.norm());
    if !mean_norm.is_finite() || mean_norm < 1e-12 {
        return Err(PoseError::DegenerateGeometry("homography has vanishing columns"));
    }
    let mut lambda = 1.0 / mean_norm;
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let t = h3 * lambda;
    if t.z <= 0.0 {
        return Err(PoseError::BehindCamera);
    }

    let r = Matrix3::from_columns(&[r1, r2, r1.cross(&r2)]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::DegenerateGeometry("rotation SVD failed"));
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    Ok(Pose::from_rotation(
        &Rotation3::from_matrix_unchecked(r_orth),
        t,
    ))
}

/// Sum of squared pixel residuals, written into `out`. `None` if any point
/// falls behind the camera.
fn reprojection(
    camera: &Camera,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    x: &Vector6<f64>,
    out: &mut [f64],
) -> Option<f64> {
    let rot = Rotation3::from_scaled_axis(Vector3::new(x[0], x[1], x[2]));
    let t = Vector3::new(x[3], x[4], x[5]);
    let mut sum_sq = 0.0;
    for (i, (pw, uv)) in object.iter().zip(image).enumerate() {
        let proj = camera.project(&(rot * pw + t))?;
        let du = proj.x - uv.x;
        let dv = proj.y - uv.y;
        out[2 * i] = du;
        out[2 * i + 1] = dv;
        sum_sq += du * du + dv * dv;
    }
    Some(sum_sq)
}

/// Refine `pose` with Levenberg–Marquardt on the pixel reprojection error.
///
/// The Jacobian uses central differences over `[rvec, t]`.
pub fn refine_pose_lm(
    camera: &Camera,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    pose: Pose,
    params: &LmParams,
) -> Result<PnpSolution, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedLengths {
            image: image.len(),
            object: object.len(),
        });
    }
    let n = object.len();
    if n < 3 {
        return Err(PoseError::InsufficientCorrespondences {
            required: 3,
            actual: n,
        });
    }

    let mut x = Vector6::new(
        pose.rvec.x,
        pose.rvec.y,
        pose.rvec.z,
        pose.tvec.x,
        pose.tvec.y,
        pose.tvec.z,
    );
    let mut residuals = vec![0.0; 2 * n];
    let mut trial = vec![0.0; 2 * n];
    let mut plus = vec![0.0; 2 * n];
    let mut minus = vec![0.0; 2 * n];
    let mut jac = vec![Vector6::<f64>::zeros(); 2 * n];

    let mut err_sq = reprojection(camera, object, image, &x, &mut residuals)
        .ok_or(PoseError::BehindCamera)?;
    let mut lambda = params.lambda_init;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iters {
        iterations += 1;

        const H_ROT: f64 = 1e-6;
        let t_scale = x[3].abs().max(x[4].abs()).max(x[5].abs()).max(1.0);
        let h_trans = 1e-6 * t_scale;
        for k in 0..6 {
            let h = if k < 3 { H_ROT } else { h_trans };
            let mut xp = x;
            let mut xm = x;
            xp[k] += h;
            xm[k] -= h;
            let ok = reprojection(camera, object, image, &xp, &mut plus).is_some()
                && reprojection(camera, object, image, &xm, &mut minus).is_some();
            if !ok {
                return Err(PoseError::BehindCamera);
            }
            for (row, (p, m)) in jac.iter_mut().zip(plus.iter().zip(&minus)) {
                row[k] = (p - m) / (2.0 * h);
            }
        }

        let mut a = Matrix6::<f64>::zeros();
        let mut b = Vector6::<f64>::zeros();
        for (row, r) in jac.iter().zip(&residuals) {
            a += row * row.transpose();
            b += row * *r;
        }
        for d in 0..6 {
            a[(d, d)] += lambda;
        }

        let Some(delta) = a.lu().solve(&(-b)) else {
            lambda *= params.lambda_mul;
            continue;
        };

        let x_new = x + delta;
        match reprojection(camera, object, image, &x_new, &mut trial) {
            Some(err_new) if err_new < err_sq => {
                let gain = err_sq - err_new;
                x = x_new;
                err_sq = err_new;
                residuals.copy_from_slice(&trial);
                lambda = (lambda / params.lambda_mul).max(1e-12);
                if gain < params.eps {
                    converged = true;
                    break;
                }
            }
            _ => lambda *= params.lambda_mul,
        }
        if err_sq < 1e-24 {
            converged = true;
            break;
        }
    }

    let rmse = (err_sq / (2 * n) as f64).sqrt();
    debug!("LM refine: rmse={rmse:.4}px after {iterations} iterations");
    Ok(PnpSolution {
        pose: Pose::new(Vector3::new(x[0], x[1], x[2]), Vector3::new(x[3], x[4], x[5])),
        rmse,
        iterations,
        converged,
    })
}

/// Pose of planar (Z = 0) object points from their pixel projections.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(camera, object, image, params), fields(n = object.len()))
)]
pub fn solve_planar_pnp(
    camera: &Camera,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    params: &LmParams,
) -> Result<PnpSolution, PoseError> {
    if object.iter().any(|p| p.z.abs() > 1e-9) {
        return Err(PoseError::DegenerateGeometry("object points must lie on Z = 0"));
    }
    let plane: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let normalized: Vec<Point2<f64>> = image
        .iter()
        .map(|&p| {
            let n = camera.normalize(p);
            Point2::new(n.x, n.y)
        })
        .collect();

    let h = estimate_homography(&plane, &normalized).ok_or(PoseError::DegenerateGeometry(
        "plane-to-image homography could not be estimated",
    ))?;
    let initial = pose_from_normalized_homography(&h.h)?;
    if object.iter().any(|p| initial.transform(p).z <= 0.0) {
        return Err(PoseError::BehindCamera);
    }
    refine_pose_lm(camera, object, image, initial, params)
}
