use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Relative size below which a point configuration counts as collinear.
const DEGENERACY_TOL: f64 = 1e-9;

/// Plane-to-plane projective map, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// True when the projective row is (numerically) `[0, 0, h33]`, i.e. the
    /// plane is viewed without perspective foreshortening.
    pub fn is_affine(&self, tol: f64) -> bool {
        let s = self.h[(2, 2)].abs();
        self.h[(2, 0)].abs() <= tol * s && self.h[(2, 1)].abs() <= tol * s
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = (2.0_f64).sqrt() / mean_dist;
    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Translate to the centroid and scale so the mean distance is sqrt(2).
///
/// Returns `None` when all points coincide.
fn normalize_points(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = pts.len() as f64;
    let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n, sy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    Some((out, t))
}

/// Twice the signed area of the triangle (a, b, c).
#[inline]
fn cross3(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Detect configurations that cannot define a homography.
///
/// Expects Hartley-normalised points (unit scale). For four points any
/// collinear triple is rejected; for more, the homogeneous point matrix must
/// have full rank.
fn is_degenerate(norm: &[Point2<f64>]) -> bool {
    if norm.len() == 4 {
        const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        return TRIPLES
            .iter()
            .any(|t| cross3(&norm[t[0]], &norm[t[1]], &norm[t[2]]).abs() < DEGENERACY_TOL);
    }

    let m = DMatrix::<f64>::from_fn(norm.len(), 3, |r, c| match c {
        0 => norm[r].x,
        1 => norm[r].y,
        _ => 1.0,
    });
    let sv = m.singular_values();
    let max = sv.max();
    let min = sv.min();
    !(max > 0.0 && min / max > DEGENERACY_TOL.sqrt())
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate H such that `dst ~ H * src` from four or more correspondences.
///
/// Exactly four points use the minimal 8x8 solve; more points use the
/// normalised DLT. Returns `None` for mismatched lengths, fewer than four
/// points, or degenerate (collinear / coincident) configurations.
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let (src_n, t_src) = normalize_points(src)?;
    let (dst_n, t_dst) = normalize_points(dst)?;
    if is_degenerate(&src_n) || is_degenerate(&dst_n) {
        return None;
    }

    let hn = if src.len() == 4 {
        solve_minimal(&src_n, &dst_n)?
    } else {
        solve_dlt(&src_n, &dst_n)?
    };

    let h_den = denormalize_homography(hn, t_src, t_dst)?;
    let h_den = normalize_homography(h_den)?;
    Some(Homography::new(h_den))
}

// Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
// For each correspondence (x,y)->(u,v):
// h11 x + h12 y + h13 - u h31 x - u h32 y = u
// h21 x + h22 y + h23 - v h31 x - v h32 y = v
fn solve_minimal(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let r0 = 2 * k;
        a[(r0, 0)] = s.x;
        a[(r0, 1)] = s.y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -d.x * s.x;
        a[(r0, 7)] = -d.x * s.y;
        b[r0] = d.x;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = s.x;
        a[(r1, 4)] = s.y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -d.y * s.x;
        a[(r1, 7)] = -d.y * s.y;
        b[r1] = d.y;
    }

    let x = a.lu().solve(&b)?;
    Some(Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    ))
}

fn solve_dlt(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -s.x;
        a[(2 * k, 1)] = -s.y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = d.x * s.x;
        a[(2 * k, 7)] = d.x * s.y;
        a[(2 * k, 8)] = d.x;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -s.x;
        a[(2 * k + 1, 4)] = -s.y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = d.y * s.x;
        a[(2 * k + 1, 7)] = d.y * s.y;
        a[(2 * k + 1, 8)] = d.y;
    }

    // Solve Ah = 0: h is the right singular vector of the smallest singular value.
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (last, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(last);

    Some(Matrix3::<f64>::from_row_slice(&[
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            80.0, 5.0, 200.0, //
            -2.0, -70.0, 150.0, //
            0.09, -0.04, 1.0,
        ))
    }

    fn marker() -> [Point2<f64>; 4] {
        [
            Point2::new(-1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, -1.0),
            Point2::new(-1.0, -1.0),
        ]
    }

    #[test]
    fn four_points_recover_h() {
        let gt = ground_truth();
        let src = marker();
        let dst = src.map(|p| gt.apply(p));

        let est = estimate_homography(&src, &dst).expect("recoverable");
        for p in [Point2::new(0.0, 0.0), Point2::new(0.3, -0.7), Point2::new(-0.9, 0.2)] {
            assert_close(est.apply(p), gt.apply(p), 1e-6);
        }
        assert_relative_eq!(est.h, gt.h, epsilon = 1e-6);
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let gt = ground_truth();
        let src: Vec<Point2<f64>> = (0..4)
            .flat_map(|y| (0..4).map(move |x| Point2::new(x as f64 * 0.5 - 1.0, y as f64 * 0.5 - 1.0)))
            .collect();
        let dst: Vec<Point2<f64>> = src.iter().map(|&p| gt.apply(p)).collect();

        let est = estimate_homography(&src, &dst).expect("estimate");
        for p in [Point2::new(0.1, 0.1), Point2::new(-0.6, 0.9)] {
            assert_close(est.apply(p), gt.apply(p), 1e-6);
        }
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = ground_truth();
        let inv = h.inverse().expect("invertible");
        for p in marker() {
            assert_close(inv.apply(h.apply(p)), p, 1e-9);
        }
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert!(estimate_homography(&marker(), &src).is_none());

        let three_collinear = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(5.0, 8.0),
        ];
        assert!(estimate_homography(&marker(), &three_collinear).is_none());
    }

    #[test]
    fn coincident_or_mismatched_input_fails() {
        let same = [Point2::new(3.0, 3.0); 4];
        assert!(estimate_homography(&marker(), &same).is_none());
        assert!(estimate_homography(&marker(), &marker()[..3]).is_none());
    }

    #[test]
    fn affine_detection() {
        let affine = Homography::new(Matrix3::new(
            100.0, 0.0, 200.0, //
            0.0, -75.0, 150.0, //
            0.0, 0.0, 1.0,
        ));
        assert!(affine.is_affine(1e-9));
        assert!(!ground_truth().is_affine(1e-9));
    }
}
