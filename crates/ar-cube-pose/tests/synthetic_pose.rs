use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Rotation3, Vector3};

use ar_cube_core::{view_matrix_to_vision, Camera, CameraIntrinsics, Distortion, ImageSize};
use ar_cube_pose::{
    solve_pose, solve_pose_from_correspondences, FixedIntrinsics, NormalizedMarkerPoints, Pose,
    PoseError, PoseSolver, PoseSolverParams, MARKER_CORNERS,
};
use ar_cube_quad::Quadrilateral;

fn centred_camera(size: ImageSize, f: f64) -> Camera {
    let (cx, cy) = size.center();
    Camera::new(CameraIntrinsics::new(f, f, cx, cy), Distortion::NONE)
}

fn project(cam: &Camera, pose: &Pose, pts: &[Point3<f64>]) -> Vec<Point2<f64>> {
    pts.iter()
        .map(|p| cam.project(&pose.transform(p)).expect("in front of camera"))
        .collect()
}

/// In-plane rotation plus a tilt about two axes, a few marker widths away.
fn tilted_pose() -> Pose {
    Pose::from_rotation(
        &Rotation3::from_euler_angles(0.4, -0.3, 0.5),
        Vector3::new(0.2, -0.1, 6.0),
    )
}

#[test]
fn fixed_intrinsics_recover_known_pose() {
    let size = ImageSize::new(640, 480);
    let cam = Camera::new(
        CameraIntrinsics::new(700.0, 690.0, 330.0, 235.0),
        Distortion::NONE,
    );
    let gt = tilted_pose();
    let image = project(&cam, &gt, &MARKER_CORNERS);

    let solver = PoseSolver::with_calibrator(FixedIntrinsics::new(cam), PoseSolverParams::default());
    let sol = solver
        .solve_correspondences(&image, &MARKER_CORNERS, size)
        .expect("solvable");

    let (r, t) = view_matrix_to_vision(&sol.view);
    assert_relative_eq!(r, gt.rotation_matrix(), epsilon = 1e-6);
    assert_relative_eq!(t, gt.tvec, epsilon = 1e-6);
    assert_eq!(sol.intrinsics, cam.intrinsics);
    assert!(sol.reprojection_rmse < 1e-6);
}

#[test]
fn single_view_calibration_recovers_pose_and_focal() {
    let size = ImageSize::new(400, 300);
    let cam = centred_camera(size, 420.0);
    let gt = tilted_pose();
    let image = project(&cam, &gt, &MARKER_CORNERS);

    let sol = solve_pose_from_correspondences(&image, &MARKER_CORNERS, size, &PoseSolverParams::default())
        .expect("solvable");
    assert_relative_eq!(sol.intrinsics.fx, 420.0, max_relative = 1e-6);
    assert_relative_eq!(sol.intrinsics.fy, 420.0, max_relative = 1e-6);
    assert!(sol.distortion.is_zero());

    let (r, t) = view_matrix_to_vision(&sol.view);
    assert_relative_eq!(r, gt.rotation_matrix(), epsilon = 1e-6);
    assert_relative_eq!(t, gt.tvec, epsilon = 1e-5);
    assert_eq!(sol.view.bottom_row(), [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn detected_quad_path_tolerates_f32_corners() {
    let size = ImageSize::new(400, 300);
    let cam = centred_camera(size, 420.0);
    let gt = tilted_pose();
    let image = project(&cam, &gt, &MARKER_CORNERS);
    let quad = Quadrilateral::from_corners(
        [0, 1, 2, 3].map(|i| Point2::new(image[i].x as f32, image[i].y as f32)),
    );

    let sol = solve_pose(&quad, size, &PoseSolverParams::default()).expect("solvable");
    let (r, _) = view_matrix_to_vision(&sol.view);
    assert_relative_eq!(r, gt.rotation_matrix(), epsilon = 1e-3);
    assert_relative_eq!(sol.intrinsics.fx, 420.0, max_relative = 1e-2);
}

#[test]
fn rotation_is_independent_of_resolution() {
    let gt = tilted_pose();
    let small = ImageSize::new(320, 240);
    let large = ImageSize::new(1280, 960);
    let img_small = project(&centred_camera(small, 300.0), &gt, &MARKER_CORNERS);
    let img_large = project(&centred_camera(large, 1200.0), &gt, &MARKER_CORNERS);

    let params = PoseSolverParams::default();
    let a = solve_pose_from_correspondences(&img_small, &MARKER_CORNERS, small, &params)
        .expect("small");
    let b = solve_pose_from_correspondences(&img_large, &MARKER_CORNERS, large, &params)
        .expect("large");
    assert_relative_eq!(
        a.pose.rotation_matrix(),
        b.pose.rotation_matrix(),
        epsilon = 1e-6
    );
}

#[test]
fn degenerate_quads_are_unsolvable() {
    let size = ImageSize::new(400, 300);
    let collinear = Quadrilateral::from_corners([
        Point2::new(10.0, 10.0),
        Point2::new(20.0, 20.0),
        Point2::new(30.0, 30.0),
        Point2::new(40.0, 40.0),
    ]);
    let err = solve_pose(&collinear, size, &PoseSolverParams::default()).unwrap_err();
    assert!(err.is_unsolvable());
    assert!(matches!(err, PoseError::DegenerateGeometry(_)));

    let collapsed = Quadrilateral::from_corners([Point2::new(50.0, 50.0); 4]);
    assert!(solve_pose(&collapsed, size, &PoseSolverParams::default()).is_err());
}

#[test]
fn reference_feature_path_applies_depth_offset() {
    let size = ImageSize::new(640, 480);
    let reference = ImageSize::new(200, 200);
    let cam = centred_camera(size, 600.0);
    let gt = Pose::from_rotation(
        &Rotation3::from_euler_angles(0.2, 0.25, -0.1),
        Vector3::new(0.0, 0.1, 5.0),
    );

    let reference_points: Vec<Point2<f64>> = [
        (20.0, 30.0),
        (180.0, 25.0),
        (170.0, 190.0),
        (35.0, 160.0),
        (100.0, 100.0),
        (60.0, 120.0),
    ]
    .iter()
    .map(|&(x, y)| Point2::new(x, y))
    .collect();
    let object: Vec<Point3<f64>> = reference_points
        .iter()
        .map(|&p| ar_cube_pose::normalize_reference_point(p, reference))
        .collect();
    let image = project(&cam, &gt, &object);

    let provider = NormalizedMarkerPoints::new(reference, reference_points, image);
    let solver = PoseSolver::with_calibrator(
        FixedIntrinsics::new(cam),
        PoseSolverParams::for_reference_features(),
    );
    let sol = solver.solve(&provider, size).expect("solvable");

    assert_relative_eq!(sol.pose.tvec.z, gt.tvec.z + 11.0, epsilon = 1e-6);
    assert_relative_eq!(sol.pose.tvec.x, gt.tvec.x, epsilon = 1e-6);
    let (_, t) = view_matrix_to_vision(&sol.view);
    assert_relative_eq!(t.z, 16.0, epsilon = 1e-6);
}
