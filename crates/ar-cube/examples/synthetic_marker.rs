//! Render a tilted marker into a synthetic image, then recover its pose.

use std::f64::consts::PI;

use image::{GrayImage, Luma};
use nalgebra::{Rotation3, Vector3};

use ar_cube::core::{init_with_level, Camera, CameraIntrinsics, Distortion, ImageSize};
use ar_cube::detect::{detect_quad_image, gray_view};
use ar_cube::pose::{solve_pose, Pose, PoseSolverParams, MARKER_CORNERS};
use ar_cube::ArConfig;
use log::{info, LevelFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)?;

    let size = ImageSize::new(640, 480);
    let (cx, cy) = size.center();
    let camera = Camera::new(CameraIntrinsics::new(600.0, 600.0, cx, cy), Distortion::NONE);
    // Half-turn about X so the marker's +y points up in the image.
    let facing = Rotation3::from_euler_angles(PI, 0.0, 0.0);
    let truth = Pose::from_rotation(
        &(Rotation3::from_euler_angles(0.35, -0.25, 0.2) * facing),
        Vector3::new(0.1, 0.0, 5.0),
    );

    let corners: Vec<(f64, f64)> = MARKER_CORNERS
        .iter()
        .filter_map(|p| camera.project(&truth.transform(p)))
        .map(|p| (p.x, p.y))
        .collect();
    let img = GrayImage::from_fn(size.width as u32, size.height as u32, |x, y| {
        let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
        let inside = (0..corners.len()).all(|i| {
            let (ax, ay) = corners[i];
            let (bx, by) = corners[(i + 1) % corners.len()];
            (bx - ax) * (py - ay) - (by - ay) * (px - ax) >= 0.0
        });
        Luma([if inside { 235 } else { 15 }])
    });

    let quad = detect_quad_image(&img, &ArConfig::default())?;
    info!("quad corners: {:?}", quad.corners);
    let solution = solve_pose(&quad, gray_view(&img).size(), &PoseSolverParams::default())?;

    info!("true rvec {:?}", truth.rvec.as_slice());
    info!("est. rvec {:?}", solution.pose.rvec.as_slice());
    info!(
        "fx={:.1} fy={:.1} rmse={:.3}px",
        solution.intrinsics.fx, solution.intrinsics.fy, solution.reprojection_rmse
    );
    println!("{}", serde_json::to_string_pretty(&solution)?);
    Ok(())
}
