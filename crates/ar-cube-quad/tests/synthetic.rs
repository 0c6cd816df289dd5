use ar_cube_core::{GrayImage, GrayImageView};
use ar_cube_quad::{detect_quad, CornerOrder, DetectError, QuadDetector, QuadDetectorParams};

/// Fill the convex polygon `corners` (clockwise on screen) with `fg`.
fn draw_convex(w: usize, h: usize, corners: &[(f64, f64); 4], bg: u8, fg: u8) -> GrayImage {
    let mut img = GrayImage::filled(w, h, bg);
    for y in 0..h {
        for x in 0..w {
            let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
            let inside = (0..4).all(|i| {
                let (ax, ay) = corners[i];
                let (bx, by) = corners[(i + 1) % 4];
                (bx - ax) * (py - ay) - (by - ay) * (px - ax) >= 0.0
            });
            if inside {
                img.data[y * w + x] = fg;
            }
        }
    }
    img
}

#[test]
fn perspective_quad_is_found_in_template_order() {
    let corners = [(120.0, 80.0), (330.0, 100.0), (300.0, 250.0), (90.0, 220.0)];
    let img = draw_convex(400, 300, &corners, 10, 240);
    let quad = detect_quad(&img.view()).expect("quad");

    for (found, expected) in quad.corners.iter().zip(corners.iter()) {
        let d = ((found.x as f64 - expected.0).powi(2) + (found.y as f64 - expected.1).powi(2)).sqrt();
        assert!(d < 6.0, "corner {found:?} vs {expected:?}");
    }
    assert!(quad.contour_perimeter > 0.0);
}

#[test]
fn dark_marker_on_light_background_is_found() {
    let corners = [(60.0, 50.0), (180.0, 50.0), (180.0, 150.0), (60.0, 150.0)];
    let img = draw_convex(240, 200, &corners, 250, 5);
    let quad = QuadDetector::new(QuadDetectorParams {
        order_corners: CornerOrder::ClockwiseFromTopLeft,
        ..QuadDetectorParams::default()
    })
    .detect(&img.view())
    .expect("quad");
    let area = quad.area();
    assert!((area - 12_000.0).abs() / 12_000.0 < 0.1, "area {area}");
}

#[test]
fn mismatched_buffer_is_an_error() {
    let data = vec![0u8; 10];
    let view = GrayImageView {
        width: 4,
        height: 4,
        data: &data,
    };
    assert_eq!(
        detect_quad(&view).unwrap_err(),
        DetectError::InvalidBuffer {
            expected: 16,
            actual: 10
        }
    );
}
