//! Closed-polygon helpers: area, perimeter and Douglas–Peucker simplification.

use nalgebra::Point2;

/// Signed shoelace area. Positive for counter-clockwise order in a y-up frame
/// (clockwise on screen for y-down pixel coordinates).
pub fn signed_polygon_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc
}

/// Enclosed area of a closed polygon.
pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    signed_polygon_area(points).abs()
}

/// Perimeter of a closed polygon (last point connects back to the first).
pub fn closed_arc_length(points: &[Point2<f64>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| (b - a).norm())
        .sum()
}

fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len < f64::EPSILON {
        return (p - a).norm();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

fn farthest_from(points: &[Point2<f64>], from: usize) -> usize {
    let origin = points[from];
    points
        .iter()
        .enumerate()
        .max_by(|a, b| (a.1 - origin).norm_squared().total_cmp(&(b.1 - origin).norm_squared()))
        .map(|(i, _)| i)
        .unwrap_or(from)
}

/// Douglas–Peucker on an open chain; returns kept positions into `chain`
/// (always including both endpoints), in order.
fn simplify_open(chain: &[Point2<f64>], epsilon: f64) -> Vec<usize> {
    let last = chain.len() - 1;
    let mut keep = vec![false; chain.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (a, b) = (&chain[lo], &chain[hi]);
        let (idx, dmax) = ((lo + 1)..hi)
            .map(|i| (i, point_segment_distance(&chain[i], a, b)))
            .fold((lo, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if dmax > epsilon {
            keep[idx] = true;
            stack.push((lo, idx));
            stack.push((idx, hi));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Douglas–Peucker simplification of a closed polygon.
///
/// The ring is split at two mutually distant vertices and each half is
/// simplified independently, so the result does not depend on where the
/// tracer happened to start. Output vertices keep the input's cyclic order.
pub fn approx_polygon_closed(points: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let a = farthest_from(points, farthest_from(points, 0));
    let b = farthest_from(points, a);
    if a == b {
        return vec![points[a]];
    }

    // Rotate so the ring starts at `a`; `split` is b's position after rotation.
    let ring: Vec<Point2<f64>> = (0..=n).map(|i| points[(a + i) % n]).collect();
    let split = (b + n - a) % n;

    let first = simplify_open(&ring[..=split], epsilon);
    let second = simplify_open(&ring[split..], epsilon);

    let mut out: Vec<Point2<f64>> = first.iter().map(|&i| ring[i]).collect();
    // Skip the shared split vertex and the closing copy of `a`.
    out.extend(
        second[1..second.len() - 1]
            .iter()
            .map(|&i| ring[split + i]),
    );
    out
}
