//! Contour extraction from an edge map.

use imageproc::contours::{find_contours, BorderType};
use nalgebra::Point2;

/// A traced border, compressed to its direction-change vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct TracedContour {
    pub points: Vec<Point2<f64>>,
    pub is_hole: bool,
    /// Index of the enclosing contour in the traced list.
    pub parent: Option<usize>,
    pub area: f64,
}

/// Trace every border in a binary edge map (non-zero = foreground), keeping
/// the full hierarchy, and compress each border to its vertices.
pub fn trace_contours(edges: &image::GrayImage) -> Vec<TracedContour> {
    find_contours::<i32>(edges)
        .into_iter()
        .map(|c| {
            let raw: Vec<Point2<i32>> = c.points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            let points: Vec<Point2<f64>> = chain_approx_simple(&raw)
                .into_iter()
                .map(|p| Point2::new(p.x as f64, p.y as f64))
                .collect();
            let area = ar_cube_core::polygon_area(&points);
            TracedContour {
                points,
                is_hole: c.border_type == BorderType::Hole,
                parent: c.parent,
                area,
            }
        })
        .collect()
}

/// Drop every point that continues the previous step's direction, leaving
/// only the vertices where the chain turns.
pub fn chain_approx_simple(contour: &[Point2<i32>]) -> Vec<Point2<i32>> {
    let mut dedup: Vec<Point2<i32>> = Vec::with_capacity(contour.len());
    for p in contour {
        if dedup.last() != Some(p) {
            dedup.push(*p);
        }
    }
    while dedup.len() > 1 && dedup.first() == dedup.last() {
        dedup.pop();
    }

    let n = dedup.len();
    if n < 3 {
        return dedup;
    }

    let kept: Vec<Point2<i32>> = (0..n)
        .filter(|&i| {
            let prev = dedup[(i + n - 1) % n];
            let cur = dedup[i];
            let next = dedup[(i + 1) % n];
            let d1 = cur - prev;
            let d2 = next - cur;
            let cross = d1.x * d2.y - d1.y * d2.x;
            let dot = d1.x * d2.x + d1.y * d2.y;
            cross != 0 || dot <= 0
        })
        .map(|i| dedup[i])
        .collect();

    if kept.len() < 3 {
        dedup
    } else {
        kept
    }
}

/// Indices of `contours` sorted by enclosed area, largest first. Ties keep
/// tracing order.
pub fn by_area_descending(contours: &[TracedContour]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..contours.len()).collect();
    order.sort_by(|&a, &b| contours[b].area.total_cmp(&contours[a].area));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(x0: i32, y0: i32, side: i32) -> Vec<Point2<i32>> {
        let mut pts = Vec::new();
        for i in 0..side {
            pts.push(Point2::new(x0 + i, y0));
        }
        for i in 0..side {
            pts.push(Point2::new(x0 + side, y0 + i));
        }
        for i in 0..side {
            pts.push(Point2::new(x0 + side - i, y0 + side));
        }
        for i in 0..side {
            pts.push(Point2::new(x0, y0 + side - i));
        }
        pts
    }

    #[test]
    fn straight_runs_collapse_to_corners() {
        let simple = chain_approx_simple(&outline(2, 3, 10));
        assert_eq!(
            simple,
            vec![
                Point2::new(2, 3),
                Point2::new(12, 3),
                Point2::new(12, 13),
                Point2::new(2, 13),
            ]
        );
    }

    #[test]
    fn diagonal_runs_collapse_too() {
        let pts: Vec<Point2<i32>> = (0..5)
            .map(|i| Point2::new(i, i))
            .chain((0..5).map(|i| Point2::new(5 + i, 5 - i)))
            .chain((0..10).map(|i| Point2::new(10 - i, 0)))
            .collect();
        assert_eq!(
            chain_approx_simple(&pts),
            vec![Point2::new(0, 0), Point2::new(5, 5), Point2::new(10, 0)]
        );
    }

    #[test]
    fn tiny_contours_pass_through() {
        let one = vec![Point2::new(4, 4)];
        assert_eq!(chain_approx_simple(&one), one);
    }

    #[test]
    fn traces_filled_square_with_hierarchy() {
        let mut edges = image::GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 5..15 {
                if x == 5 || x == 14 || y == 5 || y == 14 {
                    edges.put_pixel(x, y, image::Luma([255]));
                }
            }
        }
        let contours = trace_contours(&edges);
        assert!(!contours.is_empty());
        let order = by_area_descending(&contours);
        let largest = &contours[order[0]];
        assert!(!largest.is_hole);
        assert_eq!(largest.points.len(), 4);
        assert_eq!(largest.area, 81.0);
        assert!(contours.iter().any(|c| c.is_hole && c.parent.is_some()));
    }
}
