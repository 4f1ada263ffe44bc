//! Buffered-intersection test between two segment geometries.
//!
//! Buffering each geometry outward by `r` meters and intersecting the two
//! buffers is equivalent to asking whether the geometries come within `2r`
//! of each other. The test runs in a local metric projection so `r` is a
//! real-world distance regardless of latitude.

use crate::geo_utils::LocalProjection;
use crate::Segment;
use geo::{Distance, Euclidean, Intersects};

/// Whether the geometries of `a` and `b`, each buffered by `tolerance_meters`,
/// intersect.
pub fn buffered_intersects(a: &Segment, b: &Segment, tolerance_meters: f64) -> bool {
    let projection = LocalProjection::between(&a.bounds, &b.bounds);
    let lines_a = projection.project_lines(&a.geometry);
    let lines_b = projection.project_lines(&b.geometry);

    if lines_a.intersects(&lines_b) {
        return true;
    }

    let reach = 2.0 * tolerance_meters.max(0.0);
    lines_a.0.iter().any(|line_a| {
        lines_b
            .0
            .iter()
            .any(|line_b| Euclidean::distance(line_a, line_b) <= reach)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::meters_to_degrees;
    use geo::line_string;

    fn horizontal(id: &str, start_lng: f64, end_lng: f64, lat: f64) -> Segment {
        Segment::from_line(
            id,
            id,
            line_string![(x: start_lng, y: lat), (x: end_lng, y: lat)],
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_shared_endpoint_intersects() {
        let a = horizontal("A", -2.01, -2.0, 52.0);
        let b = horizontal("B", -2.0, -1.99, 52.0);
        assert!(buffered_intersects(&a, &b, 1.0));
    }

    #[test]
    fn test_crossing_lines_intersect() {
        let a = horizontal("A", -2.01, -1.99, 52.0);
        let b = Segment::from_line(
            "B",
            "B",
            line_string![(x: -2.0, y: 51.99), (x: -2.0, y: 52.01)],
            100.0,
        )
        .unwrap();
        assert!(buffered_intersects(&a, &b, 0.0));
    }

    #[test]
    fn test_gap_within_tolerance() {
        // 1.5 m gap, bridged by two 1 m buffers
        let gap = meters_to_degrees(1.5, 52.0);
        let a = horizontal("A", -2.01, -2.0, 52.0);
        let b = horizontal("B", -2.0 + gap, -1.99, 52.0);
        assert!(buffered_intersects(&a, &b, 1.0));
    }

    #[test]
    fn test_gap_beyond_tolerance() {
        // ~10 m gap along the east-west axis
        let gap = meters_to_degrees(10.0, 52.0);
        let a = horizontal("A", -2.01, -2.0, 52.0);
        let b = horizontal("B", -2.0 + gap, -1.99, 52.0);
        assert!(!buffered_intersects(&a, &b, 1.0));
        assert!(buffered_intersects(&a, &b, 6.0));
    }

    #[test]
    fn test_parallel_lines_far_apart() {
        let a = horizontal("A", -2.01, -1.99, 52.0);
        let b = horizontal("B", -2.01, -1.99, 52.001);
        assert!(!buffered_intersects(&a, &b, 1.0));
    }
}
