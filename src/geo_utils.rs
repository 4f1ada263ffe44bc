//! # Geographic Utilities
//!
//! Geographic primitives shared by graph construction and the statistics
//! diagnostics.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`polyline_length`] | Geodesic length of a polyline in meters |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//! | [`expand_bounds`] | Grow a bounding box by a distance in meters |
//! | [`LocalProjection`] | Equirectangular projection to local meters |
//!
//! ## Coordinate System
//!
//! All inputs are WGS84 with x = longitude and y = latitude, in degrees.
//! Tolerance tests project both geometries of a pair into a shared local
//! frame measured in meters, so a tolerance stated in meters means the same
//! real-world distance everywhere in the dataset.

use geo::{Coord, Distance, Haversine, LineString, MapCoords, MultiLineString, Point};

use crate::Bounds;

/// Meters per degree of arc on the mean-radius sphere used by [`Haversine`].
const METERS_PER_DEGREE: f64 = 111_195.08;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two coordinates in meters.
///
/// # Example
///
/// ```rust
/// use canal_tracker::geo_utils;
/// use geo::coord;
///
/// let london = coord! { x: -0.1278, y: 51.5074 };
/// let paris = coord! { x: 2.3522, y: 48.8566 };
///
/// let distance = geo_utils::haversine_distance(london, paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b))
}

/// Geodesic length of a polyline in meters. Lines with fewer than two
/// coordinates have zero length.
pub fn polyline_length(line: &LineString<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale, which shrinks with `cos(latitude)`, so the result
/// is a conservative (larger) value for both axes and suits square search
/// envelopes.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = METERS_PER_DEGREE * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Grow a bounding box by `meters` on every side.
pub fn expand_bounds(bounds: &Bounds, meters: f64) -> Bounds {
    let lat_for_scale = if bounds.min_lat.abs() > bounds.max_lat.abs() {
        bounds.min_lat
    } else {
        bounds.max_lat
    };
    let buffer_deg = meters_to_degrees(meters, lat_for_scale);

    Bounds {
        min_lat: bounds.min_lat - buffer_deg,
        max_lat: bounds.max_lat + buffer_deg,
        min_lng: bounds.min_lng - buffer_deg,
        max_lng: bounds.max_lng + buffer_deg,
    }
}

/// Check if two bounding boxes overlap (touching edges count).
pub fn bounds_overlap(a: &Bounds, b: &Bounds) -> bool {
    !(a.max_lat < b.min_lat
        || b.max_lat < a.min_lat
        || a.max_lng < b.min_lng
        || b.max_lng < a.min_lng)
}

// =============================================================================
// Local Projection
// =============================================================================

/// Equirectangular projection centered on a reference point.
///
/// Accurate to well under a meter over the few kilometers separating two
/// bounding-box candidates, which is all the tolerance test needs.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    ref_lat: f64,
    ref_lng: f64,
    meters_per_degree_lng: f64,
}

impl LocalProjection {
    /// Projection centered on the given latitude/longitude.
    pub fn new(ref_lat: f64, ref_lng: f64) -> Self {
        Self {
            ref_lat,
            ref_lng,
            meters_per_degree_lng: METERS_PER_DEGREE * ref_lat.to_radians().cos(),
        }
    }

    /// Projection centered between two bounding boxes.
    pub fn between(a: &Bounds, b: &Bounds) -> Self {
        let lat = (a.min_lat.min(b.min_lat) + a.max_lat.max(b.max_lat)) / 2.0;
        let lng = (a.min_lng.min(b.min_lng) + a.max_lng.max(b.max_lng)) / 2.0;
        Self::new(lat, lng)
    }

    /// Project a single coordinate to local meters.
    #[inline]
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.ref_lng) * self.meters_per_degree_lng,
            y: (c.y - self.ref_lat) * METERS_PER_DEGREE,
        }
    }

    /// Project every polyline of a geometry to local meters.
    pub fn project_lines(&self, lines: &MultiLineString<f64>) -> MultiLineString<f64> {
        lines.map_coords(|c| self.project(c))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let c = coord! { x: -0.1278, y: 51.5074 };
        assert_eq!(haversine_distance(c, c), 0.0);
    }

    #[test]
    fn test_polyline_length() {
        let empty: LineString<f64> = LineString::new(vec![]);
        assert_eq!(polyline_length(&empty), 0.0);

        // 0.01 degrees of latitude is about 1.1 km
        let line = line_string![(x: -2.0, y: 52.0), (x: -2.0, y: 52.01)];
        assert!(approx_eq(polyline_length(&line), 1112.0, 5.0));
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_195.08, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));

        let deg_52 = meters_to_degrees(111_195.08, 52.0);
        assert!(deg_52 > 1.0);
    }

    #[test]
    fn test_expand_bounds_overlap() {
        let a = Bounds { min_lat: 52.0, max_lat: 52.0, min_lng: -2.0, max_lng: -1.99 };
        // 0.25 m gap to the east
        let gap_deg = meters_to_degrees(0.25, 52.0);
        let b = Bounds {
            min_lat: 52.0,
            max_lat: 52.0,
            min_lng: -1.99 + gap_deg,
            max_lng: -1.98,
        };
        assert!(!bounds_overlap(&a, &b));
        assert!(bounds_overlap(&expand_bounds(&a, 2.0), &b));
    }

    #[test]
    fn test_local_projection_scale() {
        let projection = LocalProjection::new(52.0, -2.0);
        let origin = projection.project(coord! { x: -2.0, y: 52.0 });
        assert!(approx_eq(origin.x, 0.0, 1e-9));
        assert!(approx_eq(origin.y, 0.0, 1e-9));

        // Projected distance agrees with haversine at canal scale
        let a = coord! { x: -2.0, y: 52.0 };
        let b = coord! { x: -1.99, y: 52.005 };
        let pa = projection.project(a);
        let pb = projection.project(b);
        let projected = ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt();
        let geodesic = haversine_distance(a, b);
        assert!((projected - geodesic).abs() / geodesic < 0.001);
    }
}
