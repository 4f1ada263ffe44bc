//! # Canal Tracker
//!
//! Reconstructs a boat's most plausible travel path through a network of
//! canal segments from sparse, irregularly timestamped sightings, and
//! computes travel statistics (distance, elapsed time) for visualization.
//!
//! This library provides:
//! - Sighting normalization (timestamp parsing, ordering, repeat collapse)
//! - Adjacency graph construction over canal geometries (R-tree + buffered intersection)
//! - Minimum-hop pathfinding between sighting locations
//! - Run-wide distance aggregation that never credits a segment twice
//! - Elapsed-time and furthest-endpoint statistics
//!
//! ## Features
//!
//! - **`parallel`** - Test adjacency candidates in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use canal_tracker::{calculate_time_and_distance, RawSighting, Segment, TrackerConfig};
//! use geo::line_string;
//!
//! let canals = vec![
//!     Segment::from_line(
//!         "X", "Top Lock",
//!         line_string![(x: -2.0000, y: 52.0000), (x: -2.0100, y: 52.0000)],
//!         2000.0,
//!     ).unwrap(),
//!     Segment::from_line(
//!         "Y", "Long Pound",
//!         line_string![(x: -2.0100, y: 52.0000), (x: -2.0300, y: 52.0000)],
//!         3000.0,
//!     ).unwrap(),
//! ];
//!
//! let sightings = vec![
//!     RawSighting::new("boat-1", "01/06/2024 08:00", "X"),
//!     RawSighting::new("boat-1", "01/06/2024 10:00", "Y"),
//! ];
//!
//! let report = calculate_time_and_distance(&sightings, &canals, &TrackerConfig::default()).unwrap();
//! assert_eq!(report.time_taken, "2 hours");
//! assert!((report.total_distance - 5.0).abs() < 1e-9);
//! ```

use geo::{BoundingRect, Geometry, LineString, MultiLineString};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Geographic utilities (distance, projection, bounds)
pub mod geo_utils;

// Sighting parsing, ordering and repeat collapse
pub mod sightings;
pub use sightings::{normalize_sightings, parse_timestamp, NormalizedSighting};

// Adjacency graph over canal geometries
pub mod graph;
pub use graph::{
    build_adjacency_graph, build_adjacency_graph_with_cancel, AdjacencyGraph, CancelToken,
    GraphBuildStats,
};

// Breadth-first search between segments
pub mod pathfinding;
pub use pathfinding::{find_path, Path};

// Run-scoped distance accumulation
pub mod distance;
pub use distance::{DistanceAggregator, DistanceSummary, PathFeature, SegmentDetail};

// Time statistics and diagnostics
pub mod stats;
pub use stats::{format_elapsed, furthest_endpoint_distance, time_stats, TimeStats};

// Pipeline orchestration and report assembly
pub mod report;
pub use report::{calculate_time_and_distance, Report, StatsReporter, UnresolvedLeg};

// Graph reuse across runs against the same canal dataset
pub mod cache;
pub use cache::{with_graph_cache, DatasetKey, GraphCache, GRAPH_CACHE};

// JSON / GeoJSON ingestion with top-level validation
pub mod ingest;

// Algorithm toolbox - standalone access to each pipeline stage
pub mod algorithms;

/// Initialize logging for Android hosts.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("CanalTrackerRust"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for graph construction and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Buffer radius applied to every segment geometry, in real-world meters.
    /// Two segments are adjacent when their buffered shapes intersect, i.e.
    /// when they come within `2 * tolerance_meters` of each other.
    /// Default: 1.0 meter
    pub tolerance_meters: f64,

    /// Bounding-box candidate count above which a segment is reported as a
    /// graph construction performance risk.
    /// Default: 64
    pub dense_candidate_threshold: usize,

    /// Number of canal datasets whose graphs are kept by the graph cache.
    /// Default: 8
    pub graph_cache_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tolerance_meters: 1.0,
            dense_candidate_threshold: 64,
            graph_cache_capacity: 8,
        }
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Bounds of a set of polylines (x = longitude, y = latitude).
    pub fn from_lines(lines: &MultiLineString<f64>) -> Option<Self> {
        let rect = lines.bounding_rect()?;
        Some(Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }
}

/// A canal segment: a uniquely coded linear feature with an authoritative length.
///
/// Coordinates are WGS84 with x = longitude and y = latitude, as in GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Location code (unique key)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// One or more polylines
    pub geometry: MultiLineString<f64>,
    /// Authoritative length in meters
    pub length_meters: f64,
    /// Derived bounding box
    pub bounds: Bounds,
}

impl Segment {
    /// Create a segment, validating its geometry and length.
    pub fn new(
        id: &str,
        name: &str,
        geometry: MultiLineString<f64>,
        length_meters: f64,
    ) -> Result<Self> {
        let invalid = |message: &str| TrackerError::InvalidGeometry {
            segment_id: id.to_string(),
            message: message.to_string(),
        };

        if id.is_empty() {
            return Err(TrackerError::validation("segment location code is empty"));
        }
        if geometry.0.is_empty() {
            return Err(invalid("no polylines"));
        }
        if geometry.0.iter().any(|line| line.0.len() < 2) {
            return Err(invalid("polyline with fewer than 2 coordinates"));
        }
        if geometry
            .0
            .iter()
            .flat_map(|line| line.coords())
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(invalid("non-finite coordinate"));
        }
        if !length_meters.is_finite() || length_meters < 0.0 {
            return Err(TrackerError::validation(format!(
                "segment '{}' has invalid length {}",
                id, length_meters
            )));
        }

        let bounds = Bounds::from_lines(&geometry).ok_or_else(|| invalid("empty bounds"))?;

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            geometry,
            length_meters,
            bounds,
        })
    }

    /// Create a segment from a single polyline.
    pub fn from_line(
        id: &str,
        name: &str,
        line: LineString<f64>,
        length_meters: f64,
    ) -> Result<Self> {
        Self::new(id, name, MultiLineString::new(vec![line]), length_meters)
    }

    /// Create a segment from any geometry; only line geometries are accepted.
    pub fn from_geometry(
        id: &str,
        name: &str,
        geometry: Geometry<f64>,
        length_meters: f64,
    ) -> Result<Self> {
        match geometry {
            Geometry::LineString(line) => Self::from_line(id, name, line, length_meters),
            Geometry::MultiLineString(lines) => Self::new(id, name, lines, length_meters),
            other => Err(TrackerError::InvalidGeometry {
                segment_id: id.to_string(),
                message: format!("unsupported geometry type {}", geometry_kind(&other)),
            }),
        }
    }

    /// Authoritative length in kilometers.
    pub fn length_km(&self) -> f64 {
        self.length_meters / 1000.0
    }
}

pub(crate) fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// A raw sighting as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSighting {
    pub boat_id: String,
    /// Free-text timestamp, e.g. "14/03/2024 09:30:00"
    pub timestamp: String,
    /// Location code of the segment the boat was seen on
    pub location_code: String,
    pub location_description: String,
    pub waterway: String,
}

impl RawSighting {
    /// Create a sighting with empty description and waterway.
    pub fn new(boat_id: &str, timestamp: &str, location_code: &str) -> Self {
        Self {
            boat_id: boat_id.to_string(),
            timestamp: timestamp.to_string(),
            location_code: location_code.to_string(),
            location_description: String::new(),
            waterway: String::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
