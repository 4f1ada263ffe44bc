//! # Algorithm Toolbox
//!
//! Direct access to each stage of the tracking pipeline, for callers that
//! want to drive the stages themselves instead of going through
//! [`calculate_time_and_distance`](crate::calculate_time_and_distance).
//!
//! ## Pipeline Stages
//!
//! - **Sighting Normalization**: timestamp parsing, ordering, repeat collapse
//! - **Adjacency Graph**: R-tree candidates confirmed by buffered intersection
//! - **Pathfinding**: minimum-hop breadth-first search
//! - **Distance Aggregation**: run-wide credit of each segment at most once
//! - **Time Statistics**: earliest/latest dates and the coarsest-unit span
//!
//! # Example
//!
//! ```rust
//! use canal_tracker::algorithms::{
//!     build_adjacency_graph, find_path, DistanceAggregator, Segment, TrackerConfig,
//! };
//! use geo::line_string;
//!
//! let canals = vec![
//!     Segment::from_line("A", "Alpha", line_string![(x: 0.000, y: 51.0), (x: 0.001, y: 51.0)], 70.0).unwrap(),
//!     Segment::from_line("B", "Bravo", line_string![(x: 0.001, y: 51.0), (x: 0.002, y: 51.0)], 70.0).unwrap(),
//! ];
//! let graph = build_adjacency_graph(&canals, &TrackerConfig::default()).unwrap();
//! let path = find_path(&graph, "A", "B").unwrap();
//!
//! let mut aggregator = DistanceAggregator::new(&graph);
//! aggregator.credit_origin("A");
//! aggregator.credit_leg(&path);
//! assert!((aggregator.total_km() - 0.14).abs() < 1e-9);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{Bounds, RawSighting, Segment, TrackerConfig};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    bounds_overlap, expand_bounds, haversine_distance, meters_to_degrees, polyline_length,
    LocalProjection,
};

// =============================================================================
// Sighting Normalization
// =============================================================================

/// Parse a day-first "DD/MM/YYYY HH:MM[:SS]" timestamp.
pub use crate::sightings::parse_timestamp;
/// Chronological, repeat-collapsed timeline of sightings.
pub use crate::sightings::{normalize_sightings, NormalizedSighting};

// =============================================================================
// Adjacency Graph
// =============================================================================

/// Build the symmetric adjacency graph over canal segments.
///
/// Candidates come from an R-tree over buffered bounding boxes; each
/// candidate pair is confirmed with a buffered-intersection test in a local
/// metric projection.
pub use crate::graph::{build_adjacency_graph, build_adjacency_graph_with_cancel};
pub use crate::graph::{AdjacencyGraph, CancelToken, GraphBuildStats};

/// Whether two segments come within twice the tolerance of each other.
pub use crate::graph::buffered_intersects;

// =============================================================================
// Pathfinding and Distance
// =============================================================================

pub use crate::pathfinding::{find_path, Path};
pub use crate::distance::{DistanceAggregator, DistanceSummary, PathFeature, SegmentDetail};

// =============================================================================
// Statistics
// =============================================================================

pub use crate::stats::{format_elapsed, furthest_endpoint_distance, time_stats, TimeStats};

// =============================================================================
// Spatial Indexing
// =============================================================================

/// R-tree entry holding a segment's bounding box.
pub use crate::graph::{build_segment_rtree, search_envelope, SegmentBounds};

/// R-tree spatial index for custom spatial queries.
pub use rstar::RTree;
/// Axis-aligned bounding box for spatial queries.
pub use rstar::AABB;
