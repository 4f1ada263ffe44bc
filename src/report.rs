//! # Stats Reporter
//!
//! Orchestrates one report computation:
//!
//! 1. Normalize the sightings into a chronological, repeat-free timeline
//! 2. Build (or reuse) the adjacency graph for the canal dataset
//! 3. Credit the first known sighting's segment
//! 4. For each consecutive pair of distinct locations, find a path and
//!    credit its segments
//! 5. Compute earliest/latest dates and the elapsed span
//!
//! Each computation is a single deterministic pass. Unknown location codes
//! and unreachable legs are logged and skipped; the report always covers
//! whatever could be resolved.

use chrono::NaiveDateTime;
use geo::Geometry;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::distance::DistanceAggregator;
use crate::{
    find_path, furthest_endpoint_distance, normalize_sightings, time_stats, with_graph_cache,
    AdjacencyGraph, CancelToken, NormalizedSighting, PathFeature, RawSighting, Result, Segment,
    SegmentDetail, TrackerConfig,
};

/// A leg for which no path exists in the adjacency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedLeg {
    pub from: String,
    pub to: String,
}

/// Travel statistics for one boat's sightings against one canal dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub earliest_date: Option<NaiveDateTime>,
    pub latest_date: Option<NaiveDateTime>,
    /// Elapsed span at its coarsest unit, e.g. "2 hours"
    pub time_taken: String,
    /// Total distance in kilometers
    pub total_distance: f64,
    /// Credited segments in credit order
    pub segment_details: Vec<SegmentDetail>,
    /// Geometry of credited segments in credit order, for rendering
    pub path_features: Vec<PathFeature>,
    /// Legs attempted (consecutive distinct known locations)
    pub leg_count: usize,
    pub unresolved_legs: Vec<UnresolvedLeg>,
    /// Sightings whose location code is not in the canal dataset
    pub skipped_sightings: usize,
}

impl Report {
    /// Furthest distance in kilometers between any two endpoints of the
    /// report's path features.
    pub fn furthest_endpoint_distance_km(&self) -> f64 {
        let geometries: Vec<Geometry<f64>> = self
            .path_features
            .iter()
            .map(|f| Geometry::MultiLineString(f.geometry.clone()))
            .collect();
        furthest_endpoint_distance(&geometries)
    }

    /// Serialize the report for export collaborators.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Computes reports against a prebuilt adjacency graph.
#[derive(Debug, Clone, Copy)]
pub struct StatsReporter<'g> {
    graph: &'g AdjacencyGraph,
}

impl<'g> StatsReporter<'g> {
    pub fn new(graph: &'g AdjacencyGraph) -> Self {
        Self { graph }
    }

    /// Compute the report for a set of sightings.
    pub fn report(&self, sightings: &[RawSighting]) -> Report {
        let timeline = normalize_sightings(sightings);
        let time = time_stats(&timeline);

        let mut skipped_sightings = 0;
        let known: Vec<&NormalizedSighting> = timeline
            .iter()
            .filter(|s| {
                let found = self.graph.contains(&s.location_code);
                if !found {
                    warn!(
                        "[StatsReporter] Unknown location code '{}' (sighting #{}), skipping",
                        s.location_code, s.source_index
                    );
                    skipped_sightings += 1;
                }
                found
            })
            .collect();

        let mut aggregator = DistanceAggregator::new(self.graph);
        if let Some(first) = known.first() {
            aggregator.credit_origin(&first.location_code);
        }

        let mut leg_count = 0;
        let mut unresolved_legs = Vec::new();
        for pair in known.windows(2) {
            let (from, to) = (&pair[0].location_code, &pair[1].location_code);
            if from == to {
                debug!("[StatsReporter] Already at {}, no movement", from);
                continue;
            }

            leg_count += 1;
            match find_path(self.graph, from, to) {
                Some(path) => {
                    aggregator.credit_leg(&path);
                }
                None => {
                    warn!("[StatsReporter] No path found from {} to {}", from, to);
                    unresolved_legs.push(UnresolvedLeg {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        let summary = aggregator.finish();

        info!(
            "[StatsReporter] {} sightings -> {} legs ({} unresolved), {:.3} km over {} segments, {}",
            sightings.len(),
            leg_count,
            unresolved_legs.len(),
            summary.total_km,
            summary.segment_details.len(),
            time.time_taken
        );

        Report {
            earliest_date: time.earliest_date,
            latest_date: time.latest_date,
            time_taken: time.time_taken,
            total_distance: summary.total_km,
            segment_details: summary.segment_details,
            path_features: summary.path_features,
            leg_count,
            unresolved_legs,
            skipped_sightings,
        }
    }
}

/// Compute a report, building the canal graph through the shared cache.
///
/// The graph for a given dataset and build settings is built once and reused
/// read-only by later calls. The shared cache is bounded by
/// `config.graph_cache_capacity`.
pub fn calculate_time_and_distance(
    sightings: &[RawSighting],
    canals: &[Segment],
    config: &TrackerConfig,
) -> Result<Report> {
    let graph = with_graph_cache(|cache| {
        cache.set_capacity(config.graph_cache_capacity);
        cache.get_or_build(canals, config, &CancelToken::new())
    })?;
    Ok(StatsReporter::new(&graph).report(sightings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_adjacency_graph;
    use geo::line_string;

    fn canals() -> Vec<Segment> {
        vec![
            Segment::from_line("X", "Xray Reach", line_string![(x: -2.02, y: 52.0), (x: -2.01, y: 52.0)], 2000.0).unwrap(),
            Segment::from_line("Y", "Yankee Pound", line_string![(x: -2.01, y: 52.0), (x: -2.00, y: 52.0)], 3000.0).unwrap(),
            Segment::from_line("Z", "Zulu Arm", line_string![(x: -1.50, y: 52.5), (x: -1.49, y: 52.5)], 4000.0).unwrap(),
        ]
    }

    #[test]
    fn test_unknown_location_skipped() {
        let graph = build_adjacency_graph(&canals(), &TrackerConfig::default()).unwrap();
        let sightings = vec![
            RawSighting::new("b", "01/06/2024 08:00", "X"),
            RawSighting::new("b", "01/06/2024 09:00", "NOWHERE"),
            RawSighting::new("b", "01/06/2024 10:00", "Y"),
        ];
        let report = StatsReporter::new(&graph).report(&sightings);
        assert_eq!(report.skipped_sightings, 1);
        assert_eq!(report.leg_count, 1);
        assert!((report.total_distance - 5.0).abs() < 1e-9);
        // Time span still covers the skipped sighting's neighbours
        assert_eq!(report.time_taken, "2 hours");
    }

    #[test]
    fn test_unknown_between_same_location_is_no_movement() {
        let graph = build_adjacency_graph(&canals(), &TrackerConfig::default()).unwrap();
        let sightings = vec![
            RawSighting::new("b", "01/06/2024 08:00", "X"),
            RawSighting::new("b", "01/06/2024 09:00", "NOWHERE"),
            RawSighting::new("b", "01/06/2024 10:00", "X"),
        ];
        let report = StatsReporter::new(&graph).report(&sightings);
        assert_eq!(report.leg_count, 0);
        assert!((report.total_distance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_sightings() {
        let graph = build_adjacency_graph(&canals(), &TrackerConfig::default()).unwrap();
        let report = StatsReporter::new(&graph).report(&[]);
        assert_eq!(report.total_distance, 0.0);
        assert_eq!(report.time_taken, crate::stats::ELAPSED_NO_DATA);
        assert!(report.path_features.is_empty());
    }

    #[test]
    fn test_report_json_uses_camel_case() {
        let graph = build_adjacency_graph(&canals(), &TrackerConfig::default()).unwrap();
        let report = StatsReporter::new(&graph).report(&[
            RawSighting::new("b", "01/06/2024 08:00", "X"),
            RawSighting::new("b", "01/06/2024 08:30", "Y"),
        ]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["timeTaken"], "30 minutes");
        assert_eq!(json["totalDistance"], 5.0);
        assert_eq!(json["segmentDetails"][1]["name"], "Yankee Pound");
    }

    #[test]
    fn test_furthest_endpoint_on_report() {
        let graph = build_adjacency_graph(&canals(), &TrackerConfig::default()).unwrap();
        let report = StatsReporter::new(&graph).report(&[
            RawSighting::new("b", "01/06/2024 08:00", "X"),
            RawSighting::new("b", "01/06/2024 09:00", "Y"),
        ]);
        // X start to Y end spans 0.02 degrees of longitude at 52N
        let km = report.furthest_endpoint_distance_km();
        assert!((km - 1.369).abs() < 0.01, "got {}", km);
    }
}
