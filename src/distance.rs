//! Run-scoped distance accumulation.
//!
//! One [`DistanceAggregator`] lives for exactly one report. It owns the set
//! of segment ids already credited, so a segment's length is added at most
//! once however many legs revisit it. The first sighting's segment is
//! credited up front with [`credit_origin`](DistanceAggregator::credit_origin);
//! each leg then credits its path minus the leg's own origin.

use std::collections::HashSet;

use geo::MultiLineString;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{AdjacencyGraph, Path};

/// Name and length of a credited segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDetail {
    pub id: String,
    pub name: String,
    pub length_km: f64,
}

/// Geometry of a credited segment, passed through for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFeature {
    pub segment_id: String,
    pub geometry: MultiLineString<f64>,
}

/// Accumulated distance, details and geometry for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub total_km: f64,
    pub segment_details: Vec<SegmentDetail>,
    pub path_features: Vec<PathFeature>,
}

/// Credits segment lengths without ever counting the same id twice.
#[derive(Debug)]
pub struct DistanceAggregator<'g> {
    graph: &'g AdjacencyGraph,
    credited: HashSet<String>,
    total_meters: f64,
    segment_details: Vec<SegmentDetail>,
    path_features: Vec<PathFeature>,
}

impl<'g> DistanceAggregator<'g> {
    pub fn new(graph: &'g AdjacencyGraph) -> Self {
        Self {
            graph,
            credited: HashSet::new(),
            total_meters: 0.0,
            segment_details: Vec::new(),
            path_features: Vec::new(),
        }
    }

    /// Credit the first sighting's segment before any leg is processed.
    ///
    /// Returns the meters added. The id is marked credited, so a later path
    /// passing through it adds nothing more.
    pub fn credit_origin(&mut self, segment_id: &str) -> f64 {
        self.credit(segment_id)
    }

    /// Credit every segment of a leg's path except the leg's origin.
    ///
    /// Returns the meters newly added by this leg.
    pub fn credit_leg(&mut self, path: &Path) -> f64 {
        let origin = path.origin();
        let added: f64 = path
            .segment_ids
            .iter()
            .filter(|id| id.as_str() != origin)
            .map(|id| self.credit(id))
            .sum();

        debug!(
            "[DistanceAggregator] Leg {} -> {}: +{:.3} km ({} hops)",
            origin,
            path.destination(),
            added / 1000.0,
            path.hop_count()
        );
        added
    }

    fn credit(&mut self, segment_id: &str) -> f64 {
        if self.credited.contains(segment_id) {
            return 0.0;
        }
        let Some(segment) = self.graph.segment(segment_id) else {
            warn!(
                "[DistanceAggregator] Segment '{}' not found in canal lengths",
                segment_id
            );
            return 0.0;
        };

        self.credited.insert(segment_id.to_string());
        self.total_meters += segment.length_meters;
        self.segment_details.push(SegmentDetail {
            id: segment.id.clone(),
            name: segment.name.clone(),
            length_km: segment.length_km(),
        });
        self.path_features.push(PathFeature {
            segment_id: segment.id.clone(),
            geometry: segment.geometry.clone(),
        });
        segment.length_meters
    }

    pub fn is_credited(&self, segment_id: &str) -> bool {
        self.credited.contains(segment_id)
    }

    pub fn credited_count(&self) -> usize {
        self.credited.len()
    }

    pub fn total_km(&self) -> f64 {
        self.total_meters / 1000.0
    }

    pub fn finish(self) -> DistanceSummary {
        DistanceSummary {
            total_km: self.total_km(),
            segment_details: self.segment_details,
            path_features: self.path_features,
        }
    }
}
