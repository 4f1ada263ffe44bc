//! # Adjacency Graph
//!
//! Builds an undirected proximity graph over canal segments.
//!
//! ## Algorithm
//! 1. Compute each segment's bounding box and bulk-load the boxes into an R-tree
//! 2. For each segment, query the R-tree for boxes overlapping its own
//!    (grown by the combined buffer so near-touching ends are not missed)
//! 3. For each candidate pair, test whether the geometries buffered by the
//!    tolerance intersect
//! 4. Record a hit in both directions at once; each unordered pair is tested once
//!
//! Index construction is O(n log n); candidate testing is O(n·k) where k is
//! the average number of overlapping boxes. Segments whose candidate count
//! exceeds [`TrackerConfig::dense_candidate_threshold`] are logged as a
//! performance risk. Long builds can be aborted with a [`CancelToken`].

mod cancel;
mod proximity;
mod rtree;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::{Result, Segment, TrackerConfig, TrackerError};

pub use cancel::CancelToken;
pub use proximity::buffered_intersects;
pub use rtree::{build_segment_rtree, search_envelope, SegmentBounds};

/// Counters collected while building a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBuildStats {
    pub segment_count: usize,
    /// Unordered candidate pairs that reached the geometric test
    pub candidate_pairs: usize,
    /// Undirected edges
    pub edge_count: usize,
    /// Segment ids whose candidate count exceeded the density threshold
    pub dense_segments: Vec<String>,
}

/// Undirected proximity graph plus the segment lookup used for summation.
///
/// Immutable once built; share it behind an `Arc` to reuse it across runs
/// against the same canal dataset.
#[derive(Debug, Clone)]
pub struct AdjacencyGraph {
    neighbors: BTreeMap<String, BTreeSet<String>>,
    segments: HashMap<String, Segment>,
    stats: GraphBuildStats,
}

impl AdjacencyGraph {
    /// Neighbors of a segment in ascending id order. Unknown ids have none.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.neighbors
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.segments.contains_key(id)
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Authoritative length of a segment in meters.
    pub fn length_meters(&self, id: &str) -> Option<f64> {
        self.segments.get(id).map(|s| s.length_meters)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn edge_count(&self) -> usize {
        self.stats.edge_count
    }

    /// Segment ids in ascending order.
    pub fn segment_ids(&self) -> impl Iterator<Item = &str> {
        self.neighbors.keys().map(String::as_str)
    }

    pub fn stats(&self) -> &GraphBuildStats {
        &self.stats
    }
}

/// Build the adjacency graph for a canal dataset.
///
/// Fails with [`TrackerError::Validation`] when two segments share a
/// location code.
pub fn build_adjacency_graph(segments: &[Segment], config: &TrackerConfig) -> Result<AdjacencyGraph> {
    build_adjacency_graph_with_cancel(segments, config, &CancelToken::new())
}

/// Build the adjacency graph, checking `cancel` once per segment.
pub fn build_adjacency_graph_with_cancel(
    segments: &[Segment],
    config: &TrackerConfig,
    cancel: &CancelToken,
) -> Result<AdjacencyGraph> {
    let mut lookup: HashMap<String, Segment> = HashMap::with_capacity(segments.len());
    for segment in segments {
        if lookup.insert(segment.id.clone(), segment.clone()).is_some() {
            return Err(TrackerError::validation(format!(
                "duplicate segment location code '{}'",
                segment.id
            )));
        }
    }

    let rtree = build_segment_rtree(segments);
    let buffer = 2.0 * config.tolerance_meters.max(0.0);

    #[cfg(feature = "parallel")]
    let per_segment: Vec<CandidateResult> = (0..segments.len())
        .into_par_iter()
        .map(|i| test_candidates(i, segments, &rtree, buffer, config, cancel))
        .collect::<Result<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let per_segment: Vec<CandidateResult> = (0..segments.len())
        .map(|i| test_candidates(i, segments, &rtree, buffer, config, cancel))
        .collect::<Result<Vec<_>>>()?;

    let mut neighbors: BTreeMap<String, BTreeSet<String>> = segments
        .iter()
        .map(|s| (s.id.clone(), BTreeSet::new()))
        .collect();
    let mut stats = GraphBuildStats {
        segment_count: segments.len(),
        ..GraphBuildStats::default()
    };

    for (i, result) in per_segment.into_iter().enumerate() {
        stats.candidate_pairs += result.tested;
        if result.dense {
            stats.dense_segments.push(segments[i].id.clone());
        }
        for j in result.hits {
            let (a, b) = (&segments[i].id, &segments[j].id);
            let inserted = neighbors.entry(a.clone()).or_default().insert(b.clone());
            neighbors.entry(b.clone()).or_default().insert(a.clone());
            if inserted {
                stats.edge_count += 1;
            }
        }
    }

    if !stats.dense_segments.is_empty() {
        warn!(
            "[AdjacencyGraph] {} segments exceeded {} bounding-box candidates; construction cost grows with local density",
            stats.dense_segments.len(),
            config.dense_candidate_threshold
        );
    }

    info!(
        "[AdjacencyGraph] Built graph: {} segments, {} candidate pairs, {} edges (tolerance {}m)",
        stats.segment_count, stats.candidate_pairs, stats.edge_count, config.tolerance_meters
    );

    Ok(AdjacencyGraph {
        neighbors,
        segments: lookup,
        stats,
    })
}

/// Outcome of testing one segment against its later-indexed candidates.
struct CandidateResult {
    hits: Vec<usize>,
    tested: usize,
    dense: bool,
}

fn test_candidates(
    i: usize,
    segments: &[Segment],
    rtree: &RTree<SegmentBounds>,
    buffer: f64,
    config: &TrackerConfig,
    cancel: &CancelToken,
) -> Result<CandidateResult> {
    if cancel.is_cancelled() {
        return Err(TrackerError::Cancelled);
    }

    let segment = &segments[i];
    let envelope = search_envelope(&segment.bounds, buffer);

    let candidates: Vec<usize> = rtree
        .locate_in_envelope_intersecting(&envelope)
        .map(|b| b.idx)
        .filter(|&j| j != i)
        .collect();

    let dense = candidates.len() > config.dense_candidate_threshold;
    if dense {
        warn!(
            "[AdjacencyGraph] Segment '{}' has {} bounding-box candidates",
            segment.id,
            candidates.len()
        );
    }

    // Pairs are tested once, from the lower index
    let mut hits = Vec::new();
    let mut tested = 0;
    for j in candidates.into_iter().filter(|&j| j > i) {
        tested += 1;
        if buffered_intersects(segment, &segments[j], config.tolerance_meters) {
            hits.push(j);
        }
    }

    Ok(CandidateResult { hits, tested, dense })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    /// Chain A - B - C along a parallel, plus D far away.
    fn chain() -> Vec<Segment> {
        vec![
            Segment::from_line("A", "Alpha", line_string![(x: -2.03, y: 52.0), (x: -2.02, y: 52.0)], 700.0).unwrap(),
            Segment::from_line("B", "Bravo", line_string![(x: -2.02, y: 52.0), (x: -2.01, y: 52.0)], 700.0).unwrap(),
            Segment::from_line("C", "Charlie", line_string![(x: -2.01, y: 52.0), (x: -2.00, y: 52.0)], 700.0).unwrap(),
            Segment::from_line("D", "Delta", line_string![(x: -1.50, y: 52.5), (x: -1.49, y: 52.5)], 700.0).unwrap(),
        ]
    }

    #[test]
    fn test_chain_edges() {
        let graph = build_adjacency_graph(&chain(), &TrackerConfig::default()).unwrap();

        assert!(graph.has_edge("A", "B"));
        assert!(graph.has_edge("B", "C"));
        assert!(!graph.has_edge("A", "C"));
        assert!(graph.neighbors("D").next().is_none());
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.segment_count(), 4);
    }

    #[test]
    fn test_graph_is_symmetric_without_self_edges() {
        let graph = build_adjacency_graph(&chain(), &TrackerConfig::default()).unwrap();
        for id in graph.segment_ids() {
            for neighbor in graph.neighbors(id) {
                assert_ne!(id, neighbor);
                assert!(graph.has_edge(neighbor, id), "{} -> {} not mirrored", id, neighbor);
            }
        }
    }

    #[test]
    fn test_neighbors_sorted() {
        let segments = vec![
            Segment::from_line("hub", "", line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)], 1.0).unwrap(),
            Segment::from_line("zeta", "", line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 0.001)], 1.0).unwrap(),
            Segment::from_line("alpha", "", line_string![(x: 0.0, y: 0.0), (x: -0.001, y: 0.0)], 1.0).unwrap(),
            Segment::from_line("mid", "", line_string![(x: 0.0, y: 0.0), (x: 0.0, y: -0.001)], 1.0).unwrap(),
        ];
        let graph = build_adjacency_graph(&segments, &TrackerConfig::default()).unwrap();
        let neighbors: Vec<&str> = graph.neighbors("hub").collect();
        assert_eq!(neighbors, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_length_lookup() {
        let graph = build_adjacency_graph(&chain(), &TrackerConfig::default()).unwrap();
        assert_eq!(graph.length_meters("B"), Some(700.0));
        assert_eq!(graph.length_meters("missing"), None);
        assert_eq!(graph.segment("C").map(|s| s.name.as_str()), Some("Charlie"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut segments = chain();
        segments.push(segments[0].clone());
        let result = build_adjacency_graph(&segments, &TrackerConfig::default());
        assert!(matches!(result, Err(TrackerError::Validation { .. })));
    }

    #[test]
    fn test_cancelled_build() {
        let token = CancelToken::new();
        token.cancel();
        let result = build_adjacency_graph_with_cancel(&chain(), &TrackerConfig::default(), &token);
        assert!(matches!(result, Err(TrackerError::Cancelled)));
    }

    #[test]
    fn test_dense_segments_reported() {
        let config = TrackerConfig {
            dense_candidate_threshold: 1,
            ..TrackerConfig::default()
        };
        let graph = build_adjacency_graph(&chain(), &config).unwrap();
        // B overlaps both A and C
        assert_eq!(graph.stats().dense_segments, vec!["B".to_string()]);
    }

    #[test]
    fn test_empty_dataset() {
        let graph = build_adjacency_graph(&[], &TrackerConfig::default()).unwrap();
        assert_eq!(graph.segment_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }
}
