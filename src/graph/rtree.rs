//! R-tree indexed segment bounds and envelope helpers.

use crate::geo_utils::expand_bounds;
use crate::{Bounds, Segment};
use rstar::{RTree, RTreeObject, AABB};

/// A segment's bounding box with its position in the input slice
#[derive(Debug, Clone, Copy)]
pub struct SegmentBounds {
    pub idx: usize,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl RTreeObject for SegmentBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// Bulk-load every segment's bounding box into an R-tree
pub fn build_segment_rtree(segments: &[Segment]) -> RTree<SegmentBounds> {
    let entries: Vec<SegmentBounds> = segments
        .iter()
        .enumerate()
        .map(|(idx, s)| SegmentBounds {
            idx,
            min_lat: s.bounds.min_lat,
            max_lat: s.bounds.max_lat,
            min_lng: s.bounds.min_lng,
            max_lng: s.bounds.max_lng,
        })
        .collect();
    RTree::bulk_load(entries)
}

/// Search envelope for a segment, grown so that boxes closer than the
/// combined buffer are still returned as candidates
pub fn search_envelope(bounds: &Bounds, buffer_meters: f64) -> AABB<[f64; 2]> {
    let grown = expand_bounds(bounds, buffer_meters);
    AABB::from_corners([grown.min_lng, grown.min_lat], [grown.max_lng, grown.max_lat])
}
