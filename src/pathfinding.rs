//! Minimum-hop pathfinding over the adjacency graph.
//!
//! Breadth-first search with neighbors expanded in ascending id order, so
//! ties between equally short paths always resolve the same way. The result
//! minimizes hop count, not geometric length.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::AdjacencyGraph;

/// Ordered segment ids from origin to destination, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub segment_ids: Vec<String>,
}

impl Path {
    pub fn origin(&self) -> &str {
        self.segment_ids.first().map(String::as_str).unwrap_or_default()
    }

    pub fn destination(&self) -> &str {
        self.segment_ids.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of edges traversed (`segment_ids.len() - 1`).
    pub fn hop_count(&self) -> usize {
        self.segment_ids.len().saturating_sub(1)
    }
}

/// Find a minimum-hop path from `origin` to `destination`.
///
/// Returns `None` when the destination is unreachable or either id is not
/// part of the graph. An origin equal to the destination yields a
/// single-segment path.
pub fn find_path(graph: &AdjacencyGraph, origin: &str, destination: &str) -> Option<Path> {
    if !graph.contains(origin) || !graph.contains(destination) {
        return None;
    }

    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut predecessors: HashMap<&str, &str> = HashMap::new();

    queue.push_back(origin);
    visited.insert(origin);

    while let Some(current) = queue.pop_front() {
        if current == destination {
            let mut segment_ids = vec![current.to_string()];
            let mut node = current;
            while let Some(&previous) = predecessors.get(node) {
                segment_ids.push(previous.to_string());
                node = previous;
            }
            segment_ids.reverse();

            debug!(
                "[PathFinder] {} -> {}: {} hops, {} segments explored",
                origin,
                destination,
                segment_ids.len() - 1,
                visited.len()
            );
            return Some(Path { segment_ids });
        }

        for neighbor in graph.neighbors(current) {
            if visited.insert(neighbor) {
                predecessors.insert(neighbor, current);
                queue.push_back(neighbor);
            }
        }
    }

    None
}
