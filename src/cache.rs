//! # Graph Cache
//!
//! Reuses adjacency graphs across report computations against the same
//! canal dataset.
//!
//! Entries are keyed by a [`DatasetKey`] fingerprint of the segments and the
//! build settings, so two datasets never share a slot. Each slot is a build-once
//! gate: concurrent callers for the same dataset wait for the single build in
//! progress and then share the finished graph read-only. A failed or
//! cancelled build leaves the slot empty for the next caller to retry.
//!
//! The cache holds at most `capacity` datasets and evicts the least recently
//! used finished one (linear scan, fine for a handful of datasets). Slots
//! with a build in progress are never evicted, so the cache may briefly run
//! over capacity while more datasets than that are being built at once.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use once_cell::sync::{Lazy, OnceCell};

use crate::{build_adjacency_graph_with_cancel, AdjacencyGraph, CancelToken, Result, Segment, TrackerConfig};

/// Identity of a canal dataset as seen by graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetKey(u64);

impl DatasetKey {
    /// Fingerprint ids, names, lengths, coordinates and the settings that
    /// shape the built graph (tolerance and density threshold).
    pub fn new(segments: &[Segment], config: &TrackerConfig) -> Self {
        let mut hasher = DefaultHasher::new();
        config.tolerance_meters.to_bits().hash(&mut hasher);
        config.dense_candidate_threshold.hash(&mut hasher);
        segments.len().hash(&mut hasher);
        for segment in segments {
            segment.id.hash(&mut hasher);
            segment.name.hash(&mut hasher);
            segment.length_meters.to_bits().hash(&mut hasher);
            for line in &segment.geometry.0 {
                line.0.len().hash(&mut hasher);
                for c in &line.0 {
                    c.x.to_bits().hash(&mut hasher);
                    c.y.to_bits().hash(&mut hasher);
                }
            }
        }
        Self(hasher.finish())
    }
}

type GraphSlot = Arc<OnceCell<Arc<AdjacencyGraph>>>;

#[derive(Debug)]
struct CacheEntry {
    slot: GraphSlot,
    last_access: u64,
}

impl CacheEntry {
    /// A build is running when the cell is empty and some caller besides the
    /// map still holds the slot.
    fn is_building(&self) -> bool {
        self.slot.get().is_none() && Arc::strong_count(&self.slot) > 1
    }
}

#[derive(Debug)]
struct CacheState {
    capacity: usize,
    entries: HashMap<DatasetKey, CacheEntry>,
    access_counter: u64,
}

impl CacheState {
    /// Evict least recently used idle entries until at most `limit` remain.
    fn evict_to(&mut self, limit: usize) {
        while self.entries.len() > limit {
            let oldest = self
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_building())
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| *k);
            let Some(oldest) = oldest else {
                debug!(
                    "[GraphCache] {} builds in progress, over capacity {}",
                    self.entries.len(),
                    self.capacity
                );
                return;
            };
            debug!("[GraphCache] Evicting dataset {:016x}", oldest.0);
            self.entries.remove(&oldest);
        }
    }
}

/// LRU-bounded, dataset-keyed store of built adjacency graphs.
#[derive(Debug)]
pub struct GraphCache {
    state: Mutex<CacheState>,
}

impl GraphCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                access_counter: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Change the number of datasets kept, evicting immediately if shrinking.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.lock();
        let capacity = capacity.max(1);
        if state.capacity != capacity {
            info!("[GraphCache] Capacity {} -> {}", state.capacity, capacity);
            state.capacity = capacity;
            state.evict_to(capacity);
        }
    }

    /// Return the graph for `segments`, building it if this dataset has not
    /// been seen (or its previous build failed).
    pub fn get_or_build(
        &self,
        segments: &[Segment],
        config: &TrackerConfig,
        cancel: &CancelToken,
    ) -> Result<Arc<AdjacencyGraph>> {
        let key = DatasetKey::new(segments, config);
        let slot = self.slot_for(key);

        // The map lock is released here; only this dataset's callers wait
        let mut built_here = false;
        let graph = slot.get_or_try_init(|| {
            built_here = true;
            info!("[GraphCache] Building graph for dataset {:016x}", key.0);
            build_adjacency_graph_with_cancel(segments, config, cancel).map(Arc::new)
        })?;

        if !built_here {
            debug!("[GraphCache] Reusing graph for dataset {:016x}", key.0);
        }
        Ok(Arc::clone(graph))
    }

    /// The finished graph for a dataset, if one is cached.
    pub fn get(&self, key: &DatasetKey) -> Option<Arc<AdjacencyGraph>> {
        let mut state = self.lock();
        state.access_counter += 1;
        let counter = state.access_counter;
        let entry = state.entries.get_mut(key)?;
        entry.last_access = counter;
        entry.slot.get().cloned()
    }

    pub fn contains(&self, key: &DatasetKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.slot.get().is_some())
    }

    /// Drop one dataset's graph.
    pub fn invalidate(&self, key: &DatasetKey) {
        self.lock().entries.remove(key);
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.access_counter = 0;
    }

    /// Number of dataset slots (including builds in progress).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn slot_for(&self, key: DatasetKey) -> GraphSlot {
        let mut state = self.lock();
        state.access_counter += 1;
        let counter = state.access_counter;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.last_access = counter;
            return Arc::clone(&entry.slot);
        }

        let limit = state.capacity - 1;
        state.evict_to(limit);

        let slot: GraphSlot = Arc::new(OnceCell::new());
        state.entries.insert(
            key,
            CacheEntry {
                slot: Arc::clone(&slot),
                last_access: counter,
            },
        );
        slot
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(TrackerConfig::default().graph_cache_capacity)
    }
}

/// Process-wide graph cache.
pub static GRAPH_CACHE: Lazy<GraphCache> = Lazy::new(GraphCache::default);

/// Run a closure against the global graph cache.
///
/// The closure sees the cache exactly as configured by earlier callers; use
/// [`GraphCache::set_capacity`] to apply a [`TrackerConfig`] bound.
pub fn with_graph_cache<F, R>(f: F) -> R
where
    F: FnOnce(&GraphCache) -> R,
{
    f(&GRAPH_CACHE)
}
