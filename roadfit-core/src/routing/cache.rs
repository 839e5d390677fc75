use hashbrown::HashMap;

use super::Path;
use crate::NodeId;
use crate::model::WeightMode;

type CacheKey = (NodeId, NodeId, WeightMode);

/// Memoization table for computed paths, owned by the caller and handed to the
/// router explicitly.
///
/// `None` entries record pairs known to be unreachable. A cache is only valid
/// for the graph its paths were computed on.
#[derive(Debug, Clone, Default)]
pub struct PathCache {
    entries: HashMap<CacheKey, Option<Path>>,
    hits: usize,
    misses: usize,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for a pair; `Some(None)` means known unreachable
    pub fn get(&mut self, source: NodeId, target: NodeId, mode: WeightMode) -> Option<&Option<Path>> {
        let entry = self.entries.get(&(source, target, mode));
        if entry.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        entry
    }

    pub fn contains(&self, source: NodeId, target: NodeId, mode: WeightMode) -> bool {
        self.entries.contains_key(&(source, target, mode))
    }

    pub fn insert(&mut self, source: NodeId, target: NodeId, mode: WeightMode, path: Option<Path>) {
        self.entries.insert((source, target, mode), path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
