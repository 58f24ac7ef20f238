use std::num::NonZeroUsize;

use ahash::RandomState;
use lru::LruCache;
use tracing::trace;

use crate::quadtree::Node;

/// A stepped node is keyed by its content and by how far it was advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: u64,

    /// Logarithmic budget, already capped to `level - 2`.
    pub generations: u32,
}

/// How many stepped results the universe keeps around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep everything. Memory grows with the number of distinct patterns seen.
    Unbounded,

    /// Keep at most `capacity` entries, dropping the least recently used first.
    Lru { capacity: usize },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Lru { capacity: 1 << 20 }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Memoized results of stepped nodes, most recently used first.
pub struct Cache {
    policy: CachePolicy,
    map: LruCache<CacheKey, Node, RandomState>,
    stats: CacheStats,
}

impl Cache {
    pub fn new(policy: CachePolicy) -> Self {
        let map = match policy {
            CachePolicy::Unbounded => LruCache::unbounded_with_hasher(RandomState::new()),
            CachePolicy::Lru { capacity } => {
                let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
                LruCache::with_hasher(capacity, RandomState::new())
            }
        };

        Self {
            policy,
            map,
            stats: CacheStats::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.map.len(),
            ..self.stats
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Node> {
        let Some(node) = self.map.get(key) else {
            self.stats.misses += 1;
            return None;
        };

        self.stats.hits += 1;
        trace!(hash = key.hash, generations = key.generations, "cache hit");

        Some(node.clone())
    }

    pub fn insert(&mut self, key: CacheKey, node: Node) {
        // `push` hands back the replaced value too, only another key is an eviction
        if let Some((evicted, _)) = self.map.push(key, node) {
            if evicted != key {
                self.stats.evictions += 1;
                trace!(
                    hash = evicted.hash,
                    generations = evicted.generations,
                    "cache eviction"
                );
            }
        }
    }

    /// Forget every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
