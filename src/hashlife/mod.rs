//! Stepping a quadtree through time.
//!
//! [`Universe::step_node`] advances the center of a level `L` node by `2^min(g, L - 2)`
//! generations and returns it as a level `L - 1` node. Results are memoized by content hash, so a
//! pattern that shows up again, anywhere and at any time, is not recomputed.

use thiserror::Error;
use tracing::debug;

use crate::parse_rle::RleError;
use crate::parse_rle::RleFile;
use crate::parse_rle::read_rle;
use crate::quadtree::Coord;
use crate::quadtree::HashSeed;
use crate::quadtree::LEAF_LEVEL;
use crate::quadtree::MAX_LEVEL;
use crate::quadtree::Node;
use crate::quadtree::NodeError;
use crate::quadtree::in_bounds;
use crate::rule_set::RuleSet;

pub use crate::hashlife::cache::CacheKey;
pub use crate::hashlife::cache::CachePolicy;
pub use crate::hashlife::cache::CacheStats;
pub use crate::hashlife::config::DEFAULT_SEED;
pub use crate::hashlife::config::UniverseConfig;
pub use crate::hashlife::grid::LeafParentGrid;

use crate::hashlife::cache::Cache;

mod cache;
mod config;
mod grid;

/// Smallest root we accept: the root is grown once per step, and the step needs a node whose
/// children are at least leaves.
pub const MIN_ROOT_LEVEL: u32 = LEAF_LEVEL + 1;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("A universe needs a root of level {min} or more, got {level}")]
    LevelTooSmall { level: u32, min: u32 },

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("RLE error: {0}")]
    Rle(#[from] RleError),
}

pub struct Universe {
    root: Node,
    cache: Cache,
    seed: HashSeed,

    /// Canonical dead node of level `i + 1` at index `i`, sealed.
    empties: Vec<Node>,

    rule: RuleSet,

    /// Generations elapsed since the last edit.
    generation: u64,

    auto_expand: bool,
}

impl Universe {
    /// An empty universe with a root of level `level` and the default configuration.
    pub fn new(level: u32) -> Result<Self, UniverseError> {
        Self::with_config(UniverseConfig::default().with_level(level))
    }

    pub fn with_config(config: UniverseConfig) -> Result<Self, UniverseError> {
        let UniverseConfig {
            level,
            seed,
            rule,
            cache,
            auto_expand,
        } = config;

        if level < MIN_ROOT_LEVEL {
            return Err(UniverseError::LevelTooSmall {
                level,
                min: MIN_ROOT_LEVEL,
            });
        }

        if level > MAX_LEVEL {
            return Err(NodeError::LevelTooLarge { level }.into());
        }

        Ok(Self {
            root: Node::new(level),
            cache: Cache::new(cache),
            seed: HashSeed::new(seed),
            empties: Vec::new(),
            rule,
            generation: 0,
            auto_expand,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn level(&self) -> u32 {
        self.root.level()
    }

    pub fn population(&self) -> u64 {
        self.root.population()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rule(&self) -> RuleSet {
        self.rule
    }

    pub fn hash_seed(&self) -> &HashSeed {
        &self.seed
    }

    /// Switch to another rule. Stepped results depend on the rule, so the cache is dropped.
    pub fn set_rule(&mut self, rule: RuleSet) {
        if rule != self.rule {
            self.rule = rule;
            self.cache.clear();
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache.policy()
    }

    /// Forget every stepped result. Only costs time.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// `1` if the cell at `(x, y)` is alive, `0` otherwise, including outside the root.
    pub fn get(&self, x: Coord, y: Coord) -> u8 {
        self.root.get(x, y)
    }

    /// Write a cell. The root is not grown, see [`Universe::grow_to_contain`].
    pub fn set(&mut self, x: Coord, y: Coord, value: i8) -> Result<(), UniverseError> {
        self.root.set(x, y, value)?;
        self.generation = 0;

        Ok(())
    }

    /// Double the side of the root, keeping its content centered.
    pub fn grow(&mut self) -> Result<(), UniverseError> {
        // Sealed children are shared by the grown root instead of copied
        self.root.hash(&self.seed);
        self.root.grow(0, 0)?;
        debug!(level = self.root.level(), "grew root");

        Ok(())
    }

    /// Grow the root until `(x, y)` lies within it.
    pub fn grow_to_contain(&mut self, x: Coord, y: Coord) -> Result<(), UniverseError> {
        while !in_bounds(self.root.level(), x, y) {
            self.grow()?;
        }

        Ok(())
    }

    /// Canonical dead node of the given level.
    pub(crate) fn empty(&mut self, level: u32) -> Node {
        while self.empties.len() < level as usize {
            let node = Node::new(self.empties.len() as u32 + 1);
            node.hash(&self.seed);
            self.empties.push(node);
        }

        self.empties[level as usize - 1].clone()
    }

    /// Advance the center of `node` by `2^min(generations, level - 2)` generations, returning it
    /// as a node one level down.
    pub fn step_node(&mut self, node: &Node, generations: u32) -> Result<Node, UniverseError> {
        let level = node.level();

        if level < LEAF_LEVEL + 1 {
            return Err(NodeError::TooShallow {
                level,
                min: LEAF_LEVEL + 1,
            }
            .into());
        }

        if node.population() < self.rule.vanishing_threshold() {
            return Ok(self.empty(level - 1));
        }

        let budget = generations.min(level - 2);
        let key = CacheKey {
            hash: node.hash(&self.seed),
            generations: budget,
        };

        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let next = if level == LEAF_LEVEL + 1 {
            let mut grid = LeafParentGrid::from_node(node);
            grid.step(&self.rule, 1 << budget);
            grid.center()?
        } else {
            // Results for the nine overlapping windows, row major
            let mut results = Vec::with_capacity(9);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let pseudo = node.get_pseudo_child(dx, dy)?;
                    results.push(self.step_node(&pseudo, generations)?);
                }
            }

            let at = |x: usize, y: usize| results[3 * y + x].clone();

            let candidates = [
                Node::with_children(at(0, 0), at(1, 0), at(0, 1), at(1, 1))?,
                Node::with_children(at(1, 0), at(2, 0), at(1, 1), at(2, 1))?,
                Node::with_children(at(0, 1), at(1, 1), at(0, 2), at(1, 2))?,
                Node::with_children(at(1, 1), at(2, 1), at(1, 2), at(2, 2))?,
            ];

            let [nw, ne, sw, se] = candidates;
            let maximal = budget == level - 2;

            Node::with_children(
                self.finish_candidate(&nw, generations, maximal)?,
                self.finish_candidate(&ne, generations, maximal)?,
                self.finish_candidate(&sw, generations, maximal)?,
                self.finish_candidate(&se, generations, maximal)?,
            )?
        };

        // Only full steps are cached, partial ones are cheap to redo from cached pieces
        if budget == level - 2 {
            next.hash(&self.seed);
            self.cache.insert(key, next.clone());
        }

        Ok(next)
    }

    /// Second half of a step: a candidate has already moved by half the budget. Move it by the
    /// other half when the full budget was asked for, otherwise just cut out its center.
    fn finish_candidate(
        &mut self,
        candidate: &Node,
        generations: u32,
        maximal: bool,
    ) -> Result<Node, UniverseError> {
        if maximal {
            self.step_node(candidate, generations)
        } else {
            Ok(candidate.get_pseudo_child(0, 0)?)
        }
    }

    /// Advance the whole universe by `2^generations` generations, or by as many as the root can
    /// hold. Returns the number of generations actually advanced.
    pub fn step(&mut self, generations: u32) -> Result<u64, UniverseError> {
        if self.auto_expand && self.root.population() > self.root.center_population() {
            self.grow()?;
        }

        let generations = generations.min(self.root.level() - 2);

        // Border headroom, the result comes back at the current level
        self.grow()?;

        let root = self.root.clone();
        self.root = self.step_node(&root, generations)?;

        let advanced = 1 << generations;
        self.generation += advanced;

        debug!(
            generation = self.generation,
            population = self.root.population(),
            level = self.root.level(),
            cached = self.cache.len(),
            "stepped"
        );

        Ok(advanced)
    }

    /// Load an RLE pattern, growing the root to fit it. The file's rule, if any, replaces the
    /// current one.
    pub fn load_rle<'a>(&mut self, bytes: &'a [u8]) -> Result<RleFile<'a>, UniverseError> {
        // Sealed, so the writes below copy and this handle keeps the old tree
        self.root.hash(&self.seed);
        let saved = (self.root.clone(), self.generation);

        let mut cells = 0u64;
        let mut failed = None;

        let file = read_rle(bytes, |x, y| {
            if failed.is_some() {
                return;
            }

            match self.grow_to_contain(x, y).and_then(|()| self.set(x, y, 1)) {
                Ok(()) => cells += 1,
                Err(e) => failed = Some(e),
            }
        });

        let file = match (file, failed) {
            (Ok(file), None) => file,
            (Err(e), _) => {
                (self.root, self.generation) = saved;
                return Err(e.into());
            }
            (Ok(_), Some(e)) => {
                (self.root, self.generation) = saved;
                return Err(e);
            }
        };

        if let Some(rule) = file.rule {
            self.set_rule(rule);
        }

        debug!(cells, level = self.root.level(), "loaded RLE pattern");

        Ok(file)
    }
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("root", &self.root)
            .field("rule", &self.rule)
            .field("generation", &self.generation)
            .field("cache", &self.cache.stats())
            .finish()
    }
}
