use crate::hashlife::cache::CachePolicy;
use crate::rule_set::RuleSet;

/// Seed used when none is given, so that hashes are stable from one run to the next.
pub const DEFAULT_SEED: u64 = 0x5eed_11fe_c0de_0001;

/// Everything needed to build a [`Universe`](crate::hashlife::Universe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseConfig {
    /// Level of the initial root, which covers `2^level` cells on a side.
    pub level: u32,
    pub seed: u64,
    pub rule: RuleSet,
    pub cache: CachePolicy,

    /// Grow the root before stepping whenever live cells sit outside its central quarter.
    pub auto_expand: bool,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            level: 3,
            seed: DEFAULT_SEED,
            rule: RuleSet::default(),
            cache: CachePolicy::default(),
            auto_expand: true,
        }
    }
}

impl UniverseConfig {
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rule(mut self, rule: RuleSet) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_auto_expand(mut self, auto_expand: bool) -> Self {
        self.auto_expand = auto_expand;
        self
    }
}
