use std::hash::BuildHasher;
use std::hash::Hasher;

use ahash::RandomState;

use crate::quadtree::LEAF_LEVEL;
use crate::quadtree::Node;

/// Fixed seed for content hashing. Two `HashSeed`s built from the same `u64` hash identical
/// content identically, run after run.
#[derive(Clone)]
pub struct HashSeed {
    seed: u64,
    state: RandomState,
}

impl HashSeed {
    pub fn new(seed: u64) -> Self {
        // spread the single seed over the four keys ahash wants
        let state = RandomState::with_seeds(
            seed,
            seed.rotate_left(16) ^ 0x243f_6a88_85a3_08d3,
            seed.rotate_left(32) ^ 0x1319_8a2e_0370_7344,
            seed.rotate_left(48) ^ 0xa409_3822_299f_31d0,
        );

        Self { seed, state }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn hasher(&self) -> impl Hasher {
        self.state.build_hasher()
    }
}

impl std::fmt::Debug for HashSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HashSeed").field(&self.seed).finish()
    }
}

impl Node {
    /// Content hash of this node. Computing it seals the node: from then on, any change goes
    /// through a copy.
    ///
    /// All dead internal nodes of a given level hash alike, whatever their shape.
    pub fn hash(&self, seed: &HashSeed) -> u64 {
        if let Some(hash) = self.0.borrow().hash {
            return hash;
        }

        let (level, population, cells, children) = {
            let data = self.0.borrow();
            (data.level, data.population, data.cells, data.children.clone())
        };

        let mut hasher = seed.hasher();

        if level == LEAF_LEVEL {
            hasher.write(&cells.map(|c| c as u8));
        } else if population == 0 {
            hasher.write_u64(level as u64);
        } else {
            debug_assert!(children.is_some(), "live node without children");

            for child in children.iter().flatten() {
                hasher.write_u64(child.hash(seed));
            }
        }

        let hash = hasher.finish();

        let mut data = self.0.borrow_mut();
        data.hash = Some(hash);

        // A sealed dead node keeps no children, so nothing reachable from it can be written
        // through an alias later on.
        if population == 0 {
            data.children = None;
        }

        hash
    }
}

#[cfg(test)]
mod test {
    use super::HashSeed;
    use crate::quadtree::Node;

    #[test]
    fn same_content_same_hash() {
        let seed = HashSeed::new(42);

        let mut a = Node::new(4);
        let mut b = Node::new(4);

        for (x, y) in [(0, 0), (-3, 5), (7, -8)] {
            a.set(x, y, 1).unwrap();
        }
        for (x, y) in [(7, -8), (0, 0), (-3, 5)] {
            b.set(x, y, 1).unwrap();
        }

        assert_eq!(a.hash(&seed), b.hash(&seed));
        assert_eq!(a.hash(&seed), b.hash(&HashSeed::new(42)));
    }

    #[test]
    fn permuted_children_differ() {
        let seed = HashSeed::new(42);

        let mut a = Node::new(3);
        let mut b = Node::new(3);
        a.set(-1, -1, 1).unwrap();
        b.set(0, 0, 1).unwrap();

        assert_ne!(a.hash(&seed), b.hash(&seed));
    }

    #[test]
    fn dead_nodes_collapse() {
        let seed = HashSeed::new(7);

        let plain = Node::new(5);
        let mut carved = Node::new(5);
        carved.set(3, 3, 1).unwrap();
        carved.set(-10, 2, 1).unwrap();
        carved.set(3, 3, 0).unwrap();
        carved.set(-10, 2, 0).unwrap();

        assert!(carved.children().is_some());
        assert_eq!(plain.hash(&seed), carved.hash(&seed));
        assert!(carved.children().is_none());
        assert_ne!(plain.hash(&seed), Node::new(4).hash(&seed));
    }

    #[test]
    fn hashing_seals() {
        let seed = HashSeed::new(1);

        let mut node = Node::new(3);
        node.set(1, 2, 1).unwrap();
        assert!(!node.is_sealed());

        let hash = node.hash(&seed);
        assert!(node.is_sealed());

        let alias = node.clone();
        node.set(-1, -1, 1).unwrap();

        assert!(!node.ptr_eq(&alias));
        assert!(!node.is_sealed());
        assert_eq!(alias.hash(&seed), hash);
        assert_eq!(alias.get(-1, -1), 0);
        assert_ne!(node.hash(&seed), hash);
    }
}
