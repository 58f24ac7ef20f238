use crate::quadtree::LEAF_HALF_SIZE;
use crate::quadtree::LEAF_LEVEL;
use crate::quadtree::LEAF_SIZE;
use crate::quadtree::Node;
use crate::quadtree::NodeError;
use crate::rule_set::RuleSet;

const SIDE: usize = 2 * LEAF_SIZE as usize;

/// Raw cells of a node whose children are leaves, the smallest node that can be stepped.
///
/// Each generation invalidates one more ring of cells on the border, since they lack neighbors.
/// The center leaf needs one ring of context per generation, so at most [`LEAF_LEVEL`]
/// generations fit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LeafParentGrid {
    cells: [[u8; SIDE]; SIDE],
}

impl LeafParentGrid {
    pub fn from_node(node: &Node) -> Self {
        debug_assert_eq!(node.level(), LEAF_LEVEL + 1);

        let mut grid = Self::default();

        for y in -LEAF_SIZE..LEAF_SIZE {
            for x in -LEAF_SIZE..LEAF_SIZE {
                grid.cells[(y + LEAF_SIZE) as usize][(x + LEAF_SIZE) as usize] = node.get(x, y);
            }
        }

        grid
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y][x]
    }

    /// Live cells among the 8 neighbors of `(x, y)`, which must not lie on the border.
    pub fn neighbor_count(&self, x: usize, y: usize) -> u8 {
        let mut count = 0;

        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                count += self.cells[ny][nx];
            }
        }

        count - self.cells[y][x]
    }

    /// Advance `generations` times, capped by how much border is left.
    pub fn step(&mut self, rule: &RuleSet, generations: u64) {
        let rounds = generations.min(LEAF_LEVEL as u64) as usize;

        for i in 1..=rounds {
            let mut next = [[0; SIDE]; SIDE];

            for (y, row) in next.iter_mut().enumerate().take(SIDE - i).skip(i) {
                for (x, cell) in row.iter_mut().enumerate().take(SIDE - i).skip(i) {
                    let alive = self.cells[y][x] > 0;
                    *cell = rule.next_state(alive, self.neighbor_count(x, y)) as u8;
                }
            }

            self.cells = next;
        }
    }

    /// The centered leaf.
    pub fn center(&self) -> Result<Node, NodeError> {
        let mut leaf = Node::new(LEAF_LEVEL);

        for y in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
            for x in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
                let cell = self.cells[(y + LEAF_SIZE) as usize][(x + LEAF_SIZE) as usize];

                if cell != 0 {
                    leaf.set(x, y, cell as i8)?;
                }
            }
        }

        Ok(leaf)
    }
}

impl From<[[u8; SIDE]; SIDE]> for LeafParentGrid {
    fn from(cells: [[u8; SIDE]; SIDE]) -> Self {
        Self { cells }
    }
}

#[cfg(test)]
mod test {
    use super::LeafParentGrid;
    use crate::quadtree::Node;
    use crate::rule_set::B3S23;

    #[test]
    fn counts_neighbors() {
        let grid = LeafParentGrid::from([
            [1, 1, 0, 0], //
            [0, 1, 0, 0],
            [0, 0, 1, 0],
            [0, 0, 0, 0],
        ]);

        assert_eq!(grid.neighbor_count(1, 1), 3);
        assert_eq!(grid.neighbor_count(2, 1), 3);
        assert_eq!(grid.neighbor_count(2, 2), 1);
        assert_eq!(grid.neighbor_count(1, 2), 2);
    }

    #[test]
    fn steps_only_the_inside() {
        // a blinker standing on column 1
        let mut grid = LeafParentGrid::from([
            [0, 1, 0, 0], //
            [0, 1, 0, 0],
            [0, 1, 0, 0],
            [0, 0, 0, 0],
        ]);

        grid.step(&B3S23, 1);

        assert_eq!(grid.get(1, 0), 0, "border is cleared");
        assert_eq!(grid.get(1, 1), 1);
        assert_eq!(grid.get(2, 1), 1);
        assert_eq!(grid.get(1, 2), 0);
        assert_eq!(grid.get(2, 2), 0);
    }

    #[test]
    fn more_generations_than_border() {
        let cells = [
            [0, 0, 0, 0], //
            [0, 1, 1, 0],
            [0, 1, 1, 0],
            [0, 0, 0, 0],
        ];

        let mut once = LeafParentGrid::from(cells);
        let mut many = LeafParentGrid::from(cells);
        once.step(&B3S23, 1);
        many.step(&B3S23, 64);

        assert_eq!(once, many);
    }

    #[test]
    fn round_trip_through_nodes() {
        let mut node = Node::new(2);
        node.set(-1, -1, 1).unwrap();
        node.set(0, -1, 1).unwrap();
        node.set(-1, 0, 1).unwrap();

        let mut grid = LeafParentGrid::from_node(&node);
        assert_eq!(grid.get(1, 1), 1);
        assert_eq!(grid.get(3, 3), 0);

        // three cells of a block fill in the fourth
        grid.step(&B3S23, 1);
        let leaf = grid.center().unwrap();

        assert_eq!(leaf.level(), 1);
        assert_eq!(leaf.population(), 4);
        assert_eq!(leaf.leaf_cells(), Some([1, 1, 1, 1]));
    }
}
