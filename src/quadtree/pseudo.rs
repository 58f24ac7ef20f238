//! Half-offset windows into a node.
//!
//! The grandchildren of a level `L` node form a 4x4 grid of level `L - 2` nodes. Any 2x2 block of
//! that grid is a level `L - 1` window, a "pseudo-child". There are nine of them, addressed by an
//! offset `(dx, dy)` in `{-1, 0, 1}^2`, where `(0, 0)` is the centered one.

use crate::quadtree::Coord;
use crate::quadtree::LEAF_HALF_SIZE;
use crate::quadtree::LEAF_LEVEL;
use crate::quadtree::MAX_LEVEL;
use crate::quadtree::Node;
use crate::quadtree::NodeError;
use crate::quadtree::node::fresh_children;

/// Position of a grid cell as `(child index, grandchild index)`.
///
/// Children are stored NW, NE, SW, SE, and so are their own children, so walking the grid in row
/// major order does not walk the grandchildren in storage order: the NE child's west column and
/// the SW child's north row trade places.
fn grid_to_tree(row: usize, col: usize) -> (usize, usize) {
    (2 * (row / 2) + col / 2, 2 * (row % 2) + col % 2)
}

fn check_offset(dx: Coord, dy: Coord) -> Result<(usize, usize), NodeError> {
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) {
        return Err(NodeError::InvalidOffset { dx, dy });
    }

    Ok(((dy + 1) as usize, (dx + 1) as usize))
}

impl Node {
    /// The 4x4 grid of grandchildren, row major. Missing levels of the tree are filled with
    /// fresh dead nodes, which are not attached to `self`.
    fn grandchildren(&self) -> [[Node; 4]; 4] {
        let level = self.level();
        debug_assert!(level >= LEAF_LEVEL + 2);

        let quads: [Option<[Node; 4]>; 4] = match self.children() {
            Some(children) => children.map(|c| c.children()),
            None => std::array::from_fn(|_| None),
        };

        std::array::from_fn(|row| {
            std::array::from_fn(|col| {
                let (i, j) = grid_to_tree(row, col);

                match &quads[i] {
                    Some(grandchildren) => grandchildren[j].clone(),
                    None => Node::new(level - 2),
                }
            })
        })
    }

    /// The four level `L - 2` quadrants of the pseudo-child at `(dx, dy)`, in NW, NE, SW, SE
    /// order. Quadrants that exist in the tree are returned as aliases, not copies.
    pub fn get_pseudo_quads(&self, dx: Coord, dy: Coord) -> Result<[Node; 4], NodeError> {
        let level = self.level();

        if level < LEAF_LEVEL + 2 {
            return Err(NodeError::TooShallow {
                level,
                min: LEAF_LEVEL + 2,
            });
        }

        let (r, c) = check_offset(dx, dy)?;
        let g = self.grandchildren();

        Ok([
            g[r][c].clone(),
            g[r][c + 1].clone(),
            g[r + 1][c].clone(),
            g[r + 1][c + 1].clone(),
        ])
    }

    /// The level `L - 1` window at `(dx, dy)`, built on top of aliased quadrants.
    pub fn get_pseudo_child(&self, dx: Coord, dy: Coord) -> Result<Node, NodeError> {
        let level = self.level();

        if level < LEAF_LEVEL + 1 {
            return Err(NodeError::TooShallow {
                level,
                min: LEAF_LEVEL + 1,
            });
        }

        check_offset(dx, dy)?;

        // The grandchildren would be single cells, read them directly
        if level == LEAF_LEVEL + 1 {
            let mut pseudo = Node::new(LEAF_LEVEL);

            for y in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
                for x in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
                    let value = self.get_raw(dx + x, dy + y);

                    if value != 0 {
                        pseudo.set(x, y, value)?;
                    }
                }
            }

            return Ok(pseudo);
        }

        let mut pseudo = Node::new(level - 1);

        if self.has_children() {
            pseudo.set_children(self.get_pseudo_quads(dx, dy)?)?;
        }

        Ok(pseudo)
    }

    /// Paste `node` over the window at `(dx, dy)`, across whichever child boundaries it
    /// straddles.
    pub fn set_pseudo_child(&mut self, dx: Coord, dy: Coord, node: &Node) -> Result<(), NodeError> {
        let level = self.level();

        if level < LEAF_LEVEL + 1 {
            return Err(NodeError::TooShallow {
                level,
                min: LEAF_LEVEL + 1,
            });
        }

        if node.level() + 1 != level {
            return Err(NodeError::LevelMismatch {
                expected: level - 1,
                found: node.level(),
            });
        }

        let (r, c) = check_offset(dx, dy)?;

        self.make_mut();

        if level == LEAF_LEVEL + 1 {
            for y in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
                for x in -LEAF_HALF_SIZE..LEAF_HALF_SIZE {
                    self.set(dx + x, dy + y, node.get_raw(x, y))?;
                }
            }

            return Ok(());
        }

        let sources = node.children().unwrap_or_else(|| fresh_children(level - 2));

        let mut data = self.0.borrow_mut();
        let children = data
            .children
            .get_or_insert_with(|| fresh_children(level - 1));

        // Every node on the path to the window must be private to us before writing through it
        for child in children.iter_mut() {
            child.make_mut();
            child.subdivide();
        }

        let (mut added, mut removed) = (0, 0);

        for (k, src) in sources.iter().enumerate() {
            let (i, j) = grid_to_tree(r + k / 2, c + k % 2);

            let mut child = children[i].0.borrow_mut();
            let Some(grandchildren) = child.children.as_mut() else {
                unreachable!("children were subdivided above")
            };

            let quad = &mut grandchildren[j];
            let before = quad.population();

            // Sealed sources are shared as is, unsealed ones copied so later writes on either side
            // stay private
            *quad = if src.is_sealed() {
                src.clone()
            } else {
                src.deep_copy()
            };
            let after = quad.population();

            child.population = child.population + after - before;
            added += after;
            removed += before;
        }

        data.population = data.population + added - removed;

        Ok(())
    }

    /// Double the size of this node. The old content ends up at the pseudo-child `(-dx, -dy)` of
    /// the new node, so `grow(0, 0)` surrounds it with a dead border on every side.
    pub fn grow(&mut self, dx: Coord, dy: Coord) -> Result<(), NodeError> {
        let level = self.level() + 1;

        if level > MAX_LEVEL {
            return Err(NodeError::LevelTooLarge { level });
        }

        let mut grown = Node::new(level);
        grown.set_pseudo_child(-dx, -dy, self)?;

        *self = grown;

        Ok(())
    }

    /// Population of the centered pseudo-child, i.e. of the central half of each axis.
    pub fn center_population(&self) -> u64 {
        let level = self.level();

        if level <= LEAF_LEVEL {
            return self.population();
        }

        if level == LEAF_LEVEL + 1 {
            return (-LEAF_HALF_SIZE..LEAF_HALF_SIZE)
                .flat_map(|y| (-LEAF_HALF_SIZE..LEAF_HALF_SIZE).map(move |x| (x, y)))
                .map(|(x, y)| self.get(x, y) as u64)
                .sum();
        }

        if !self.has_children() {
            return 0;
        }

        self.get_pseudo_quads(0, 0)
            .map(|quads| quads.iter().map(Node::population).sum())
            .unwrap_or_default()
    }
}
