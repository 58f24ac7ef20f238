use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::quadtree::Coord;
use crate::quadtree::LEAF_HALF_SIZE;
use crate::quadtree::LEAF_LEVEL;
use crate::quadtree::LEAF_SIZE;
use crate::quadtree::MAX_LEVEL;
use crate::quadtree::NodeError;
use crate::quadtree::Quadrant;
use crate::quadtree::in_bounds;
use crate::quadtree::to_child_coords;

#[derive(Clone)]
pub(crate) struct NodeData {
    pub(crate) level: u32,

    /// Raw cells of a leaf, row major. Unused above [`LEAF_LEVEL`].
    pub(crate) cells: [i8; 4],

    /// `None` on leaves and on internal nodes that were never subdivided (all dead).
    pub(crate) children: Option<[Node; 4]>,

    /// Number of cells with a positive value in the subtree.
    pub(crate) population: u64,

    /// Memoized content hash. A node with a hash is sealed and never changes in place again.
    pub(crate) hash: Option<u64>,
}

/// A square patch of the grid, `2^level` cells on a side, centered on its own origin.
///
/// `Node` is a handle: cloning it creates an alias to the same patch. Every operation taking
/// `&mut self` copies the patch first if it is sealed, and then swaps the copy into the handle,
/// so other aliases of a sealed patch never observe the change.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<NodeData>>);

fn positive(value: i8) -> i64 {
    (value > 0) as i64
}

fn leaf_index(x: Coord, y: Coord) -> usize {
    ((y + LEAF_HALF_SIZE) * LEAF_SIZE + (x + LEAF_HALF_SIZE)) as usize
}

/// Four fresh, unsubdivided, dead nodes of level `level`.
pub(crate) fn fresh_children(level: u32) -> [Node; 4] {
    std::array::from_fn(|_| Node::new(level))
}

impl Node {
    /// A fresh, dead, unsealed node of level `level`.
    pub fn new(level: u32) -> Self {
        debug_assert!(level >= LEAF_LEVEL, "level 0 nodes do not exist");

        Node(Rc::new(RefCell::new(NodeData {
            level,
            cells: [0; 4],
            children: None,
            population: 0,
            hash: None,
        })))
    }

    /// Build the node of level `level + 1` whose children are the given nodes, all of level
    /// `level`.
    pub fn with_children(nw: Node, ne: Node, sw: Node, se: Node) -> Result<Self, NodeError> {
        let level = nw.level() + 1;
        let found = [nw.level(), ne.level(), sw.level(), se.level()];

        if found.iter().any(|&l| l + 1 != level) {
            return Err(NodeError::InvalidCombination { level, found });
        }

        if level > MAX_LEVEL {
            return Err(NodeError::LevelTooLarge { level });
        }

        let mut node = Node::new(level);
        node.set_children([nw, ne, sw, se])?;

        Ok(node)
    }

    pub fn level(&self) -> u32 {
        self.0.borrow().level
    }

    pub fn population(&self) -> u64 {
        self.0.borrow().population
    }

    pub fn is_leaf(&self) -> bool {
        self.level() == LEAF_LEVEL
    }

    /// Whether the content hash was computed, freezing this node's content.
    pub fn is_sealed(&self) -> bool {
        self.0.borrow().hash.is_some()
    }

    /// Whether both handles point at the very same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The children in NW, NE, SW, SE order, or `None` when this is a leaf or was never
    /// subdivided.
    pub fn children(&self) -> Option<[Node; 4]> {
        self.0.borrow().children.clone()
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<Node> {
        self.0
            .borrow()
            .children
            .as_ref()
            .map(|c| c[quadrant.index()].clone())
    }

    pub(crate) fn has_children(&self) -> bool {
        self.0.borrow().children.is_some()
    }

    /// Raw cell values of a leaf, row major from the north west corner.
    pub fn leaf_cells(&self) -> Option<[i8; 4]> {
        let data = self.0.borrow();

        (data.level == LEAF_LEVEL).then_some(data.cells)
    }

    /// Liveness of the cell at `(x, y)`: `1` when alive, `0` otherwise. Cells outside the node
    /// are dead.
    pub fn get(&self, x: Coord, y: Coord) -> u8 {
        (self.get_raw(x, y) > 0) as u8
    }

    /// The value stored at `(x, y)`, `0` outside the node or in never subdivided regions.
    pub(crate) fn get_raw(&self, x: Coord, y: Coord) -> i8 {
        if !in_bounds(self.level(), x, y) {
            return 0;
        }

        self.get_unchecked(x, y)
    }

    fn get_unchecked(&self, x: Coord, y: Coord) -> i8 {
        let data = self.0.borrow();

        if data.level == LEAF_LEVEL {
            return data.cells[leaf_index(x, y)];
        }

        let Some(children) = &data.children else {
            return 0;
        };

        let (cx, cy) = to_child_coords(data.level, x, y);
        children[Quadrant::of(x, y).index()].get_unchecked(cx, cy)
    }

    /// Write `value` at `(x, y)`, returning the change in population. Only the sign of `value`
    /// matters for liveness.
    pub fn set(&mut self, x: Coord, y: Coord, value: i8) -> Result<i64, NodeError> {
        let level = self.level();

        if !in_bounds(level, x, y) {
            return Err(NodeError::OutOfBounds { x, y, level });
        }

        Ok(self.set_unchecked(x, y, value))
    }

    fn set_unchecked(&mut self, x: Coord, y: Coord, value: i8) -> i64 {
        self.make_mut();

        let mut data = self.0.borrow_mut();

        if data.level == LEAF_LEVEL {
            let i = leaf_index(x, y);
            let d = positive(value) - positive(data.cells[i]);

            data.cells[i] = value;
            data.population = data.population.wrapping_add_signed(d);

            return d;
        }

        let level = data.level;
        let (cx, cy) = to_child_coords(level, x, y);

        let children = data
            .children
            .get_or_insert_with(|| fresh_children(level - 1));
        let d = children[Quadrant::of(x, y).index()].set_unchecked(cx, cy, value);

        debug_assert!(data.population.checked_add_signed(d).is_some());
        data.population = data.population.wrapping_add_signed(d);

        d
    }

    /// Install `children` in place of the current ones. Fails unless this is an internal node
    /// and every child is exactly one level below it.
    pub fn set_children(&mut self, children: [Node; 4]) -> Result<(), NodeError> {
        let level = self.level();

        if level <= LEAF_LEVEL {
            return Err(NodeError::LeafHasNoChildren { level });
        }

        let found = children.each_ref().map(Node::level);
        if found.iter().any(|&l| l + 1 != level) {
            return Err(NodeError::InvalidCombination { level, found });
        }

        self.make_mut();

        let mut data = self.0.borrow_mut();
        data.population = children.iter().map(Node::population).sum();
        data.children = Some(children);

        Ok(())
    }

    /// Allocate four dead children if there are none yet. Never called on sealed nodes.
    pub(crate) fn subdivide(&self) {
        let mut data = self.0.borrow_mut();

        debug_assert!(data.hash.is_none(), "subdividing a sealed node");

        if data.level > LEAF_LEVEL && data.children.is_none() {
            data.children = Some(fresh_children(data.level - 1));
        }
    }

    /// Recursively duplicate this subtree. The copy is unsealed throughout and its population
    /// is recomputed from the cells.
    pub fn deep_copy(&self) -> Node {
        let data = self.0.borrow();

        let (children, population) = if data.level == LEAF_LEVEL {
            let population = data.cells.iter().filter(|&&c| c > 0).count() as u64;
            (None, population)
        } else if let Some(children) = &data.children {
            let children = children.each_ref().map(Node::deep_copy);
            let population: u64 = children.iter().map(Node::population).sum();

            // dead subtrees are not worth keeping around
            if population == 0 {
                (None, 0)
            } else {
                (Some(children), population)
            }
        } else {
            (None, 0)
        };

        Node(Rc::new(RefCell::new(NodeData {
            level: data.level,
            cells: data.cells,
            children,
            population,
            hash: None,
        })))
    }

    /// Copy-on-write: if sealed, point this handle at an unsealed copy. The copy shares the
    /// children, which are sealed too, so only the path actually written to gets copied.
    pub(crate) fn make_mut(&mut self) {
        if !self.is_sealed() {
            return;
        }

        let mut data = self.0.borrow().clone();
        data.hash = None;

        *self = Node(Rc::new(RefCell::new(data)));
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.0.borrow();

        f.debug_struct("Node")
            .field("level", &data.level)
            .field("population", &data.population)
            .field("sealed", &data.hash.is_some())
            .field("subdivided", &data.children.is_some())
            .finish()
    }
}
