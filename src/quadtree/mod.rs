use thiserror::Error;

pub use crate::quadtree::hash::HashSeed;
pub use crate::quadtree::node::Node;

mod hash;
mod node;
mod pseudo;

/// Signed coordinate relative to the center of a node.
pub type Coord = i64;

/// Level of the smallest node, a 2x2 block of raw cells.
pub const LEAF_LEVEL: u32 = 1;

/// Half the side length of a leaf.
pub const LEAF_HALF_SIZE: Coord = 1 << (LEAF_LEVEL - 1);

/// Side length of a leaf.
pub const LEAF_SIZE: Coord = LEAF_HALF_SIZE << 1;

/// Largest level we allow, so that `2^(level - 1)` always fits in a [`Coord`].
pub const MAX_LEVEL: u32 = 62;

/// One of the four children of an internal node.
///
/// The discriminant is the index of the child slot. Negative `y` is north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    Nw = 0,
    Ne = 1,
    Sw = 2,
    Se = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Nw, Quadrant::Ne, Quadrant::Sw, Quadrant::Se];

    /// The quadrant that contains `(x, y)`, relative to the center.
    pub fn of(x: Coord, y: Coord) -> Self {
        match (x < 0, y < 0) {
            (true, true) => Quadrant::Nw,
            (false, true) => Quadrant::Ne,
            (true, false) => Quadrant::Sw,
            (false, false) => Quadrant::Se,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("Cannot combine children of levels {found:?} into a node of level {level}")]
    InvalidCombination { level: u32, found: [u32; 4] },

    #[error("A level {level} node has no children")]
    LeafHasNoChildren { level: u32 },

    #[error("Expected a node of level {expected}, got level {found}")]
    LevelMismatch { expected: u32, found: u32 },

    #[error("A level {level} node is too shallow, at least level {min} is required")]
    TooShallow { level: u32, min: u32 },

    #[error("Pseudo-child offsets live in [-1, 1], got ({dx}, {dy})")]
    InvalidOffset { dx: Coord, dy: Coord },

    #[error("({x}, {y}) lies outside a level {level} node")]
    OutOfBounds { x: Coord, y: Coord, level: u32 },

    #[error("Level {level} is larger than the maximum of {MAX_LEVEL}")]
    LevelTooLarge { level: u32 },
}

/// Half the side length of a node of level `level`.
pub fn half_size(level: u32) -> Coord {
    1 << (level - 1)
}

/// Whether `(x, y)` lies within a node of level `level`, i.e. in `[-2^(level-1), 2^(level-1))`.
pub fn in_bounds(level: u32, x: Coord, y: Coord) -> bool {
    let h = half_size(level);

    (-h..h).contains(&x) && (-h..h).contains(&y)
}

/// Map coordinates relative to a node of level `level` into the frame of the child that
/// contains them.
pub fn to_child_coords(level: u32, x: Coord, y: Coord) -> (Coord, Coord) {
    debug_assert!(level > LEAF_LEVEL);

    let quarter = half_size(level - 1);
    let half = quarter << 1;

    let f = |c: Coord| (c + half).rem_euclid(half) - quarter;

    (f(x), f(y))
}

#[cfg(test)]
mod test {
    use super::Quadrant;
    use super::in_bounds;
    use super::to_child_coords;

    #[test]
    fn quadrant_of_signs() {
        assert_eq!(Quadrant::of(-1, -1), Quadrant::Nw);
        assert_eq!(Quadrant::of(0, -1), Quadrant::Ne);
        assert_eq!(Quadrant::of(-1, 0), Quadrant::Sw);
        assert_eq!(Quadrant::of(0, 0), Quadrant::Se);
    }

    #[test]
    fn child_coords_are_recentered() {
        // level 3 covers [-4, 4), its children cover [-2, 2)
        assert_eq!(to_child_coords(3, -4, -4), (-2, -2));
        assert_eq!(to_child_coords(3, -1, -1), (1, 1));
        assert_eq!(to_child_coords(3, 0, 0), (-2, -2));
        assert_eq!(to_child_coords(3, 3, -3), (1, -1));

        // level 2 covers [-2, 2), its leaves cover [-1, 1)
        assert_eq!(to_child_coords(2, -2, 1), (-1, 0));
        assert_eq!(to_child_coords(2, 1, -1), (0, 0));
    }

    #[test]
    fn bounds() {
        assert!(in_bounds(1, -1, 0));
        assert!(!in_bounds(1, 1, 0));
        assert!(in_bounds(4, -8, 7));
        assert!(!in_bounds(4, -9, 0));
        assert!(!in_bounds(4, 0, 8));
    }
}
