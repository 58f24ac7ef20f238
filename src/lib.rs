pub mod hashlife;
pub mod parse_rle;
pub mod quadtree;
pub mod rule_set;

mod parse_util;
