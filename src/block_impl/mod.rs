//! Blocks of a CI vector
//!
//! [`CiBlock`] / [`CiBlockMut`] borrow a block out of the contiguous buffer of
//! a local vector; [`DistBlock`] owns the alpha-range shard of a block held by
//! one rank.

mod block;
mod dist_block;

pub use block::{Block, CiBlock, CiBlockMut};
pub use dist_block::DistBlock;
