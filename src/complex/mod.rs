//! The bifiltered simplicial complex.
//!
//! [`tree`] holds the arena-backed simplex tree; [`node`] its node and
//! identifier types.

pub mod node;
pub mod tree;

pub use node::{NodeId, SimplexNode};
pub use tree::SimplexTree;
