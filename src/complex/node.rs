//! Simplex-tree nodes and their arena identifiers.

use crate::grade::Multigrade;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of one simplex-tree node.
///
/// Index 0 is always the (vertex-less) root; every other id names one
/// simplex. Ids are never reused: nodes live until the whole tree is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node.
    pub const ROOT: NodeId = NodeId(0);

    /// The arena slot this id refers to.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One node of the simplex tree.
///
/// A node's full vertex set is its own label prefixed by its ancestors'
/// labels; only the last vertex is stored. The `parent` field is a plain
/// back-reference with no ownership implied; teardown is bulk arena drop.
#[derive(Debug, Clone)]
pub struct SimplexNode {
    /// Last vertex of the simplex; `None` only for the root.
    pub vertex: Option<u32>,
    /// Parent node, `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children, kept sorted by vertex label for binary search.
    pub children: Vec<NodeId>,
    /// Minimal appearance grades.
    pub grades: Multigrade,
    /// Number of vertices on the path from the root (0 for the root), so
    /// the simplex dimension is `depth - 1`.
    pub depth: u32,
    /// Position in the depth-first total order over all simplices.
    pub global_index: Option<u32>,
    /// Position in the grade-sorted order within this dimension.
    pub dim_index: Option<u32>,
}

impl SimplexNode {
    pub(crate) fn root() -> Self {
        SimplexNode {
            vertex: None,
            parent: None,
            children: Vec::new(),
            grades: Multigrade::new(),
            depth: 0,
            global_index: None,
            dim_index: None,
        }
    }

    pub(crate) fn child_of(parent: NodeId, vertex: u32, depth: u32) -> Self {
        SimplexNode {
            vertex: Some(vertex),
            parent: Some(parent),
            children: Vec::new(),
            grades: Multigrade::new(),
            depth,
            global_index: None,
            dim_index: None,
        }
    }

    /// Simplex dimension; `None` for the root.
    #[inline]
    pub fn dim(&self) -> Option<usize> {
        (self.depth > 0).then(|| self.depth as usize - 1)
    }
}

static_assertions::assert_eq_size!(NodeId, u32);
static_assertions::assert_impl_all!(NodeId: Copy, Send, Sync);
