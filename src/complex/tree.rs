//! The bifiltered simplex tree.
//!
//! Simplices are stored as root-to-leaf paths in a trie over vertex labels
//! (the usual simplex-tree layout): a node's vertex set is its own label
//! preceded by its ancestors' labels, and each node carries the antichain of
//! minimal grades at which the simplex enters the bifiltration. Children are
//! kept sorted by vertex label so lookups are binary searches along a path.
//!
//! Index assignment is an explicit pass, not a side effect of construction:
//! [`SimplexTree::update_global_indexes`] fixes the depth-first total order
//! used as a simplex identifier, and [`SimplexTree::update_dim_indexes`]
//! fixes the per-dimension grade order the boundary matrices are keyed on.

use crate::debug_invariants::DebugInvariants;
use crate::error::PersistenceError;
use crate::grade::{Grade, colex_cmp};
use crate::matrix::BigradedMatrix;

use super::node::{NodeId, SimplexNode};

/// An arena-backed simplex tree over a two-parameter grading grid.
pub struct SimplexTree {
    nodes: Vec<SimplexNode>,
    num_x: usize,
    num_y: usize,
    /// `dim_orders[d]` lists the dimension-`d` simplices in ascending
    /// (colex-least grade, global index) order once
    /// [`Self::update_dim_indexes`] has run.
    dim_orders: Vec<Vec<NodeId>>,
}

impl SimplexTree {
    /// Creates an empty tree over a `num_x × num_y` grading grid.
    pub fn new(num_x: usize, num_y: usize) -> Self {
        SimplexTree {
            nodes: vec![SimplexNode::root()],
            num_x,
            num_y,
            dim_orders: Vec::new(),
        }
    }

    /// Number of x-grades in the grid.
    #[inline]
    pub fn num_x(&self) -> usize {
        self.num_x
    }

    /// Number of y-grades in the grid.
    #[inline]
    pub fn num_y(&self) -> usize {
        self.num_y
    }

    /// Borrow a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &SimplexNode {
        &self.nodes[id.idx()]
    }

    /// Number of simplices (the root does not count).
    #[inline]
    pub fn simplex_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// The child of `parent` labelled `vertex`, if present.
    pub fn find_child(&self, parent: NodeId, vertex: u32) -> Option<NodeId> {
        let children = &self.nodes[parent.idx()].children;
        children
            .binary_search_by_key(&vertex, |&c| {
                self.nodes[c.idx()].vertex.unwrap_or(u32::MAX)
            })
            .ok()
            .map(|pos| children[pos])
    }

    /// Looks up the node for a full vertex list.
    pub fn find(&self, vertices: &[u32]) -> Option<NodeId> {
        let mut cur = NodeId::ROOT;
        for &v in vertices {
            cur = self.find_child(cur, v)?;
        }
        (cur != NodeId::ROOT).then_some(cur)
    }

    /// Inserts a simplex and, recursively, all of its faces, merging the
    /// given grades into every node touched.
    ///
    /// Merging keeps minimal grades only, so re-adding an existing simplex
    /// at a dominating grade is a no-op.
    ///
    /// # Errors
    /// [`PersistenceError::EmptySimplex`] or
    /// [`PersistenceError::UnsortedVertices`] when the vertex list is
    /// malformed.
    pub fn add_simplex(&mut self, vertices: &[u32], grades: &[Grade]) -> Result<(), PersistenceError> {
        if vertices.is_empty() {
            return Err(PersistenceError::EmptySimplex);
        }
        if !vertices.windows(2).all(|w| w[0] < w[1]) {
            return Err(PersistenceError::UnsortedVertices {
                vertices: vertices.to_vec(),
            });
        }
        self.add_closed(vertices, grades);
        self.debug_assert_invariants();
        Ok(())
    }

    fn add_closed(&mut self, vertices: &[u32], grades: &[Grade]) {
        let id = self.insert_path(vertices);
        for &g in grades {
            self.nodes[id.idx()].grades.insert(g);
        }
        if vertices.len() > 1 {
            let mut face = Vec::with_capacity(vertices.len() - 1);
            for skip in 0..vertices.len() {
                face.clear();
                face.extend(
                    vertices
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != skip)
                        .map(|(_, &v)| v),
                );
                let face_owned = face.clone();
                self.add_closed(&face_owned, grades);
            }
        }
    }

    /// Walks `vertices` from the root, creating nodes as needed.
    fn insert_path(&mut self, vertices: &[u32]) -> NodeId {
        let mut cur = NodeId::ROOT;
        for (i, &v) in vertices.iter().enumerate() {
            let pos = self.nodes[cur.idx()]
                .children
                .binary_search_by_key(&v, |&c| self.nodes[c.idx()].vertex.unwrap_or(u32::MAX));
            cur = match pos {
                Ok(p) => self.nodes[cur.idx()].children[p],
                Err(p) => {
                    let id = NodeId(self.nodes.len() as u32);
                    self.nodes.push(SimplexNode::child_of(cur, v, i as u32 + 1));
                    self.nodes[cur.idx()].children.insert(p, id);
                    id
                }
            };
        }
        cur
    }

    /// Builds a Vietoris–Rips bifiltration.
    ///
    /// `times[i]` is the discretized birth grade of point `i` along the
    /// x-axis; `distances` is the condensed lower-triangle distance array
    /// (entry for the pair `i < j` at index `j·(j−1)/2 + i`), discretized
    /// along the y-axis. A vertex enters at `(times[i], 0)`; a higher
    /// simplex at the maximum birth time and maximum pairwise distance of
    /// its vertices. Simplices are built up to dimension `max_dim`.
    pub fn build_rips(
        times: &[u32],
        distances: &[u32],
        max_dim: usize,
        num_x: usize,
        num_y: usize,
    ) -> Result<Self, PersistenceError> {
        let n = times.len();
        if distances.len() != n * n.saturating_sub(1) / 2 {
            return Err(PersistenceError::InvariantViolation(format!(
                "condensed distance array has length {}, expected {}",
                distances.len(),
                n * n.saturating_sub(1) / 2
            )));
        }
        let dist = |i: usize, j: usize| -> u32 {
            debug_assert!(i < j);
            distances[j * (j - 1) / 2 + i]
        };

        let mut tree = SimplexTree::new(num_x, num_y);
        for (i, &t) in times.iter().enumerate() {
            let id = tree.insert_path(&[i as u32]);
            tree.nodes[id.idx()].grades.insert(Grade::new(t, 0));
        }

        // Depth-first expansion by appending larger-labelled vertices, so
        // every face of an emitted simplex is emitted by a shorter prefix.
        let mut stack: Vec<(Vec<u32>, u32, u32)> = (0..n)
            .map(|i| (vec![i as u32], times[i], 0))
            .collect();
        while let Some((simplex, time, d)) = stack.pop() {
            if simplex.len() > max_dim {
                continue;
            }
            let last = *simplex.last().unwrap_or(&0) as usize;
            for w in (last + 1)..n {
                let mut dw = d;
                for &v in &simplex {
                    dw = dw.max(dist(v as usize, w));
                }
                let tw = time.max(times[w]);
                let mut next = simplex.clone();
                next.push(w as u32);
                let id = tree.insert_path(&next);
                tree.nodes[id.idx()].grades.insert(Grade::new(tw, dw));
                stack.push((next, tw, dw));
            }
        }

        log::debug!(
            "rips bifiltration: {} simplices over a {}x{} grid",
            tree.simplex_count(),
            num_x,
            num_y
        );
        tree.debug_assert_invariants();
        Ok(tree)
    }

    /// Assigns the depth-first global index to every simplex.
    ///
    /// Children are visited in vertex order, so the numbering is
    /// deterministic for a given insertion set.
    pub fn update_global_indexes(&mut self) {
        let mut next = 0u32;
        let mut stack: Vec<NodeId> = Vec::new();
        stack.extend(self.nodes[NodeId::ROOT.idx()].children.iter().rev());
        while let Some(id) = stack.pop() {
            self.nodes[id.idx()].global_index = Some(next);
            next += 1;
            let children = self.nodes[id.idx()].children.clone();
            stack.extend(children.iter().rev());
        }
        log::debug!("assigned {next} global indexes");
    }

    /// Recomputes, for each dimension up to `max_dim`, the total order over
    /// that dimension's simplices: ascending by colex-least grade, ties by
    /// global index.
    ///
    /// # Errors
    /// [`PersistenceError::MissingIndex`] if global indexes have not been
    /// assigned, or [`PersistenceError::InvariantViolation`] if a simplex
    /// has no grade.
    pub fn update_dim_indexes(&mut self, max_dim: usize) -> Result<(), PersistenceError> {
        let mut orders: Vec<Vec<NodeId>> = vec![Vec::new(); max_dim + 1];
        for (i, node) in self.nodes.iter().enumerate() {
            let Some(d) = node.dim() else { continue };
            if d > max_dim {
                continue;
            }
            if node.global_index.is_none() {
                return Err(PersistenceError::MissingIndex {
                    simplex: self.vertices_of(NodeId(i as u32)),
                    kind: "global",
                });
            }
            if node.grades.is_empty() {
                return Err(PersistenceError::InvariantViolation(format!(
                    "simplex {:?} has no appearance grade",
                    self.vertices_of(NodeId(i as u32))
                )));
            }
            orders[d].push(NodeId(i as u32));
        }
        for order in &mut orders {
            order.sort_by(|&a, &b| {
                let (na, nb) = (&self.nodes[a.idx()], &self.nodes[b.idx()]);
                // min_colex is Some for every node collected above
                let (ga, gb) = (na.grades.min_colex(), nb.grades.min_colex());
                colex_cmp(&ga.unwrap_or(Grade::new(0, 0)), &gb.unwrap_or(Grade::new(0, 0)))
                    .then(na.global_index.cmp(&nb.global_index))
            });
            for (i, &id) in order.iter().enumerate() {
                self.nodes[id.idx()].dim_index = Some(i as u32);
            }
        }
        self.dim_orders = orders;
        Ok(())
    }

    /// The dimension-`dim` simplices in dimension-index order.
    pub fn ordered_simplices(&self, dim: usize) -> &[NodeId] {
        self.dim_orders.get(dim).map_or(&[], Vec::as_slice)
    }

    /// Reconstructs a node's vertex list from its root path.
    pub fn vertices_of(&self, id: NodeId) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = &self.nodes[c.idx()];
            if let Some(v) = node.vertex {
                out.push(v);
            }
            cur = node.parent;
        }
        out.reverse();
        out
    }

    /// Builds the bigraded boundary matrix of dimension `dim`.
    ///
    /// Columns are the dimension-`dim` simplices in dimension-index order,
    /// each graded at its colex-least appearance grade; rows are the
    /// dimension-indexes of the `dim − 1` simplices. For `dim == 0` the
    /// matrix has no rows.
    ///
    /// # Errors
    /// [`PersistenceError::FaceNotFound`] if a codimension-1 face is missing
    /// from the tree: the tree inserts every face alongside its simplex, so
    /// this is a structural inconsistency, not an input problem.
    pub fn boundary_matrix(&self, dim: usize) -> Result<BigradedMatrix, PersistenceError> {
        let cols_of = self.ordered_simplices(dim);
        let num_rows = if dim == 0 {
            0
        } else {
            self.ordered_simplices(dim - 1).len()
        };

        let mut columns = Vec::with_capacity(cols_of.len());
        for &id in cols_of {
            let vertices = self.vertices_of(id);
            let mut rows: Vec<u32> = Vec::with_capacity(vertices.len());
            if dim > 0 {
                let mut face = Vec::with_capacity(vertices.len() - 1);
                for skip in 0..vertices.len() {
                    face.clear();
                    face.extend(
                        vertices
                            .iter()
                            .enumerate()
                            .filter(|&(i, _)| i != skip)
                            .map(|(_, &v)| v),
                    );
                    let fid = self.find(&face).ok_or_else(|| PersistenceError::FaceNotFound {
                        face: face.clone(),
                        dim,
                    })?;
                    let row = self.nodes[fid.idx()].dim_index.ok_or_else(|| {
                        PersistenceError::MissingIndex {
                            simplex: face.clone(),
                            kind: "dimension",
                        }
                    })?;
                    rows.push(row);
                }
                rows.sort_unstable();
            }
            let grade = self.nodes[id.idx()].grades.min_colex().ok_or_else(|| {
                PersistenceError::InvariantViolation(format!(
                    "simplex {vertices:?} has no appearance grade"
                ))
            })?;
            columns.push((rows, grade));
        }
        BigradedMatrix::from_columns(num_rows, columns, self.num_x, self.num_y)
    }
}

impl DebugInvariants for SimplexTree {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "SimplexTree");
    }

    fn validate_invariants(&self) -> Result<(), PersistenceError> {
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i as u32);
            for w in node.children.windows(2) {
                let (a, b) = (&self.nodes[w[0].idx()], &self.nodes[w[1].idx()]);
                if a.vertex >= b.vertex {
                    return Err(PersistenceError::InvariantViolation(format!(
                        "children of {id} not sorted by vertex"
                    )));
                }
            }
            for &c in &node.children {
                if self.nodes[c.idx()].parent != Some(id) {
                    return Err(PersistenceError::InvariantViolation(format!(
                        "child {c} of {id} has a stale parent link"
                    )));
                }
            }
            if id != NodeId::ROOT && !node.grades.is_antichain() {
                return Err(PersistenceError::InvariantViolation(format!(
                    "grades of {id} are not a sorted antichain"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(x: u32, y: u32) -> Grade {
        Grade::new(x, y)
    }

    #[test]
    fn add_simplex_inserts_all_faces() {
        let mut tree = SimplexTree::new(2, 2);
        tree.add_simplex(&[0, 1, 2], &[g(1, 1)]).unwrap();
        // 3 vertices + 3 edges + 1 triangle
        assert_eq!(tree.simplex_count(), 7);
        for face in [&[0u32][..], &[1], &[2], &[0, 1], &[0, 2], &[1, 2], &[0, 1, 2]] {
            let id = tree.find(face).unwrap();
            assert_eq!(tree.node(id).grades.min_colex(), Some(g(1, 1)));
        }
    }

    #[test]
    fn readding_at_dominating_grade_is_a_noop() {
        let mut tree = SimplexTree::new(3, 3);
        tree.add_simplex(&[0, 1], &[g(0, 0)]).unwrap();
        tree.add_simplex(&[0, 1], &[g(2, 2)]).unwrap();
        let id = tree.find(&[0, 1]).unwrap();
        assert_eq!(tree.node(id).grades.len(), 1);
        assert_eq!(tree.node(id).grades.min_colex(), Some(g(0, 0)));
    }

    #[test]
    fn unsorted_vertices_are_rejected() {
        let mut tree = SimplexTree::new(1, 1);
        assert!(matches!(
            tree.add_simplex(&[1, 0], &[g(0, 0)]),
            Err(PersistenceError::UnsortedVertices { .. })
        ));
        assert!(matches!(
            tree.add_simplex(&[], &[g(0, 0)]),
            Err(PersistenceError::EmptySimplex)
        ));
    }

    #[test]
    fn lookup_after_insert_is_stable() {
        let mut tree = SimplexTree::new(1, 1);
        tree.add_simplex(&[3], &[g(0, 0)]).unwrap();
        tree.add_simplex(&[1], &[g(0, 0)]).unwrap();
        tree.add_simplex(&[2], &[g(0, 0)]).unwrap();
        let first = tree.find(&[2]).unwrap();
        tree.add_simplex(&[0], &[g(0, 0)]).unwrap();
        assert_eq!(tree.find(&[2]), Some(first));
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn dim_indexes_follow_colex_grade_order() {
        let mut tree = SimplexTree::new(3, 3);
        tree.add_simplex(&[0], &[g(2, 0)]).unwrap();
        tree.add_simplex(&[1], &[g(0, 1)]).unwrap();
        tree.add_simplex(&[2], &[g(1, 0)]).unwrap();
        tree.update_global_indexes();
        tree.update_dim_indexes(0).unwrap();
        let order: Vec<_> = tree
            .ordered_simplices(0)
            .iter()
            .map(|&id| tree.vertices_of(id))
            .collect();
        // colex: (1,0) < (2,0) < (0,1)
        assert_eq!(order, vec![vec![2], vec![0], vec![1]]);
    }

    #[test]
    fn triangle_boundary_matrix() {
        let mut tree = SimplexTree::new(1, 1);
        tree.add_simplex(&[0, 1, 2], &[g(0, 0)]).unwrap();
        tree.update_global_indexes();
        tree.update_dim_indexes(2).unwrap();

        let b1 = tree.boundary_matrix(1).unwrap();
        assert_eq!(b1.mat.width(), 3);
        assert_eq!(b1.mat.height(), 3);
        for j in 0..3 {
            assert_eq!(b1.mat.column(j).len(), 2);
        }
        let b2 = tree.boundary_matrix(2).unwrap();
        assert_eq!(b2.mat.width(), 1);
        assert_eq!(b2.mat.column(0), &[0, 1, 2]);

        let b0 = tree.boundary_matrix(0).unwrap();
        assert_eq!(b0.mat.height(), 0);
        assert_eq!(b0.mat.width(), 3);
    }

    #[test]
    fn rips_grades_take_pairwise_maxima() {
        // Two points born at times 0 and 1, at distance grade 2.
        let tree = SimplexTree::build_rips(&[0, 1], &[2], 1, 2, 3).unwrap();
        let e = tree.find(&[0, 1]).unwrap();
        assert_eq!(tree.node(e).grades.min_colex(), Some(g(1, 2)));
        let v0 = tree.find(&[0]).unwrap();
        assert_eq!(tree.node(v0).grades.min_colex(), Some(g(0, 0)));
    }

    #[test]
    fn rips_respects_max_dim() {
        let times = [0, 0, 0];
        let dists = [1, 1, 1];
        let tree = SimplexTree::build_rips(&times, &dists, 1, 1, 2).unwrap();
        assert!(tree.find(&[0, 1, 2]).is_none());
        assert!(tree.find(&[0, 2]).is_some());
        assert_eq!(tree.simplex_count(), 6);
    }
}
