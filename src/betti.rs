//! Multigraded Betti support points.
//!
//! The support points driving anchor detection are the grades where the
//! zeroth or first multigraded Betti number of the homology module is
//! nonzero. They are read off a minimal presentation of the module:
//!
//! 1. reduce the high boundary map `∂_{d+1}` to a minimal generating set of
//!    its column span
//!    ([`BigradedMatrix::minimal_generators`](crate::matrix::BigradedMatrix::minimal_generators));
//! 2. compute the kernel of the low boundary map `∂_d`
//!    ([`BigradedMatrix::kernel`](crate::matrix::BigradedMatrix::kernel));
//! 3. rewrite each surviving high column in kernel coordinates; every
//!    boundary is a cycle, so each column reduces to zero against the
//!    kernel basis and the combination used becomes a presentation column;
//! 4. minimize: scanning relations in colex grade order, cancel any
//!    relation whose pivot generator carries the same bigrade, folding the
//!    cancelled relation into later columns that touch its pivot.
//!
//! Surviving generator grades are ξ₀, surviving relation grades are ξ₁.

use crate::complex::SimplexTree;
use crate::error::PersistenceError;
use crate::grade::{Grade, lex_cmp};
use crate::matrix::sparse::{SparseBinaryMatrix, xor_merge};
use serde::{Deserialize, Serialize};

/// A grade with nonzero multigraded Betti numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportPoint {
    /// x-coordinate in the discrete grading grid.
    pub x: u32,
    /// y-coordinate in the discrete grading grid.
    pub y: u32,
    /// Multiplicity of ξ₀ (module generators) at this grade.
    pub betti0: u32,
    /// Multiplicity of ξ₁ (module relations) at this grade.
    pub betti1: u32,
}

impl SupportPoint {
    /// The grade this point sits at.
    #[inline]
    pub fn grade(&self) -> Grade {
        Grade::new(self.x, self.y)
    }
}

/// Computes the ξ₀/ξ₁ support points of `H_{hom_dim}` for a tree whose
/// index passes have already run.
///
/// The returned points are sorted lexicographically (x, then y), one entry
/// per distinct grade, ready for the support grid.
///
/// # Errors
/// Propagates structural errors from boundary-matrix construction, and
/// [`PersistenceError::NotACycle`] if a boundary column fails to reduce to
/// zero against the kernel basis (which would mean `∂_d ∘ ∂_{d+1} ≠ 0`, a
/// structural impossibility for a correctly built tree).
pub fn compute_support_points(
    tree: &SimplexTree,
    hom_dim: usize,
) -> Result<Vec<SupportPoint>, PersistenceError> {
    let low = tree.boundary_matrix(hom_dim)?;
    let high = tree.boundary_matrix(hom_dim + 1)?;

    let high_min = high.minimal_generators()?;
    let ker = low.kernel()?;
    let ker_grades = ker.column_grades();
    let num_gens = ker.mat.width();

    // Kernel columns are upper triangular over the low matrix's column
    // space: column k's maximum entry is unique to it, so it serves as the
    // pivot for rewriting cycles in kernel coordinates.
    let mut ker_lows: Vec<Option<usize>> = vec![None; ker.mat.height()];
    for k in 0..num_gens {
        if let Some(l) = ker.mat.low(k) {
            ker_lows[l as usize] = Some(k);
        }
    }

    // Presentation: the minimal high generators in kernel coordinates,
    // assembled per bigrade cell in colex order.
    let mut pres = SparseBinaryMatrix::new(num_gens, 0);
    let mut pres_grades: Vec<Grade> = Vec::new();
    for y in 0..high_min.ind.height() {
        for x in 0..high_min.ind.width() {
            for j in high_min.ind.start(y, x)..high_min.ind.end(y, x) {
                let mut working: Vec<u32> = high_min.mat.column(j).to_vec();
                let mut coords: Vec<u32> = Vec::new();
                while let Some(&l) = working.last() {
                    let k =
                        ker_lows[l as usize].ok_or(PersistenceError::NotACycle { index: j })?;
                    coords.push(k as u32);
                    working = xor_merge(&working, ker.mat.column(k));
                }
                coords.sort_unstable();
                pres.push_column(coords)?;
                pres_grades.push(Grade::new(x as u32, y as u32));
            }
        }
    }

    // Minimize: relations arrive in colex grade order; a relation whose
    // pivot generator carries the same bigrade cancels against it.
    let mut row_removed = vec![false; num_gens];
    let mut col_removed = vec![false; pres.width()];
    for j in 0..pres.width() {
        let Some(l) = pres.low(j) else {
            col_removed[j] = true; // trivial relation
            continue;
        };
        if ker_grades[l as usize] == pres_grades[j] {
            row_removed[l as usize] = true;
            col_removed[j] = true;
            for j2 in (j + 1)..pres.width() {
                if pres.entry(l, j2) {
                    pres.add_column(j, j2)?;
                }
            }
        }
    }

    let mut points: Vec<(Grade, u32, u32)> = Vec::new();
    let bump = |g: Grade, xi0: u32, xi1: u32, points: &mut Vec<(Grade, u32, u32)>| {
        match points.iter_mut().find(|(pg, _, _)| *pg == g) {
            Some((_, a, b)) => {
                *a += xi0;
                *b += xi1;
            }
            None => points.push((g, xi0, xi1)),
        }
    };
    for (k, &removed) in row_removed.iter().enumerate() {
        if !removed {
            bump(ker_grades[k], 1, 0, &mut points);
        }
    }
    for (j, &removed) in col_removed.iter().enumerate() {
        if !removed {
            bump(pres_grades[j], 0, 1, &mut points);
        }
    }
    points.sort_by(|a, b| lex_cmp(&a.0, &b.0));

    log::debug!(
        "dimension {hom_dim}: {} support points ({} generators, {} relations kept)",
        points.len(),
        row_removed.iter().filter(|r| !**r).count(),
        col_removed.iter().filter(|r| !**r).count()
    );
    Ok(points
        .into_iter()
        .map(|(g, betti0, betti1)| SupportPoint {
            x: g.x,
            y: g.y,
            betti0,
            betti1,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Grade;

    fn g(x: u32, y: u32) -> Grade {
        Grade::new(x, y)
    }

    fn rips_4pts() -> SimplexTree {
        // Two early points (time 0) and two late ones (time 1); distances
        // split into two nonzero grades so edges appear at distinct bigrades.
        let times = [0, 0, 1, 1];
        // condensed pairs (0,1) (0,2) (1,2) (0,3) (1,3) (2,3)
        let dists = [1, 2, 2, 2, 2, 1];
        let mut tree = SimplexTree::build_rips(&times, &dists, 1, 2, 3).unwrap();
        tree.update_global_indexes();
        tree.update_dim_indexes(2).unwrap();
        tree
    }

    #[test]
    fn h0_of_four_points_has_vertex_generators_and_edge_relations() {
        let tree = rips_4pts();
        let pts = compute_support_points(&tree, 0).unwrap();
        let find = |x, y| pts.iter().find(|p| p.grade() == g(x, y));

        // All four vertices are generators (no edge shares a vertex grade).
        assert_eq!(find(0, 0).map(|p| p.betti0), Some(2));
        assert_eq!(find(1, 0).map(|p| p.betti0), Some(2));
        // One minimal relation per merge: the two near edges and one far one.
        assert_eq!(find(0, 1).map(|p| p.betti1), Some(1));
        assert_eq!(find(1, 1).map(|p| p.betti1), Some(1));
        assert_eq!(find(1, 2).map(|p| p.betti1), Some(1));
        assert_eq!(pts.len(), 5);
        assert!(
            pts.windows(2)
                .all(|w| lex_cmp(&w[0].grade(), &w[1].grade()) == std::cmp::Ordering::Less)
        );
    }

    #[test]
    fn single_component_has_one_generator() {
        let times = [0, 0];
        let dists = [1];
        let mut tree = SimplexTree::build_rips(&times, &dists, 1, 1, 2).unwrap();
        tree.update_global_indexes();
        tree.update_dim_indexes(1).unwrap();
        let pts = compute_support_points(&tree, 0).unwrap();
        let gen_total: u32 = pts.iter().map(|p| p.betti0).sum();
        assert_eq!(gen_total, 2);
        // the two vertices at (0,0) merge via the edge at (0,1)
        assert!(pts.iter().any(|p| p.x == 0 && p.y == 1 && p.betti1 == 1));
    }
}
