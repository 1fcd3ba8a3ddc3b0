//! The end-to-end batch pipeline and its line-query surface.
//!
//! [`AugmentedArrangement`] runs every stage in order: index the simplex
//! tree, compute the Betti support points, build the support grid, assemble
//! the anchor-line arrangement, and propagate a barcode template into every
//! face. Afterwards [`AugmentedArrangement::barcode_for_line`] answers
//! queries for any line of nonnegative slope in constant-ish time (one point
//! location plus a reference return), and
//! [`AugmentedArrangement::barcode_values`] projects the stored template
//! onto the query line to recover numeric endpoints.

use itertools::Itertools;
use serde::Serialize;

use crate::arrangement::{Arrangement, build_arrangement};
use crate::betti::{SupportPoint, compute_support_points};
use crate::complex::SimplexTree;
use crate::error::PersistenceError;
use crate::grid::SupportGrid;
use crate::vineyard::{Barcode, propagate_barcodes};

/// One interval of a projected barcode, in filtration values of the query
/// line's parameterization.
///
/// Intervals of non-vertical lines are parameterized by the x-axis value,
/// vertical lines by the y-axis value. Essential classes carry an infinite
/// `death`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarValue {
    /// Filtration value where the class appears.
    pub birth: f64,
    /// Filtration value where the class dies, `f64::INFINITY` if never.
    pub death: f64,
    /// Number of classes sharing this interval in the stored template.
    pub multiplicity: u32,
}

/// The fully computed two-parameter persistence structure for one homology
/// dimension: the line arrangement with a barcode template in every face,
/// plus the augmented support points the templates index into.
#[derive(Debug)]
pub struct AugmentedArrangement {
    arrangement: Arrangement,
    points: Vec<SupportPoint>,
    hom_dim: usize,
}

impl AugmentedArrangement {
    /// Runs the whole pipeline for `H_{hom_dim}` of the given bifiltration.
    ///
    /// `x_values` and `y_values` map the discrete grades of the tree back to
    /// filtration values; they must be strictly increasing and match the
    /// tree's grid dimensions exactly.
    ///
    /// # Errors
    /// [`PersistenceError::GradeValues`] or
    /// [`PersistenceError::UnsortedGradeValues`] on malformed value axes;
    /// otherwise whatever stage fails first propagates its error.
    pub fn compute(
        tree: &mut SimplexTree,
        hom_dim: usize,
        x_values: Vec<f64>,
        y_values: Vec<f64>,
    ) -> Result<Self, PersistenceError> {
        check_axis("x", &x_values, tree.num_x())?;
        check_axis("y", &y_values, tree.num_y())?;

        tree.update_global_indexes();
        tree.update_dim_indexes(hom_dim + 1)?;

        let points = compute_support_points(tree, hom_dim)?;
        let mut grid = SupportGrid::fill_and_find_anchors(&points, tree.num_x(), tree.num_y())?;

        let low = tree.boundary_matrix(hom_dim)?;
        let high = tree.boundary_matrix(hom_dim + 1)?;
        grid.attach_multigrades(&low.column_grades(), &high.column_grades());

        let mut arrangement = build_arrangement(&grid, x_values, y_values)?;
        propagate_barcodes(&mut arrangement, &grid, &low, &high)?;

        log::debug!(
            "pipeline finished: {} faces, {} template points for H_{hom_dim}",
            arrangement.num_faces(),
            grid.points().len()
        );
        Ok(AugmentedArrangement {
            arrangement,
            points: grid.points().to_vec(),
            hom_dim,
        })
    }

    /// Builds a Vietoris–Rips bifiltration and runs [`compute`] on it.
    ///
    /// `times` and `distances` are discretized as in
    /// [`SimplexTree::build_rips`]; `x_values` and `y_values` supply the
    /// filtration values those discrete grades stand for. Simplices are
    /// built one dimension above `hom_dim`.
    ///
    /// [`compute`]: AugmentedArrangement::compute
    pub fn from_rips(
        times: &[u32],
        distances: &[u32],
        x_values: Vec<f64>,
        y_values: Vec<f64>,
        hom_dim: usize,
    ) -> Result<Self, PersistenceError> {
        let mut tree = SimplexTree::build_rips(
            times,
            distances,
            hom_dim + 1,
            x_values.len(),
            y_values.len(),
        )?;
        AugmentedArrangement::compute(&mut tree, hom_dim, x_values, y_values)
    }

    /// The stored barcode template for the line at `degrees` (0 to 90) from
    /// horizontal with the given signed offset from the origin.
    ///
    /// # Errors
    /// [`PersistenceError::FaceNotLocated`] if point location fails, and
    /// [`PersistenceError::InvariantViolation`] if the located face carries
    /// no barcode, which the propagation pass rules out.
    pub fn barcode_for_line(
        &self,
        degrees: f64,
        offset: f64,
    ) -> Result<&Barcode, PersistenceError> {
        let face = self.arrangement.face_for_line(degrees, offset)?;
        self.arrangement.barcode(face).ok_or_else(|| {
            PersistenceError::InvariantViolation(format!("face {face} has no stored barcode"))
        })
    }

    /// Projects the template for the given line onto it, returning numeric
    /// intervals.
    ///
    /// Every template point pushes to the first parameter value at which the
    /// line dominates its grade. On axis-parallel lines a point the line
    /// never dominates pushes to infinity: a bar born there is dropped, a
    /// bar dying there becomes an infinite interval. Bars whose endpoints
    /// push to the same value have zero length and are dropped as well.
    pub fn barcode_values(
        &self,
        degrees: f64,
        offset: f64,
    ) -> Result<Vec<BarValue>, PersistenceError> {
        let template = self.barcode_for_line(degrees, offset)?;

        let push = |p: u32| -> f64 {
            let pt = &self.points[p as usize];
            let t = self.arrangement.x_values[pt.x as usize];
            let d = self.arrangement.y_values[pt.y as usize];
            if degrees == 90.0 {
                // vertical line t = -offset, parameterized by d
                if t <= -offset { d } else { f64::INFINITY }
            } else if degrees == 0.0 {
                // horizontal line d = offset, parameterized by t
                if d <= offset { t } else { f64::INFINITY }
            } else {
                let radians = degrees.to_radians();
                t.max((d - offset / radians.cos()) / radians.tan())
            }
        };

        let mut values = Vec::new();
        for bar in template.bars() {
            let birth = push(bar.birth);
            if !birth.is_finite() {
                continue;
            }
            let death = push(bar.death);
            if death <= birth {
                continue;
            }
            values.push(BarValue {
                birth,
                death,
                multiplicity: bar.multiplicity,
            });
        }
        for &b in template.essential() {
            let birth = push(b);
            if !birth.is_finite() {
                continue;
            }
            values.push(BarValue {
                birth,
                death: f64::INFINITY,
                multiplicity: 1,
            });
        }
        Ok(values)
    }

    /// The augmented support points every stored bar indexes into.
    #[inline]
    pub fn points(&self) -> &[SupportPoint] {
        &self.points
    }

    /// The underlying anchor-line arrangement.
    #[inline]
    pub fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    /// The homology dimension this structure was computed for.
    #[inline]
    pub fn hom_dim(&self) -> usize {
        self.hom_dim
    }
}

fn check_axis(
    axis: &'static str,
    values: &[f64],
    expected: usize,
) -> Result<(), PersistenceError> {
    if values.len() != expected {
        return Err(PersistenceError::GradeValues {
            axis,
            expected,
            found: values.len(),
        });
    }
    if let Some(i) = values.iter().tuple_windows().position(|(a, b)| !(a < b)) {
        return Err(PersistenceError::UnsortedGradeValues { axis, index: i + 1 });
    }
    Ok(())
}
