//! Bigraded matrices: sparse columns grouped by grade.
//!
//! A bigraded matrix pairs a [`SparseBinaryMatrix`] with an index table that
//! maps each bigrade to the range of columns carrying it. Columns are stored
//! contiguously per grade; the table records, for every grid cell, how many
//! columns appear at or before that cell in the scan order. Two scan orders
//! are needed: colexicographic (y-major, the order boundary matrices are
//! built in) and lexicographic (x-major, the order kernel generators are
//! discovered in), hence the two table variants.
//!
//! [`BigradedMatrix::kernel`] is the workhorse: a bigrade-aware column
//! reduction that records a kernel basis with the grade at which each
//! generator first exists. It consumes the matrix; the reduction destroys
//! the column data, so ownership is transferred rather than letting a
//! caller reuse a gutted matrix.

use crate::error::PersistenceError;
use crate::grade::{Grade, colex_cmp};
use crate::matrix::sparse::SparseBinaryMatrix;

/// Column counts per bigrade in colexicographic (y-major) scan order.
///
/// `end(y, x)` is the number of columns whose grade is at or before `(x, y)`
/// in colex order; the columns exactly at `(x, y)` are `start(y, x)..end(y, x)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColexIndexTable {
    width: usize,
    height: usize,
    ends: Vec<usize>,
}

impl ColexIndexTable {
    /// Creates an all-zero table for a `width × height` grade grid.
    pub fn new(width: usize, height: usize) -> Self {
        ColexIndexTable {
            width,
            height,
            ends: vec![0; width * height],
        }
    }

    /// Builds the table for columns whose grades are already sorted in
    /// ascending colex order.
    pub fn from_sorted_grades(grades: &[Grade], width: usize, height: usize) -> Self {
        debug_assert!(
            grades
                .windows(2)
                .all(|w| colex_cmp(&w[0], &w[1]) != std::cmp::Ordering::Greater)
        );
        let mut table = Self::new(width, height);
        let mut next = 0usize;
        for y in 0..height as u32 {
            for x in 0..width as u32 {
                while next < grades.len() && grades[next].y == y && grades[next].x == x {
                    next += 1;
                }
                table.set_end(y as usize, x as usize, next);
            }
        }
        table
    }

    /// Number of x-grades.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of y-grades.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// One past the last column at or before `(x, y)` in colex order.
    #[inline]
    pub fn end(&self, y: usize, x: usize) -> usize {
        self.ends[y * self.width + x]
    }

    /// First column at exactly `(x, y)`.
    #[inline]
    pub fn start(&self, y: usize, x: usize) -> usize {
        if x > 0 {
            self.end(y, x - 1)
        } else {
            self.row_start(y)
        }
    }

    /// First column whose grade lies in row `y`.
    #[inline]
    pub fn row_start(&self, y: usize) -> usize {
        if y > 0 { self.end(y - 1, self.width - 1) } else { 0 }
    }

    /// Records the running column count for cell `(x, y)`.
    #[inline]
    pub fn set_end(&mut self, y: usize, x: usize, n: usize) {
        self.ends[y * self.width + x] = n;
    }

    /// Recovers the grade of every column from the cell ranges.
    pub fn column_grades(&self) -> Vec<Grade> {
        let total = if self.ends.is_empty() {
            0
        } else {
            self.ends[self.ends.len() - 1]
        };
        let mut grades = Vec::with_capacity(total);
        for y in 0..self.height {
            for x in 0..self.width {
                let g = Grade::new(x as u32, y as u32);
                for _ in self.start(y, x)..self.end(y, x) {
                    grades.push(g);
                }
            }
        }
        grades
    }
}

/// Column counts per bigrade in lexicographic (x-major) scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexIndexTable {
    width: usize,
    height: usize,
    ends: Vec<usize>,
}

impl LexIndexTable {
    /// Creates an all-zero table for a `width × height` grade grid.
    pub fn new(width: usize, height: usize) -> Self {
        LexIndexTable {
            width,
            height,
            ends: vec![0; width * height],
        }
    }

    /// Number of x-grades.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of y-grades.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// One past the last column at or before `(x, y)` in lex order.
    #[inline]
    pub fn end(&self, y: usize, x: usize) -> usize {
        self.ends[x * self.height + y]
    }

    /// First column at exactly `(x, y)`.
    #[inline]
    pub fn start(&self, y: usize, x: usize) -> usize {
        if y > 0 {
            self.end(y - 1, x)
        } else if x > 0 {
            self.end(self.height - 1, x - 1)
        } else {
            0
        }
    }

    /// Records the running column count for cell `(x, y)`.
    #[inline]
    pub fn set_end(&mut self, y: usize, x: usize, n: usize) {
        self.ends[x * self.height + y] = n;
    }
}

/// A sparse matrix whose columns are grouped by grade in colex order.
#[derive(Debug, Clone)]
pub struct BigradedMatrix {
    /// The column data.
    pub mat: SparseBinaryMatrix,
    /// Column ranges per bigrade.
    pub ind: ColexIndexTable,
}

/// A sparse matrix whose columns are grouped by grade in lex order.
///
/// Produced by [`BigradedMatrix::kernel`], whose bigrade scan discovers
/// generators x-major; convert with [`BigradedMatrixLex::into_colex`].
#[derive(Debug, Clone)]
pub struct BigradedMatrixLex {
    /// The column data.
    pub mat: SparseBinaryMatrix,
    /// Column ranges per bigrade.
    pub ind: LexIndexTable,
}

impl BigradedMatrix {
    /// Assembles a bigraded matrix from `(column, grade)` pairs already
    /// sorted in ascending colex grade order.
    pub fn from_columns(
        num_rows: usize,
        columns: Vec<(Vec<u32>, Grade)>,
        width: usize,
        height: usize,
    ) -> Result<Self, PersistenceError> {
        let grades: Vec<Grade> = columns.iter().map(|(_, g)| *g).collect();
        let ind = ColexIndexTable::from_sorted_grades(&grades, width, height);
        let mut mat = SparseBinaryMatrix::new(num_rows, 0);
        for (rows, _) in columns {
            mat.push_column(rows)?;
        }
        Ok(BigradedMatrix { mat, ind })
    }

    /// The grade of every column, in column order.
    pub fn column_grades(&self) -> Vec<Grade> {
        self.ind.column_grades()
    }

    /// Computes a basis for the kernel of this bigraded map.
    ///
    /// Bigrades are scanned in lex order (x outer, y inner); at each bigrade
    /// the columns of row `y` visible so far are reduced against the columns
    /// already finalized. A slave identity matrix mirrors every column
    /// addition, so when a column zeroes out the slave column is exactly the
    /// combination that produced the cycle; it is recorded as a kernel
    /// generator at the current bigrade and cleared from the slave.
    ///
    /// A column that is zero the moment it first becomes visible is itself a
    /// kernel generator at its own grade (this happens for every column of a
    /// height-zero matrix, e.g. a vertex boundary map).
    ///
    /// Consumes `self`: the reduction destroys the column data.
    ///
    /// # Errors
    /// Propagates [`PersistenceError::ColumnOutOfRange`] if the index table
    /// references columns the matrix does not have.
    pub fn kernel(mut self) -> Result<BigradedMatrix, PersistenceError> {
        let width = self.mat.width();
        let num_x = self.ind.width();
        let num_y = self.ind.height();

        let mut slave = SparseBinaryMatrix::identity(width);
        let mut lows: Vec<Option<usize>> = vec![None; self.mat.height()];
        let mut emitted = vec![false; width];
        let mut ker = BigradedMatrixLex {
            mat: SparseBinaryMatrix::new(width, 0),
            ind: LexIndexTable::new(num_x, num_y),
        };

        for x in 0..num_x {
            for y in 0..num_y {
                let first = self.ind.row_start(y);
                let last = self.ind.end(y, x);
                for j in first..last {
                    loop {
                        let Some(l) = self.mat.low(j) else { break };
                        match lows[l as usize] {
                            Some(c) if c < j => {
                                self.mat.add_column(c, j)?;
                                slave.add_column(c, j)?;
                            }
                            _ => break,
                        }
                    }
                    match self.mat.low(j) {
                        Some(l) => lows[l as usize] = Some(j),
                        None => {
                            if !emitted[j] {
                                emitted[j] = true;
                                let combo = slave.take_column(j)?;
                                ker.mat.push_column(combo)?;
                            }
                        }
                    }
                }
                ker.ind.set_end(y, x, ker.mat.width());
            }
        }

        log::debug!(
            "kernel: {} generators from a {}x{} bigraded map",
            ker.mat.width(),
            self.mat.height(),
            width
        );
        ker.into_colex()
    }

    /// Extracts a minimal generating set of this matrix's column span as a
    /// bigraded module.
    ///
    /// Runs the same bigrade scan as [`Self::kernel`], but instead of
    /// recording the columns that die it copies out each column that is
    /// still nonzero at its own bigrade after reduction against everything
    /// visible there. Columns that zero out at their own bigrade are
    /// redundant (spanned by earlier-grade columns) and are dropped.
    ///
    /// Consumes `self`; the output columns come back grouped in lex order.
    pub fn minimal_generators(mut self) -> Result<BigradedMatrixLex, PersistenceError> {
        let num_x = self.ind.width();
        let num_y = self.ind.height();
        let mut lows: Vec<Option<usize>> = vec![None; self.mat.height()];
        let mut out = BigradedMatrixLex {
            mat: SparseBinaryMatrix::new(self.mat.height(), 0),
            ind: LexIndexTable::new(num_x, num_y),
        };

        for x in 0..num_x {
            for y in 0..num_y {
                let first = self.ind.row_start(y);
                let own_start = self.ind.start(y, x);
                let last = self.ind.end(y, x);
                for j in first..last {
                    loop {
                        let Some(l) = self.mat.low(j) else { break };
                        match lows[l as usize] {
                            Some(c) if c < j => self.mat.add_column(c, j)?,
                            _ => break,
                        }
                    }
                    if let Some(l) = self.mat.low(j) {
                        lows[l as usize] = Some(j);
                        if j >= own_start {
                            out.mat.push_column(self.mat.column(j).to_vec())?;
                        }
                    }
                }
                out.ind.set_end(y, x, out.mat.width());
            }
        }
        Ok(out)
    }
}

impl BigradedMatrixLex {
    /// Regroups the columns into colex grade order, consuming `self`.
    pub fn into_colex(mut self) -> Result<BigradedMatrix, PersistenceError> {
        let height = self.ind.height;
        let width = self.ind.width;
        let mut mat = SparseBinaryMatrix::new(self.mat.height(), 0);
        let mut ind = ColexIndexTable::new(width, height);
        for y in 0..height {
            for x in 0..width {
                for j in self.ind.start(y, x)..self.ind.end(y, x) {
                    let col = self.mat.take_column(j)?;
                    mat.push_column(col)?;
                }
                ind.set_end(y, x, mat.width());
            }
        }
        Ok(BigradedMatrix { mat, ind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(x: u32, y: u32) -> Grade {
        Grade::new(x, y)
    }

    #[test]
    fn index_table_ranges() {
        let grades = vec![g(0, 0), g(0, 0), g(1, 0), g(0, 1)];
        let t = ColexIndexTable::from_sorted_grades(&grades, 2, 2);
        assert_eq!((t.start(0, 0), t.end(0, 0)), (0, 2));
        assert_eq!((t.start(0, 1), t.end(0, 1)), (2, 3));
        assert_eq!((t.start(1, 0), t.end(1, 0)), (3, 4));
        assert_eq!((t.start(1, 1), t.end(1, 1)), (4, 4));
        assert_eq!(t.column_grades(), grades);
    }

    #[test]
    fn kernel_of_parallel_edges() {
        // Two edges on the same vertex pair, entering at incomparable
        // grades (1,0) and (0,1). Their sum is a cycle born at (1,1).
        let m = BigradedMatrix::from_columns(
            2,
            vec![(vec![0, 1], g(1, 0)), (vec![0, 1], g(0, 1))],
            2,
            2,
        )
        .unwrap();
        let ker = m.kernel().unwrap();
        assert_eq!(ker.mat.width(), 1);
        assert_eq!(ker.mat.column(0), &[0, 1]);
        assert_eq!(ker.column_grades(), vec![g(1, 1)]);
    }

    #[test]
    fn kernel_of_zero_height_map() {
        // A vertex boundary map has no rows; every column is a generator at
        // its own grade.
        let m = BigradedMatrix::from_columns(
            0,
            vec![(vec![], g(0, 0)), (vec![], g(1, 0))],
            2,
            1,
        )
        .unwrap();
        let ker = m.kernel().unwrap();
        assert_eq!(ker.mat.width(), 2);
        assert_eq!(ker.column_grades(), vec![g(0, 0), g(1, 0)]);
        assert_eq!(ker.mat.column(0), &[0]);
        assert_eq!(ker.mat.column(1), &[1]);
    }

    #[test]
    fn kernel_consumes_and_regrades_in_colex() {
        // Three columns over two rows; the two cycles appear at (1,1) and
        // (2,0), which must come back in colex order: (2,0) first.
        let m = BigradedMatrix::from_columns(
            2,
            vec![
                (vec![0, 1], g(0, 0)),
                (vec![0, 1], g(2, 0)),
                (vec![0, 1], g(0, 1)),
            ],
            3,
            2,
        )
        .unwrap();
        let ker = m.kernel().unwrap();
        assert_eq!(ker.mat.width(), 2);
        assert_eq!(ker.column_grades(), vec![g(2, 0), g(0, 1)]);
    }
}
