//! Column-sparse matrices over the two-element field.
//!
//! Every matrix in the pipeline is a [`SparseBinaryMatrix`]: a fixed row
//! count and a sequence of owned columns, each column the ascending list of
//! its nonzero row indices. The *low* of a column is its maximum row index
//! (`None` for a zero column); the persistence pairing and every vineyard
//! update are phrased in terms of lows.
//!
//! [`SparseBinaryMatrix::add_column`] is the single mutating primitive the
//! reduction is built on: a mod-2 symmetric-difference merge of one column
//! into another that leaves the source untouched.

use crate::error::PersistenceError;

/// A column-sparse matrix over GF(2).
///
/// # Invariants
/// - Each column's row indices are strictly increasing and `< num_rows`.
///
/// The invariant is maintained by every mutator; [`Self::low`] is `O(1)`
/// because the maximum row index is the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBinaryMatrix {
    num_rows: usize,
    columns: Vec<Vec<u32>>,
}

impl SparseBinaryMatrix {
    /// Creates a zero matrix with the given dimensions.
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        SparseBinaryMatrix {
            num_rows,
            columns: vec![Vec::new(); num_cols],
        }
    }

    /// Creates the `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        SparseBinaryMatrix {
            num_rows: n,
            columns: (0..n as u32).map(|i| vec![i]).collect(),
        }
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.num_rows
    }

    /// Appends a zero column and returns its index.
    pub fn push_zero_column(&mut self) -> usize {
        self.columns.push(Vec::new());
        self.columns.len() - 1
    }

    /// Appends an owned column. The rows must be strictly increasing.
    pub fn push_column(&mut self, rows: Vec<u32>) -> Result<usize, PersistenceError> {
        if let Some(&max) = rows.last() {
            if max as usize >= self.num_rows {
                return Err(PersistenceError::RowOutOfRange {
                    index: max as usize,
                    height: self.num_rows,
                });
            }
        }
        debug_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        self.columns.push(rows);
        Ok(self.columns.len() - 1)
    }

    /// The nonzero rows of column `j`, ascending.
    #[inline]
    pub fn column(&self, j: usize) -> &[u32] {
        &self.columns[j]
    }

    /// The maximum row index of column `j`, or `None` for a zero column.
    #[inline]
    pub fn low(&self, j: usize) -> Option<u32> {
        self.columns[j].last().copied()
    }

    /// Whether entry `(row, col)` is nonzero.
    #[inline]
    pub fn entry(&self, row: u32, col: usize) -> bool {
        self.columns[col].binary_search(&row).is_ok()
    }

    /// Toggles entry `(row, col)` on.
    pub fn set_entry(&mut self, row: u32, col: usize) -> Result<(), PersistenceError> {
        self.check_row(row)?;
        self.check_col(col)?;
        if let Err(pos) = self.columns[col].binary_search(&row) {
            self.columns[col].insert(pos, row);
        }
        Ok(())
    }

    /// Toggles entry `(row, col)` off.
    pub fn clear_entry(&mut self, row: u32, col: usize) -> Result<(), PersistenceError> {
        self.check_col(col)?;
        if let Ok(pos) = self.columns[col].binary_search(&row) {
            self.columns[col].remove(pos);
        }
        Ok(())
    }

    /// Zeroes out column `j`.
    pub fn clear_column(&mut self, j: usize) -> Result<(), PersistenceError> {
        self.check_col(j)?;
        self.columns[j].clear();
        Ok(())
    }

    /// Removes and returns column `j`'s rows, leaving a zero column behind.
    pub fn take_column(&mut self, j: usize) -> Result<Vec<u32>, PersistenceError> {
        self.check_col(j)?;
        Ok(std::mem::take(&mut self.columns[j]))
    }

    /// Adds column `src` into column `dst` (mod-2 symmetric difference).
    ///
    /// Column `src` is left untouched. The two indices must differ.
    ///
    /// # Errors
    /// [`PersistenceError::ColumnOutOfRange`] if either index is out of
    /// range, or [`PersistenceError::InvariantViolation`] if `src == dst`.
    pub fn add_column(&mut self, src: usize, dst: usize) -> Result<(), PersistenceError> {
        self.check_col(src)?;
        self.check_col(dst)?;
        if src == dst {
            return Err(PersistenceError::InvariantViolation(format!(
                "cannot add column {src} to itself"
            )));
        }
        let old = std::mem::take(&mut self.columns[dst]);
        let merged = xor_merge(&old, &self.columns[src]);
        self.columns[dst] = merged;
        Ok(())
    }

    /// Adds column `src` of `other` into column `dst` of `self`.
    pub fn add_column_from(
        &mut self,
        other: &SparseBinaryMatrix,
        src: usize,
        dst: usize,
    ) -> Result<(), PersistenceError> {
        other.check_col(src)?;
        self.check_col(dst)?;
        let old = std::mem::take(&mut self.columns[dst]);
        self.columns[dst] = xor_merge(&old, &other.columns[src]);
        Ok(())
    }

    /// Swaps columns `j` and `j + 1`.
    pub fn swap_adjacent_columns(&mut self, j: usize) -> Result<(), PersistenceError> {
        self.check_col(j + 1)?;
        self.columns.swap(j, j + 1);
        Ok(())
    }

    /// Swaps rows `a` and `a + 1` by relabelling entries in every column.
    ///
    /// # Complexity
    /// `O(width · log nnz)`: one binary search per column, and a swap of two
    /// adjacent stored entries at most.
    pub fn swap_adjacent_rows(&mut self, a: u32) -> Result<(), PersistenceError> {
        self.check_row(a + 1)?;
        let b = a + 1;
        for col in &mut self.columns {
            let has_a = col.binary_search(&a);
            match has_a {
                Ok(pos) => {
                    // If b is present too, the set {a, b} maps to itself.
                    if pos + 1 >= col.len() || col[pos + 1] != b {
                        col[pos] = b;
                    }
                }
                Err(pos) => {
                    if pos < col.len() && col[pos] == b {
                        col[pos] = a;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finds the column whose low is `row`, if any.
    pub fn find_low(&self, row: u32) -> Option<usize> {
        (0..self.width()).find(|&j| self.low(j) == Some(row))
    }

    /// Standard persistence column reduction, left to right.
    ///
    /// Processes columns in index order; while the current column's low
    /// collides with the low of an earlier finalized column, adds that
    /// earlier column in. On return, nonzero columns have pairwise distinct
    /// lows and persistence pairs read off as (row `r`, column with low `r`).
    ///
    /// # Complexity
    /// Worst case quadratic in the matrix dimensions; near-linear for the
    /// sparse columns boundary matrices produce in practice.
    pub fn col_reduce(&mut self) -> Result<(), PersistenceError> {
        self.col_reduce_with(|_, _| {})
    }

    /// Column reduction that reports every column addition to `hook`.
    ///
    /// `hook(src, dst)` fires for each `add_column(src, dst)` performed, in
    /// order, so callers can mirror the operations onto a companion matrix
    /// (a slave recording combinations, or an upper-triangular factor).
    pub fn col_reduce_with<F>(&mut self, mut hook: F) -> Result<(), PersistenceError>
    where
        F: FnMut(usize, usize),
    {
        let mut lows: Vec<Option<usize>> = vec![None; self.num_rows];
        for j in 0..self.width() {
            while let Some(l) = self.low(j) {
                match lows[l as usize] {
                    Some(k) => {
                        self.add_column(k, j)?;
                        hook(k, j);
                    }
                    None => {
                        lows[l as usize] = Some(j);
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether all nonzero columns have pairwise distinct lows.
    pub fn is_reduced(&self) -> bool {
        let mut seen = vec![false; self.num_rows];
        for j in 0..self.width() {
            if let Some(l) = self.low(j) {
                if seen[l as usize] {
                    return false;
                }
                seen[l as usize] = true;
            }
        }
        true
    }

    /// Total number of nonzero entries.
    pub fn nnz(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    #[inline]
    fn check_col(&self, j: usize) -> Result<(), PersistenceError> {
        if j >= self.columns.len() {
            return Err(PersistenceError::ColumnOutOfRange {
                index: j,
                width: self.columns.len(),
            });
        }
        Ok(())
    }

    #[inline]
    fn check_row(&self, r: u32) -> Result<(), PersistenceError> {
        if r as usize >= self.num_rows {
            return Err(PersistenceError::RowOutOfRange {
                index: r as usize,
                height: self.num_rows,
            });
        }
        Ok(())
    }
}

/// Mod-2 merge of two ascending row lists.
pub(crate) fn xor_merge(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_cols(num_rows: usize, cols: &[&[u32]]) -> SparseBinaryMatrix {
        let mut m = SparseBinaryMatrix::new(num_rows, 0);
        for c in cols {
            m.push_column(c.to_vec()).unwrap();
        }
        m
    }

    #[test]
    fn low_of_empty_column_is_none() {
        let m = SparseBinaryMatrix::new(4, 2);
        assert_eq!(m.low(0), None);
        assert_eq!(m.low(1), None);
    }

    #[test]
    fn add_column_is_symmetric_difference() {
        let mut m = from_cols(6, &[&[0, 2, 4], &[2, 3, 4, 5]]);
        m.add_column(0, 1).unwrap();
        assert_eq!(m.column(0), &[0, 2, 4]); // source untouched
        assert_eq!(m.column(1), &[0, 3, 5]);
        assert_eq!(m.low(1), Some(5));
    }

    #[test]
    fn add_column_to_self_is_rejected() {
        let mut m = from_cols(3, &[&[0, 1]]);
        assert!(matches!(
            m.add_column(0, 0),
            Err(PersistenceError::InvariantViolation(_))
        ));
    }

    #[test]
    fn out_of_range_column_is_fatal() {
        let mut m = SparseBinaryMatrix::new(3, 2);
        assert_eq!(
            m.add_column(0, 5),
            Err(PersistenceError::ColumnOutOfRange { index: 5, width: 2 })
        );
    }

    #[test]
    fn reduce_triangle_boundary() {
        // Boundary of a filled triangle: edges 01, 02, 12 over vertices 0,1,2.
        let mut m = from_cols(3, &[&[0, 1], &[0, 2], &[1, 2]]);
        m.col_reduce().unwrap();
        assert!(m.is_reduced());
        assert_eq!(m.low(0), Some(1));
        assert_eq!(m.low(1), Some(2));
        assert_eq!(m.low(2), None); // the cycle column zeroes out
    }

    #[test]
    fn reduce_is_idempotent() {
        let mut m = from_cols(5, &[&[0, 1], &[1, 2], &[0, 2], &[2, 3], &[3, 4], &[2, 4]]);
        m.col_reduce().unwrap();
        let once = m.clone();
        m.col_reduce().unwrap();
        assert_eq!(m, once);
    }

    #[test]
    fn swap_adjacent_rows_relabels() {
        let mut m = from_cols(4, &[&[0, 2], &[1, 2], &[1], &[]]);
        m.swap_adjacent_rows(1).unwrap();
        assert_eq!(m.column(0), &[0, 1]);
        assert_eq!(m.column(1), &[1, 2]); // both rows present: unchanged as a set
        assert_eq!(m.column(2), &[2]);
        assert_eq!(m.column(3), &[] as &[u32]);
    }

    #[test]
    fn reduction_hook_replays_onto_slave() {
        let mut m = from_cols(3, &[&[0, 1], &[0, 2], &[1, 2]]);
        let mut slave = SparseBinaryMatrix::identity(3);
        m.col_reduce_with(|src, dst| {
            slave.add_column(src, dst).unwrap();
        })
        .unwrap();
        // column 2 reduced to zero; its slave column records 01 + 02 + 12
        assert_eq!(m.low(2), None);
        assert_eq!(slave.column(2), &[0, 1, 2]);
    }

    #[test]
    fn find_low_scans_columns() {
        let m = from_cols(4, &[&[0, 3], &[1], &[]]);
        assert_eq!(m.find_low(3), Some(0));
        assert_eq!(m.find_low(1), Some(1));
        assert_eq!(m.find_low(2), None);
    }
}
