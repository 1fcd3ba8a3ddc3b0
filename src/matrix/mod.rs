//! Sparse linear algebra over the two-element field.
//!
//! [`sparse`] provides the column-sparse mod-2 matrix and the persistence
//! column reduction; [`bigraded`] layers grade-aware column grouping on top
//! and computes kernels of bigraded maps.

pub mod bigraded;
pub mod sparse;

pub use bigraded::{BigradedMatrix, BigradedMatrixLex, ColexIndexTable, LexIndexTable};
pub use sparse::SparseBinaryMatrix;
