//! Error types for bipersist operations.
//!
//! This module defines [`PersistenceError`], the error type used throughout
//! the crate for all fallible operations. The computation is a batch
//! pipeline: every variant here is fatal to the run that raised it, and
//! callers are expected to propagate rather than recover. Queries that can
//! legitimately come up empty (the low of a zero column, the incident edge
//! of an isolated vertex) return `Option` instead and never construct an
//! error.

use thiserror::Error;

/// Fatal errors raised by the two-parameter persistence pipeline.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum PersistenceError {
    /// A simplex was given with no vertices.
    #[error("simplex has no vertices")]
    EmptySimplex,
    /// A simplex's vertex list was not strictly increasing.
    #[error("simplex vertices must be strictly increasing: {vertices:?}")]
    UnsortedVertices {
        /// The offending vertex list.
        vertices: Vec<u32>,
    },
    /// A boundary face of an inserted simplex is missing from the tree.
    ///
    /// This indicates the tree is structurally inconsistent: every face of
    /// every simplex is inserted alongside it, so a failed lookup during
    /// boundary-matrix construction is a violated invariant.
    #[error("boundary face {face:?} of a dimension-{dim} simplex not found in the tree")]
    FaceNotFound {
        /// Vertex labels of the missing face.
        face: Vec<u32>,
        /// Dimension of the simplex whose boundary was being built.
        dim: usize,
    },
    /// A simplex was expected to carry an index that was never assigned.
    #[error("simplex {simplex:?} has no {kind} index; run the indexing pass first")]
    MissingIndex {
        /// Vertex labels of the simplex.
        simplex: Vec<u32>,
        /// Which index was missing ("global" or "dimension").
        kind: &'static str,
    },
    /// A column index exceeded the width of a matrix.
    #[error("column index {index} out of range for matrix of width {width}")]
    ColumnOutOfRange {
        /// The offending column index.
        index: usize,
        /// The matrix width.
        width: usize,
    },
    /// A row index exceeded the height of a matrix.
    #[error("row index {index} out of range for matrix of height {height}")]
    RowOutOfRange {
        /// The offending row index.
        index: usize,
        /// The matrix height.
        height: usize,
    },
    /// A column that must represent a cycle failed to reduce to zero.
    #[error("column {index} is not in the span of the kernel basis")]
    NotACycle {
        /// Index of the offending column.
        index: usize,
    },
    /// Support points handed to the grid were not sorted lexicographically.
    #[error("support points must be sorted lexicographically: point {index} is out of order")]
    UnsortedSupportPoints {
        /// Position of the first out-of-order point.
        index: usize,
    },
    /// Two critical lines crossed at the current sweep position.
    ///
    /// The sweep cannot order the lines past a coincident crossing; the
    /// arrangement would be combinatorially wrong, so construction aborts.
    #[error("degenerate crossing at sweep position x = {x}")]
    DegenerateCrossing {
        /// Sweep x-coordinate of the coincident crossing.
        x: f64,
    },
    /// A queued crossing involved lines that are not adjacent in sweep order.
    #[error("crossing between non-consecutive lines at positions {first} and {second}")]
    NonConsecutiveCrossing {
        /// Sweep position of one line.
        first: usize,
        /// Sweep position of the other line.
        second: usize,
    },
    /// A half-edge record points at a missing or inconsistent neighbor.
    #[error("arrangement invariant violated: {0}")]
    ArrangementInvariant(String),
    /// The traversal asked for a face the arrangement does not contain.
    #[error("no face contains the dual point ({x}, {y})")]
    FaceNotLocated {
        /// Dual x-coordinate (slope) of the query.
        x: f64,
        /// Dual y-coordinate (offset) of the query.
        y: f64,
    },
    /// A vineyard update was requested across an edge with no anchor line.
    #[error("halfedge {halfedge} borders no critical line")]
    MissingAnchorLine {
        /// Arena index of the offending half-edge.
        halfedge: usize,
    },
    /// A grade-value axis does not match the tree's grid dimensions.
    #[error("expected {expected} {axis} grade values, found {found}")]
    GradeValues {
        /// Which axis ("x" or "y").
        axis: &'static str,
        /// Number of distinct grades along the axis.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// Grade values along an axis were not strictly increasing.
    #[error("{axis} grade values must be strictly increasing: value {index} is out of order")]
    UnsortedGradeValues {
        /// Which axis ("x" or "y").
        axis: &'static str,
        /// Position of the first out-of-order value.
        index: usize,
    },
    /// An internal structural invariant failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
