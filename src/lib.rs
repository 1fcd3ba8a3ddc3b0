#![cfg_attr(docsrs, feature(doc_cfg))]
//! # bipersist
//!
//! bipersist computes two-parameter persistent homology over GF(2): it takes
//! a bifiltered simplicial complex, finds the support of its multigraded
//! Betti numbers, builds the arrangement of critical lines those points
//! induce in the dual plane, and stores a barcode template in every face by
//! carrying an RU-decomposition across the arrangement with vineyard
//! updates. Afterwards the barcode of any line of nonnegative slope is a
//! point-location query away.
//!
//! ## Pipeline
//! - [`complex`]: arena-backed simplex trees for bifiltrations, including a
//!   Vietoris–Rips builder, and their graded boundary matrices
//! - [`matrix`]: sparse GF(2) columns, the standard column reduction, and
//!   bigraded matrices with kernel and minimal-generator computations
//! - [`betti`]: ξ₀/ξ₁ support points read off a minimal presentation
//! - [`grid`]: the support grid, anchor detection, and grade lifting
//! - [`arrangement`]: the sweep-line construction of the anchor-line
//!   arrangement and point location in it
//! - [`vineyard`]: barcode templates and their propagation face to face
//! - [`pipeline`]: [`AugmentedArrangement`](pipeline::AugmentedArrangement),
//!   the batch entry point and query surface
//!
//! ## Determinism
//! Every stage is deterministic: simplex orders, support-point orders, the
//! sweep, and the spanning path all break ties by fixed structural rules, so
//! a given input always yields the same arrangement and the same templates.
//!
//! ## Invariant checking
//! Expensive structural checks run in debug builds and behind the
//! `check-invariants`/`strict-invariants` features; see
//! [`debug_invariants`].

pub mod arrangement;
pub mod betti;
pub mod complex;
pub mod debug_invariants;
pub mod error;
pub mod grade;
pub mod grid;
pub mod matrix;
pub mod pipeline;
pub mod vineyard;

pub use debug_invariants::DebugInvariants;
pub use error::PersistenceError;

/// A convenient prelude to import the most-used types:
pub mod prelude {
    pub use crate::arrangement::{Arrangement, FaceId, build_arrangement};
    pub use crate::betti::{SupportPoint, compute_support_points};
    pub use crate::complex::SimplexTree;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::error::PersistenceError;
    pub use crate::grade::Grade;
    pub use crate::grid::SupportGrid;
    pub use crate::matrix::{BigradedMatrix, SparseBinaryMatrix};
    pub use crate::pipeline::{AugmentedArrangement, BarValue};
    pub use crate::vineyard::{Bar, Barcode, propagate_barcodes};
}
