//! Barcode templates and their propagation across the arrangement.
//!
//! [`barcode`] defines the discrete barcode stored at each face;
//! [`propagate`] walks a spanning path of the dual graph and carries an
//! RU-decomposition from face to face by vineyard transpositions, storing
//! one barcode per face along the way.

pub mod barcode;
pub mod propagate;

pub use barcode::{Bar, Barcode};
pub use propagate::propagate_barcodes;
