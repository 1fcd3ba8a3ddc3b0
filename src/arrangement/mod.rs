//! The arrangement of critical lines in the dual plane.
//!
//! Every anchor of the support grid induces one critical line; the faces of
//! their arrangement are exactly the cells of the parameter plane within
//! which the discrete barcode is constant. [`build_arrangement`] constructs
//! the subdivision by a left-to-right sweep; [`Arrangement::face_for_line`]
//! answers location queries for arbitrary lines afterwards.

mod anchor;
mod builder;
mod dcel;

pub use anchor::{Anchor, AnchorId, AngleOrder, left_edge_cmp};
pub use builder::build_arrangement;
pub use dcel::{Arrangement, Face, FaceId, Halfedge, HalfedgeId, Vertex, VertexId};
