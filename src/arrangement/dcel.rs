//! The half-edge planar subdivision of the dual strip.
//!
//! Vertices, half-edges and faces live in arenas addressed by stable
//! integer ids; twin/next/prev/face references are plain index fields with
//! no ownership implied, and teardown is bulk arena drop. The subdivision
//! starts as a bounding box over the strip `x ∈ [0, ∞)` (four vertices,
//! eight half-edges, one bounded face); the builder then splits it along
//! every critical line. Half-edges on the unbounded side carry no face.
//!
//! Point location ([`Arrangement::find_point`]) walks from the left edge of
//! the strip toward the query, crossing one cell per step, so any line in
//! the primal plane can be routed to the face whose cell contains its dual
//! point.

use crate::debug_invariants::DebugInvariants;
use crate::error::PersistenceError;
use crate::vineyard::Barcode;
use once_cell::sync::OnceCell;
use std::fmt;

use super::anchor::{Anchor, AnchorId};

/// Stable arena index of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct VertexId(pub u32);

/// Stable arena index of one half-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HalfedgeId(pub u32);

/// Stable arena index of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FaceId(pub u32);

impl VertexId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl HalfedgeId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HalfedgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A vertex of the subdivision. Coordinates may be infinite for vertices on
/// the strip boundary.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    /// One half-edge leaving this vertex.
    pub incident: Option<HalfedgeId>,
}

/// A half-edge of the subdivision.
#[derive(Debug, Clone)]
pub struct Halfedge {
    /// Origin vertex; unset only transiently during construction.
    pub origin: Option<VertexId>,
    pub twin: HalfedgeId,
    pub next: Option<HalfedgeId>,
    pub prev: Option<HalfedgeId>,
    /// Bounding face; `None` on the unbounded side of the strip boundary.
    pub face: Option<FaceId>,
    /// The critical line this half-edge lies on, if any.
    pub anchor: Option<AnchorId>,
}

/// A face of the subdivision, owning its barcode once the traversal has
/// computed one.
#[derive(Debug, Clone)]
pub struct Face {
    /// One half-edge on the boundary cycle.
    pub boundary: HalfedgeId,
    pub barcode: Option<Barcode>,
}

/// One edge of the dual graph over faces: two cells separated by a segment
/// of an anchor's line, weighted by that anchor's crossing cost.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DualEdge {
    pub weight: u64,
    pub faces: (FaceId, FaceId),
    pub halfedge: HalfedgeId,
}

/// The arrangement of critical lines in the dual strip.
#[derive(Debug)]
pub struct Arrangement {
    /// Grade values on the x-axis (query-line slopes), ascending.
    pub(crate) x_values: Vec<f64>,
    /// Grade values on the y-axis (query-line offsets), ascending.
    pub(crate) y_values: Vec<f64>,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) halfedges: Vec<Halfedge>,
    pub(crate) faces: Vec<Face>,
    pub(crate) anchors: Vec<Anchor>,
    /// Anchors sorted bottom-to-top along the left edge.
    pub(crate) left_order: Vec<AnchorId>,
    pub(crate) topleft: HalfedgeId,
    pub(crate) bottomleft: HalfedgeId,
    pub(crate) bottomright: HalfedgeId,
    /// For each slope group, the topmost line's inward half-edge at the
    /// right boundary, in ascending slope order.
    pub(crate) vertical_line_query_list: Vec<HalfedgeId>,
    /// Dual graph over faces, filled on first use.
    dual_edges: OnceCell<Vec<DualEdge>>,
}

impl Arrangement {
    /// Bounding box of the strip: four vertices, eight half-edges, one
    /// bounded face, no anchors yet.
    pub(crate) fn new(x_values: Vec<f64>, y_values: Vec<f64>) -> Self {
        const INF: f64 = f64::INFINITY;
        let mut vertices = vec![
            Vertex {
                x: 0.0,
                y: INF,
                incident: None,
            },
            Vertex {
                x: INF,
                y: INF,
                incident: None,
            },
            Vertex {
                x: INF,
                y: -INF,
                incident: None,
            },
            Vertex {
                x: 0.0,
                y: -INF,
                incident: None,
            },
        ];

        let mut halfedges = Vec::with_capacity(8);
        for i in 0..4u32 {
            // even ids walk the bounded face counterclockwise
            halfedges.push(Halfedge {
                origin: Some(VertexId(i)),
                twin: HalfedgeId(2 * i + 1),
                next: Some(HalfedgeId((2 * i + 2) % 8)),
                prev: Some(HalfedgeId((2 * i + 6) % 8)),
                face: Some(FaceId(0)),
                anchor: None,
            });
            halfedges.push(Halfedge {
                origin: Some(VertexId((i + 1) % 4)),
                twin: HalfedgeId(2 * i),
                next: Some(HalfedgeId((2 * i + 7) % 8)),
                prev: Some(HalfedgeId((2 * i + 3) % 8)),
                face: None,
                anchor: None,
            });
        }
        for i in 0..4u32 {
            vertices[i as usize].incident = Some(HalfedgeId(2 * i));
        }

        let faces = vec![Face {
            boundary: HalfedgeId(0),
            barcode: None,
        }];

        Arrangement {
            x_values,
            y_values,
            vertices,
            halfedges,
            faces,
            anchors: Vec::new(),
            left_order: Vec::new(),
            topleft: HalfedgeId(7),
            bottomleft: HalfedgeId(6),
            bottomright: HalfedgeId(3),
            vertical_line_query_list: Vec::new(),
            dual_edges: OnceCell::new(),
        }
    }

    /// Edges of the dual graph over faces, one per interior anchor segment,
    /// sorted by ascending weight. Computed lazily and cached.
    pub(crate) fn dual_edges(&self) -> &[DualEdge] {
        self.dual_edges.get_or_init(|| {
            let mut edges = Vec::new();
            for (i, he) in self.halfedges.iter().enumerate() {
                if i >= he.twin.idx() {
                    continue;
                }
                let Some(a) = he.anchor else { continue };
                let (Some(f1), Some(f2)) = (he.face, self.he(he.twin).face) else {
                    continue;
                };
                edges.push(DualEdge {
                    weight: self.anchors[a.idx()].weight,
                    faces: (f1, f2),
                    halfedge: HalfedgeId(i as u32),
                });
            }
            edges.sort_unstable_by_key(|e| (e.weight, e.faces.0.0, e.faces.1.0));
            edges
        })
    }

    #[inline]
    pub(crate) fn he(&self, h: HalfedgeId) -> &Halfedge {
        &self.halfedges[h.idx()]
    }

    #[inline]
    pub(crate) fn he_mut(&mut self, h: HalfedgeId) -> &mut Halfedge {
        &mut self.halfedges[h.idx()]
    }

    pub(crate) fn next_of(&self, h: HalfedgeId) -> Result<HalfedgeId, PersistenceError> {
        self.he(h)
            .next
            .ok_or_else(|| PersistenceError::ArrangementInvariant(format!("{h} has no next")))
    }

    pub(crate) fn prev_of(&self, h: HalfedgeId) -> Result<HalfedgeId, PersistenceError> {
        self.he(h)
            .prev
            .ok_or_else(|| PersistenceError::ArrangementInvariant(format!("{h} has no prev")))
    }

    pub(crate) fn origin_of(&self, h: HalfedgeId) -> Result<VertexId, PersistenceError> {
        self.he(h)
            .origin
            .ok_or_else(|| PersistenceError::ArrangementInvariant(format!("{h} has no origin")))
    }

    pub(crate) fn face_of(&self, h: HalfedgeId) -> Result<FaceId, PersistenceError> {
        self.he(h)
            .face
            .ok_or_else(|| PersistenceError::ArrangementInvariant(format!("{h} has no face")))
    }

    /// Links `a` before `b` on a boundary cycle.
    pub(crate) fn link(&mut self, a: HalfedgeId, b: HalfedgeId) {
        self.he_mut(a).next = Some(b);
        self.he_mut(b).prev = Some(a);
    }

    pub(crate) fn push_vertex(&mut self, x: f64, y: f64) -> VertexId {
        self.vertices.push(Vertex {
            x,
            y,
            incident: None,
        });
        VertexId((self.vertices.len() - 1) as u32)
    }

    /// New half-edge with its twin temporarily pointing at itself; the
    /// caller pairs it up before construction finishes.
    pub(crate) fn push_halfedge(
        &mut self,
        origin: Option<VertexId>,
        anchor: Option<AnchorId>,
    ) -> HalfedgeId {
        let id = HalfedgeId(self.halfedges.len() as u32);
        self.halfedges.push(Halfedge {
            origin,
            twin: id,
            next: None,
            prev: None,
            face: None,
            anchor,
        });
        id
    }

    pub(crate) fn push_face(&mut self, boundary: HalfedgeId) -> FaceId {
        self.faces.push(Face {
            boundary,
            barcode: None,
        });
        FaceId((self.faces.len() - 1) as u32)
    }

    /// Splits `edge` at a new vertex with the given coordinates and returns
    /// the half-edge that leaves the new vertex along `edge`'s direction.
    pub(crate) fn insert_vertex(
        &mut self,
        edge: HalfedgeId,
        x: f64,
        y: f64,
    ) -> Result<HalfedgeId, PersistenceError> {
        let v = self.push_vertex(x, y);
        let twin = self.he(edge).twin;
        let anchor = self.he(edge).anchor;
        let up = self.push_halfedge(Some(v), anchor);
        let dn = self.push_halfedge(Some(v), anchor);

        let edge_next = self.next_of(edge)?;
        let twin_next = self.next_of(twin)?;
        let edge_face = self.he(edge).face;
        let twin_face = self.he(twin).face;

        self.he_mut(up).twin = twin;
        self.he_mut(up).face = edge_face;
        self.link(up, edge_next);
        self.link(edge, up);
        self.he_mut(edge).twin = dn;

        self.he_mut(dn).twin = edge;
        self.he_mut(dn).face = twin_face;
        self.link(dn, twin_next);
        self.link(twin, dn);
        self.he_mut(twin).twin = up;

        self.vertices[v.idx()].incident = Some(up);
        Ok(up)
    }

    /// Starts an anchor line at the origin of `edge` on the left boundary,
    /// creating the face below the new line.
    ///
    /// The returned half-edge points away from the left edge; its `next`
    /// and its twin's `prev` stay unset until the sweep reaches the line's
    /// first crossing.
    pub(crate) fn create_edge_left(
        &mut self,
        edge: HalfedgeId,
        anchor: AnchorId,
    ) -> Result<HalfedgeId, PersistenceError> {
        let origin = self.he(edge).origin;
        let new_edge = self.push_halfedge(origin, Some(anchor));
        let new_twin = self.push_halfedge(None, Some(anchor));
        let new_face = self.push_face(new_edge);

        let edge_prev = self.prev_of(edge)?;
        let edge_face = self.he(edge).face;

        self.he_mut(new_edge).twin = new_twin;
        self.he_mut(new_edge).prev = Some(edge_prev);
        self.he_mut(new_edge).face = Some(new_face);

        self.he_mut(edge_prev).next = Some(new_edge);
        self.he_mut(edge_prev).face = Some(new_face);
        if let Some(pp) = self.he(edge_prev).prev {
            self.he_mut(pp).face = Some(new_face);
        }

        self.he_mut(new_twin).twin = new_edge;
        self.he_mut(new_twin).next = Some(edge);
        self.he_mut(new_twin).face = edge_face;

        self.he_mut(edge).prev = Some(new_twin);
        Ok(new_edge)
    }

    /// The first anchor whose line meets the left edge at or above the given
    /// height, in left-edge order.
    pub(crate) fn find_least_upper_anchor(&self, y_coord: f64) -> Option<AnchorId> {
        if self.y_values.is_empty() || self.y_values[0] > y_coord {
            return None;
        }
        let best = self.y_values.partition_point(|&v| v <= y_coord) - 1;
        self.left_order
            .iter()
            .copied()
            .find(|a| (self.anchors[a.idx()].y as usize) <= best)
    }

    /// The unbounded cell holding the dual point of the vertical line with
    /// the given x-intercept.
    pub(crate) fn find_vertical_line(&self, x_coord: f64) -> Result<FaceId, PersistenceError> {
        let anchor_x = |h: HalfedgeId| -> Option<f64> {
            let a = self.he(h).anchor?;
            Some(self.x_values[self.anchors[a.idx()].x as usize])
        };
        if let Some(x0) = self.vertical_line_query_list.first().and_then(|&h| anchor_x(h))
            && x0 <= x_coord
        {
            let best = self
                .vertical_line_query_list
                .partition_point(|&h| anchor_x(h).is_some_and(|v| v <= x_coord))
                - 1;
            return self.face_of(self.vertical_line_query_list[best]);
        }
        // no anchor line lies below the query: the lowest cell wins
        self.face_of(self.he(self.bottomright).twin)
    }

    /// Locates the face whose cell contains the dual point `(x, y)`.
    ///
    /// Walks cell to cell from the left edge, crossing whichever boundary
    /// edge separates the current cell from the query.
    pub(crate) fn find_point(&self, x_coord: f64, y_coord: f64) -> Result<FaceId, PersistenceError> {
        let mut finger = match self.find_least_upper_anchor(-y_coord) {
            None => self.next_of(self.he(self.topleft).twin)?,
            Some(a) => self.anchors[a.idx()].line.ok_or_else(|| {
                PersistenceError::ArrangementInvariant(format!("anchor {a} has no line"))
            })?,
        };

        let budget = 2 * self.halfedges.len() + 16;
        let mut steps = 0usize;
        loop {
            steps += 1;
            if steps > budget {
                return Err(PersistenceError::FaceNotLocated {
                    x: x_coord,
                    y: y_coord,
                });
            }

            // the boundary edge of this cell that crosses the query height
            let mut next_pt = self.origin_of(self.next_of(finger)?)?;
            while self.vertices[next_pt.idx()].y > y_coord {
                finger = self.next_of(finger)?;
                next_pt = self.origin_of(self.next_of(finger)?)?;
                steps += 1;
                if steps > budget {
                    return Err(PersistenceError::FaceNotLocated {
                        x: x_coord,
                        y: y_coord,
                    });
                }
            }

            let (px, py) = {
                let p = &self.vertices[next_pt.idx()];
                (p.x, p.y)
            };
            if py == y_coord {
                // the walk hit a vertex exactly on the query height
                if px >= x_coord {
                    return self.face_of(finger);
                }
                let twin = self.he(finger).twin;
                let mut thumb = self.next_of(finger)?;
                let mut deg = 1usize;
                while thumb != twin {
                    thumb = self.next_of(self.he(thumb).twin)?;
                    deg += 1;
                }
                finger = self.next_of(finger)?;
                for _ in 0..deg / 2 {
                    finger = self.next_of(self.he(finger).twin)?;
                }
            } else {
                match self.he(finger).anchor {
                    // a vertical boundary edge: the cell is unbounded rightward
                    None => return self.face_of(finger),
                    Some(a) => {
                        let anc = &self.anchors[a.idx()];
                        let slope = self.x_values[anc.x as usize];
                        let inside = if slope == 0.0 {
                            // horizontal line: an edge walked leftward has its
                            // face above the line, one walked rightward below
                            let ox = self.vertices[self.origin_of(finger)?.idx()].x;
                            let line_y = -self.y_values[anc.y as usize];
                            if px < ox {
                                y_coord > line_y
                            } else {
                                y_coord < line_y
                            }
                        } else {
                            (y_coord + self.y_values[anc.y as usize]) / slope >= x_coord
                        };
                        if inside {
                            return self.face_of(finger);
                        }
                        finger = self.he(finger).twin;
                    }
                }
            }
        }
    }

    /// Locates the face answering barcode queries for the line at `degrees`
    /// (0 to 90) from horizontal with the given offset.
    pub fn face_for_line(&self, degrees: f64, offset: f64) -> Result<FaceId, PersistenceError> {
        if degrees == 90.0 {
            return self.find_vertical_line(-offset);
        }
        if degrees == 0.0 {
            return match self.find_least_upper_anchor(offset) {
                Some(a) => {
                    let line = self.anchors[a.idx()].line.ok_or_else(|| {
                        PersistenceError::ArrangementInvariant(format!("anchor {a} has no line"))
                    })?;
                    self.face_of(line)
                }
                None => self.face_of(self.he(self.topleft).twin),
            };
        }
        let radians = degrees.to_radians();
        let slope = radians.tan();
        let intercept = offset / radians.cos();
        self.find_point(slope, -intercept)
    }

    /// All vertices, for rendering.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All half-edges, for rendering.
    #[inline]
    pub fn halfedges(&self) -> &[Halfedge] {
        &self.halfedges
    }

    /// All faces.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// All anchors, in discovery order.
    #[inline]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// The barcode stored at a face, if the traversal has reached it.
    pub fn barcode(&self, face: FaceId) -> Option<&Barcode> {
        self.faces[face.idx()].barcode.as_ref()
    }
}

impl DebugInvariants for Arrangement {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Arrangement");
    }

    fn validate_invariants(&self) -> Result<(), PersistenceError> {
        let fail = |msg: String| Err(PersistenceError::ArrangementInvariant(msg));

        for (i, he) in self.halfedges.iter().enumerate() {
            let h = HalfedgeId(i as u32);
            if he.twin == h {
                return fail(format!("{h} is its own twin"));
            }
            if self.he(he.twin).twin != h {
                return fail(format!("{h} has a non-mutual twin"));
            }
            if he.anchor != self.he(he.twin).anchor {
                return fail(format!("{h} and its twin disagree on their anchor"));
            }
            if he.origin.is_none() {
                return fail(format!("{h} has no origin"));
            }
            let next = self.next_of(h)?;
            if self.he(next).prev != Some(h) {
                return fail(format!("{h} has a non-mutual next"));
            }
            let prev = self.prev_of(h)?;
            if self.he(prev).next != Some(h) {
                return fail(format!("{h} has a non-mutual prev"));
            }
            if self.he(next).face != he.face {
                return fail(format!("{h} and its next disagree on their face"));
            }
        }

        let mut seen = vec![false; self.halfedges.len()];
        for (i, face) in self.faces.iter().enumerate() {
            let f = FaceId(i as u32);
            let start = face.boundary;
            if self.he(start).face != Some(f) {
                return fail(format!("boundary of {f} does not point back at it"));
            }
            let mut cur = start;
            let mut len = 0usize;
            loop {
                seen[cur.idx()] = true;
                len += 1;
                if len > self.halfedges.len() {
                    return fail(format!("boundary of {f} does not close up"));
                }
                cur = self.next_of(cur)?;
                if cur == start {
                    break;
                }
            }
        }
        // the unbounded side is one cycle as well
        let outer = self
            .halfedges
            .iter()
            .position(|he| he.face.is_none())
            .map(|i| HalfedgeId(i as u32));
        if let Some(start) = outer {
            let mut cur = start;
            let mut len = 0usize;
            loop {
                seen[cur.idx()] = true;
                len += 1;
                if len > self.halfedges.len() {
                    return fail("outer boundary does not close up".into());
                }
                cur = self.next_of(cur)?;
                if cur == start {
                    break;
                }
            }
        }
        if let Some(i) = seen.iter().position(|s| !s) {
            return fail(format!("h{i} belongs to no boundary cycle"));
        }

        for (i, a) in self.anchors.iter().enumerate() {
            let line = a.line.ok_or_else(|| {
                PersistenceError::ArrangementInvariant(format!("anchor a{i} has no line"))
            })?;
            if self.he(line).anchor != Some(AnchorId(i as u32)) {
                return fail(format!("line of anchor a{i} does not point back at it"));
            }
        }
        Ok(())
    }
}
