//! Sweep construction of the arrangement interior.
//!
//! Lines enter along the left boundary of the strip in left-edge order and
//! are swept left to right; a priority queue of pending crossings drives
//! the sweep, ordered by the angular key of each pair (the x-coordinate at
//! which the two lines cross). Each crossing splices a new vertex into both
//! lines, closes the faces below it, and swaps the lines' relative
//! positions; crossings at one point are absorbed into a single vertex.
//! Crossings between lines that are not adjacent at the sweep front are
//! fatal: they mean the queue and the front have diverged.

use hashbrown::HashSet;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::debug_invariants::DebugInvariants;
use crate::error::PersistenceError;
use crate::grid::SupportGrid;

use super::anchor::{Anchor, AnchorId, AngleOrder, almost_equal, left_edge_cmp};
use super::dcel::{Arrangement, HalfedgeId};

/// A pending crossing between the lines of two anchors, `a` below `b` at
/// the time it was queued.
struct Crossing {
    a: AnchorId,
    b: AnchorId,
    x: f64,
    y: f64,
}

impl Crossing {
    fn new(a: AnchorId, b: AnchorId, arr: &Arrangement) -> Result<Self, PersistenceError> {
        let aa = &arr.anchors[a.idx()];
        let bb = &arr.anchors[b.idx()];
        let x = AngleOrder::about(aa, &arr.x_values, &arr.y_values).key(bb);
        if !x.is_finite() {
            return Err(PersistenceError::DegenerateCrossing { x });
        }
        let y = arr.x_values[aa.x as usize] * x - arr.y_values[aa.y as usize];
        Ok(Crossing { a, b, x, y })
    }

    fn x_equal(&self, other: &Crossing) -> bool {
        almost_equal(self.x, other.x)
    }
}

impl PartialEq for Crossing {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Crossing {}

impl PartialOrd for Crossing {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Crossing {
    /// Left to right, then bottom to top, then by anchor ids for
    /// determinism.
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then(self.y.total_cmp(&other.y))
            .then((self.a.0, self.b.0).cmp(&(other.a.0, other.b.0)))
    }
}

/// Builds the arrangement of critical lines for the anchors of `grid`.
///
/// `x_values` and `y_values` are the ascending grade values of the two
/// axes; the line of the anchor at values `(t, d)` is `y = t·x − d` over
/// the strip `x ∈ [0, ∞)`.
pub fn build_arrangement(
    grid: &SupportGrid,
    x_values: Vec<f64>,
    y_values: Vec<f64>,
) -> Result<Arrangement, PersistenceError> {
    let mut arr = Arrangement::new(x_values, y_values);

    arr.anchors = grid
        .anchors()
        .iter()
        .map(|&e| {
            let entry = grid.entry(e);
            Anchor::at(e, entry.x, entry.y, grid.anchor_weight(e))
        })
        .collect();
    let mut order: Vec<AnchorId> = (0..arr.anchors.len() as u32).map(AnchorId).collect();
    order.sort_by(|&i, &j| left_edge_cmp(&arr.anchors[i.idx()], &arr.anchors[j.idx()]));
    arr.left_order = order.clone();

    let mut lines: Vec<HalfedgeId> = Vec::with_capacity(order.len());
    let mut crossings: BinaryHeap<Reverse<Crossing>> = BinaryHeap::new();
    let mut considered: HashSet<(u32, u32)> = HashSet::new();

    // Part 1: vertices and edges along the left boundary
    let mut leftedge = arr.bottomleft;
    let mut prev_y: Option<u32> = None;
    for &aid in &order {
        let ay = arr.anchors[aid.idx()].y;
        if prev_y != Some(ay) {
            // point-line duality negates the offset
            let dual_y = -arr.y_values[ay as usize];
            leftedge = arr.insert_vertex(leftedge, 0.0, dual_y)?;
            prev_y = Some(ay);
        }
        let new_edge = arr.create_edge_left(leftedge, aid)?;
        lines.push(new_edge);
        let a = &mut arr.anchors[aid.idx()];
        a.position = lines.len() - 1;
        a.line = Some(new_edge);
    }

    for w in order.windows(2) {
        let (a, b) = (w[0], w[1]);
        considered.insert((a.0, b.0));
        if arr.anchors[a.idx()].comparable(&arr.anchors[b.idx()]) {
            crossings.push(Reverse(Crossing::new(a, b, &arr)?));
        }
    }

    // Part 2: interior crossings, left to right
    while let Some(Reverse(first)) = crossings.pop() {
        let first_pos = arr.anchors[first.a.idx()].position;
        let mut last_pos = arr.anchors[first.b.idx()].position;
        if last_pos != first_pos + 1 {
            return Err(PersistenceError::NonConsecutiveCrossing {
                first: first_pos,
                second: last_pos,
            });
        }

        // absorb further crossings through the same point
        let mut cur_b = first.b;
        loop {
            let absorb = match crossings.peek() {
                Some(Reverse(top)) => first.x_equal(top) && top.a == cur_b,
                None => false,
            };
            if !absorb {
                break;
            }
            let Some(Reverse(next)) = crossings.pop() else {
                break;
            };
            let pos = arr.anchors[next.b.idx()].position;
            if pos != last_pos + 1 {
                return Err(PersistenceError::NonConsecutiveCrossing {
                    first: last_pos,
                    second: pos,
                });
            }
            last_pos += 1;
            cur_b = next.b;
        }

        let new_vertex = arr.push_vertex(first.x, first.y);

        // splice every involved line through the new vertex, closing the
        // face between each adjacent pair
        let first_incoming = lines[first_pos];
        let mut prev_incoming: Option<HalfedgeId> = None;
        let mut prev_new_edge: Option<HalfedgeId> = None;
        for cur_pos in first_pos..=last_pos {
            let incoming = lines[cur_pos];
            let twin = arr.he(incoming).twin;
            arr.he_mut(twin).origin = Some(new_vertex);

            let anchor = arr.he(incoming).anchor;
            let new_edge = arr.push_halfedge(Some(new_vertex), anchor);
            let new_twin = arr.push_halfedge(None, anchor);
            arr.he_mut(new_edge).twin = new_twin;
            arr.he_mut(new_twin).twin = new_edge;

            if let (Some(prev_in), Some(prev_new)) = (prev_incoming, prev_new_edge) {
                let prev_in_twin = arr.he(prev_in).twin;
                arr.link(incoming, prev_in_twin);

                let new_face = arr.push_face(new_twin);
                arr.he_mut(new_twin).face = Some(new_face);
                arr.he_mut(prev_new).face = Some(new_face);
                arr.link(new_twin, prev_new);
            } else {
                let last_twin = arr.he(lines[last_pos]).twin;
                let f = arr.he(last_twin).face;
                arr.link(new_twin, last_twin);
                arr.he_mut(new_twin).face = f;
            }

            prev_incoming = Some(incoming);
            prev_new_edge = Some(new_edge);

            if cur_pos == last_pos {
                arr.link(first_incoming, new_edge);
                let f = arr.he(first_incoming).face;
                arr.he_mut(new_edge).face = f;
            }

            lines[cur_pos] = new_edge;
            if let Some(aid) = anchor {
                arr.anchors[aid.idx()].position = last_pos - (cur_pos - first_pos);
            }
        }

        // the lines leave the crossing in the opposite vertical order
        lines[first_pos..=last_pos].reverse();

        if first_pos > 0 {
            maybe_push_crossing(
                &mut crossings,
                &mut considered,
                &arr,
                lines[first_pos - 1],
                lines[first_pos],
            )?;
        }
        if last_pos + 1 < lines.len() {
            maybe_push_crossing(
                &mut crossings,
                &mut considered,
                &arr,
                lines[last_pos],
                lines[last_pos + 1],
            )?;
        }
    }

    // Part 3: tie every line off at the right boundary, one vertex per
    // distinct slope
    let mut rightedge = arr.bottomright;
    let mut cur_x: Option<u32> = None;
    for &incoming in &lines {
        let aid = arr.he(incoming).anchor.ok_or_else(|| {
            PersistenceError::ArrangementInvariant(format!("{incoming} lies on no line"))
        })?;
        let ax = arr.anchors[aid.idx()].x;
        if cur_x != Some(ax) {
            cur_x = Some(ax);
            let slope = arr.x_values[ax as usize];
            let y = if slope > 0.0 {
                f64::INFINITY
            } else if slope < 0.0 {
                f64::NEG_INFINITY
            } else {
                0.0
            };
            rightedge = arr.insert_vertex(rightedge, f64::INFINITY, y)?;
        } else {
            arr.vertical_line_query_list.pop();
        }
        let twin = arr.he(incoming).twin;
        arr.vertical_line_query_list.push(twin);

        let cur_vertex = arr.he(rightedge).origin;
        arr.he_mut(twin).origin = cur_vertex;

        let right_twin = arr.he(rightedge).twin;
        let rt_next = arr.next_of(right_twin)?;
        arr.link(incoming, rt_next);
        let f = arr.he(incoming).face;
        arr.he_mut(rt_next).face = f;

        arr.link(right_twin, twin);
        let tf = arr.he(twin).face;
        arr.he_mut(right_twin).face = tf;
    }

    log::debug!(
        "arrangement: {} anchors, {} vertices, {} halfedges, {} faces",
        arr.anchors.len(),
        arr.vertices.len(),
        arr.halfedges.len(),
        arr.faces.len()
    );
    arr.debug_assert_invariants();
    Ok(arr)
}

fn maybe_push_crossing(
    crossings: &mut BinaryHeap<Reverse<Crossing>>,
    considered: &mut HashSet<(u32, u32)>,
    arr: &Arrangement,
    lower: HalfedgeId,
    upper: HalfedgeId,
) -> Result<(), PersistenceError> {
    let (Some(a), Some(b)) = (arr.he(lower).anchor, arr.he(upper).anchor) else {
        return Ok(());
    };
    if considered.contains(&(a.0, b.0)) || considered.contains(&(b.0, a.0)) {
        return Ok(());
    }
    considered.insert((a.0, b.0));
    if arr.anchors[a.idx()].comparable(&arr.anchors[b.idx()]) {
        crossings.push(Reverse(Crossing::new(a, b, arr)?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::betti::SupportPoint;

    fn pt(x: u32, y: u32) -> SupportPoint {
        SupportPoint {
            x,
            y,
            betti0: 1,
            betti1: 0,
        }
    }

    fn values(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn euler_characteristic(arr: &Arrangement) -> i64 {
        let v = arr.vertices().len() as i64;
        let e = (arr.halfedges().len() / 2) as i64;
        // bounded faces plus the unbounded one
        let f = arr.num_faces() as i64 + 1;
        v - e + f
    }

    #[test]
    fn empty_grid_yields_the_bounding_box() {
        let grid = SupportGrid::fill_and_find_anchors(&[pt(0, 0)], 1, 1).unwrap();
        let arr = build_arrangement(&grid, values(1), values(1)).unwrap();
        assert_eq!(arr.anchors().len(), 0);
        assert_eq!(arr.num_faces(), 1);
        assert_eq!(arr.vertices().len(), 4);
        assert!(arr.validate_invariants().is_ok());
        assert_eq!(euler_characteristic(&arr), 2);
    }

    #[test]
    fn single_anchor_splits_the_strip_in_two() {
        let grid = SupportGrid::fill_and_find_anchors(&[pt(0, 2), pt(2, 0)], 3, 3).unwrap();
        assert_eq!(grid.anchors().len(), 1);
        let arr = build_arrangement(&grid, values(3), values(3)).unwrap();
        assert_eq!(arr.anchors().len(), 1);
        assert_eq!(arr.num_faces(), 2);
        assert_eq!(arr.vertices().len(), 6);
        assert_eq!(arr.halfedges().len(), 14);
        assert!(arr.anchors()[0].line.is_some());
        assert!(arr.validate_invariants().is_ok());
        assert_eq!(euler_characteristic(&arr), 2);
    }

    #[test]
    fn crossing_lines_swap_positions_and_close_a_face() {
        // anchors (0,2), (1,1), (1,2) and (2,2); the lines of (1,1) and
        // (2,2) cross at the dual point (1, 0)
        let pts = [pt(0, 1), pt(0, 2), pt(1, 0), pt(2, 2)];
        let grid = SupportGrid::fill_and_find_anchors(&pts, 3, 3).unwrap();
        let anchors: Vec<(u32, u32)> = grid
            .anchors()
            .iter()
            .map(|&e| {
                let en = grid.entry(e);
                (en.x, en.y)
            })
            .collect();
        assert_eq!(anchors, vec![(0, 2), (1, 1), (1, 2), (2, 2)]);

        let arr = build_arrangement(&grid, values(3), values(3)).unwrap();
        assert!(arr.validate_invariants().is_ok());
        assert_eq!(arr.num_faces(), 6);
        assert_eq!(arr.vertices().len(), 10);
        assert_eq!(arr.halfedges().len(), 30);
        assert_eq!(euler_characteristic(&arr), 2);
        assert!(format!("{arr:?}").starts_with("Arrangement"));

        // the crossing vertex sits at (1, 0)
        assert!(
            arr.vertices()
                .iter()
                .any(|v| v.x == 1.0 && v.y == 0.0)
        );
    }

    #[test]
    fn every_face_is_reachable_by_point_location() {
        let pts = [pt(0, 1), pt(0, 2), pt(1, 0), pt(2, 2)];
        let grid = SupportGrid::fill_and_find_anchors(&pts, 3, 3).unwrap();
        let arr = build_arrangement(&grid, values(3), values(3)).unwrap();

        // one dual point per cell of the subdivision
        let queries = [
            (1.0, 5.0),
            (0.5, -0.8),
            (2.0, 1.5),
            (1.0, -0.5),
            (1.0, -1.5),
            (1.0, -3.0),
        ];
        let mut hit = vec![false; arr.num_faces()];
        for &(x, y) in &queries {
            let f = arr.find_point(x, y).unwrap();
            assert!(!hit[f.idx()], "two queries landed in {f}");
            hit[f.idx()] = true;
        }
        assert!(hit.iter().all(|&h| h), "unreached faces: {hit:?}");
    }

    #[test]
    fn vertical_and_horizontal_queries_resolve_to_faces() {
        let pts = [pt(0, 1), pt(0, 2), pt(1, 0), pt(2, 2)];
        let grid = SupportGrid::fill_and_find_anchors(&pts, 3, 3).unwrap();
        let arr = build_arrangement(&grid, values(3), values(3)).unwrap();

        arr.face_for_line(90.0, -0.5).unwrap();
        arr.face_for_line(0.0, 1.5).unwrap();
        arr.face_for_line(45.0, 0.0).unwrap();
    }
}
