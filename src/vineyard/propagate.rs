//! Vineyard propagation of barcodes across the arrangement.
//!
//! One RU-decomposition of the two boundary maps is computed from scratch
//! for the topmost cell, then carried from face to face along a spanning
//! path of the dual graph. Crossing into a neighboring face changes the
//! one-parameter order of the columns; the decomposition is kept current by
//! bubble-sorting the columns into the new order, one adjacent transposition
//! at a time, with the update rules of Cohen-Steiner, Edelsbrunner and
//! Morozov. Each face's barcode is read off the decomposition the first
//! time the path enters it.
//!
//! The upper-triangular factors are stored transposed, so every row
//! operation on a factor is a column operation on the stored matrix.
//!
//! Column order within a face comes from a sample point in the open cell:
//! each column lifts to the cheapest grid entry dominating its grade, and
//! entries are ranked by their projection onto the line dual to the sample
//! point. The entry order is constant across the cell, which is exactly
//! what makes the stored barcode valid for every line the cell contains.

use hashbrown::HashMap;

use crate::arrangement::{Arrangement, FaceId, HalfedgeId};
use crate::debug_invariants::DebugInvariants;
use crate::error::PersistenceError;
use crate::grade::Grade;
use crate::grid::{EntryId, SupportGrid};
use crate::matrix::{BigradedMatrix, SparseBinaryMatrix};

use super::barcode::Barcode;

/// Computes and stores a barcode at every face of the arrangement.
///
/// `low` and `high` are the boundary maps `∂_d` and `∂_{d+1}` with columns
/// grouped by grade; `grid` supplies the template points the bars index
/// into.
///
/// # Errors
/// Propagates matrix errors, and
/// [`PersistenceError::ArrangementInvariant`] if the subdivision is
/// malformed.
pub fn propagate_barcodes(
    arr: &mut Arrangement,
    grid: &SupportGrid,
    low: &BigradedMatrix,
    high: &BigradedMatrix,
) -> Result<(), PersistenceError> {
    let low_grades = low.column_grades();
    let high_grades = high.column_grades();

    let root = arr.face_of(arr.he(arr.topleft).twin)?;
    let (x0, y0) = face_sample(arr, root)?;
    let (low_order, low_lifts) =
        order_columns(grid, &arr.x_values, &arr.y_values, x0, y0, &low_grades);
    let (high_order, high_lifts) =
        order_columns(grid, &arr.x_values, &arr.y_values, x0, y0, &high_grades);

    let mut state = RuState::initialize(low, high, &low_order, &high_order)?;
    state.debug_assert_invariants();
    arr.faces[root.idx()].barcode = Some(state.read_barcode(grid, &low_lifts, &high_lifts));

    let path = spanning_path(arr)?;
    log::debug!(
        "propagating barcodes along {} crossings over {} faces",
        path.len(),
        arr.faces.len()
    );

    let mut rank_low = vec![0usize; low_grades.len()];
    let mut rank_high = vec![0usize; high_grades.len()];
    for h in path {
        let f = arr.face_of(h)?;
        let (x0, y0) = face_sample(arr, f)?;
        let (lo, ll) = order_columns(grid, &arr.x_values, &arr.y_values, x0, y0, &low_grades);
        let (ho, hl) = order_columns(grid, &arr.x_values, &arr.y_values, x0, y0, &high_grades);
        for (p, &c) in lo.iter().enumerate() {
            rank_low[c] = p;
        }
        for (p, &c) in ho.iter().enumerate() {
            rank_high[c] = p;
        }
        state.reorder_low(&rank_low)?;
        state.reorder_high(&rank_high)?;
        state.debug_assert_invariants();
        if arr.faces[f.idx()].barcode.is_none() {
            arr.faces[f.idx()].barcode = Some(state.read_barcode(grid, &ll, &hl));
        }
    }
    Ok(())
}

/// A dual point strictly inside the cell of `f`.
///
/// The x-coordinate is taken in the first gap between distinct vertex
/// x-coordinates of the face (one unit right of the last vertex for cells
/// unbounded rightward), so the vertical through it meets no vertex. The
/// y-coordinate is then pinned between the one or two anchor edges that
/// vertical crosses; a half-edge running rightward has its face below the
/// line, one running leftward above.
fn face_sample(arr: &Arrangement, f: FaceId) -> Result<(f64, f64), PersistenceError> {
    let start = arr.faces[f.idx()].boundary;
    let mut cycle = Vec::new();
    let mut cur = start;
    loop {
        cycle.push(cur);
        cur = arr.next_of(cur)?;
        if cur == start {
            break;
        }
        if cycle.len() > arr.halfedges.len() {
            return Err(PersistenceError::ArrangementInvariant(format!(
                "boundary of {f} does not close up"
            )));
        }
    }

    let mut xs: Vec<f64> = Vec::new();
    for &h in &cycle {
        let v = &arr.vertices[arr.origin_of(h)?.idx()];
        if v.x.is_finite() {
            xs.push(v.x);
        }
    }
    xs.sort_unstable_by(f64::total_cmp);
    xs.dedup();
    let x0 = match xs.len() {
        0 => {
            return Err(PersistenceError::ArrangementInvariant(format!(
                "{f} has no finite vertex"
            )));
        }
        1 => xs[0] + 1.0,
        _ => (xs[0] + xs[1]) / 2.0,
    };

    // anchor edges the vertical at x0 crosses, with the side the face is on
    let mut crossed: Vec<(f64, bool)> = Vec::new();
    for &h in &cycle {
        let Some(a) = arr.he(h).anchor else { continue };
        let p = &arr.vertices[arr.origin_of(h)?.idx()];
        let q = &arr.vertices[arr.origin_of(arr.next_of(h)?)?.idx()];
        let (px, qx) = (p.x, q.x);
        if px.min(qx) < x0 && x0 < px.max(qx) {
            let anc = &arr.anchors[a.idx()];
            let value = arr.x_values[anc.x as usize] * x0 - arr.y_values[anc.y as usize];
            crossed.push((value, qx > px));
        }
    }
    let y0 = match crossed.as_slice() {
        [] => 0.0,
        &[(v, rightward)] => {
            if rightward {
                v - 1.0
            } else {
                v + 1.0
            }
        }
        &[(v, _), (w, _)] => (v + w) / 2.0,
        _ => {
            return Err(PersistenceError::ArrangementInvariant(format!(
                "{f} is not convex at x = {x0}"
            )));
        }
    };
    Ok((x0, y0))
}

/// Ranks the columns along the line dual to `(x0, y0)` and records each
/// column's lift.
///
/// A column lifts to the grid entry dominating its grade whose projection
/// onto the line is least (ties to the earliest entry); columns dominated
/// by no entry keep their own projection and sort after lifted ties. The
/// returned order lists column ids by ascending projection.
fn order_columns(
    grid: &SupportGrid,
    x_values: &[f64],
    y_values: &[f64],
    x0: f64,
    y0: f64,
    grades: &[Grade],
) -> (Vec<usize>, Vec<Option<EntryId>>) {
    let push_of = |x: u32, y: u32| -> f64 {
        let t = x_values[x as usize];
        let d = y_values[y as usize];
        t.max((d + y0) / x0)
    };
    let entry_push: Vec<f64> = grid
        .entries()
        .iter()
        .map(|e| push_of(e.x, e.y))
        .collect();

    let mut memo: HashMap<Grade, Option<EntryId>> = HashMap::new();
    let mut lifts: Vec<Option<EntryId>> = Vec::with_capacity(grades.len());
    for g in grades {
        let lift = *memo.entry(*g).or_insert_with(|| {
            let mut best: Option<(f64, u32)> = None;
            for (i, e) in grid.entries().iter().enumerate() {
                if e.x >= g.x && e.y >= g.y {
                    let better = match best {
                        None => true,
                        Some((bp, _)) => entry_push[i].total_cmp(&bp).is_lt(),
                    };
                    if better {
                        best = Some((entry_push[i], i as u32));
                    }
                }
            }
            best.map(|(_, i)| EntryId(i))
        });
        lifts.push(lift);
    }

    let key = |j: usize| -> (f64, u32) {
        match lifts[j] {
            Some(e) => (entry_push[e.idx()], e.0),
            None => (push_of(grades[j].x, grades[j].y), u32::MAX),
        }
    };
    let mut order: Vec<usize> = (0..grades.len()).collect();
    order.sort_by(|&a, &b| {
        let (ka, kb) = (key(a), key(b));
        ka.0.total_cmp(&kb.0).then(ka.1.cmp(&kb.1)).then(a.cmp(&b))
    });
    (order, lifts)
}

/// The RU-decompositions of both boundary maps under the current column
/// order, plus the permutations tying positions back to column ids.
///
/// `r_high`'s rows are indexed by the *positions* of the low columns, so a
/// low transposition relabels them. The `u_*` matrices store the transpose
/// of the upper-triangular factors: stored column `j` holds row `j` of the
/// factor.
struct RuState {
    r_low: SparseBinaryMatrix,
    u_low: SparseBinaryMatrix,
    r_high: SparseBinaryMatrix,
    u_high: SparseBinaryMatrix,
    /// position -> low column id
    cur_low: Vec<usize>,
    /// low column id -> position
    pos_low: Vec<usize>,
    cur_high: Vec<usize>,
    pos_high: Vec<usize>,
}

impl RuState {
    /// Builds and reduces both decompositions for the given initial orders.
    fn initialize(
        low: &BigradedMatrix,
        high: &BigradedMatrix,
        low_order: &[usize],
        high_order: &[usize],
    ) -> Result<Self, PersistenceError> {
        let n_low = low.mat.width();
        let n_high = high.mat.width();
        let mut pos_low = vec![0usize; n_low];
        for (p, &c) in low_order.iter().enumerate() {
            pos_low[c] = p;
        }
        let mut pos_high = vec![0usize; n_high];
        for (p, &c) in high_order.iter().enumerate() {
            pos_high[c] = p;
        }

        let mut r_low = SparseBinaryMatrix::new(low.mat.height(), 0);
        for &c in low_order {
            r_low.push_column(low.mat.column(c).to_vec())?;
        }
        let mut r_high = SparseBinaryMatrix::new(n_low, 0);
        for &c in high_order {
            let mut rows: Vec<u32> = high
                .mat
                .column(c)
                .iter()
                .map(|&r| pos_low[r as usize] as u32)
                .collect();
            rows.sort_unstable();
            r_high.push_column(rows)?;
        }

        let mut state = RuState {
            r_low,
            u_low: SparseBinaryMatrix::identity(n_low),
            r_high,
            u_high: SparseBinaryMatrix::identity(n_high),
            cur_low: low_order.to_vec(),
            pos_low,
            cur_high: high_order.to_vec(),
            pos_high,
        };

        // replay the reductions onto the stored transposes: adding column k
        // into column j of R adds row j into row k of the factor
        let mut ops: Vec<(usize, usize)> = Vec::new();
        state.r_low.col_reduce_with(|k, j| ops.push((k, j)))?;
        for (k, j) in ops.drain(..) {
            state.u_low.add_column(j, k)?;
        }
        state.r_high.col_reduce_with(|k, j| ops.push((k, j)))?;
        for (k, j) in ops {
            state.u_high.add_column(j, k)?;
        }
        Ok(state)
    }

    /// Bubbles the low columns into the order given by `rank`, applying one
    /// vineyard update per adjacent transposition.
    fn reorder_low(&mut self, rank: &[usize]) -> Result<(), PersistenceError> {
        for i in 1..self.cur_low.len() {
            let mut j = i;
            while j > 0 && rank[self.cur_low[j - 1]] > rank[self.cur_low[j]] {
                self.transpose_low(j - 1)?;
                j -= 1;
            }
        }
        Ok(())
    }

    fn reorder_high(&mut self, rank: &[usize]) -> Result<(), PersistenceError> {
        for i in 1..self.cur_high.len() {
            let mut j = i;
            while j > 0 && rank[self.cur_high[j - 1]] > rank[self.cur_high[j]] {
                self.transpose_high(j - 1)?;
                j -= 1;
            }
        }
        Ok(())
    }

    /// Transposes the low columns at positions `a` and `a + 1`, keeping both
    /// decompositions reduced.
    ///
    /// The case split is on the positivity (zeroness) of the two columns;
    /// the high matrix sees the transposition as a row relabelling, with a
    /// column fixup when the swap would collide two pivots.
    fn transpose_low(&mut self, a: usize) -> Result<(), PersistenceError> {
        let b = a + 1;
        let ar = a as u32;
        let a_positive = self.r_low.low(a).is_none();
        let b_positive = self.r_low.low(b).is_none();

        if a_positive && b_positive {
            let k = self.r_high.find_low(ar);
            let l = self.r_high.find_low(ar + 1);
            let coupled = l.is_some_and(|l| self.r_high.entry(ar, l));
            // column a of R is zero, so the coupling entry may be dropped
            self.u_low.clear_entry(b as u32, a)?;
            self.u_low.swap_adjacent_rows(ar)?;
            self.u_low.swap_adjacent_columns(a)?;
            self.r_high.swap_adjacent_rows(ar)?;
            if let (Some(k), Some(l), true) = (k, l, coupled) {
                if k < l {
                    self.r_high.add_column(k, l)?;
                    self.u_high.add_column(l, k)?;
                } else {
                    self.r_high.add_column(l, k)?;
                    self.u_high.add_column(k, l)?;
                }
            }
        } else if a_positive {
            self.u_low.clear_entry(b as u32, a)?;
            self.r_low.swap_adjacent_columns(a)?;
            self.r_high.swap_adjacent_rows(ar)?;
            self.u_low.swap_adjacent_rows(ar)?;
            self.u_low.swap_adjacent_columns(a)?;
        } else if b_positive {
            self.r_high.swap_adjacent_rows(ar)?;
            if self.u_low.entry(b as u32, a) {
                self.u_low.add_column(b, a)?;
                self.u_low.swap_adjacent_columns(a)?;
                self.u_low.add_column(b, a)?;
            } else {
                self.r_low.swap_adjacent_columns(a)?;
                self.u_low.swap_adjacent_columns(a)?;
            }
            self.u_low.swap_adjacent_rows(ar)?;
        } else {
            self.r_high.swap_adjacent_rows(ar)?;
            if self.u_low.entry(b as u32, a) {
                self.u_low.add_column(b, a)?;
                self.u_low.swap_adjacent_columns(a)?;
                if self.r_low.low(a) < self.r_low.low(b) {
                    self.r_low.add_column(a, b)?;
                    self.r_low.swap_adjacent_columns(a)?;
                } else {
                    self.r_low.add_column(a, b)?;
                    self.r_low.swap_adjacent_columns(a)?;
                    self.r_low.add_column(a, b)?;
                    self.u_low.add_column(b, a)?;
                }
            } else {
                self.r_low.swap_adjacent_columns(a)?;
                self.u_low.swap_adjacent_columns(a)?;
            }
            self.u_low.swap_adjacent_rows(ar)?;
        }

        let (ca, cb) = (self.cur_low[a], self.cur_low[b]);
        self.cur_low.swap(a, b);
        self.pos_low[ca] = b;
        self.pos_low[cb] = a;
        Ok(())
    }

    /// Transposes the high columns at positions `a` and `a + 1`. Nothing
    /// above dimension `d + 1` is tracked, so no row relabelling follows.
    fn transpose_high(&mut self, a: usize) -> Result<(), PersistenceError> {
        let b = a + 1;
        let ar = a as u32;
        let a_positive = self.r_high.low(a).is_none();
        let b_positive = self.r_high.low(b).is_none();

        if a_positive {
            if !b_positive {
                self.r_high.swap_adjacent_columns(a)?;
            }
            self.u_high.clear_entry(b as u32, a)?;
            self.u_high.swap_adjacent_rows(ar)?;
            self.u_high.swap_adjacent_columns(a)?;
        } else if b_positive {
            if self.u_high.entry(b as u32, a) {
                self.u_high.add_column(b, a)?;
                self.u_high.swap_adjacent_columns(a)?;
                self.u_high.add_column(b, a)?;
            } else {
                self.r_high.swap_adjacent_columns(a)?;
                self.u_high.swap_adjacent_columns(a)?;
            }
            self.u_high.swap_adjacent_rows(ar)?;
        } else {
            if self.u_high.entry(b as u32, a) {
                self.u_high.add_column(b, a)?;
                self.u_high.swap_adjacent_columns(a)?;
                if self.r_high.low(a) < self.r_high.low(b) {
                    self.r_high.add_column(a, b)?;
                    self.r_high.swap_adjacent_columns(a)?;
                } else {
                    self.r_high.add_column(a, b)?;
                    self.r_high.swap_adjacent_columns(a)?;
                    self.r_high.add_column(a, b)?;
                    self.u_high.add_column(b, a)?;
                }
            } else {
                self.r_high.swap_adjacent_columns(a)?;
                self.u_high.swap_adjacent_columns(a)?;
            }
            self.u_high.swap_adjacent_rows(ar)?;
        }

        let (ca, cb) = (self.cur_high[a], self.cur_high[b]);
        self.cur_high.swap(a, b);
        self.pos_high[ca] = b;
        self.pos_high[cb] = a;
        Ok(())
    }

    /// Reads the barcode off the current decomposition.
    ///
    /// Every zero low column is a class; its pairing partner, if any, is the
    /// high column whose pivot sits at the class's position. Endpoints are
    /// the template-point indexes of the columns' lifts; pairs lifting to
    /// one point are invisible on every line of the cell and are dropped. A
    /// paired class whose death does not lift outlives every template point
    /// and counts as essential.
    fn read_barcode(
        &self,
        grid: &SupportGrid,
        low_lifts: &[Option<EntryId>],
        high_lifts: &[Option<EntryId>],
    ) -> Barcode {
        let point_of = |e: EntryId| grid.entry(e).index;
        let mut bc = Barcode::new();
        for c in 0..self.r_low.width() {
            if self.r_low.low(c).is_some() {
                continue;
            }
            let Some(birth) = low_lifts[self.cur_low[c]].map(point_of) else {
                continue;
            };
            match self.r_high.find_low(c as u32) {
                Some(s) => match high_lifts[self.cur_high[s]].map(point_of) {
                    Some(death) if death != birth => bc.add_bar(birth, death),
                    Some(_) => {}
                    None => bc.add_essential(birth),
                },
                None => bc.add_essential(birth),
            }
        }
        bc.finalize();
        bc
    }
}

impl DebugInvariants for RuState {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "RuState");
    }

    fn validate_invariants(&self) -> Result<(), PersistenceError> {
        let fail = |msg: String| Err(PersistenceError::InvariantViolation(msg));
        if !self.r_low.is_reduced() || !self.r_high.is_reduced() {
            return fail("RU state lost reducedness".into());
        }
        // stored transposes of upper-triangular factors are lower triangular
        for (name, u) in [("low", &self.u_low), ("high", &self.u_high)] {
            for j in 0..u.width() {
                if !u.entry(j as u32, j) {
                    return fail(format!("{name} factor has a zero diagonal at {j}"));
                }
                if u.column(j).first().is_some_and(|&r| (r as usize) < j) {
                    return fail(format!("{name} factor is not triangular at column {j}"));
                }
            }
        }
        for (p, &c) in self.cur_low.iter().enumerate() {
            if self.pos_low[c] != p {
                return fail(format!("low permutation out of sync at position {p}"));
            }
        }
        for (p, &c) in self.cur_high.iter().enumerate() {
            if self.pos_high[c] != p {
                return fail(format!("high permutation out of sync at position {p}"));
            }
        }
        Ok(())
    }
}

/// Union-find over faces for the spanning-tree construction.
struct DisjointSets {
    parent: Vec<u32>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        DisjointSets {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    /// Merges the two sets; `false` if they were one already.
    fn union(&mut self, a: u32, b: u32) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[ra as usize] = rb;
        true
    }
}

/// A walk through every face, starting from the topmost cell.
///
/// A minimal spanning tree of the dual graph (edges weighted by the crossing
/// cost of the shared anchor) is traversed depth first, heavier branches
/// first; the returned half-edges point into the face entered at each step,
/// so backtracking reuses the twin of the edge the walk came in by. Every
/// face but the root appears exactly once as a first entry.
fn spanning_path(arr: &Arrangement) -> Result<Vec<HalfedgeId>, PersistenceError> {
    let nf = arr.faces.len();
    let root = arr.face_of(arr.he(arr.topleft).twin)?;
    if nf == 1 {
        return Ok(Vec::new());
    }

    let mut sets = DisjointSets::new(nf);
    let mut adj: Vec<Vec<(u32, HalfedgeId, u64)>> = vec![Vec::new(); nf];
    for e in arr.dual_edges() {
        let (f1, f2) = (e.faces.0.0, e.faces.1.0);
        if sets.union(f1, f2) {
            adj[f1 as usize].push((f2, e.halfedge, e.weight));
            adj[f2 as usize].push((f1, e.halfedge, e.weight));
        }
    }

    // orient away from the root
    let mut parent = vec![u32::MAX; nf];
    let mut preorder: Vec<u32> = Vec::with_capacity(nf);
    let mut seen = vec![false; nf];
    seen[root.idx()] = true;
    let mut stack = vec![root.0];
    while let Some(f) = stack.pop() {
        preorder.push(f);
        for &(g, _, _) in &adj[f as usize] {
            if !seen[g as usize] {
                seen[g as usize] = true;
                parent[g as usize] = f;
                stack.push(g);
            }
        }
    }
    if preorder.len() != nf {
        return Err(PersistenceError::ArrangementInvariant(
            "dual graph of the subdivision is disconnected".into(),
        ));
    }

    let mut subtree = vec![0u64; nf];
    for &f in preorder.iter().rev() {
        for &(g, _, w) in &adj[f as usize] {
            if parent[g as usize] == f {
                subtree[f as usize] += subtree[g as usize] + w;
            }
        }
    }

    // children by ascending branch weight, so the stack pops heaviest first
    let order_children = |f: u32| -> Vec<(u32, HalfedgeId)> {
        let mut kids: Vec<(u64, u32, HalfedgeId)> = adj[f as usize]
            .iter()
            .filter(|&&(g, _, _)| parent[g as usize] == f)
            .map(|&(g, h, w)| (subtree[g as usize] + w, g, h))
            .collect();
        kids.sort_unstable_by_key(|&(wt, g, _)| (wt, std::cmp::Reverse(g)));
        kids.into_iter().map(|(_, g, h)| (g, h)).collect()
    };

    enum Step {
        Enter(u32, HalfedgeId),
        Leave(HalfedgeId),
    }
    let mut path = Vec::with_capacity(2 * (nf - 1));
    let mut actions: Vec<Step> = Vec::new();
    let descend = |f: u32, actions: &mut Vec<Step>| {
        for (g, h) in order_children(f) {
            let into = if arr.he(h).face == Some(FaceId(g)) {
                h
            } else {
                arr.he(h).twin
            };
            actions.push(Step::Leave(arr.he(into).twin));
            actions.push(Step::Enter(g, into));
        }
    };
    descend(root.0, &mut actions);
    while let Some(step) = actions.pop() {
        match step {
            Step::Enter(f, into) => {
                path.push(into);
                descend(f, &mut actions);
            }
            Step::Leave(h) => path.push(h),
        }
    }
    Ok(path)
}
