//! The sparse support-point grid and anchor detection.
//!
//! One cross-linked entry per grade with nonzero Betti support (plus the
//! anchors synthesized between them): each entry stores its nearest nonempty
//! neighbor below in the same column (`down`) and to the left in the same
//! row (`left`), realizing a sparse two-dimensional linked grid without
//! storing empty cells. Entries live in an arena; the links are plain arena
//! indices with no ownership implied.
//!
//! Scanning positions in lexicographic (column-major) order, a position is a
//! *strict anchor* when both its links are already occupied, and a
//! *non-strict anchor* when it is itself a support point and at least one
//! link is occupied. Every anchor induces one critical line of the
//! arrangement.

use crate::betti::SupportPoint;
use crate::error::PersistenceError;
use crate::grade::Grade;
use serde::{Deserialize, Serialize};

/// Stable arena index of one grid entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntryId(pub u32);

impl EntryId {
    /// The arena slot this id refers to.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A run of matrix columns sharing one appearance grade, lifted to a grid
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeRun {
    /// The shared grade.
    pub grade: Grade,
    /// How many consecutive matrix columns carry it.
    pub num_cols: u32,
    /// Dimension-index of the last column in the run.
    pub last_index: u32,
}

/// One occupied position of the sparse grid.
#[derive(Debug, Clone)]
pub struct GridEntry {
    /// x-coordinate in the discrete grading grid.
    pub x: u32,
    /// y-coordinate in the discrete grading grid.
    pub y: u32,
    /// Position in the augmented support-point list.
    pub index: u32,
    /// Nearest occupied entry below in this column.
    pub down: Option<EntryId>,
    /// Nearest occupied entry to the left in this row.
    pub left: Option<EntryId>,
    /// Whether this position is an anchor (strict or non-strict).
    pub is_anchor: bool,
    /// Whether this position carries nonzero Betti multiplicities.
    pub is_support: bool,
    /// Grade runs of dimension-`d` columns lifted to this entry.
    pub low_grades: Vec<GradeRun>,
    /// Grade runs of dimension-`d+1` columns lifted to this entry.
    pub high_grades: Vec<GradeRun>,
    /// Total dimension-`d` columns lifted here.
    pub low_count: u32,
    /// Total dimension-`d+1` columns lifted here.
    pub high_count: u32,
}

/// The cross-linked sparse grid of support points and anchors.
pub struct SupportGrid {
    width: usize,
    height: usize,
    entries: Vec<GridEntry>,
    /// Topmost occupied entry per column.
    cols: Vec<Option<EntryId>>,
    /// Rightmost occupied entry per row.
    rows: Vec<Option<EntryId>>,
    /// Anchors in discovery (lexicographic) order.
    anchors: Vec<EntryId>,
    /// The input points plus zero-multiplicity points synthesized for
    /// anchors that are not support points, in entry-index order.
    points: Vec<SupportPoint>,
}

impl SupportGrid {
    /// Builds the grid from support points sorted lexicographically and
    /// reports every anchor discovered.
    ///
    /// # Errors
    /// [`PersistenceError::UnsortedSupportPoints`] if the input order is
    /// wrong; the scan relies on consuming points in lexicographic order.
    ///
    /// # Complexity
    /// `O(width · height)` over the *distinct* coordinate counts, not the
    /// raw input size.
    pub fn fill_and_find_anchors(
        points: &[SupportPoint],
        width: usize,
        height: usize,
    ) -> Result<Self, PersistenceError> {
        for (i, w) in points.windows(2).enumerate() {
            let (a, b) = (w[0].grade(), w[1].grade());
            if crate::grade::lex_cmp(&a, &b) != std::cmp::Ordering::Less {
                return Err(PersistenceError::UnsortedSupportPoints { index: i + 1 });
            }
        }

        let mut grid = SupportGrid {
            width,
            height,
            entries: Vec::new(),
            cols: vec![None; width],
            rows: vec![None; height],
            anchors: Vec::new(),
            points: points.to_vec(),
        };

        let mut next_pt = 0usize;
        for i in 0..width {
            for j in 0..height {
                let is_support = next_pt < points.len()
                    && points[next_pt].x == i as u32
                    && points[next_pt].y == j as u32;
                let is_anchor = (grid.cols[i].is_some() && grid.rows[j].is_some())
                    || (is_support && (grid.cols[i].is_some() || grid.rows[j].is_some()));
                if !(is_support || is_anchor) {
                    continue;
                }

                let index = if is_support {
                    next_pt += 1;
                    (next_pt - 1) as u32
                } else {
                    // synthesize a zero-multiplicity point for the anchor
                    grid.points.push(SupportPoint {
                        x: i as u32,
                        y: j as u32,
                        betti0: 0,
                        betti1: 0,
                    });
                    (grid.points.len() - 1) as u32
                };

                let id = EntryId(grid.entries.len() as u32);
                grid.entries.push(GridEntry {
                    x: i as u32,
                    y: j as u32,
                    index,
                    down: grid.cols[i],
                    left: grid.rows[j],
                    is_anchor,
                    is_support,
                    low_grades: Vec::new(),
                    high_grades: Vec::new(),
                    low_count: 0,
                    high_count: 0,
                });
                grid.cols[i] = Some(id);
                grid.rows[j] = Some(id);
                if is_anchor {
                    grid.anchors.push(id);
                }
            }
        }

        log::debug!(
            "support grid: {} entries, {} anchors on a {width}x{height} grid",
            grid.entries.len(),
            grid.anchors.len()
        );
        Ok(grid)
    }

    /// Lifts the boundary-matrix column grades onto the grid.
    ///
    /// `low_grades` and `high_grades` are the column grades of the two
    /// boundary matrices in dimension-index order. Each run of consecutive
    /// equal grades is attached to the colex-least entry dominating it, and
    /// the entry's running column counts are bumped; the counts feed the
    /// anchor crossing-cost estimates. Grades dominated by no entry stay
    /// unattached.
    pub fn attach_multigrades(&mut self, low_grades: &[Grade], high_grades: &[Grade]) {
        for (grades, low) in [(low_grades, true), (high_grades, false)] {
            let mut i = 0usize;
            while i < grades.len() {
                let g = grades[i];
                let mut end = i + 1;
                while end < grades.len() && grades[end] == g {
                    end += 1;
                }
                let run = GradeRun {
                    grade: g,
                    num_cols: (end - i) as u32,
                    last_index: (end - 1) as u32,
                };
                if let Some(id) = self.lift(g) {
                    let e = &mut self.entries[id.idx()];
                    if low {
                        e.low_grades.push(run);
                        e.low_count += run.num_cols;
                    } else {
                        e.high_grades.push(run);
                        e.high_count += run.num_cols;
                    }
                }
                i = end;
            }
        }
    }

    /// The colex-least entry whose position dominates `g`.
    pub fn lift(&self, g: Grade) -> Option<EntryId> {
        let mut best: Option<EntryId> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if e.x >= g.x && e.y >= g.y {
                let better = match best {
                    None => true,
                    Some(b) => {
                        let be = &self.entries[b.idx()];
                        crate::grade::colex_cmp(
                            &Grade::new(e.x, e.y),
                            &Grade::new(be.x, be.y),
                        ) == std::cmp::Ordering::Less
                    }
                };
                if better {
                    best = Some(EntryId(i as u32));
                }
            }
        }
        best
    }

    /// Estimated RU-update cost of crossing this anchor's line: the product
    /// of the column counts on its row and column neighbors.
    pub fn anchor_weight(&self, id: EntryId) -> u64 {
        let e = &self.entries[id.idx()];
        let (left, down) = match (e.left, e.down) {
            (Some(l), Some(d)) => (&self.entries[l.idx()], &self.entries[d.idx()]),
            _ => return 0,
        };
        u64::from(left.low_count) * u64::from(down.low_count)
            + u64::from(left.high_count) * u64::from(down.high_count)
    }

    /// Borrow an entry.
    #[inline]
    pub fn entry(&self, id: EntryId) -> &GridEntry {
        &self.entries[id.idx()]
    }

    /// All occupied entries in creation (lexicographic) order.
    #[inline]
    pub fn entries(&self) -> &[GridEntry] {
        &self.entries
    }

    /// Anchors in discovery order.
    #[inline]
    pub fn anchors(&self) -> &[EntryId] {
        &self.anchors
    }

    /// The support points augmented with synthesized anchor points.
    #[inline]
    pub fn points(&self) -> &[SupportPoint] {
        &self.points
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: u32, y: u32) -> SupportPoint {
        SupportPoint {
            x,
            y,
            betti0: 1,
            betti1: 0,
        }
    }

    #[test]
    fn two_incomparable_points_make_one_strict_anchor() {
        let pts = [pt(0, 2), pt(2, 0)];
        let grid = SupportGrid::fill_and_find_anchors(&pts, 3, 3).unwrap();

        // (0,0) has no predecessor links and is not an entry at all.
        assert!(!grid.entries().iter().any(|e| e.x == 0 && e.y == 0));

        // (2,2) sees (2,0) through its column and (0,2) through its row.
        assert_eq!(grid.anchors().len(), 1);
        let a = grid.entry(grid.anchors()[0]);
        assert_eq!((a.x, a.y), (2, 2));
        assert!(a.is_anchor && !a.is_support);
        let down = grid.entry(a.down.unwrap());
        let left = grid.entry(a.left.unwrap());
        assert_eq!((down.x, down.y), (2, 0));
        assert_eq!((left.x, left.y), (0, 2));

        // The anchor was appended as a zero-multiplicity point.
        let synth = grid.points().last().unwrap();
        assert_eq!((synth.x, synth.y, synth.betti0, synth.betti1), (2, 2, 0, 0));
    }

    #[test]
    fn support_point_with_one_link_is_non_strict_anchor() {
        let pts = [pt(0, 0), pt(0, 2), pt(1, 1)];
        let grid = SupportGrid::fill_and_find_anchors(&pts, 2, 3).unwrap();
        // (0,2) sits above (0,0) in its column: non-strict anchor.
        let e = grid
            .entries()
            .iter()
            .find(|e| e.x == 0 && e.y == 2)
            .unwrap();
        assert!(e.is_anchor && e.is_support);
        // (1,1) sees (0,... ) nothing below, but (1,1) has left neighbor? row 1
        // is empty to its left, column 1 empty below: not an anchor.
        // Its links to row/column heads are captured all the same.
        let f = grid
            .entries()
            .iter()
            .find(|e| e.x == 1 && e.y == 1)
            .unwrap();
        assert!(!f.is_anchor);
    }

    #[test]
    fn unsorted_points_are_rejected() {
        let pts = [pt(2, 0), pt(0, 2)];
        assert!(matches!(
            SupportGrid::fill_and_find_anchors(&pts, 3, 3),
            Err(PersistenceError::UnsortedSupportPoints { index: 1 })
        ));
    }

    #[test]
    fn attach_multigrades_counts_columns() {
        let pts = [pt(0, 2), pt(2, 0)];
        let mut grid = SupportGrid::fill_and_find_anchors(&pts, 3, 3).unwrap();
        let g = Grade::new;
        grid.attach_multigrades(&[g(0, 0), g(0, 0), g(2, 0)], &[g(1, 1)]);
        // (0,0)x2 lifts to (2,0) (colex-least dominating entry);
        // (2,0) lifts to (2,0); (1,1) lifts to the anchor (2,2).
        let e20 = grid
            .entries()
            .iter()
            .find(|e| e.x == 2 && e.y == 0)
            .unwrap();
        assert_eq!(e20.low_count, 3);
        let e22 = grid
            .entries()
            .iter()
            .find(|e| e.x == 2 && e.y == 2)
            .unwrap();
        assert_eq!(e22.high_count, 1);
        assert_eq!(e22.low_count, 0);
    }
}
