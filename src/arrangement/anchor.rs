//! Anchors and the comparison strategies that order their critical lines.
//!
//! The anchor at discrete grid position (x, y) induces the critical line
//! `y_dual = x_value·x_dual − y_value` in the dual plane, where the
//! arrangement's x-coordinate is the slope of a query line and its
//! y-coordinate the (negated) offset. Two named orderings over anchors are
//! needed: the left-edge order that fixes the insertion sequence before the
//! sweep, and an angular order about a reference anchor that drives the
//! sweep itself. Both are strict weak orderings.

use crate::grade::Grade;
use crate::grid::EntryId;
use std::cmp::Ordering;
use std::fmt;

use super::dcel::HalfedgeId;

/// Stable arena index of one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct AnchorId(pub u32);

impl AnchorId {
    /// The arena slot this id refers to.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// An anchor of the support grid, carrying its critical line once the
/// arrangement is built.
///
/// Equality is coordinate equality, not arena identity.
#[derive(Debug, Clone)]
pub struct Anchor {
    /// x-coordinate in the discrete grading grid.
    pub x: u32,
    /// y-coordinate in the discrete grading grid.
    pub y: u32,
    /// The grid entry at this anchor's position.
    pub entry: EntryId,
    /// Leftmost half-edge of this anchor's line in the arrangement.
    pub line: Option<HalfedgeId>,
    /// Relative position of the line at the sweep front.
    pub(crate) position: usize,
    /// Estimated cost of an RU update crossing this line.
    pub weight: u64,
}

impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Anchor {}

impl Anchor {
    pub(crate) fn at(entry: EntryId, x: u32, y: u32, weight: u64) -> Self {
        Anchor {
            x,
            y,
            entry,
            line: None,
            position: 0,
            weight,
        }
    }

    /// The grade this anchor sits at.
    #[inline]
    pub fn grade(&self) -> Grade {
        Grade::new(self.x, self.y)
    }

    /// Whether the two anchors' lines cross in the open strip: this happens
    /// exactly when one anchor strictly dominates the other in both
    /// coordinates.
    pub fn comparable(&self, other: &Anchor) -> bool {
        (self.x > other.x && self.y > other.y) || (self.x < other.x && self.y < other.y)
    }
}

/// Orders anchors along the left boundary of the dual strip, bottom to top.
///
/// A line enters the left edge at height `−y_value`, so larger y-grades
/// enter lower. Lines sharing an entry height stack shallower slopes below
/// steeper ones, which is the order they hold for every positive sweep
/// position. Discrete indexes suffice because the value vectors are sorted
/// ascending.
pub fn left_edge_cmp(a: &Anchor, b: &Anchor) -> Ordering {
    b.y.cmp(&a.y).then(a.x.cmp(&b.x))
}

/// Angular order of anchors about a reference anchor.
///
/// The key of an anchor is the slope of the segment joining the reference's
/// grade point to its own, which is exactly the sweep x-coordinate at which
/// the two dual lines cross. Anchors vertically aligned with the reference
/// (including one coincident with it) have no defined slope and sort last.
pub struct AngleOrder<'a> {
    time: f64,
    dist: f64,
    x_values: &'a [f64],
    y_values: &'a [f64],
}

impl<'a> AngleOrder<'a> {
    pub fn about(reference: &Anchor, x_values: &'a [f64], y_values: &'a [f64]) -> Self {
        AngleOrder {
            time: x_values[reference.x as usize],
            dist: y_values[reference.y as usize],
            x_values,
            y_values,
        }
    }

    /// Slope from the reference's grade point to the anchor's; infinite for
    /// vertically aligned anchors.
    pub fn key(&self, anchor: &Anchor) -> f64 {
        let dx = self.x_values[anchor.x as usize] - self.time;
        if dx == 0.0 {
            f64::INFINITY
        } else {
            (self.y_values[anchor.y as usize] - self.dist) / dx
        }
    }

    pub fn cmp(&self, a: &Anchor, b: &Anchor) -> Ordering {
        self.key(a).total_cmp(&self.key(b))
    }
}

/// Tolerance below which two sweep coordinates are treated as one crossing
/// point.
pub(crate) const EPSILON: f64 = 9.313_225_746_154_785e-10; // 2^-30

pub(crate) fn almost_equal(a: f64, b: f64) -> bool {
    let diff = (a - b).abs();
    diff <= EPSILON || diff <= (a.abs() + b.abs()) * EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: u32, y: u32) -> Anchor {
        Anchor::at(EntryId(0), x, y, 0)
    }

    #[test]
    fn comparable_requires_strict_domination() {
        assert!(anchor(1, 1).comparable(&anchor(2, 2)));
        assert!(anchor(3, 2).comparable(&anchor(1, 0)));
        assert!(!anchor(1, 2).comparable(&anchor(2, 1)));
        assert!(!anchor(1, 1).comparable(&anchor(1, 2)));
        assert!(!anchor(1, 1).comparable(&anchor(1, 1)));
    }

    #[test]
    fn left_edge_order_is_bottom_up() {
        let mut anchors = vec![anchor(1, 1), anchor(2, 2), anchor(1, 2)];
        anchors.sort_by(left_edge_cmp);
        let order: Vec<(u32, u32)> = anchors.iter().map(|a| (a.x, a.y)).collect();
        assert_eq!(order, vec![(1, 2), (2, 2), (1, 1)]);
    }

    #[test]
    fn angle_order_keys_are_crossing_positions() {
        let x_values = [0.0, 1.0, 2.0];
        let y_values = [0.0, 1.0, 2.0];
        let reference = anchor(1, 1);
        let order = AngleOrder::about(&reference, &x_values, &y_values);
        // line of (2,2) crosses line of (1,1) at x = (2-1)/(2-1) = 1
        assert_eq!(order.key(&anchor(2, 2)), 1.0);
        // vertically aligned anchors sort last
        assert_eq!(order.key(&anchor(1, 2)), f64::INFINITY);
        assert_eq!(
            order.cmp(&anchor(2, 2), &anchor(1, 2)),
            Ordering::Less
        );
    }

    #[test]
    fn comparators_are_strict_weak_orderings() {
        let x_values = [0.0, 1.0, 2.0, 3.0];
        let y_values = [0.0, 1.0, 2.0, 3.0];
        let mut sample = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                sample.push(anchor(x, y));
            }
        }
        let reference = anchor(0, 0);
        let angle = AngleOrder::about(&reference, &x_values, &y_values);
        for a in &sample {
            assert_eq!(left_edge_cmp(a, a), Ordering::Equal);
            assert_eq!(angle.cmp(a, a), Ordering::Equal);
            for b in &sample {
                assert_eq!(left_edge_cmp(a, b), left_edge_cmp(b, a).reverse());
                assert_eq!(angle.cmp(a, b), angle.cmp(b, a).reverse());
                for c in &sample {
                    if left_edge_cmp(a, b) == Ordering::Less
                        && left_edge_cmp(b, c) == Ordering::Less
                    {
                        assert_eq!(left_edge_cmp(a, c), Ordering::Less);
                    }
                    if angle.cmp(a, b) == Ordering::Less && angle.cmp(b, c) == Ordering::Less {
                        assert_eq!(angle.cmp(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn almost_equal_uses_absolute_and_relative_tolerance() {
        assert!(almost_equal(1.0, 1.0 + 1e-12));
        assert!(almost_equal(1e12, 1e12 + 1.0));
        assert!(!almost_equal(1.0, 1.001));
    }
}
