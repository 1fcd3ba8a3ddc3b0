//! Bigrades and multigrade antichains.
//!
//! A [`Grade`] is an `(x, y)` pair of discrete coordinates in the
//! two-parameter plane, carrying the product partial order: `a` precedes `b`
//! when `a.x <= b.x` and `a.y <= b.y`. Because the order is partial, `Grade`
//! deliberately does not implement `Ord`; the two total orders the pipeline
//! needs (colexicographic, used for matrix column grouping, and
//! lexicographic, used by the support grid) are exposed as named functions.
//!
//! A [`Multigrade`] records every minimal grade at which a simplex enters a
//! bifiltration. It is kept as an antichain: inserting a grade that is
//! comparable to an existing one keeps only the earlier (dominated) grade,
//! and the set stays sorted in ascending colexicographic order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A discrete point in the two-parameter grading plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grade {
    /// First (x-axis) coordinate.
    pub x: u32,
    /// Second (y-axis) coordinate.
    pub y: u32,
}

impl Grade {
    /// Creates a grade from its two coordinates.
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Grade { x, y }
    }

    /// Returns `true` if `self` precedes or equals `other` in the product
    /// partial order.
    #[inline]
    pub fn leq(&self, other: &Grade) -> bool {
        self.x <= other.x && self.y <= other.y
    }

    /// Returns `true` if neither grade precedes the other.
    #[inline]
    pub fn incomparable(&self, other: &Grade) -> bool {
        !self.leq(other) && !other.leq(self)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Colexicographic total order: compare `y`, then `x`.
///
/// This refines the product partial order and is the order in which matrix
/// columns are grouped by grade.
#[inline]
pub fn colex_cmp(a: &Grade, b: &Grade) -> Ordering {
    a.y.cmp(&b.y).then(a.x.cmp(&b.x))
}

/// Lexicographic total order: compare `x`, then `y`.
///
/// The support grid consumes its points in this order.
#[inline]
pub fn lex_cmp(a: &Grade, b: &Grade) -> Ordering {
    a.x.cmp(&b.x).then(a.y.cmp(&b.y))
}

/// The minimal appearance grades of one simplex, kept as an antichain.
///
/// # Invariants
/// - No two stored grades are comparable.
/// - Grades are sorted in ascending colexicographic order.
///
/// Both invariants are restored by [`Multigrade::insert`] after every
/// mutation, so they hold at all times from the caller's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multigrade {
    grades: Vec<Grade>,
}

impl Multigrade {
    /// Creates an empty multigrade set.
    #[inline]
    pub fn new() -> Self {
        Multigrade { grades: Vec::new() }
    }

    /// Creates a multigrade set from one grade.
    #[inline]
    pub fn singleton(g: Grade) -> Self {
        Multigrade { grades: vec![g] }
    }

    /// Inserts a grade, then collapses comparable pairs to the earlier grade
    /// and restores colexicographic order.
    ///
    /// Inserting a grade dominated by an existing one replaces it; inserting
    /// a grade that dominates an existing one is a no-op.
    pub fn insert(&mut self, g: Grade) {
        self.grades.push(g);
        self.reduce();
    }

    /// Merges another multigrade set into this one.
    pub fn merge(&mut self, other: &Multigrade) {
        self.grades.extend_from_slice(&other.grades);
        self.reduce();
    }

    fn reduce(&mut self) {
        self.grades.sort_unstable_by(colex_cmp);
        self.grades.dedup();
        // One adjacent-pair pass suffices: in colex order, any grade
        // dominated by an earlier one is reached before anything it
        // dominates.
        let mut i = 0;
        while i + 1 < self.grades.len() {
            if self.grades[i].leq(&self.grades[i + 1]) {
                self.grades.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// The colexicographically least grade, or `None` if the set is empty.
    #[inline]
    pub fn min_colex(&self) -> Option<Grade> {
        self.grades.first().copied()
    }

    /// Number of incomparable grades.
    #[inline]
    pub fn len(&self) -> usize {
        self.grades.len()
    }

    /// Returns `true` if no grade has been inserted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    /// Iterates over the grades in ascending colexicographic order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Grade> {
        self.grades.iter()
    }

    /// Checks the antichain and ordering invariants.
    pub fn is_antichain(&self) -> bool {
        for (i, a) in self.grades.iter().enumerate() {
            for b in &self.grades[i + 1..] {
                if !a.incomparable(b) {
                    return false;
                }
            }
        }
        self.grades.windows(2).all(|w| colex_cmp(&w[0], &w[1]) == Ordering::Less)
    }
}

impl<'a> IntoIterator for &'a Multigrade {
    type Item = &'a Grade;
    type IntoIter = std::slice::Iter<'a, Grade>;
    fn into_iter(self) -> Self::IntoIter {
        self.grades.iter()
    }
}

// Grade must stay a bare pair of u32s; the arenas rely on it being Copy and
// word-sized.
static_assertions::assert_eq_size!(Grade, u64);
static_assertions::assert_impl_all!(Grade: Copy, Send, Sync);
