//! Discrete barcodes attached to arrangement faces.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One bar of a discrete barcode.
///
/// `birth` and `death` are indexes into the augmented support-point list,
/// not filtration values: projecting those points onto any line inside the
/// owning face's cell recovers the bar's endpoints for that line. Bars with
/// equal endpoints are merged and counted via `multiplicity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bar {
    /// Support point where the class is born.
    pub birth: u32,
    /// Support point where the class dies.
    pub death: u32,
    /// Number of classes sharing these endpoints.
    pub multiplicity: u32,
}

impl Bar {
    fn length(&self) -> i64 {
        i64::from(self.death) - i64::from(self.birth)
    }
}

impl PartialOrd for Bar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bar {
    /// Longest bars first; among equal lengths, earlier births first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .length()
            .cmp(&self.length())
            .then(self.birth.cmp(&other.birth))
            .then(self.death.cmp(&other.death))
    }
}

/// The barcode of one face of the arrangement: finite bars plus the birth
/// points of essential (never-dying) cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barcode {
    bars: Vec<Bar>,
    essential: Vec<u32>,
}

impl Barcode {
    pub fn new() -> Self {
        Barcode::default()
    }

    /// Records one finite (birth, death) pair, merging into an existing bar
    /// with the same endpoints if present.
    pub fn add_bar(&mut self, birth: u32, death: u32) {
        match self
            .bars
            .iter_mut()
            .find(|b| b.birth == birth && b.death == death)
        {
            Some(bar) => bar.multiplicity += 1,
            None => self.bars.push(Bar {
                birth,
                death,
                multiplicity: 1,
            }),
        }
    }

    /// Records one essential cycle born at the given support point.
    pub fn add_essential(&mut self, birth: u32) {
        self.essential.push(birth);
    }

    /// Sorts bars by decreasing length (ties by birth) and essential births
    /// ascending.
    pub fn finalize(&mut self) {
        self.bars.sort_unstable();
        self.essential.sort_unstable();
    }

    /// Finite bars, longest first after [`finalize`](Barcode::finalize).
    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Births of essential cycles, with multiplicity via repetition.
    #[inline]
    pub fn essential(&self) -> &[u32] {
        &self.essential
    }

    /// Total number of finite classes, counting multiplicity.
    pub fn num_finite(&self) -> u32 {
        self.bars.iter().map(|b| b.multiplicity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty() && self.essential.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_endpoints_merge_into_multiplicity() {
        let mut bc = Barcode::new();
        bc.add_bar(0, 3);
        bc.add_bar(0, 3);
        bc.add_bar(1, 2);
        bc.finalize();
        assert_eq!(bc.num_finite(), 3);
        assert_eq!(bc.bars().len(), 2);
        assert_eq!(bc.bars()[0].multiplicity, 2);
    }

    #[test]
    fn bars_sort_longest_first_then_by_birth() {
        let mut bc = Barcode::new();
        bc.add_bar(2, 3);
        bc.add_bar(0, 4);
        bc.add_bar(1, 5);
        bc.finalize();
        let order: Vec<(u32, u32)> = bc.bars().iter().map(|b| (b.birth, b.death)).collect();
        assert_eq!(order, vec![(0, 4), (1, 5), (2, 3)]);
    }

    #[test]
    fn essential_births_sort_ascending() {
        let mut bc = Barcode::new();
        bc.add_essential(4);
        bc.add_essential(0);
        bc.add_essential(4);
        bc.finalize();
        assert_eq!(bc.essential(), &[0, 4, 4]);
    }
}
