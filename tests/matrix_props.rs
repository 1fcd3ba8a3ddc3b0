//! Property tests for the GF(2) column algebra.

use proptest::prelude::*;

use bipersist::grade::Grade;
use bipersist::matrix::{BigradedMatrix, SparseBinaryMatrix};

fn columns(m: &SparseBinaryMatrix) -> Vec<Vec<u32>> {
    (0..m.width()).map(|j| m.column(j).to_vec()).collect()
}

fn arb_matrix() -> impl Strategy<Value = SparseBinaryMatrix> {
    (1u32..=12, 0usize..=14).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(
            proptest::collection::btree_set(0u32..rows, 0..=rows as usize),
            cols,
        )
        .prop_map(move |cs| {
            let mut m = SparseBinaryMatrix::new(rows as usize, 0);
            for c in cs {
                m.push_column(c.into_iter().collect()).unwrap();
            }
            m
        })
    })
}

proptest! {
    #[test]
    fn reduction_leaves_distinct_pivots(m in arb_matrix()) {
        let mut r = m.clone();
        r.col_reduce().unwrap();
        prop_assert!(r.is_reduced());
    }

    #[test]
    fn reduction_is_idempotent(m in arb_matrix()) {
        let mut r = m.clone();
        r.col_reduce().unwrap();
        let once = columns(&r);
        r.col_reduce().unwrap();
        prop_assert_eq!(once, columns(&r));
    }

    #[test]
    fn recorded_operations_replay_the_reduction(m in arb_matrix()) {
        let mut r = m.clone();
        let mut ops = Vec::new();
        r.col_reduce_with(|src, dst| ops.push((src, dst))).unwrap();

        let mut replay = m.clone();
        for (src, dst) in ops {
            replay.add_column(src, dst).unwrap();
        }
        prop_assert_eq!(columns(&r), columns(&replay));
    }

    #[test]
    fn adding_a_column_twice_is_the_identity(m in arb_matrix()) {
        if m.width() < 2 {
            return Ok(());
        }
        let mut n = m.clone();
        n.add_column(0, m.width() - 1).unwrap();
        n.add_column(0, m.width() - 1).unwrap();
        prop_assert_eq!(columns(&m), columns(&n));
    }

    #[test]
    fn adjacent_column_swaps_are_involutions(m in arb_matrix()) {
        if m.width() < 2 {
            return Ok(());
        }
        let mut n = m.clone();
        n.swap_adjacent_columns(0).unwrap();
        n.swap_adjacent_columns(0).unwrap();
        prop_assert_eq!(columns(&m), columns(&n));
    }

    #[test]
    fn adjacent_row_swaps_are_involutions(m in arb_matrix()) {
        if m.height() < 2 {
            return Ok(());
        }
        let mut n = m.clone();
        n.swap_adjacent_rows(0).unwrap();
        n.swap_adjacent_rows(0).unwrap();
        prop_assert_eq!(columns(&m), columns(&n));
    }

    #[test]
    fn kernel_columns_combine_to_zero(m in arb_matrix()) {
        let width = m.width();
        let height = m.height();

        let mut reduced = m.clone();
        reduced.col_reduce().unwrap();
        let rank = (0..width).filter(|&j| reduced.low(j).is_some()).count();

        let graded = BigradedMatrix::from_columns(
            height,
            (0..width).map(|j| (m.column(j).to_vec(), Grade::new(0, 0))).collect(),
            1,
            1,
        )
        .unwrap();
        let ker = graded.kernel().unwrap();

        // nullity plus rank accounts for every column
        prop_assert_eq!(ker.mat.width() + rank, width);

        for k in 0..ker.mat.width() {
            let mut acc = vec![false; height];
            for &c in ker.mat.column(k) {
                for &row in m.column(c as usize) {
                    acc[row as usize] ^= true;
                }
            }
            prop_assert!(acc.iter().all(|&b| !b), "kernel column {} is not a cycle", k);
        }
    }
}
