//! End-to-end checks of the batch pipeline on Vietoris–Rips bifiltrations.
//!
//! The projected barcode of every queried line is compared against an
//! independent union-find computation of the one-parameter H₀ barcode of
//! that line, run directly on the raw simplex grades.

use bipersist::pipeline::AugmentedArrangement;
use bipersist::prelude::*;

/// First parameter value at which the line at `degrees`/`offset` dominates
/// the grade with filtration values `(t, d)`.
fn line_push(t: f64, d: f64, degrees: f64, offset: f64) -> f64 {
    if degrees == 90.0 {
        if t <= -offset { d } else { f64::INFINITY }
    } else if degrees == 0.0 {
        if d <= offset { t } else { f64::INFINITY }
    } else {
        let radians = degrees.to_radians();
        t.max((d - offset / radians.cos()) / radians.tan())
    }
}

fn find(parent: &mut [usize], mut v: usize) -> usize {
    while parent[v] != v {
        parent[v] = parent[parent[v]];
        v = parent[v];
    }
    v
}

/// One-parameter H₀ barcode of a single line, by Kruskal with the elder
/// rule, straight from the input point cloud.
fn h0_intervals_by_union_find(
    times: &[u32],
    distances: &[u32],
    x_values: &[f64],
    y_values: &[f64],
    degrees: f64,
    offset: f64,
) -> Vec<(f64, f64)> {
    let n = times.len();
    let births: Vec<f64> = times
        .iter()
        .map(|&t| line_push(x_values[t as usize], y_values[0], degrees, offset))
        .collect();

    let mut edges: Vec<(f64, usize, usize)> = Vec::new();
    for j in 1..n {
        for i in 0..j {
            let t = x_values[times[i].max(times[j]) as usize];
            let d = y_values[distances[j * (j - 1) / 2 + i] as usize];
            let p = line_push(t, d, degrees, offset);
            if p.is_finite() {
                edges.push((p, i, j));
            }
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut parent: Vec<usize> = (0..n).collect();
    let mut comp_birth = births.clone();
    let mut intervals = Vec::new();
    for (p, i, j) in edges {
        let (a, b) = (find(&mut parent, i), find(&mut parent, j));
        if a == b {
            continue;
        }
        let (old, young) = if comp_birth[a] <= comp_birth[b] {
            (a, b)
        } else {
            (b, a)
        };
        if p > comp_birth[young] {
            intervals.push((comp_birth[young], p));
        }
        parent[young] = old;
        comp_birth[old] = comp_birth[old].min(comp_birth[young]);
    }
    for v in 0..n {
        if find(&mut parent, v) == v && births[v].is_finite() {
            intervals.push((births[v], f64::INFINITY));
        }
    }
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    intervals
}

fn projected_intervals(
    aug: &AugmentedArrangement,
    degrees: f64,
    offset: f64,
) -> Vec<(f64, f64)> {
    let mut intervals = Vec::new();
    for v in aug.barcode_values(degrees, offset).unwrap() {
        for _ in 0..v.multiplicity {
            intervals.push((v.birth, v.death));
        }
    }
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    intervals
}

fn assert_intervals_match(got: &[(f64, f64)], want: &[(f64, f64)], ctx: &str) {
    assert_eq!(got.len(), want.len(), "{ctx}: {got:?} vs {want:?}");
    for (g, w) in got.iter().zip(want) {
        assert!(
            (g.0 - w.0).abs() < 1e-9,
            "{ctx}: birth {} vs {}",
            g.0,
            w.0
        );
        if w.1.is_infinite() {
            assert!(g.1.is_infinite(), "{ctx}: expected essential, got {g:?}");
        } else {
            assert!((g.1 - w.1).abs() < 1e-9, "{ctx}: death {} vs {}", g.1, w.1);
        }
    }
}

fn check_against_union_find(
    times: &[u32],
    distances: &[u32],
    x_values: &[f64],
    y_values: &[f64],
) {
    let aug = AugmentedArrangement::from_rips(
        times,
        distances,
        x_values.to_vec(),
        y_values.to_vec(),
        0,
    )
    .unwrap();

    for face in aug.arrangement().faces() {
        assert!(face.barcode.is_some(), "face left without a barcode");
    }
    assert!(aug.arrangement().validate_invariants().is_ok());

    for &degrees in &[30.0, 60.0, 85.0] {
        for &offset in &[0.0, 0.12, -0.25] {
            let got = projected_intervals(&aug, degrees, offset);
            let want = h0_intervals_by_union_find(
                times, distances, x_values, y_values, degrees, offset,
            );
            assert_intervals_match(&got, &want, &format!("{degrees}deg/{offset}"));
        }
    }
}

#[test]
fn two_pair_point_cloud_matches_union_find_on_every_line() {
    check_against_union_find(
        &[0, 0, 1, 1],
        &[1, 2, 2, 2, 2, 1],
        &[0.0, 1.0],
        &[0.0, 1.0, 2.0],
    );
}

#[test]
fn five_point_cloud_matches_union_find_on_every_line() {
    // condensed lower-triangle order: (0,1) (0,2) (1,2) (0,3) (1,3) (2,3)
    // (0,4) (1,4) (2,4) (3,4)
    check_against_union_find(
        &[0, 1, 2, 0, 1],
        &[1, 2, 3, 2, 1, 3, 3, 2, 1, 2],
        &[0.0, 0.5, 1.0],
        &[0.0, 0.3, 0.8, 1.5],
    );
}

#[test]
fn axis_parallel_queries_match_union_find() {
    let times = [0u32, 0, 1, 1];
    let distances = [1u32, 2, 2, 2, 2, 1];
    let x_values = [0.0, 1.0];
    let y_values = [0.0, 1.0, 2.0];
    let aug = AugmentedArrangement::from_rips(
        &times,
        &distances,
        x_values.to_vec(),
        y_values.to_vec(),
        0,
    )
    .unwrap();

    for &(degrees, offset) in &[(0.0, 0.0), (0.0, 1.2), (90.0, -0.5), (90.0, -1.7)] {
        let got = projected_intervals(&aug, degrees, offset);
        let want =
            h0_intervals_by_union_find(&times, &distances, &x_values, &y_values, degrees, offset);
        assert_intervals_match(&got, &want, &format!("{degrees}deg/{offset}"));
    }
}

#[test]
fn queries_in_the_same_cell_share_a_template() {
    let aug = AugmentedArrangement::from_rips(
        &[0, 0, 1, 1],
        &[1, 2, 2, 2, 2, 1],
        vec![0.0, 1.0],
        vec![0.0, 1.0, 2.0],
        0,
    )
    .unwrap();

    // two nearby generic lines land in the same face
    let a = aug.arrangement().face_for_line(60.0, 0.01).unwrap();
    let b = aug.arrangement().face_for_line(60.1, 0.012).unwrap();
    if a == b {
        assert_eq!(
            aug.barcode_for_line(60.0, 0.01).unwrap(),
            aug.barcode_for_line(60.1, 0.012).unwrap()
        );
    }
    // and a far-away line does not
    let c = aug.arrangement().face_for_line(5.0, 0.7).unwrap();
    assert_ne!(a, c);
}
