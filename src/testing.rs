/*!
# Test Helpers

Random instance generators and brute-force reference solvers used by the
unit tests. The generators draw small integer weights (stored as `f64`) so
that optimal totals compare exactly; the brute-force solvers enumerate the
full solution space and are only feasible for tiny instances.
*/

use itertools::Itertools;
use rand::Rng;

use crate::{edge::*, matrix::WeightMatrix, node::*};

/// Generates a random `rows x cols` weight matrix with integer entries
/// in `0..=20`
pub(crate) fn random_matrix<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> WeightMatrix {
    let data = (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(0..=20) as Weight).collect())
        .collect::<Vec<Vec<Weight>>>();
    WeightMatrix::from_rows(&data).unwrap()
}

/// Minimum total weight over all injective row-to-column assignments,
/// found by enumerating every column permutation.
///
/// An empty matrix yields the empty assignment of weight zero.
pub(crate) fn brute_force_assignment_weight(matrix: &WeightMatrix) -> Weight {
    (0..matrix.cols())
        .permutations(matrix.rows())
        .map(|cols| {
            cols.into_iter()
                .enumerate()
                .map(|(i, j)| matrix.at(i, j))
                .sum()
        })
        .fold(Weight::INFINITY, Weight::min)
}

/// Generates `m` random edges on `n >= 2` vertices with integer weights in
/// `-10..=10`. Parallel edges may occur; self-loops do not.
pub(crate) fn random_weighted_edges<R: Rng>(
    rng: &mut R,
    n: NumNodes,
    m: usize,
) -> Vec<(Node, Node, Weight)> {
    (0..m)
        .map(|_| {
            let u = rng.gen_range(0..n);
            let mut v = rng.gen_range(0..n - 1);
            if v >= u {
                v += 1;
            }
            (u, v, rng.gen_range(-10..=10) as Weight)
        })
        .collect()
}

/// Best matching over the given edges by exhaustive enumeration.
///
/// Returns `(cardinality, total weight)` of the maximum-weight matching;
/// with `max_cardinality`, weight is maximized among matchings of maximum
/// size. The empty matching (cardinality 0, weight 0) is always a
/// candidate.
pub(crate) fn brute_force_matching(
    n: NumNodes,
    edges: &[(Node, Node, Weight)],
    max_cardinality: bool,
) -> (usize, Weight) {
    fn enumerate(
        edges: &[(Node, Node, Weight)],
        idx: usize,
        used: &mut [bool],
        cardinality: usize,
        weight: Weight,
        max_cardinality: bool,
        best: &mut (usize, Weight),
    ) {
        if idx == edges.len() {
            let better = if max_cardinality {
                cardinality > best.0 || (cardinality == best.0 && weight > best.1)
            } else {
                weight > best.1
            };
            if better {
                *best = (cardinality, weight);
            }
            return;
        }

        enumerate(edges, idx + 1, used, cardinality, weight, max_cardinality, best);

        let (u, v, w) = edges[idx];
        if !used[u as usize] && !used[v as usize] {
            used[u as usize] = true;
            used[v as usize] = true;
            enumerate(
                edges,
                idx + 1,
                used,
                cardinality + 1,
                weight + w,
                max_cardinality,
                best,
            );
            used[u as usize] = false;
            used[v as usize] = false;
        }
    }

    let mut best = (0, 0.0);
    let mut used = vec![false; n as usize];
    enumerate(edges, 0, &mut used, 0, 0.0, max_cardinality, &mut best);
    best
}
