/*!
`wmatching` is a library of exact weighted-matching algorithms:

- **Bipartite assignment**: given a dense `rows x cols` weight matrix with
  `rows <= cols`, find the minimum-weight assignment of one distinct column
  per row ([`assignment`]). This is the classic Hungarian /
  Jonker–Volgenant shortest-augmenting-path algorithm with dual potentials,
  running in `O(rows^2 * cols)`.
- **General matching**: given an arbitrary undirected graph with real edge
  weights, find the maximum-weight matching ([`matching`]), optionally
  restricted to matchings of maximum cardinality. This is Edmonds' blossom
  algorithm in the primal-dual formulation, running in `O(n^3)`.

Both solvers are exact and deterministic: the same input always produces
the same output, with documented tie-breaking rules.

# Representation

We represent **vertices** as `u32` in the range `0..n`; unmatched slots in
mate arrays carry the sentinel [`INVALID_NODE`](node::INVALID_NODE).
Assignment inputs are dense [`WeightMatrix`](matrix::WeightMatrix)
instances; matching inputs are [`WeightedGraph`](graph::WeightedGraph)
instances built from weighted edge lists. All weights are finite `f64`;
inputs are validated once on construction and malformed instances are
rejected with a descriptive [`Error`](error::Error) before any algorithmic
work begins.

# Design

Both algorithms are provided as configurable solver structs
([`BipartiteAssigner`](assignment::BipartiteAssigner),
[`GeneralMatcher`](matching::GeneralMatcher)) that one can alter to their
needs using the *Builder* / *Setter* pattern before running them on a
provided instance. For the common cases, the free functions
[`assign`](assignment::assign) and
[`maximum_weight_matching`](matching::maximum_weight_matching) run a solver
with default settings.

Internally all comparisons of slacks and dual variables use an absolute
tolerance scaled to the instance, `1e-9 * max(1, max |weight|)`; see
[`edge::instance_tolerance`]. Inputs whose weights span so many orders of
magnitude that this tolerance becomes meaningless fail with
[`Error::NumericInstability`](error::Error::NumericInstability) instead of
returning a wrong answer.

# Usage

In most use-cases, `use wmatching::prelude::*;` suffices for your needs.

```
use wmatching::prelude::*;

// Assignment: route each row to its own column at minimum total weight.
let costs = WeightMatrix::from_rows(&[
    vec![8.0, 4.0, 7.0],
    vec![5.0, 2.0, 3.0],
    vec![9.0, 4.0, 8.0],
])
.unwrap();
assert_eq!(assign(&costs).unwrap(), vec![0, 2, 1]);

// Matching: pair up vertices of a general graph at maximum total weight.
let graph = WeightedGraph::from_edges(4, [(0, 1, 8.0), (0, 2, 9.0), (1, 2, 10.0), (2, 3, 7.0)])
    .unwrap();
let mate = maximum_weight_matching(&graph, false).unwrap();
assert_eq!(mate, vec![1, 0, 3, 2]);
```
*/

pub mod assignment;
pub mod edge;
pub mod error;
pub mod graph;
pub mod matching;
pub mod matrix;
pub mod node;
#[cfg(test)]
pub(crate) mod testing;

/// `wmatching::prelude` includes definitions for nodes, edges and errors,
/// both input representations, and both solvers with their entry points.
pub mod prelude {
    pub use super::{
        assignment::{assign, BipartiteAssigner},
        edge::*,
        error::{Error, Result},
        graph::WeightedGraph,
        matching::{matched_pairs, matching_weight, maximum_weight_matching, GeneralMatcher},
        matrix::WeightMatrix,
        node::*,
    };
}
