/*!
# Minimum-Weight Bipartite Assignment

Computes an exact minimum-weight assignment (one column per row) for a dense
[`WeightMatrix`] with `rows <= cols`, using successive shortest augmenting
paths guided by row/column dual potentials (the Hungarian /
Jonker–Volgenant family of algorithms).

Throughout the search the potentials satisfy dual feasibility,
`row_potential[i] + col_potential[j] <= weight[i][j]`, with equality on
every matched edge (complementary slackness); this certifies optimality of
the final assignment. Runtime is `O(rows^2 * cols)`.

The solver is deterministic: ties between columns of equal reduced cost are
broken in favor of the smallest column index.
*/

use crate::{edge::*, error::*, matrix::WeightMatrix, node::*};

/// Computes a minimum-weight assignment for the given weight matrix.
///
/// Returns one column index per row such that no column is repeated and the
/// sum of the selected weights is minimal over all injective row-to-column
/// mappings. An empty matrix yields an empty assignment.
///
/// Convenience wrapper around [`BipartiteAssigner`] with the default
/// tolerance.
///
/// # Examples
/// ```
/// use wmatching::prelude::*;
///
/// let m = WeightMatrix::from_rows(&[
///     vec![8.0, 4.0, 7.0],
///     vec![5.0, 2.0, 3.0],
///     vec![9.0, 4.0, 8.0],
/// ])
/// .unwrap();
/// assert_eq!(assign(&m).unwrap(), vec![0, 2, 1]);
/// ```
pub fn assign(weights: &WeightMatrix) -> Result<Vec<Node>> {
    BipartiteAssigner::new(weights).solve()
}

/// Solver state for one assignment computation.
///
/// All working arrays are allocated per instance and discarded afterwards;
/// concurrent solves on independent matrices are safe.
pub struct BipartiteAssigner<'a> {
    matrix: &'a WeightMatrix,
    tolerance: Weight,

    /// `row_mate[i]` is the column assigned to row `i`
    row_mate: Vec<Node>,
    /// `col_mate[j]` is the row assigned to column `j`, or `INVALID_NODE`
    col_mate: Vec<Node>,
    row_potential: Vec<Weight>,
    col_potential: Vec<Weight>,

    /// `slack[j]` is the least reduced cost from any scanned row to column `j`
    slack: Vec<Weight>,
    /// `slack_prev[j]` is the scanned column whose matched row attains
    /// `slack[j]`, or `INVALID_NODE` if the entering row does
    slack_prev: Vec<Node>,
    /// Columns already added to the alternating tree of the current pass
    scanned: NodeBitSet,
}

impl<'a> BipartiteAssigner<'a> {
    /// Creates a solver for the given matrix with the default tolerance
    /// scaled to the instance, `1e-9 * max(1, max |weight|)`.
    pub fn new(matrix: &'a WeightMatrix) -> Self {
        let (rows, cols) = (matrix.rows(), matrix.cols());
        Self {
            matrix,
            tolerance: instance_tolerance(matrix.max_abs_weight()),
            row_mate: vec![INVALID_NODE; rows],
            col_mate: vec![INVALID_NODE; cols],
            row_potential: vec![0.0; rows],
            col_potential: vec![0.0; cols],
            slack: vec![Weight::INFINITY; cols],
            slack_prev: vec![INVALID_NODE; cols],
            scanned: NodeBitSet::with_capacity(cols),
        }
    }

    /// Overrides the numeric tolerance used for dual-feasibility guards
    pub fn set_tolerance(&mut self, tolerance: Weight) {
        self.tolerance = tolerance;
    }

    /// Chainable version of [`Self::set_tolerance`]
    pub fn tolerance(mut self, tolerance: Weight) -> Self {
        self.set_tolerance(tolerance);
        self
    }

    /// Runs the solver to completion and returns the assignment.
    ///
    /// # Errors
    /// [`Error::NumericInstability`] if a dual adjustment turns negative
    /// beyond the tolerance, which indicates weights too large for the
    /// configured tolerance.
    pub fn solve(mut self) -> Result<Vec<Node>> {
        for row in 0..self.matrix.rows() {
            self.augment_row(row)?;
        }

        debug_assert!(self.row_mate.iter().all(|&j| j != INVALID_NODE));
        Ok(self.row_mate)
    }

    /// Reduced cost of the matrix entry `(i, j)` under the current potentials
    #[inline]
    fn reduced_cost(&self, i: Node, j: usize) -> Weight {
        self.matrix.at(i as usize, j) - self.row_potential[i as usize] - self.col_potential[j]
    }

    /// Grows an alternating tree from the unmatched `row` until a free
    /// column of zero slack is found, then augments along the tree.
    ///
    /// One pass of the labeling step: repeatedly relax the column slacks
    /// from the row most recently added to the tree, pick the unscanned
    /// column of minimum slack (smallest index on ties), pay the slack out
    /// of the duals to make that column tight, and either stop at a free
    /// column or pull its matched row into the tree.
    fn augment_row(&mut self, row: usize) -> Result<()> {
        let cols = self.matrix.cols();

        self.scanned.clear();
        self.slack.fill(Weight::INFINITY);
        self.slack_prev.fill(INVALID_NODE);

        let mut tree_row = row as Node;
        let mut tree_col = INVALID_NODE;

        let entering_col = loop {
            for j in 0..cols {
                if self.scanned.contains(j) {
                    continue;
                }
                let reduced = self.reduced_cost(tree_row, j);
                if reduced < self.slack[j] {
                    self.slack[j] = reduced;
                    self.slack_prev[j] = tree_col;
                }
            }

            let mut delta = Weight::INFINITY;
            let mut next_col = INVALID_NODE;
            for j in 0..cols {
                if !self.scanned.contains(j) && self.slack[j] < delta {
                    delta = self.slack[j];
                    next_col = j as Node;
                }
            }

            if next_col == INVALID_NODE {
                return Err(Error::NumericInstability(
                    "no admissible column reachable during augmentation",
                ));
            }
            if delta < -self.tolerance {
                return Err(Error::NumericInstability(
                    "negative dual adjustment in assignment search",
                ));
            }

            // Pay delta out of the duals: all tree rows (including the
            // entering one) gain, all tree columns lose, so every tree edge
            // stays tight and next_col becomes tight.
            self.row_potential[row] += delta;
            for j in 0..cols {
                if self.scanned.contains(j) {
                    self.row_potential[self.col_mate[j] as usize] += delta;
                    self.col_potential[j] -= delta;
                } else {
                    self.slack[j] -= delta;
                }
            }

            self.scanned.insert(next_col as usize);
            if self.col_mate[next_col as usize] == INVALID_NODE {
                break next_col;
            }

            tree_row = self.col_mate[next_col as usize];
            tree_col = next_col;
        };

        // Flip matched/unmatched status along the alternating path that
        // leads from the free column back to the entering row.
        let mut j = entering_col;
        loop {
            let prev = self.slack_prev[j as usize];
            let r = if prev == INVALID_NODE {
                row as Node
            } else {
                self.col_mate[prev as usize]
            };

            self.col_mate[j as usize] = r;
            self.row_mate[r as usize] = j;

            if prev == INVALID_NODE {
                return Ok(());
            }
            j = prev;
        }
    }
}
