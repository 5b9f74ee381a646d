/*!
# Weight Matrix

Dense rectangular matrix of finite real weights, the input of the
[`BipartiteAssigner`](crate::assignment::BipartiteAssigner). Rows play the
role of the smaller bipartition class, so `rows <= cols` is required.

The matrix is validated once on construction; the solvers can then assume a
rectangular, finite instance and never re-check entries.
*/

use crate::{edge::Weight, error::*};

/// An immutable `rows x cols` matrix of finite weights with `rows <= cols`,
/// stored row-major in a single flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Weight>,
}

impl WeightMatrix {
    /// Builds a matrix from a slice of rows.
    ///
    /// All rows must have the same length, every entry must be finite, and
    /// there must be at most as many rows as columns. An empty slice yields
    /// the valid `0 x 0` matrix.
    ///
    /// # Errors
    /// [`Error::RaggedMatrix`], [`Error::NonFiniteWeight`] or
    /// [`Error::MoreRowsThanColumns`] if the input violates the above.
    ///
    /// # Examples
    /// ```
    /// use wmatching::prelude::*;
    ///
    /// let m = WeightMatrix::from_rows(&[vec![8.0, 4.0, 7.0], vec![5.0, 2.0, 3.0]]).unwrap();
    /// assert_eq!((m.rows(), m.cols()), (2, 3));
    /// assert_eq!(m.at(1, 2), 3.0);
    /// ```
    pub fn from_rows(rows: &[Vec<Weight>]) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, |r| r.len());

        if num_rows > num_cols {
            return Err(Error::MoreRowsThanColumns {
                rows: num_rows,
                cols: num_cols,
            });
        }

        let mut data = Vec::with_capacity(num_rows * num_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != num_cols {
                return Err(Error::RaggedMatrix {
                    row: i,
                    expected: num_cols,
                    got: row.len(),
                });
            }

            for (j, &w) in row.iter().enumerate() {
                if !w.is_finite() {
                    return Err(Error::NonFiniteWeight {
                        row: i,
                        col: j,
                        weight: w,
                    });
                }
                data.push(w);
            }
        }

        Ok(Self {
            rows: num_rows,
            cols: num_cols,
            data,
        })
    }

    /// Returns the number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns *true* if the matrix has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns the entry at row `i`, column `j`.
    /// ** Panics if `i >= rows || j >= cols` **
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> Weight {
        assert!(j < self.cols);
        self.data[i * self.cols + j]
    }

    /// Returns row `i` as a slice.
    /// ** Panics if `i >= rows` **
    #[inline]
    pub fn row(&self, i: usize) -> &[Weight] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns the largest absolute entry, or `0.0` for an empty matrix.
    ///
    /// Used to scale the numeric tolerance of the assigner to the instance.
    pub fn max_abs_weight(&self) -> Weight {
        self.data.iter().fold(0.0, |acc, w| acc.max(w.abs()))
    }
}
