//! Error types for wmatching

use crate::{edge::Weight, node::Node};
use thiserror::Error;

/// Result type alias using wmatching's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by input validation or, at run time, by a violated
/// numeric invariant.
///
/// Validation errors are raised synchronously before any algorithmic work
/// begins; they are never retried. There is no partial-result mode: a call
/// either returns a fully optimal result or fails.
#[derive(Error, Debug)]
pub enum Error {
    /// A row of the weight matrix has the wrong number of entries
    #[error("row {row} has {got} entries, expected {expected}")]
    RaggedMatrix {
        /// Index of the offending row
        row: usize,
        /// Number of columns of the matrix
        expected: usize,
        /// Number of entries found in the row
        got: usize,
    },

    /// The weight matrix has more rows than columns
    #[error("weight matrix must satisfy rows <= cols, got {rows} rows and {cols} cols")]
    MoreRowsThanColumns {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// A matrix entry is NaN or infinite
    #[error("non-finite weight {weight} at matrix entry ({row}, {col})")]
    NonFiniteWeight {
        /// Row of the entry
        row: usize,
        /// Column of the entry
        col: usize,
        /// The offending value
        weight: Weight,
    },

    /// An edge weight is NaN or infinite
    #[error("non-finite weight {weight} on edge ({u}, {v})")]
    NonFiniteEdgeWeight {
        /// First endpoint
        u: Node,
        /// Second endpoint
        v: Node,
        /// The offending value
        weight: Weight,
    },

    /// An edge endpoint does not lie in `[0, n)`
    #[error("edge ({u}, {v}) has an endpoint out of range for {n} vertices")]
    EndpointOutOfRange {
        /// First endpoint
        u: Node,
        /// Second endpoint
        v: Node,
        /// Number of vertices of the graph
        n: Node,
    },

    /// An edge connects a vertex to itself
    #[error("self-loop at vertex {0}")]
    SelfLoop(Node),

    /// A dual/slack invariant was violated beyond the configured tolerance.
    ///
    /// This indicates a tolerance insufficient for the magnitude of the
    /// input weights rather than a recoverable condition.
    #[error("numeric instability: {0}")]
    NumericInstability(&'static str),
}
