/*!
# Weighted Edges and Half-Edges

An edge is defined by two endpoints and a real weight. Graphs are undirected
at the API boundary; internally each edge `k` is split into the two directed
half-edges `2k` (pointing towards the second endpoint) and `2k + 1` (pointing
towards the first), which makes alternating-path traversal cheap and
direction-aware without duplicating edge records.
*/

use std::fmt::{Debug, Display};

use crate::node::Node;

/// Edge weights are finite reals
pub type Weight = f64;

/// We limit the number of edges to `2^31 - 1` so that half-edge ids fit `u32`
pub type NumEdges = u32;

/// A directed half of an undirected edge: edge `k` owns half-edges `2k` and
/// `2k + 1`
pub type Endpoint = u32;

/// Endpoint-Value that is considered invalid
pub const INVALID_ENDPOINT: Endpoint = Endpoint::MAX;

/// Relative tolerance of all floating-point slack and dual comparisons
pub const RELATIVE_TOLERANCE: Weight = 1e-9;

/// Default absolute tolerance for an instance with the given largest
/// absolute weight.
///
/// Weights below `1.0` do not shrink the tolerance further, so
/// all-zero instances still compare against a positive threshold.
pub fn instance_tolerance(max_abs_weight: Weight) -> Weight {
    RELATIVE_TOLERANCE * max_abs_weight.max(1.0)
}

/// An undirected edge with a real weight.
///
/// It is up to the user whether the order of the endpoints carries meaning;
/// the algorithms in this crate treat `WeightedEdge(u, v, w)` and
/// `WeightedEdge(v, u, w)` as the same edge.
#[derive(Copy, Clone, PartialEq, PartialOrd)]
pub struct WeightedEdge(pub Node, pub Node, pub Weight);

impl Display for WeightedEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{};{})", self.0, self.1, self.2)
    }
}

impl Debug for WeightedEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl WeightedEdge {
    /// Normalizes the edge such that the endpoint with smaller value comes first
    pub fn normalized(&self) -> Self {
        WeightedEdge(self.0.min(self.1), self.0.max(self.1), self.2)
    }

    /// Returns true if the endpoint with smaller index comes first
    pub fn is_normalized(&self) -> bool {
        self.0 <= self.1
    }

    /// Returns true if both endpoints are equal
    pub fn is_loop(&self) -> bool {
        self.0 == self.1
    }

    /// Reverses the edge by switching the endpoints
    pub fn reverse(&self) -> Self {
        WeightedEdge(self.1, self.0, self.2)
    }

    /// The weight of the edge
    pub fn weight(&self) -> Weight {
        self.2
    }
}

impl From<(Node, Node, Weight)> for WeightedEdge {
    fn from(value: (Node, Node, Weight)) -> Self {
        WeightedEdge(value.0, value.1, value.2)
    }
}

impl From<&(Node, Node, Weight)> for WeightedEdge {
    fn from(value: &(Node, Node, Weight)) -> Self {
        WeightedEdge(value.0, value.1, value.2)
    }
}

impl From<&WeightedEdge> for WeightedEdge {
    fn from(value: &WeightedEdge) -> Self {
        *value
    }
}
