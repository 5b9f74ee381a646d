/*!
# Weighted Graph Representation

An undirected graph with real edge weights, the input of the
[`GeneralMatcher`](crate::matching::GeneralMatcher).

Internally every edge `k` is split into the two directed half-edges `2k` and
`2k + 1` (see [`crate::edge`]); each vertex stores the list of half-edges
leading away from it. The matcher walks alternating paths by flipping the
low bit of a half-edge id to step to the opposite side of an edge.

Parallel edges between the same vertex pair are collapsed to the one of
maximum weight on construction, so the solvers always see a simple graph.
*/

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::{edge::*, error::*, node::*};

/// An immutable undirected graph with finite real edge weights.
///
/// Construction validates endpoint bounds, rejects self-loops and
/// non-finite weights, and collapses parallel edges (keeping the maximum
/// weight per vertex pair).
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    n: NumNodes,
    edges: Vec<WeightedEdge>,
    /// `endpoint[p]` is the vertex that half-edge `p` points to
    endpoint: Vec<Node>,
    /// `incident[v]` lists the half-edges leading away from `v`
    incident: Vec<SmallVec<[Endpoint; 4]>>,
}

impl WeightedGraph {
    /// Builds a graph with `n` vertices from an iterator of weighted edges.
    ///
    /// # Errors
    /// [`Error::EndpointOutOfRange`], [`Error::SelfLoop`] or
    /// [`Error::NonFiniteEdgeWeight`] if an edge is malformed.
    ///
    /// # Examples
    /// ```
    /// use wmatching::prelude::*;
    ///
    /// let g = WeightedGraph::from_edges(3, [(0, 1, 2.0), (1, 2, -1.5)]).unwrap();
    /// assert_eq!(g.number_of_edges(), 2);
    /// assert_eq!(g.neighbors_of(1).collect::<Vec<_>>(), vec![0, 2]);
    /// ```
    pub fn from_edges<I, E>(n: NumNodes, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<WeightedEdge>,
    {
        let mut collapsed: Vec<WeightedEdge> = Vec::new();
        let mut index_of_pair: FxHashMap<(Node, Node), usize> = FxHashMap::default();

        for edge in edges {
            let WeightedEdge(u, v, w) = edge.into();

            if u >= n || v >= n {
                return Err(Error::EndpointOutOfRange { u, v, n });
            }
            if u == v {
                return Err(Error::SelfLoop(u));
            }
            if !w.is_finite() {
                return Err(Error::NonFiniteEdgeWeight { u, v, weight: w });
            }

            let key = (u.min(v), u.max(v));
            match index_of_pair.get(&key) {
                Some(&k) if collapsed[k].2 >= w => {}
                Some(&k) => collapsed[k].2 = w,
                None => {
                    index_of_pair.insert(key, collapsed.len());
                    collapsed.push(WeightedEdge(u, v, w));
                }
            }
        }

        let mut endpoint = Vec::with_capacity(2 * collapsed.len());
        let mut incident = vec![SmallVec::new(); n as usize];
        for (k, &WeightedEdge(u, v, _)) in collapsed.iter().enumerate() {
            endpoint.push(u);
            endpoint.push(v);
            incident[u as usize].push(2 * k as Endpoint + 1);
            incident[v as usize].push(2 * k as Endpoint);
        }

        Ok(Self {
            n,
            edges: collapsed,
            endpoint,
            incident,
        })
    }

    /// Returns the number of vertices
    pub fn number_of_nodes(&self) -> NumNodes {
        self.n
    }

    /// Returns the number of vertices as usize
    pub fn len(&self) -> usize {
        self.n as usize
    }

    /// Returns *true* if the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the number of (collapsed) edges
    pub fn number_of_edges(&self) -> NumEdges {
        self.edges.len() as NumEdges
    }

    /// Returns an iterator over V
    pub fn vertices(&self) -> impl Iterator<Item = Node> {
        0..self.n
    }

    /// Returns the `k`-th edge.
    /// ** Panics if `k >= m` **
    #[inline]
    pub fn edge(&self, k: NumEdges) -> WeightedEdge {
        self.edges[k as usize]
    }

    /// Returns all edges as a slice
    pub fn edges(&self) -> &[WeightedEdge] {
        &self.edges
    }

    /// Returns the vertex that half-edge `p` points to.
    /// ** Panics if `p >= 2m` **
    #[inline]
    pub fn endpoint(&self, p: Endpoint) -> Node {
        self.endpoint[p as usize]
    }

    /// Returns the half-edges leading away from `v`.
    /// ** Panics if `v >= n` **
    #[inline]
    pub fn half_edges_of(&self, v: Node) -> &[Endpoint] {
        &self.incident[v as usize]
    }

    /// Returns an iterator over the neighbors of `v`.
    /// ** Panics if `v >= n` **
    pub fn neighbors_of(&self, v: Node) -> impl Iterator<Item = Node> + '_ {
        self.half_edges_of(v).iter().map(|&p| self.endpoint(p))
    }

    /// Returns the degree of `v` in the collapsed graph.
    /// ** Panics if `v >= n` **
    pub fn degree_of(&self, v: Node) -> NumNodes {
        self.incident[v as usize].len() as NumNodes
    }

    /// Returns the largest absolute edge weight, or `0.0` without edges.
    ///
    /// Used to scale the numeric tolerance of the matcher to the instance.
    pub fn max_abs_weight(&self) -> Weight {
        self.edges.iter().fold(0.0, |acc, e| acc.max(e.2.abs()))
    }

    /// Returns the largest edge weight clamped below by zero.
    ///
    /// This is the initial value of all vertex duals in the matcher: it
    /// keeps every edge slack non-negative while allowing the empty
    /// matching to remain optimal for all-negative weights.
    pub fn max_weight(&self) -> Weight {
        self.edges.iter().fold(0.0, |acc, e| acc.max(e.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn half_edge_layout() {
        let g = WeightedGraph::from_edges(4, [(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0)]).unwrap();

        assert_eq!(g.number_of_nodes(), 4);
        assert_eq!(g.number_of_edges(), 3);

        // half-edge 2k points to the second endpoint, 2k+1 to the first
        assert_eq!(g.endpoint(2), 1);
        assert_eq!(g.endpoint(3), 2);

        for v in g.vertices() {
            for &p in g.half_edges_of(v) {
                assert_eq!(g.endpoint(p ^ 1), v);
            }
        }

        assert_eq!(g.neighbors_of(1).collect_vec(), vec![0, 2]);
        assert_eq!(g.degree_of(1), 2);
    }

    #[test]
    fn parallel_edges_collapse_to_max_weight() {
        let g = WeightedGraph::from_edges(
            2,
            [(0, 1, 1.0), (1, 0, 5.0), (0, 1, 3.0), (0, 1, 5.0)],
        )
        .unwrap();
        assert_eq!(g.number_of_edges(), 1);
        assert_eq!(g.edge(0).weight(), 5.0);
    }

    #[test]
    fn validation() {
        assert!(matches!(
            WeightedGraph::from_edges(2, [(0, 2, 1.0)]).unwrap_err(),
            Error::EndpointOutOfRange { u: 0, v: 2, n: 2 }
        ));
        assert!(matches!(
            WeightedGraph::from_edges(2, [(1, 1, 1.0)]).unwrap_err(),
            Error::SelfLoop(1)
        ));
        assert!(matches!(
            WeightedGraph::from_edges(2, [(0, 1, f64::NAN)]).unwrap_err(),
            Error::NonFiniteEdgeWeight { u: 0, v: 1, .. }
        ));
    }

    #[test]
    fn empty_graph() {
        let g = WeightedGraph::from_edges(0, std::iter::empty::<WeightedEdge>()).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.number_of_edges(), 0);
        assert_eq!(g.max_weight(), 0.0);
    }

    #[test]
    fn max_weights() {
        let g = WeightedGraph::from_edges(3, [(0, 1, -4.0), (1, 2, -2.0)]).unwrap();
        assert_eq!(g.max_abs_weight(), 4.0);
        assert_eq!(g.max_weight(), 0.0);

        let g = WeightedGraph::from_edges(3, [(0, 1, -4.0), (1, 2, 2.0)]).unwrap();
        assert_eq!(g.max_weight(), 2.0);
    }
}
