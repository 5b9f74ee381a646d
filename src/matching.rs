/*!
# Maximum-Weight General Matching

Computes an exact maximum-weight matching on an arbitrary weighted
[`WeightedGraph`] with Edmonds' blossom algorithm in its primal-dual
(Galil-style) formulation: alternating trees are grown over tight edges,
odd cycles are contracted into blossoms, and dual variables are adjusted by
the smallest of four candidate deltas whenever no tight edge is available.

The algorithm is taken from "Efficient Algorithms for Finding Maximum
Matching in Graphs" by Zvi Galil, ACM Computing Surveys, 1986, following
the well-known formulation by Joris van Rantwijk. Runtime is `O(n^3)`.

## Blossom arena

Vertices are numbered `0..n`; non-trivial blossoms live in the id range
`n..2n` of the same flat arrays. Each blossom record holds its base vertex,
parent id and an ordered ring of children with the half-edges connecting
them. Parent links always point towards enclosing blossoms, so the records
form a forest and parent-chain walks terminate.

## Numeric tolerance

Duals and slacks are `f64`; a slack within `tolerance` of zero counts as
tight and a blossom dual within `tolerance` of zero as expandable, where
`tolerance = 1e-9 * max(1, max |weight|)` by default. Dual adjustments that
turn negative beyond the tolerance abort with
[`Error::NumericInstability`].
*/

use smallvec::SmallVec;

use crate::{edge::*, error::*, graph::WeightedGraph, node::*};

/// Edge-id sentinel of the matcher's best-edge bookkeeping
const INVALID_EDGE: NumEdges = NumEdges::MAX;

/// Computes a maximum-weight matching of the given graph.
///
/// Returns a mate array of length `n`: `mate[v]` is the matched partner of
/// `v`, or [`INVALID_NODE`] if `v` is unmatched. The array is symmetric,
/// `mate[mate[v]] == v` for every matched `v`.
///
/// Without `max_cardinality` the matching maximizes total weight over
/// matchings of any size (possibly the empty matching). With
/// `max_cardinality` it maximizes total weight among matchings of maximum
/// possible cardinality; vertices may still end up unmatched when the graph
/// has no perfect matching.
///
/// Convenience wrapper around [`GeneralMatcher`] with the default
/// tolerance.
///
/// # Examples
/// ```
/// use wmatching::prelude::*;
///
/// let g = WeightedGraph::from_edges(4, [(0, 1, 2.0), (1, 2, 3.0), (2, 3, 2.0)]).unwrap();
/// assert_eq!(maximum_weight_matching(&g, false).unwrap(), vec![1, 0, 3, 2]);
/// ```
pub fn maximum_weight_matching(graph: &WeightedGraph, max_cardinality: bool) -> Result<Vec<Node>> {
    GeneralMatcher::new(graph)
        .max_cardinality(max_cardinality)
        .solve()
}

/// Returns the matched pairs `(u, v)` with `u < v` of a mate array,
/// sorted by first endpoint
pub fn matched_pairs(mate: &[Node]) -> Vec<(Node, Node)> {
    mate.iter()
        .enumerate()
        .filter_map(|(u, &v)| (v != INVALID_NODE && (u as Node) < v).then_some((u as Node, v)))
        .collect()
}

/// Returns the total weight of the matching described by `mate`
pub fn matching_weight(graph: &WeightedGraph, mate: &[Node]) -> Weight {
    graph
        .edges()
        .iter()
        .filter(|&&WeightedEdge(u, v, _)| mate[u as usize] == v)
        .map(|e| e.weight())
        .sum()
}

/// Label of a top-level vertex/blossom in the alternating forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    /// Not reached by the current search
    Free,
    /// On the root side of its alternating tree (an S-vertex/blossom)
    Even,
    /// Reached over a matched edge (a T-vertex/blossom)
    Odd,
}

/// The structural event requiring the smallest dual adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaKind {
    /// No event left; remaining slack sits on vertex duals only (optimum)
    Terminal,
    /// Make the least-slack edge from an even vertex to a free vertex
    /// tight and grow the tree over it
    GrowEdge(NumEdges),
    /// Make the least-slack edge between two even blossoms tight,
    /// triggering augmentation or blossom formation
    ConnectEdge(NumEdges),
    /// Shrink an odd blossom's dual to zero and expand it
    ExpandBlossom(Node),
}

/// Solver state for one matching computation.
///
/// Vertices and blossoms share the flat working arrays (ids `0..n` and
/// `n..2n`). All state is allocated per instance and discarded afterwards;
/// concurrent solves on independent graphs are safe.
pub struct GeneralMatcher<'a> {
    graph: &'a WeightedGraph,
    max_cardinality: bool,
    tolerance: Weight,

    /// `mate[v]` is the remote half-edge of v's matched edge, or invalid
    mate: Vec<Endpoint>,
    /// Labels of top-level vertices/blossoms; for a vertex inside an odd
    /// blossom, `label[v] == Odd` iff `v` was reached from outside
    label: Vec<Label>,
    /// Remote half-edge through which the label was obtained
    label_end: Vec<Endpoint>,
    /// Top-level blossom containing each vertex (the vertex itself if trivial)
    in_blossom: Vec<Node>,
    /// Immediate enclosing blossom, or `INVALID_NODE` at top level
    blossom_parent: Vec<Node>,
    /// Base vertex of each vertex/blossom, `INVALID_NODE` for unused slots
    blossom_base: Vec<Node>,
    /// Ordered ring of sub-blossoms, starting at the base
    blossom_children: Vec<SmallVec<[Node; 8]>>,
    /// `blossom_endpoints[b][i]` is the half-edge of `blossom_children[b][i]`
    /// on the ring edge towards child `i + 1`
    blossom_endpoints: Vec<SmallVec<[Endpoint; 8]>>,
    /// Least-slack edge towards a different even blossom (for even
    /// blossoms) resp. from any even vertex (for free vertices)
    best_edge: Vec<NumEdges>,
    /// Per even blossom: least-slack edges to neighboring even blossoms
    blossom_best_edges: Vec<Vec<NumEdges>>,
    /// Recyclable blossom ids
    unused_blossoms: Vec<Node>,
    /// Dual variables: `u(v)` for vertices and `z(b) / 2` for blossoms,
    /// so that a single delta adjusts both kinds uniformly
    dual: Vec<Weight>,
    /// Edges known to have zero slack
    allowed: NodeBitSet,
    /// Scratch marks of `scan_blossom`
    breadcrumbs: NodeBitSet,
    /// Queue of newly discovered even vertices
    queue: Vec<Node>,
}

impl<'a> GeneralMatcher<'a> {
    /// Creates a solver for the given graph with the default tolerance
    /// scaled to the instance, `1e-9 * max(1, max |weight|)`.
    pub fn new(graph: &'a WeightedGraph) -> Self {
        let n = graph.len();
        let m = graph.number_of_edges() as usize;

        // Vertex duals start at half the largest (non-negative) edge
        // weight, making every edge slack non-negative while keeping the
        // empty matching dual-optimal for all-negative weights.
        let initial_dual = graph.max_weight() / 2.0;
        let mut dual = vec![initial_dual; n];
        dual.extend(std::iter::repeat(0.0).take(n));

        Self {
            graph,
            max_cardinality: false,
            tolerance: instance_tolerance(graph.max_abs_weight()),
            mate: vec![INVALID_ENDPOINT; n],
            label: vec![Label::Free; 2 * n],
            label_end: vec![INVALID_ENDPOINT; 2 * n],
            in_blossom: (0..n as Node).collect(),
            blossom_parent: vec![INVALID_NODE; 2 * n],
            blossom_base: (0..n as Node)
                .chain(std::iter::repeat(INVALID_NODE).take(n))
                .collect(),
            blossom_children: vec![SmallVec::new(); 2 * n],
            blossom_endpoints: vec![SmallVec::new(); 2 * n],
            best_edge: vec![INVALID_EDGE; 2 * n],
            blossom_best_edges: vec![Vec::new(); 2 * n],
            unused_blossoms: (n as Node..2 * n as Node).collect(),
            dual,
            allowed: NodeBitSet::with_capacity(m),
            breadcrumbs: NodeBitSet::with_capacity(2 * n),
            queue: Vec::new(),
        }
    }

    /// Sets whether only maximum-cardinality matchings are considered
    pub fn set_max_cardinality(&mut self, max_cardinality: bool) {
        self.max_cardinality = max_cardinality;
    }

    /// Chainable version of [`Self::set_max_cardinality`]
    pub fn max_cardinality(mut self, max_cardinality: bool) -> Self {
        self.set_max_cardinality(max_cardinality);
        self
    }

    /// Overrides the numeric tolerance used for tightness tests and
    /// dual-feasibility guards
    pub fn set_tolerance(&mut self, tolerance: Weight) {
        self.tolerance = tolerance;
    }

    /// Chainable version of [`Self::set_tolerance`]
    pub fn tolerance(mut self, tolerance: Weight) -> Self {
        self.set_tolerance(tolerance);
        self
    }

    /// Runs the solver to completion and returns the mate array.
    ///
    /// # Errors
    /// [`Error::NumericInstability`] if a dual adjustment turns negative
    /// beyond the tolerance, which indicates weights too large for the
    /// configured tolerance.
    pub fn solve(mut self) -> Result<Vec<Node>> {
        let graph = self.graph;
        let n = graph.len();

        if n == 0 || graph.number_of_edges() == 0 {
            return Ok(vec![INVALID_NODE; n]);
        }

        // Each stage augments the matching by one edge (or proves that no
        // further augmentation exists), so n stages always suffice.
        for _stage in 0..n {
            self.label.fill(Label::Free);
            self.best_edge.fill(INVALID_EDGE);
            for b in n..2 * n {
                self.blossom_best_edges[b].clear();
            }
            self.allowed.clear();
            self.queue.clear();

            // Root the alternating forest at all exposed vertices.
            for v in 0..n as Node {
                if self.mate[v as usize] == INVALID_ENDPOINT
                    && self.label[self.in_blossom[v as usize] as usize] == Label::Free
                {
                    self.assign_label(v, Label::Even, INVALID_ENDPOINT);
                }
            }

            let mut augmented = false;
            loop {
                // Grow the forest over tight edges until an augmenting
                // path appears or the queue runs dry.
                'scan: while !augmented {
                    let Some(v) = self.queue.pop() else { break };
                    debug_assert_eq!(
                        self.label[self.in_blossom[v as usize] as usize],
                        Label::Even
                    );

                    for &p in graph.half_edges_of(v) {
                        let k = p / 2;
                        let w = graph.endpoint(p);
                        if self.in_blossom[v as usize] == self.in_blossom[w as usize] {
                            // edge internal to a blossom
                            continue;
                        }

                        let mut k_slack = 0.0;
                        let mut is_allowed = self.allowed.contains(k as usize);
                        if !is_allowed {
                            k_slack = self.slack(k);
                            if k_slack <= self.tolerance {
                                self.allowed.insert(k as usize);
                                is_allowed = true;
                            }
                        }

                        let bw = self.in_blossom[w as usize];
                        if is_allowed {
                            match self.label[bw as usize] {
                                Label::Free => {
                                    // w is free; reach it over the tight
                                    // edge and its mate becomes even
                                    self.assign_label(w, Label::Odd, p ^ 1);
                                }
                                Label::Even => {
                                    // two even vertices: either a common
                                    // tree root (blossom) or two distinct
                                    // trees (augmenting path)
                                    let base = self.scan_blossom(v, w);
                                    if base != INVALID_NODE {
                                        self.add_blossom(base, k);
                                    } else {
                                        self.augment_matching(k);
                                        augmented = true;
                                        continue 'scan;
                                    }
                                }
                                Label::Odd => {
                                    if self.label[w as usize] == Label::Free {
                                        // w sits inside an odd blossom but
                                        // was not yet reached itself; the
                                        // mark is needed for relabeling
                                        // during blossom expansion
                                        self.label[w as usize] = Label::Odd;
                                        self.label_end[w as usize] = p ^ 1;
                                    }
                                }
                            }
                        } else if self.label[bw as usize] == Label::Even {
                            // least-slack edge to a different even blossom
                            let bv = self.in_blossom[v as usize];
                            let best = self.best_edge[bv as usize];
                            if best == INVALID_EDGE || k_slack < self.slack(best) {
                                self.best_edge[bv as usize] = k;
                            }
                        } else if self.label[w as usize] == Label::Free {
                            // least-slack edge reaching the free vertex w
                            let best = self.best_edge[w as usize];
                            if best == INVALID_EDGE || k_slack < self.slack(best) {
                                self.best_edge[w as usize] = k;
                            }
                        }
                    }
                }

                if augmented {
                    break;
                }

                // No augmenting path under the current duals: pick the
                // structural event requiring the smallest adjustment.
                let mut best: Option<(Weight, DeltaKind)> = (!self.max_cardinality).then(|| {
                    let d = self.min_vertex_dual();
                    (d, DeltaKind::Terminal)
                });

                // delta2: least slack from an even vertex to a free vertex
                for v in 0..n {
                    if self.label[self.in_blossom[v] as usize] == Label::Free
                        && self.best_edge[v] != INVALID_EDGE
                    {
                        let d = self.slack(self.best_edge[v]);
                        if best.is_none_or(|(bd, _)| d < bd) {
                            best = Some((d, DeltaKind::GrowEdge(self.best_edge[v])));
                        }
                    }
                }

                // delta3: half the least slack between two even blossoms
                for b in 0..2 * n {
                    if self.blossom_parent[b] == INVALID_NODE
                        && self.label[b] == Label::Even
                        && self.best_edge[b] != INVALID_EDGE
                    {
                        let d = self.slack(self.best_edge[b]) / 2.0;
                        if best.is_none_or(|(bd, _)| d < bd) {
                            best = Some((d, DeltaKind::ConnectEdge(self.best_edge[b])));
                        }
                    }
                }

                // delta4: smallest dual of a top-level odd blossom
                for b in n..2 * n {
                    if self.blossom_base[b] != INVALID_NODE
                        && self.blossom_parent[b] == INVALID_NODE
                        && self.label[b] == Label::Odd
                        && best.is_none_or(|(bd, _)| self.dual[b] < bd)
                    {
                        best = Some((self.dual[b], DeltaKind::ExpandBlossom(b as Node)));
                    }
                }

                let (delta, kind) = best.unwrap_or_else(|| {
                    // max-cardinality optimum reached; one final adjustment
                    // makes the duals verifiable
                    debug_assert!(self.max_cardinality);
                    (self.min_vertex_dual().max(0.0), DeltaKind::Terminal)
                });

                if delta < -self.tolerance {
                    return Err(Error::NumericInstability(
                        "negative dual adjustment in matching search",
                    ));
                }

                // Pay delta into the duals: even side decreases, odd side
                // increases, blossoms by their own sign convention.
                for v in 0..n {
                    match self.label[self.in_blossom[v] as usize] {
                        Label::Free => {}
                        Label::Even => self.dual[v] -= delta,
                        Label::Odd => self.dual[v] += delta,
                    }
                }
                for b in n..2 * n {
                    if self.blossom_base[b] != INVALID_NODE
                        && self.blossom_parent[b] == INVALID_NODE
                    {
                        match self.label[b] {
                            Label::Free => {}
                            Label::Even => self.dual[b] += delta,
                            Label::Odd => self.dual[b] -= delta,
                        }
                    }
                }

                // Take action at the point where the minimum occurred.
                match kind {
                    DeltaKind::Terminal => break,
                    DeltaKind::GrowEdge(k) => {
                        self.allowed.insert(k as usize);
                        let WeightedEdge(mut i, j, _) = graph.edge(k);
                        if self.label[self.in_blossom[i as usize] as usize] == Label::Free {
                            i = j;
                        }
                        debug_assert_eq!(
                            self.label[self.in_blossom[i as usize] as usize],
                            Label::Even
                        );
                        self.queue.push(i);
                    }
                    DeltaKind::ConnectEdge(k) => {
                        self.allowed.insert(k as usize);
                        let WeightedEdge(i, _, _) = graph.edge(k);
                        debug_assert_eq!(
                            self.label[self.in_blossom[i as usize] as usize],
                            Label::Even
                        );
                        self.queue.push(i);
                    }
                    DeltaKind::ExpandBlossom(b) => self.expand_blossom(b, false),
                }
            }

            if !augmented {
                break;
            }

            // End of stage: expand even blossoms whose dual dropped to zero
            // (they are no longer paid for and their structure is loose).
            for b in n as Node..2 * n as Node {
                if self.blossom_parent[b as usize] == INVALID_NODE
                    && self.blossom_base[b as usize] != INVALID_NODE
                    && self.label[b as usize] == Label::Even
                    && self.dual[b as usize] <= self.tolerance
                {
                    self.expand_blossom(b, true);
                }
            }
        }

        if cfg!(debug_assertions) {
            self.verify_optimum();
        }

        // Turn remote half-edges into partner vertices.
        let mate = self
            .mate
            .iter()
            .map(|&p| {
                if p == INVALID_ENDPOINT {
                    INVALID_NODE
                } else {
                    graph.endpoint(p)
                }
            })
            .collect::<Vec<_>>();

        debug_assert!(mate
            .iter()
            .enumerate()
            .all(|(v, &w)| w == INVALID_NODE || mate[w as usize] == v as Node));
        Ok(mate)
    }

    /// Returns *true* if `b` is a blossom id rather than a vertex
    #[inline]
    fn is_blossom(&self, b: Node) -> bool {
        b as usize >= self.graph.len()
    }

    /// Slack of edge `k` under the current duals (not valid for edges
    /// internal to a blossom)
    #[inline]
    fn slack(&self, k: NumEdges) -> Weight {
        let WeightedEdge(u, v, w) = self.graph.edge(k);
        self.dual[u as usize] + self.dual[v as usize] - w
    }

    fn min_vertex_dual(&self) -> Weight {
        self.dual[..self.graph.len()]
            .iter()
            .fold(Weight::INFINITY, |a, &b| a.min(b))
    }

    /// Collects the vertices contained in (sub-)blossom `b`
    fn blossom_leaves(&self, b: Node) -> Vec<Node> {
        let mut leaves = Vec::new();
        let mut stack = vec![b];
        while let Some(t) = stack.pop() {
            if self.is_blossom(t) {
                stack.extend(self.blossom_children[t as usize].iter().copied());
            } else {
                leaves.push(t);
            }
        }
        leaves
    }

    /// Assigns `label` to the top-level blossom containing vertex `w`,
    /// reached through the edge with remote half-edge `p`.
    ///
    /// An even blossom enqueues all its vertices; an odd blossom passes the
    /// even label on to the mate of its base.
    fn assign_label(&mut self, w: Node, label: Label, p: Endpoint) {
        debug_assert_ne!(label, Label::Free);
        let b = self.in_blossom[w as usize];
        debug_assert_eq!(self.label[w as usize], Label::Free);
        debug_assert_eq!(self.label[b as usize], Label::Free);

        self.label[w as usize] = label;
        self.label[b as usize] = label;
        self.label_end[w as usize] = p;
        self.label_end[b as usize] = p;
        self.best_edge[w as usize] = INVALID_EDGE;
        self.best_edge[b as usize] = INVALID_EDGE;

        if label == Label::Even {
            let leaves = self.blossom_leaves(b);
            self.queue.extend(leaves);
        } else {
            // the base is the only vertex of an odd blossom with an
            // external mate
            let base = self.blossom_base[b as usize];
            let mate_end = self.mate[base as usize];
            debug_assert_ne!(mate_end, INVALID_ENDPOINT);
            self.assign_label(self.graph.endpoint(mate_end), Label::Even, mate_end ^ 1);
        }
    }

    /// Traces back from the even vertices `v` and `w` towards their tree
    /// roots, alternating between both paths. Returns the first common
    /// ancestor's base vertex (a new blossom closes there), or
    /// `INVALID_NODE` if the paths end in two distinct roots (an
    /// augmenting path exists).
    fn scan_blossom(&mut self, v: Node, w: Node) -> Node {
        let mut path = Vec::new();
        let mut base = INVALID_NODE;
        let (mut v, mut w) = (v, w);

        while v != INVALID_NODE || w != INVALID_NODE {
            let mut b = self.in_blossom[v as usize];
            if self.breadcrumbs.contains(b as usize) {
                base = self.blossom_base[b as usize];
                break;
            }

            debug_assert_eq!(self.label[b as usize], Label::Even);
            path.push(b);
            self.breadcrumbs.insert(b as usize);

            debug_assert_eq!(
                self.label_end[b as usize],
                self.mate[self.blossom_base[b as usize] as usize]
            );
            if self.label_end[b as usize] == INVALID_ENDPOINT {
                // the base of b is exposed; this path ends here
                v = INVALID_NODE;
            } else {
                // step over the matched edge, then over the tree edge of
                // the odd blossom behind it
                v = self.graph.endpoint(self.label_end[b as usize]);
                b = self.in_blossom[v as usize];
                debug_assert_eq!(self.label[b as usize], Label::Odd);
                debug_assert_ne!(self.label_end[b as usize], INVALID_ENDPOINT);
                v = self.graph.endpoint(self.label_end[b as usize]);
            }

            if w != INVALID_NODE {
                std::mem::swap(&mut v, &mut w);
            }
        }

        for b in path {
            self.breadcrumbs.remove(b as usize);
        }
        base
    }

    /// Contracts the cycle closed by edge `k` (connecting two even
    /// vertices with common ancestor base `base`) into a new blossom.
    ///
    /// The new blossom is even with dual zero; former odd sub-blossoms
    /// turn even and their vertices join the queue.
    fn add_blossom(&mut self, base: Node, k: NumEdges) {
        let WeightedEdge(mut v, mut w, _) = self.graph.edge(k);
        let bb = self.in_blossom[base as usize];
        let mut bv = self.in_blossom[v as usize];
        let mut bw = self.in_blossom[w as usize];

        let b = self.unused_blossoms.pop().expect("blossom arena exhausted");
        self.blossom_base[b as usize] = base;
        self.blossom_parent[b as usize] = INVALID_NODE;
        self.blossom_parent[bb as usize] = b;

        let mut children: SmallVec<[Node; 8]> = SmallVec::new();
        let mut endpoints: SmallVec<[Endpoint; 8]> = SmallVec::new();

        // Trace back from v to the base.
        while bv != bb {
            self.blossom_parent[bv as usize] = b;
            children.push(bv);
            endpoints.push(self.label_end[bv as usize]);
            debug_assert!(
                self.label[bv as usize] == Label::Odd
                    || (self.label[bv as usize] == Label::Even
                        && self.label_end[bv as usize]
                            == self.mate[self.blossom_base[bv as usize] as usize])
            );
            debug_assert_ne!(self.label_end[bv as usize], INVALID_ENDPOINT);
            v = self.graph.endpoint(self.label_end[bv as usize]);
            bv = self.in_blossom[v as usize];
        }

        // Put the base first, then the v-side path in base-to-v order,
        // then edge k, then the w-side path.
        children.push(bb);
        children.reverse();
        endpoints.reverse();
        endpoints.push(2 * k);

        while bw != bb {
            self.blossom_parent[bw as usize] = b;
            children.push(bw);
            endpoints.push(self.label_end[bw as usize] ^ 1);
            debug_assert!(
                self.label[bw as usize] == Label::Odd
                    || (self.label[bw as usize] == Label::Even
                        && self.label_end[bw as usize]
                            == self.mate[self.blossom_base[bw as usize] as usize])
            );
            debug_assert_ne!(self.label_end[bw as usize], INVALID_ENDPOINT);
            w = self.graph.endpoint(self.label_end[bw as usize]);
            bw = self.in_blossom[w as usize];
        }

        debug_assert_eq!(children.len() % 2, 1);
        self.blossom_children[b as usize] = children;
        self.blossom_endpoints[b as usize] = endpoints;

        debug_assert_eq!(self.label[bb as usize], Label::Even);
        self.label[b as usize] = Label::Even;
        self.label_end[b as usize] = self.label_end[bb as usize];
        self.dual[b as usize] = 0.0;

        // Relabel the swallowed vertices.
        for leaf in self.blossom_leaves(b) {
            if self.label[self.in_blossom[leaf as usize] as usize] == Label::Odd {
                // former odd vertex turns even; enqueue it
                self.queue.push(leaf);
            }
            self.in_blossom[leaf as usize] = b;
        }

        // Recompute least-slack edges towards neighboring even blossoms.
        let mut best_edge_to: Vec<NumEdges> = vec![INVALID_EDGE; 2 * self.graph.len()];
        let children = self.blossom_children[b as usize].clone();
        for bv in children {
            let candidate_lists: Vec<Vec<NumEdges>> =
                if self.blossom_best_edges[bv as usize].is_empty() {
                    // no cached list; take all edges of the leaves
                    self.blossom_leaves(bv)
                        .into_iter()
                        .map(|leaf| {
                            self.graph
                                .half_edges_of(leaf)
                                .iter()
                                .map(|&p| p / 2)
                                .collect()
                        })
                        .collect()
                } else {
                    vec![std::mem::take(&mut self.blossom_best_edges[bv as usize])]
                };

            for list in candidate_lists {
                for k in list {
                    let WeightedEdge(mut i, mut j, _) = self.graph.edge(k);
                    if self.in_blossom[j as usize] == b {
                        std::mem::swap(&mut i, &mut j);
                    }
                    let bj = self.in_blossom[j as usize];
                    if bj != b && self.label[bj as usize] == Label::Even {
                        let best = best_edge_to[bj as usize];
                        if best == INVALID_EDGE || self.slack(k) < self.slack(best) {
                            best_edge_to[bj as usize] = k;
                        }
                    }
                }
            }

            self.blossom_best_edges[bv as usize].clear();
            self.best_edge[bv as usize] = INVALID_EDGE;
        }

        self.blossom_best_edges[b as usize] = best_edge_to
            .into_iter()
            .filter(|&k| k != INVALID_EDGE)
            .collect();

        let mut best = INVALID_EDGE;
        for &k in &self.blossom_best_edges[b as usize] {
            if best == INVALID_EDGE || self.slack(k) < self.slack(best) {
                best = k;
            }
        }
        self.best_edge[b as usize] = best;
    }

    /// Expands the top-level blossom `b` back into its sub-blossoms.
    ///
    /// At the end of a stage (`end_stage`), loose sub-blossoms with zero
    /// dual are expanded recursively. During a stage, an expanding odd
    /// blossom must relabel its sub-blossoms along the path through which
    /// it received its label.
    fn expand_blossom(&mut self, b: Node, end_stage: bool) {
        let children = self.blossom_children[b as usize].clone();

        for &s in &children {
            self.blossom_parent[s as usize] = INVALID_NODE;
            if !self.is_blossom(s) {
                self.in_blossom[s as usize] = s;
            } else if end_stage && self.dual[s as usize] <= self.tolerance {
                self.expand_blossom(s, end_stage);
            } else {
                for leaf in self.blossom_leaves(s) {
                    self.in_blossom[leaf as usize] = s;
                }
            }
        }

        if !end_stage && self.label[b as usize] == Label::Odd {
            // Relabel the ring from the entry sub-blossom (through which b
            // obtained its label) to the base, then mark the remaining
            // sub-blossoms reachable from outside.
            debug_assert_ne!(self.label_end[b as usize], INVALID_ENDPOINT);
            let entry_child = self.in_blossom
                [self.graph.endpoint(self.label_end[b as usize] ^ 1) as usize];

            let endpoints = self.blossom_endpoints[b as usize].clone();
            let len = children.len() as isize;
            let wrap = |j: isize| j.rem_euclid(len) as usize;

            let pos = children.iter().position(|&c| c == entry_child).unwrap() as isize;
            // from an odd ring position walk forward, from an even one
            // backward; the shift picks the half-edge oriented along the
            // walking direction
            let (step, shift): (isize, Endpoint) = if pos & 1 == 1 { (1, 0) } else { (-1, 1) };
            let endp_at = |j: isize| endpoints[wrap(j - shift as isize)] ^ shift;

            let mut j = if step == 1 { pos - len } else { pos };
            let mut p = self.label_end[b as usize];
            while j != 0 {
                // relabel the odd sub-blossom at this ring position
                self.label[self.graph.endpoint(p ^ 1) as usize] = Label::Free;
                self.label[self.graph.endpoint(endp_at(j) ^ 1) as usize] = Label::Free;
                self.assign_label(self.graph.endpoint(p ^ 1), Label::Odd, p);

                // the ring edges towards the next odd position are tight
                self.allowed.insert((endp_at(j) / 2) as usize);
                j += step;
                p = endp_at(j);
                self.allowed.insert((p / 2) as usize);
                j += step;
            }

            // Relabel the base sub-blossom odd without stepping through to
            // its mate.
            let base_child = children[wrap(j)];
            self.label[self.graph.endpoint(p ^ 1) as usize] = Label::Odd;
            self.label[base_child as usize] = Label::Odd;
            self.label_end[self.graph.endpoint(p ^ 1) as usize] = p;
            self.label_end[base_child as usize] = p;
            self.best_edge[base_child as usize] = INVALID_EDGE;

            // Continue along the ring: sub-blossoms not on the entry path
            // stay free unless reachable from a neighboring even vertex.
            j += step;
            while children[wrap(j)] != entry_child {
                let bv = children[wrap(j)];
                if self.label[bv as usize] == Label::Even {
                    j += step;
                    continue;
                }

                let reached = self
                    .blossom_leaves(bv)
                    .into_iter()
                    .find(|&leaf| self.label[leaf as usize] != Label::Free);
                if let Some(v) = reached {
                    debug_assert_eq!(self.label[v as usize], Label::Odd);
                    debug_assert_eq!(self.in_blossom[v as usize], bv);
                    self.label[v as usize] = Label::Free;
                    self.label[self
                        .graph
                        .endpoint(self.mate[self.blossom_base[bv as usize] as usize])
                        as usize] = Label::Free;
                    let through = self.label_end[v as usize];
                    self.assign_label(v, Label::Odd, through);
                }
                j += step;
            }
        }

        // Recycle the arena slot.
        self.label[b as usize] = Label::Free;
        self.label_end[b as usize] = INVALID_ENDPOINT;
        self.blossom_base[b as usize] = INVALID_NODE;
        self.best_edge[b as usize] = INVALID_EDGE;
        self.blossom_children[b as usize].clear();
        self.blossom_endpoints[b as usize].clear();
        self.blossom_best_edges[b as usize].clear();
        self.unused_blossoms.push(b);
    }

    /// Swaps matched/unmatched edges along the alternating path inside
    /// blossom `b` from vertex `v` to the base, making `v` the new base.
    fn augment_blossom(&mut self, b: Node, v: Node) {
        // Bubble up to the immediate sub-blossom of b containing v.
        let mut t = v;
        while self.blossom_parent[t as usize] != b {
            t = self.blossom_parent[t as usize];
        }
        if self.is_blossom(t) {
            self.augment_blossom(t, v);
        }

        let children = self.blossom_children[b as usize].clone();
        let endpoints = self.blossom_endpoints[b as usize].clone();
        let len = children.len() as isize;
        let wrap = |j: isize| j.rem_euclid(len) as usize;

        let pos = children.iter().position(|&c| c == t).unwrap() as isize;
        let (step, shift): (isize, Endpoint) = if pos & 1 == 1 { (1, 0) } else { (-1, 1) };
        let endp_at = |j: isize| endpoints[wrap(j - shift as isize)] ^ shift;

        // Walk the ring from t to the base, matching every second edge.
        let mut j = if step == 1 { pos - len } else { pos };
        while j != 0 {
            j += step;
            let p = endp_at(j);
            let t1 = children[wrap(j)];
            if self.is_blossom(t1) {
                self.augment_blossom(t1, self.graph.endpoint(p));
            }
            j += step;
            let t2 = children[wrap(j)];
            if self.is_blossom(t2) {
                self.augment_blossom(t2, self.graph.endpoint(p ^ 1));
            }
            self.mate[self.graph.endpoint(p) as usize] = p ^ 1;
            self.mate[self.graph.endpoint(p ^ 1) as usize] = p;
        }

        // Rotate the ring so that the new base comes first.
        self.blossom_children[b as usize].rotate_left(pos as usize);
        self.blossom_endpoints[b as usize].rotate_left(pos as usize);
        self.blossom_base[b as usize] =
            self.blossom_base[self.blossom_children[b as usize][0] as usize];
        debug_assert_eq!(self.blossom_base[b as usize], v);
    }

    /// Swaps matched/unmatched edges along the augmenting path through
    /// edge `k`, which connects two even vertices in distinct trees.
    fn augment_matching(&mut self, k: NumEdges) {
        let WeightedEdge(v, w, _) = self.graph.edge(k);

        for (s0, p0) in [(v, 2 * k + 1), (w, 2 * k)] {
            // Match s to the remote half-edge p, then trace back towards
            // the tree root, swapping matched and unmatched edges.
            let (mut s, mut p) = (s0, p0 as Endpoint);
            loop {
                let bs = self.in_blossom[s as usize];
                debug_assert_eq!(self.label[bs as usize], Label::Even);
                debug_assert_eq!(
                    self.label_end[bs as usize],
                    self.mate[self.blossom_base[bs as usize] as usize]
                );
                if self.is_blossom(bs) {
                    self.augment_blossom(bs, s);
                }
                self.mate[s as usize] = p;

                if self.label_end[bs as usize] == INVALID_ENDPOINT {
                    // reached an exposed vertex
                    break;
                }

                let t = self.graph.endpoint(self.label_end[bs as usize]);
                let bt = self.in_blossom[t as usize];
                debug_assert_eq!(self.label[bt as usize], Label::Odd);
                debug_assert_ne!(self.label_end[bt as usize], INVALID_ENDPOINT);
                debug_assert_eq!(self.blossom_base[bt as usize], t);

                s = self.graph.endpoint(self.label_end[bt as usize]);
                let j = self.graph.endpoint(self.label_end[bt as usize] ^ 1);
                if self.is_blossom(bt) {
                    self.augment_blossom(bt, j);
                }
                self.mate[j as usize] = self.label_end[bt as usize];

                // the opposite half-edge becomes mate[s] in the next turn
                p = self.label_end[bt as usize] ^ 1;
            }
        }
    }

    /// Checks complementary slackness of the final duals and matching.
    /// Only meaningful (and only called) under debug assertions.
    fn verify_optimum(&self) {
        let n = self.graph.len();
        let tol = self.tolerance;

        // With max-cardinality, vertex duals may be negative by a common
        // offset.
        let dual_offset = if self.max_cardinality {
            (-self.min_vertex_dual()).max(0.0)
        } else {
            0.0
        };

        for k in 0..self.graph.number_of_edges() {
            let WeightedEdge(i, j, w) = self.graph.edge(k);
            let mut s = self.dual[i as usize] + self.dual[j as usize] - w;

            // add the duals of all blossoms enclosing both endpoints
            let chain = |mut v: Node| {
                let mut blossoms = vec![v];
                while self.blossom_parent[v as usize] != INVALID_NODE {
                    v = self.blossom_parent[v as usize];
                    blossoms.push(v);
                }
                blossoms.reverse();
                blossoms
            };
            for (bi, bj) in chain(i).into_iter().zip(chain(j)) {
                if bi != bj {
                    break;
                }
                s += 2.0 * self.dual[bi as usize];
            }

            debug_assert!(s >= -tol, "edge {k} has negative slack {s}");
            if self.mate[i as usize] / 2 == k || self.mate[j as usize] / 2 == k {
                debug_assert_eq!(self.mate[i as usize] / 2, k);
                debug_assert_eq!(self.mate[j as usize] / 2, k);
                debug_assert!(s.abs() <= tol, "matched edge {k} has slack {s}");
            }
        }

        for v in 0..n {
            debug_assert!(
                self.mate[v] != INVALID_ENDPOINT || self.dual[v] + dual_offset <= tol,
                "exposed vertex {v} has positive dual"
            );
        }

        for b in n..2 * n {
            if self.blossom_base[b] != INVALID_NODE && self.dual[b] > tol {
                debug_assert_eq!(self.blossom_endpoints[b].len() % 2, 1);
                for (i, &p) in self.blossom_endpoints[b].iter().enumerate() {
                    if i % 2 == 1 {
                        debug_assert_eq!(self.mate[self.graph.endpoint(p) as usize], p ^ 1);
                        debug_assert_eq!(self.mate[self.graph.endpoint(p ^ 1) as usize], p);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    const X: Node = INVALID_NODE;

    fn mate(n: NumNodes, edges: &[(Node, Node, Weight)], max_cardinality: bool) -> Vec<Node> {
        let graph = WeightedGraph::from_edges(n, edges.iter().copied()).unwrap();
        maximum_weight_matching(&graph, max_cardinality).unwrap()
    }

    #[test]
    fn trivial_graphs() {
        assert_eq!(mate(0, &[], false), Vec::<Node>::new());
        assert_eq!(mate(0, &[], true), Vec::<Node>::new());
        assert_eq!(mate(3, &[], false), vec![X, X, X]);
        assert_eq!(mate(2, &[(0, 1, 1.0)], false), vec![1, 0]);
    }

    #[test]
    fn two_edges_share_a_vertex() {
        assert_eq!(
            mate(4, &[(1, 2, 10.0), (2, 3, 11.0)], false),
            vec![X, X, 3, 2]
        );
    }

    #[test]
    fn path_without_max_cardinality_leaves_ends_exposed() {
        assert_eq!(
            mate(5, &[(1, 2, 5.0), (2, 3, 11.0), (3, 4, 5.0)], false),
            vec![X, X, 3, 2, X]
        );
    }

    #[test]
    fn path_with_max_cardinality() {
        assert_eq!(
            mate(5, &[(1, 2, 5.0), (2, 3, 11.0), (3, 4, 5.0)], true),
            vec![X, 2, 1, 4, 3]
        );
    }

    #[test]
    fn negative_weights() {
        let edges = [
            (1, 2, 2.0),
            (1, 3, -2.0),
            (2, 3, 1.0),
            (2, 4, -1.0),
            (3, 4, -6.0),
        ];
        assert_eq!(mate(5, &edges, false), vec![X, 2, 1, X, X]);
        assert_eq!(mate(5, &edges, true), vec![X, 3, 4, 1, 2]);
    }

    #[test]
    fn all_negative_weights_yield_empty_matching() {
        assert_eq!(mate(3, &[(0, 1, -2.0), (1, 2, -1.0)], false), vec![X, X, X]);
        assert_eq!(mate(3, &[(0, 1, -2.0), (1, 2, -1.0)], true), vec![X, 2, 1]);
    }

    #[test]
    fn triangle_with_pendant_forms_blossom() {
        // the triangle 0-1-2 is contracted into a blossom, then the
        // matching augments through it to reach the pendant vertex 3
        assert_eq!(
            mate(4, &[(0, 1, 8.0), (0, 2, 9.0), (1, 2, 10.0), (2, 3, 7.0)], false),
            vec![1, 0, 3, 2]
        );
    }

    #[test]
    fn s_blossom_augmentation() {
        assert_eq!(
            mate(
                7,
                &[
                    (1, 2, 8.0),
                    (1, 3, 9.0),
                    (2, 3, 10.0),
                    (3, 4, 7.0),
                    (1, 6, 5.0),
                    (4, 5, 6.0),
                ],
                false
            ),
            vec![X, 6, 3, 2, 5, 4, 1]
        );
    }

    #[test]
    fn s_blossom_relabeled_to_t_blossom() {
        let base = [(1, 2, 9.0), (1, 3, 8.0), (2, 3, 10.0), (1, 4, 5.0)];

        let mut edges = base.to_vec();
        edges.extend([(4, 5, 4.0), (1, 6, 3.0)]);
        assert_eq!(mate(7, &edges, false), vec![X, 6, 3, 2, 5, 4, 1]);

        let mut edges = base.to_vec();
        edges.extend([(4, 5, 3.0), (1, 6, 4.0)]);
        assert_eq!(mate(7, &edges, false), vec![X, 6, 3, 2, 5, 4, 1]);

        let mut edges = base.to_vec();
        edges.extend([(4, 5, 3.0), (3, 6, 4.0)]);
        assert_eq!(mate(7, &edges, false), vec![X, 2, 1, 6, 5, 4, 3]);
    }

    #[test]
    fn nested_s_blossom_augmentation() {
        assert_eq!(
            mate(
                7,
                &[
                    (1, 2, 9.0),
                    (1, 3, 9.0),
                    (2, 3, 10.0),
                    (2, 4, 8.0),
                    (3, 5, 8.0),
                    (4, 5, 10.0),
                    (5, 6, 6.0),
                ],
                false
            ),
            vec![X, 3, 4, 1, 2, 6, 5]
        );
    }

    #[test]
    fn s_blossom_relabeled_into_nested_s_blossom() {
        assert_eq!(
            mate(
                9,
                &[
                    (1, 2, 10.0),
                    (1, 7, 10.0),
                    (2, 3, 12.0),
                    (3, 4, 20.0),
                    (3, 5, 20.0),
                    (4, 5, 25.0),
                    (5, 6, 10.0),
                    (6, 7, 10.0),
                    (7, 8, 8.0),
                ],
                false
            ),
            vec![X, 2, 1, 4, 3, 6, 5, 8, 7]
        );
    }

    #[test]
    fn nested_s_blossom_expands_recursively() {
        assert_eq!(
            mate(
                9,
                &[
                    (1, 2, 8.0),
                    (1, 3, 8.0),
                    (2, 3, 10.0),
                    (2, 4, 12.0),
                    (3, 5, 12.0),
                    (4, 5, 14.0),
                    (4, 6, 12.0),
                    (5, 7, 12.0),
                    (6, 7, 14.0),
                    (7, 8, 12.0),
                ],
                false
            ),
            vec![X, 2, 1, 5, 6, 3, 4, 8, 7]
        );
    }

    #[test]
    fn s_blossom_relabeled_to_t_and_expanded() {
        assert_eq!(
            mate(
                9,
                &[
                    (1, 2, 23.0),
                    (1, 5, 22.0),
                    (1, 6, 15.0),
                    (2, 3, 25.0),
                    (3, 4, 22.0),
                    (4, 5, 25.0),
                    (4, 8, 14.0),
                    (5, 7, 13.0),
                ],
                false
            ),
            vec![X, 6, 3, 2, 8, 7, 1, 5, 4]
        );
    }

    #[test]
    fn nested_s_blossom_relabeled_to_t_and_expanded() {
        assert_eq!(
            mate(
                9,
                &[
                    (1, 2, 19.0),
                    (1, 3, 20.0),
                    (1, 8, 8.0),
                    (2, 3, 25.0),
                    (2, 4, 18.0),
                    (3, 5, 18.0),
                    (4, 5, 13.0),
                    (4, 7, 7.0),
                    (5, 6, 7.0),
                ],
                false
            ),
            vec![X, 8, 3, 2, 7, 6, 5, 4, 1]
        );
    }

    #[test]
    fn nasty_t_blossom_expansion() {
        // blossom relabeled as T in more than one way; expand, augment
        let base = [
            (1, 2, 45.0),
            (1, 5, 45.0),
            (2, 3, 50.0),
            (3, 4, 45.0),
            (4, 5, 50.0),
            (1, 6, 30.0),
            (3, 9, 35.0),
            (9, 10, 5.0),
        ];

        let mut edges = base.to_vec();
        edges.extend([(4, 8, 35.0), (5, 7, 26.0)]);
        assert_eq!(mate(11, &edges, false), vec![X, 6, 3, 2, 8, 7, 1, 5, 4, 10, 9]);

        let mut edges = base.to_vec();
        edges.extend([(4, 8, 26.0), (5, 7, 40.0)]);
        assert_eq!(mate(11, &edges, false), vec![X, 6, 3, 2, 8, 7, 1, 5, 4, 10, 9]);

        // expansion produces a new least-slack edge from an even vertex
        let mut edges = base.to_vec();
        edges.extend([(4, 8, 28.0), (5, 7, 26.0)]);
        assert_eq!(mate(11, &edges, false), vec![X, 6, 3, 2, 8, 7, 1, 5, 4, 10, 9]);
    }

    #[test]
    fn nested_nasty_t_blossom_expansion() {
        // expand the outer blossom such that the inner one ends up on an
        // augmenting path
        assert_eq!(
            mate(
                13,
                &[
                    (1, 2, 45.0),
                    (1, 7, 45.0),
                    (2, 3, 50.0),
                    (3, 4, 45.0),
                    (4, 5, 95.0),
                    (4, 6, 94.0),
                    (5, 6, 94.0),
                    (6, 7, 50.0),
                    (1, 8, 30.0),
                    (3, 11, 35.0),
                    (5, 9, 36.0),
                    (7, 10, 26.0),
                    (11, 12, 5.0),
                ],
                false
            ),
            vec![X, 8, 3, 2, 6, 9, 4, 10, 1, 5, 7, 12, 11]
        );
    }

    #[test]
    fn nested_s_blossom_relabeled_and_expanded() {
        assert_eq!(
            mate(
                11,
                &[
                    (1, 2, 40.0),
                    (1, 3, 40.0),
                    (2, 3, 60.0),
                    (2, 4, 55.0),
                    (3, 5, 55.0),
                    (4, 5, 50.0),
                    (1, 8, 15.0),
                    (5, 7, 30.0),
                    (7, 6, 10.0),
                    (8, 10, 10.0),
                    (4, 9, 30.0),
                ],
                false
            ),
            vec![X, 2, 1, 5, 9, 3, 7, 6, 10, 4, 8]
        );
    }

    #[test]
    fn bipartite_negative_weights_with_max_cardinality() {
        // the matcher run on a negated assignment instance reproduces the
        // minimum-weight assignment
        let edges = [
            (0, 3, -8.0),
            (0, 4, -4.0),
            (0, 5, -7.0),
            (1, 3, -5.0),
            (1, 4, -2.0),
            (1, 5, -3.0),
            (2, 3, -9.0),
            (2, 4, -4.0),
            (2, 5, -8.0),
        ];
        assert_eq!(mate(6, &edges, true), vec![3, 5, 4, 0, 2, 1]);
    }

    #[test]
    fn parallel_edges_use_the_heavier_weight() {
        let graph = WeightedGraph::from_edges(2, [(0, 1, 3.0), (1, 0, 7.0)]).unwrap();
        let mate = maximum_weight_matching(&graph, false).unwrap();
        assert_eq!(mate, vec![1, 0]);
        assert_eq!(matching_weight(&graph, &mate), 7.0);
    }

    #[test]
    fn matched_pairs_of_mate_array() {
        assert_eq!(matched_pairs(&[1, 0, X, 4, 3]), vec![(0, 1), (3, 4)]);
        assert_eq!(matched_pairs(&[X, X]), vec![]);
    }

    #[test]
    fn deterministic() {
        let rng = &mut Pcg64Mcg::seed_from_u64(5);
        let edges = random_weighted_edges(rng, 9, 16);
        assert_eq!(mate(9, &edges, false), mate(9, &edges, false));
        assert_eq!(mate(9, &edges, true), mate(9, &edges, true));
    }

    #[test]
    fn mate_array_is_symmetric() {
        let rng = &mut Pcg64Mcg::seed_from_u64(23);
        for _ in 0..30 {
            let n = rng.gen_range(2..=9);
            let m = rng.gen_range(1..=12);
            let edges = random_weighted_edges(rng, n, m);

            for max_cardinality in [false, true] {
                let mate = mate(n, &edges, max_cardinality);
                for (v, &w) in mate.iter().enumerate() {
                    assert!(w == X || mate[w as usize] == v as Node);
                }
            }
        }
    }

    #[test]
    fn optimal_against_brute_force() {
        let rng = &mut Pcg64Mcg::seed_from_u64(1234);
        for _ in 0..40 {
            let n = rng.gen_range(2..=8);
            let m = rng.gen_range(1..=11);
            let edges = random_weighted_edges(rng, n, m);
            let graph = WeightedGraph::from_edges(n, edges.iter().copied()).unwrap();

            let mate = maximum_weight_matching(&graph, false).unwrap();
            let (_, best_weight) = brute_force_matching(n, &edges, false);
            assert!(
                (matching_weight(&graph, &mate) - best_weight).abs() < 1e-6,
                "suboptimal matching {mate:?} for {edges:?}"
            );
        }
    }

    #[test]
    fn optimal_against_brute_force_with_max_cardinality() {
        let rng = &mut Pcg64Mcg::seed_from_u64(4321);
        for _ in 0..40 {
            let n = rng.gen_range(2..=8);
            let m = rng.gen_range(1..=11);
            let edges = random_weighted_edges(rng, n, m);
            let graph = WeightedGraph::from_edges(n, edges.iter().copied()).unwrap();

            let mate = maximum_weight_matching(&graph, true).unwrap();
            let cardinality = matched_pairs(&mate).len();
            let (best_cardinality, best_weight) = brute_force_matching(n, &edges, true);

            assert_eq!(cardinality, best_cardinality, "not maximum cardinality");
            assert!(
                (matching_weight(&graph, &mate) - best_weight).abs() < 1e-6,
                "suboptimal max-cardinality matching {mate:?} for {edges:?}"
            );
        }
    }
}
