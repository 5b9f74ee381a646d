/*!
# Node Representation

We choose `Node = u32` as almost all use-cases involve fewer than `2^32`
vertices. This saves space compared to `usize`/`u64` and lets us manipulate
node values directly without abstracting over them.

Unmatched/absent nodes are encoded with the [`INVALID_NODE`] sentinel rather
than `Option<Node>`, keeping the per-vertex working arrays of the solvers
flat and dense.
*/

use bit_set::BitSet;

/// Nodes can be any unsigned integer from `0` to `Node::MAX - 1`
pub type Node = u32;

/// Node-Value that is considered invalid.
///
/// In mate arrays this plays the role of "unmatched" (the all-bits-set
/// rendering of `-1`).
pub const INVALID_NODE: Node = Node::MAX;

/// There can be at most `2^32 - 1` nodes in a graph!
pub type NumNodes = Node;

/// BitSet used for per-node (and per-edge) bookkeeping
pub type NodeBitSet = BitSet;
