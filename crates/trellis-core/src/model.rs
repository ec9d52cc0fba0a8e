//! Graph element model.
//!
//! - [`Node`]: a named node owning its attributes
//! - [`Link`]: an edge from an [`Endpoint`] to a [`LinkTarget`]
//! - [`Graph`]: flags, attributes, nodes, links and nested subgraphs
//!
//! Elements built through a [`ContextStack`](crate::context::ContextStack)
//! start out with the ambient defaults of the active scope; the plain
//! constructors (`Node::new`, `Link::new`, `Graph::new`) start empty.

mod endpoint;
mod graph;
mod graph_base;
mod link;
mod node;

pub use endpoint::{Compass, Endpoint, LinkTarget};
pub use graph::Graph;
pub use link::Link;
pub use node::Node;

/// Identifies a subgraph within the graph that created it.
///
/// An id is only accepted by that graph and its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubgraphId {
    pub(crate) owner: u64,
    pub(crate) index: usize,
}
