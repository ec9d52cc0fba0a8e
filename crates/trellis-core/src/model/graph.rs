//! Graphs, subgraphs and clusters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    attribute::{AttrScope, AttrValue, Attributes},
    context::ContextStack,
    error::{GraphError, Result},
};

use super::{
    SubgraphId,
    endpoint::{Endpoint, LinkTarget},
    graph_base::GraphBase,
    link::Link,
    node::Node,
};

static NEXT_GRAPH_UID: AtomicU64 = AtomicU64::new(1);

/// A mutable graph: flags, attributes, nodes, links and nested subgraphs.
///
/// Insertion order of nodes, links and subgraphs is preserved and drives the
/// serialized output.
#[derive(Debug, Clone)]
pub struct Graph {
    uid: u64,
    name: String,
    strict: bool,
    directed: bool,
    cluster: bool,
    graph_attrs: Attributes,
    node_defaults: Attributes,
    edge_defaults: Attributes,
    base: GraphBase,
    subgraphs: Vec<Graph>,
}

impl Graph {
    /// Creates an empty, undirected, non-strict graph without ambient defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uid: NEXT_GRAPH_UID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            strict: false,
            directed: false,
            cluster: false,
            graph_attrs: Attributes::graph(),
            node_defaults: Attributes::node(),
            edge_defaults: Attributes::edge(),
            base: GraphBase::new(),
            subgraphs: Vec::new(),
        }
    }

    pub(crate) fn with_defaults(name: impl Into<String>, defaults: &Attributes) -> Self {
        let mut graph = Self::new(name);
        graph.graph_attrs.merge(defaults);
        graph
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.set_strict(strict);
        self
    }

    pub fn directed(mut self, directed: bool) -> Self {
        self.set_directed(directed);
        self
    }

    pub fn cluster(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }

    /// Sets a graph attribute, overriding any ambient default with the same key.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.graph_attrs.set(key, value);
        self
    }

    /// Applies a graph attribute group.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`](crate::GraphError::InvalidAttributeScope)
    /// unless `attrs` is tagged `Graph` or `Any`.
    pub fn with(mut self, attrs: &Attributes) -> Result<Self> {
        attrs.ensure_scope(AttrScope::Graph)?;
        self.graph_attrs.merge(attrs);
        Ok(self)
    }

    /// Sets the strict flag. Links added earlier that are now equivalent
    /// collapse into the first of them.
    pub fn set_strict(&mut self, strict: bool) -> &mut Self {
        if self.strict != strict {
            self.strict = strict;
            self.base.reindex(self.strict, self.directed);
        }
        self
    }

    /// Sets the direction of this graph and every nested subgraph.
    ///
    /// In a strict graph, links added earlier that are equivalent under the
    /// new direction collapse into the first of them.
    pub fn set_directed(&mut self, directed: bool) -> &mut Self {
        if self.directed != directed {
            self.directed = directed;
            self.base.reindex(self.strict, self.directed);
        }
        for subgraph in &mut self.subgraphs {
            subgraph.set_directed(directed);
        }
        self
    }

    pub fn set_cluster(&mut self, cluster: bool) -> &mut Self {
        self.cluster = cluster;
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.graph_attrs.set(key, value);
        self
    }

    /// Adds a graph-wide default for nodes, written as a `node [...]`
    /// statement and applied by the layout engine.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`](crate::GraphError::InvalidAttributeScope)
    /// unless `attrs` is tagged `Node` or `Any`.
    pub fn node_defaults(&mut self, attrs: &Attributes) -> Result<&mut Self> {
        attrs.ensure_scope(AttrScope::Node)?;
        self.node_defaults.merge(attrs);
        Ok(self)
    }

    /// Adds a graph-wide default for edges, written as an `edge [...]` statement.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`](crate::GraphError::InvalidAttributeScope)
    /// unless `attrs` is tagged `Edge` or `Any`.
    pub fn edge_defaults(&mut self, attrs: &Attributes) -> Result<&mut Self> {
        attrs.ensure_scope(AttrScope::Edge)?;
        self.edge_defaults.merge(attrs);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn is_cluster(&self) -> bool {
        self.cluster
    }

    pub fn graph_attrs(&self) -> &Attributes {
        &self.graph_attrs
    }

    pub fn node_attrs(&self) -> &Attributes {
        &self.node_defaults
    }

    pub fn edge_attrs(&self) -> &Attributes {
        &self.edge_defaults
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Registers a node, merging into an existing node of the same name.
    pub fn add_node(&mut self, node: Node) -> &mut Node {
        self.base.add_node(node)
    }

    /// Returns the node named `name`, creating it with the node defaults of
    /// the active scope of `ctx` if it does not exist yet.
    pub fn node(&mut self, ctx: &ContextStack, name: &str) -> &mut Node {
        self.base.node_or_insert_with(name, || ctx.node(name))
    }

    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.base.node(name)
    }

    /// Mutable access to a registered node; every lookup by the same name
    /// sees the same node.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.base.node_mut(name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.base.contains_node(name)
    }

    /// Iterates registered nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.base.nodes()
    }

    // -------------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------------

    /// Adds a link and returns it.
    ///
    /// In a strict graph a link equivalent to an existing one is ignored and
    /// the existing link is returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ForeignSubgraph`] when the link targets a
    /// subgraph id not issued by this graph.
    pub fn add_link(&mut self, link: Link) -> Result<&mut Link> {
        if let LinkTarget::Subgraph(id) = link.target() {
            self.check_subgraph(*id)?;
        }
        Ok(self.push_link(link))
    }

    /// Connects two nodes, registering both endpoints (with the node defaults
    /// of `ctx`) and creating the link with the edge defaults of `ctx`.
    pub fn link(
        &mut self,
        ctx: &ContextStack,
        from: impl Into<Endpoint>,
        to: impl Into<Endpoint>,
    ) -> &mut Link {
        let from = from.into();
        let to = to.into();
        self.node(ctx, from.node());
        self.node(ctx, to.node());
        self.push_link(ctx.link(from, to))
    }

    /// Connects a node to one of this graph's subgraphs, registering the
    /// source node and creating the link with the edge defaults of `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ForeignSubgraph`] when `id` was not issued by
    /// this graph.
    pub fn link_subgraph(
        &mut self,
        ctx: &ContextStack,
        from: impl Into<Endpoint>,
        id: SubgraphId,
    ) -> Result<&mut Link> {
        self.check_subgraph(id)?;
        let from = from.into();
        self.node(ctx, from.node());
        Ok(self.push_link(ctx.link(from, id)))
    }

    fn push_link(&mut self, link: Link) -> &mut Link {
        let idx = self.base.add_link(link, self.strict, self.directed);
        self.base.link_mut(idx)
    }

    /// Iterates links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.base.links()
    }

    /// Iterates the links leaving node `name`.
    pub fn links_from(&self, name: &str) -> impl Iterator<Item = &Link> {
        self.base.outgoing_links(name)
    }

    pub(crate) fn is_linked(&self, name: &str) -> bool {
        self.base.is_linked(name)
    }

    // -------------------------------------------------------------------------
    // Subgraphs
    // -------------------------------------------------------------------------

    /// Nests `graph` and returns its id, usable as a [`LinkTarget`].
    pub fn add_subgraph(&mut self, graph: Graph) -> SubgraphId {
        self.subgraphs.push(graph);
        self.subgraph_id(self.subgraphs.len() - 1)
    }

    /// Creates a nested subgraph with the graph defaults of `ctx`, inheriting
    /// this graph's direction.
    pub fn subgraph(&mut self, ctx: &ContextStack, name: &str) -> SubgraphId {
        let graph = ctx.graph(name).directed(self.directed);
        self.add_subgraph(graph)
    }

    /// Like [`Graph::subgraph`], flagged as a cluster.
    pub fn cluster_subgraph(&mut self, ctx: &ContextStack, name: &str) -> SubgraphId {
        let graph = ctx.graph(name).directed(self.directed).cluster(true);
        self.add_subgraph(graph)
    }

    /// Returns the subgraph `id`, or `None` if `id` was issued by another graph.
    pub fn get_subgraph(&self, id: SubgraphId) -> Option<&Graph> {
        if id.owner != self.uid {
            return None;
        }
        self.subgraphs.get(id.index)
    }

    pub fn subgraph_mut(&mut self, id: SubgraphId) -> Option<&mut Graph> {
        if id.owner != self.uid {
            return None;
        }
        self.subgraphs.get_mut(id.index)
    }

    /// Iterates nested subgraphs with their ids, in insertion order.
    pub fn subgraphs(&self) -> impl Iterator<Item = (SubgraphId, &Graph)> {
        self.subgraphs
            .iter()
            .enumerate()
            .map(|(idx, graph)| (self.subgraph_id(idx), graph))
    }

    fn subgraph_id(&self, index: usize) -> SubgraphId {
        SubgraphId {
            owner: self.uid,
            index,
        }
    }

    fn check_subgraph(&self, id: SubgraphId) -> Result<()> {
        match self.get_subgraph(id) {
            Some(_) => Ok(()),
            None => Err(GraphError::ForeignSubgraph {
                graph: self.name.clone(),
                index: id.index,
            }),
        }
    }

    /// Returns `true` if a link of this graph points at subgraph `id`.
    pub(crate) fn is_link_target(&self, id: SubgraphId) -> bool {
        self.base
            .links()
            .any(|link| link.target() == &LinkTarget::Subgraph(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn test_flags() {
        let graph = Graph::new("g").strict(true).directed(true).cluster(true);

        assert!(graph.is_strict());
        assert!(graph.is_directed());
        assert!(graph.is_cluster());
        assert_eq!(graph.name(), "g");
    }

    #[test]
    fn test_link_registers_endpoints() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("g").directed(true);

        graph.link(&ctx, "a", "b").set("color", "red");

        assert_eq!(graph.nodes().map(Node::name).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(graph.links().count(), 1);
        assert_eq!(graph.links_from("a").count(), 1);
        assert_eq!(graph.links_from("b").count(), 0);
    }

    #[test]
    fn test_node_is_shared_by_name() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("g");

        graph.node(&ctx, "a").set("shape", "box");
        graph.node(&ctx, "a").set("color", "red");

        assert_eq!(graph.nodes().count(), 1);
        let node = graph.get_node("a").unwrap();
        assert!(node.attributes().contains("shape"));
        assert!(node.attributes().contains("color"));
    }

    #[test]
    fn test_strict_graph_returns_existing_link() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("g").strict(true).directed(true);

        graph.link(&ctx, "a", "b").set("color", "red");
        graph.link(&ctx, "a", "b").set("penwidth", 2);

        assert_eq!(graph.links().count(), 1);
        let link = graph.links().next().unwrap();
        assert!(link.attributes().contains("color"));
        assert!(link.attributes().contains("penwidth"));
    }

    #[test]
    fn test_subgraph_inherits_direction() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("g").directed(true);

        let id = graph.cluster_subgraph(&ctx, "inner");

        let sub = graph.get_subgraph(id).unwrap();
        assert!(sub.is_directed());
        assert!(sub.is_cluster());
        assert!(!graph.is_link_target(id));

        graph.add_link(Link::new("a", id)).unwrap();
        assert!(graph.is_link_target(id));
    }

    #[test]
    fn test_foreign_subgraph_target_is_rejected() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G").directed(true);
        let mut other = Graph::new("other").directed(true);
        let own = graph.subgraph(&ctx, "s");
        let foreign = other.subgraph(&ctx, "s");
        assert_eq!(own.index, foreign.index);

        let err = graph.add_link(Link::new("a", foreign)).unwrap_err();
        assert_eq!(
            err,
            GraphError::ForeignSubgraph {
                graph: "G".to_string(),
                index: 0,
            }
        );
        assert!(graph.link_subgraph(&ctx, "a", foreign).is_err());
        assert!(graph.get_subgraph(foreign).is_none());
        assert_eq!(graph.links().count(), 0);
        assert!(!graph.contains_node("a"));

        graph.link_subgraph(&ctx, "a", own).unwrap();
        assert!(graph.is_link_target(own));
    }

    #[test]
    fn test_subgraph_cannot_target_its_parents_ids() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G");
        let id = graph.subgraph(&ctx, "inner");

        let inner = graph.subgraph_mut(id).unwrap();
        assert!(inner.add_link(Link::new("x", id)).is_err());
    }

    #[test]
    fn test_clone_accepts_original_ids() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G");
        let id = graph.subgraph(&ctx, "inner");

        let mut copy = graph.clone();
        assert!(copy.link_subgraph(&ctx, "a", id).is_ok());
    }

    #[test]
    fn test_set_directed_rekeys_strict_links() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G").strict(true).directed(true);
        graph.link(&ctx, "b", "a").set("color", "red");
        graph.link(&ctx, "a", "b");
        assert_eq!(graph.links().count(), 2);

        graph.set_directed(false);
        assert_eq!(graph.links().count(), 1);

        graph.link(&ctx, "a", "b").set("penwidth", 2);
        assert_eq!(graph.links().count(), 1);
        let link = graph.links().next().unwrap();
        assert_eq!(link.source().node(), "b");
        assert!(link.attributes().contains("color"));
        assert!(link.attributes().contains("penwidth"));
    }

    #[test]
    fn test_set_strict_collapses_existing_duplicates() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G").directed(true);
        graph.link(&ctx, "a", "b");
        graph.link(&ctx, "a", "b");
        graph.link(&ctx, "b", "a");

        graph.set_strict(true);

        assert_eq!(graph.links().count(), 2);
        assert_eq!(graph.links_from("a").count(), 1);
    }

    #[test]
    fn test_set_directed_propagates_to_subgraphs() {
        let ctx = ContextStack::new();
        let mut graph = Graph::new("G");
        let id = graph.subgraph(&ctx, "inner");

        graph.set_directed(true);

        assert!(graph.get_subgraph(id).unwrap().is_directed());
    }

    #[test]
    fn test_defaults_reject_wrong_scope() {
        let mut graph = Graph::new("g");

        assert!(graph.node_defaults(&attrs!["shape" => "box"]).is_ok());
        let err = graph
            .edge_defaults(&Attributes::node().with("shape", "box"))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidAttributeScope { .. }));
        assert!(Graph::new("h").with(&Attributes::edge()).is_err());
    }
}
