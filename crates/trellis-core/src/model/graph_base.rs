//! Low-level node and link storage shared by every graph level.
//!
//! # Architecture
//!
//! - [`LinkIndex`]: index of a link in insertion order
//! - [`GraphBase`]: nodes keyed by name in insertion order, links in a
//!   vector, plus incoming/outgoing indexes per node name
//!
//! Link endpoints do not have to be registered nodes; the serializer only
//! writes node statements for registered nodes.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::trace;

use super::{
    endpoint::{Endpoint, LinkTarget},
    link::Link,
    node::Node,
};

/// Index of a link in a [`GraphBase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LinkIndex(usize);

/// Normalized identity of a link, used to collapse duplicates in strict graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LinkKey {
    from: Endpoint,
    to: LinkTarget,
}

impl LinkKey {
    /// Builds the key; undirected node-to-node links are ordered so that
    /// `a -- b` and `b -- a` compare equal.
    fn new(link: &Link, directed: bool) -> Self {
        let from = link.source().clone();
        match link.target() {
            LinkTarget::Node(to) if !directed && to < &from => Self {
                from: to.clone(),
                to: LinkTarget::Node(from),
            },
            to => Self {
                from,
                to: to.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct GraphBase {
    nodes: IndexMap<String, Node>,
    links: Vec<Link>,
    incoming: HashMap<String, Vec<LinkIndex>>,
    outgoing: HashMap<String, Vec<LinkIndex>>,
    link_keys: HashSet<LinkKey>,
}

impl GraphBase {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub(super) fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Iterates registered nodes in insertion order.
    pub(super) fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(super) fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Returns the node registered under `name`, inserting the one built by
    /// `create` if there is none.
    pub(super) fn node_or_insert_with(
        &mut self,
        name: &str,
        create: impl FnOnce() -> Node,
    ) -> &mut Node {
        self.nodes.entry(name.to_string()).or_insert_with(create)
    }

    /// Registers `node`, merging into an existing node with the same name.
    ///
    /// The first registration fixes the node's position.
    pub(super) fn add_node(&mut self, node: Node) -> &mut Node {
        match self.nodes.entry(node.name().to_string()) {
            indexmap::map::Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.merge(&node);
                existing
            }
            indexmap::map::Entry::Vacant(entry) => entry.insert(node),
        }
    }

    pub(super) fn link(&self, idx: LinkIndex) -> &Link {
        &self.links[idx.0]
    }

    pub(super) fn link_mut(&mut self, idx: LinkIndex) -> &mut Link {
        &mut self.links[idx.0]
    }

    /// Iterates links in insertion order.
    pub(super) fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub(super) fn links_count(&self) -> usize {
        self.links.len()
    }

    /// Iterates links leaving the node `name`.
    pub(super) fn outgoing_links(&self, name: &str) -> impl Iterator<Item = &Link> {
        self.outgoing
            .get(name)
            .into_iter()
            .flatten()
            .map(|idx| self.link(*idx))
    }

    /// Returns `true` if some link in this graph starts or ends at node `name`.
    pub(super) fn is_linked(&self, name: &str) -> bool {
        self.outgoing.contains_key(name) || self.incoming.contains_key(name)
    }

    /// Appends a link.
    ///
    /// When `strict` is set and an equivalent link already exists, the new
    /// link is dropped and the index of the existing one is returned.
    pub(super) fn add_link(&mut self, link: Link, strict: bool, directed: bool) -> LinkIndex {
        let key = LinkKey::new(&link, directed);
        match self.equivalent(&key, directed).filter(|_| strict) {
            Some(existing) => existing,
            None => self.push_link(link, key),
        }
    }

    /// Rebuilds the link indexes after the graph's `strict` or `directed`
    /// flag changed.
    ///
    /// In a strict graph, links that became equivalent to an earlier link are
    /// dropped and their attributes merged into the earlier one.
    pub(super) fn reindex(&mut self, strict: bool, directed: bool) {
        let links = std::mem::take(&mut self.links);
        self.incoming.clear();
        self.outgoing.clear();
        self.link_keys.clear();

        for link in links {
            let key = LinkKey::new(&link, directed);
            match self.equivalent(&key, directed).filter(|_| strict) {
                Some(existing) => {
                    trace!(from = link.source().node(); "Duplicate link merged");
                    self.links[existing.0].merge_attributes(link.attributes());
                }
                None => {
                    self.push_link(link, key);
                }
            }
        }
    }

    fn equivalent(&self, key: &LinkKey, directed: bool) -> Option<LinkIndex> {
        if !self.link_keys.contains(key) {
            return None;
        }
        self.links
            .iter()
            .position(|candidate| &LinkKey::new(candidate, directed) == key)
            .map(LinkIndex)
    }

    fn push_link(&mut self, link: Link, key: LinkKey) -> LinkIndex {
        let idx = LinkIndex(self.links.len());
        self.outgoing
            .entry(link.source().node().to_string())
            .or_default()
            .push(idx);
        if let LinkTarget::Node(to) = link.target() {
            self.incoming
                .entry(to.node().to_string())
                .or_default()
                .push(idx);
        }
        self.link_keys.insert(key);
        self.links.push(link);
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_new() {
        let graph = GraphBase::new();

        assert_eq!(graph.nodes_count(), 0);
        assert_eq!(graph.links_count(), 0);
        assert_eq!(graph.nodes().count(), 0);
    }

    #[test]
    fn test_add_node_keeps_insertion_order() {
        let mut graph = GraphBase::new();
        graph.add_node(Node::new("c"));
        graph.add_node(Node::new("a"));
        graph.add_node(Node::new("b"));

        let names: Vec<&str> = graph.nodes().map(Node::name).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_add_node_merges_same_name() {
        let mut graph = GraphBase::new();
        graph.add_node(Node::new("a").attr("color", "red").attr("shape", "box"));
        graph.add_node(Node::new("b"));
        graph.add_node(Node::new("a").attr("color", "blue"));

        assert_eq!(graph.nodes_count(), 2);
        let node = graph.node("a").unwrap();
        assert_eq!(node.attributes().get("color").unwrap().to_string(), "blue");
        assert_eq!(node.attributes().get("shape").unwrap().to_string(), "box");
        assert_eq!(graph.nodes().next().map(Node::name), Some("a"));
    }

    #[test]
    fn test_node_mut_is_shared() {
        let mut graph = GraphBase::new();
        graph.add_node(Node::new("a"));

        graph.node_mut("a").unwrap().set("label", "A");

        assert!(graph.node("a").unwrap().attributes().contains("label"));
        assert!(graph.node_mut("missing").is_none());
    }

    #[test]
    fn test_add_link_indexes() {
        let mut graph = GraphBase::new();
        let idx = graph.add_link(Link::new("a", "b"), false, true);
        graph.add_link(Link::new("a", "c"), false, true);

        assert_eq!(graph.link(idx).target(), &LinkTarget::from("b"));
        assert_eq!(graph.outgoing_links("a").count(), 2);
        assert_eq!(graph.outgoing_links("b").count(), 0);
        assert!(graph.is_linked("b"));
        assert!(graph.is_linked("a"));
        assert!(!graph.is_linked("z"));
    }

    #[test]
    fn test_non_strict_keeps_duplicates() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("a", "b"), false, true);
        graph.add_link(Link::new("a", "b"), false, true);

        assert_eq!(graph.links_count(), 2);
    }

    #[test]
    fn test_strict_collapses_duplicates() {
        let mut graph = GraphBase::new();
        let first = graph.add_link(Link::new("a", "b").attr("color", "red"), true, true);
        let second = graph.add_link(Link::new("a", "b").attr("color", "blue"), true, true);

        assert_eq!(first, second);
        assert_eq!(graph.links_count(), 1);
        assert_eq!(
            graph.link(first).attributes().get("color").unwrap().to_string(),
            "red"
        );
    }

    #[test]
    fn test_strict_directed_keeps_reverse_link() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("a", "b"), true, true);
        graph.add_link(Link::new("b", "a"), true, true);

        assert_eq!(graph.links_count(), 2);
    }

    #[test]
    fn test_strict_undirected_collapses_reverse_link() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("a", "b"), true, false);
        graph.add_link(Link::new("b", "a"), true, false);

        assert_eq!(graph.links_count(), 1);
    }

    #[test]
    fn test_strict_distinguishes_ports() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("a", "b"), true, true);
        graph.add_link(
            Link::new(Endpoint::new("a").with_record("f0"), "b"),
            true,
            true,
        );

        assert_eq!(graph.links_count(), 2);
    }

    #[test]
    fn test_reindex_collapses_links_equivalent_once_undirected() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("b", "a").attr("color", "red"), true, true);
        graph.add_link(Link::new("a", "b").attr("penwidth", 2), true, true);
        graph.add_link(Link::new("a", "c"), true, true);
        assert_eq!(graph.links_count(), 3);

        graph.reindex(true, false);

        assert_eq!(graph.links_count(), 2);
        let first = graph.links().next().unwrap();
        assert_eq!(first.source().node(), "b");
        assert!(first.attributes().contains("color"));
        assert!(first.attributes().contains("penwidth"));
        assert_eq!(graph.outgoing_links("a").count(), 1);
        assert_eq!(graph.outgoing_links("b").count(), 1);

        let idx = graph.add_link(Link::new("a", "b"), true, false);
        assert_eq!(idx, LinkIndex(0));
        assert_eq!(graph.links_count(), 2);
    }

    #[test]
    fn test_reindex_non_strict_keeps_every_link() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("b", "a"), false, true);
        graph.add_link(Link::new("a", "b"), false, true);

        graph.reindex(false, false);

        assert_eq!(graph.links_count(), 2);
        assert_eq!(graph.outgoing_links("a").count(), 1);
    }

    #[test]
    fn test_self_loop() {
        let mut graph = GraphBase::new();
        graph.add_link(Link::new("a", "a"), false, true);

        assert!(graph.is_linked("a"));
        assert_eq!(graph.outgoing_links("a").count(), 1);
    }
}
