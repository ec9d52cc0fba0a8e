//! Graph nodes.

use crate::{
    attribute::{AttrScope, AttrValue, Attributes},
    error::Result,
};

use super::endpoint::{Compass, Endpoint};

/// A named node and its attributes.
///
/// Nodes are identified by name within one [`Graph`](super::Graph); adding a
/// node whose name is already present merges into the existing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    attributes: Attributes,
}

impl Node {
    /// Creates a node without ambient defaults.
    ///
    /// Use [`ContextStack::node`](crate::context::ContextStack::node) to pick
    /// up the defaults of the active scope.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::node(),
        }
    }

    pub(crate) fn with_defaults(name: impl Into<String>, defaults: &Attributes) -> Self {
        let mut node = Self::new(name);
        node.attributes.merge(defaults);
        node
    }

    /// Sets an attribute, overriding any ambient default with the same key.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.set(key, value);
        self
    }

    /// Applies an attribute group.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`](crate::GraphError::InvalidAttributeScope)
    /// unless `attrs` is tagged `Node` or `Any`.
    pub fn with(mut self, attrs: &Attributes) -> Result<Self> {
        self.add(attrs)?;
        Ok(self)
    }

    /// In-place variant of [`Node::with`].
    ///
    /// # Errors
    ///
    /// Same as [`Node::with`].
    pub fn add(&mut self, attrs: &Attributes) -> Result<&mut Self> {
        attrs.ensure_scope(AttrScope::Node)?;
        self.attributes.merge(attrs);
        Ok(self)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Endpoint anchored at a record field of this node.
    pub fn port(&self, record: impl Into<String>) -> Endpoint {
        Endpoint::new(self.name.as_str()).with_record(record)
    }

    /// Endpoint anchored at a compass point of this node.
    pub fn compass(&self, compass: Compass) -> Endpoint {
        Endpoint::new(self.name.as_str()).with_compass(compass)
    }

    /// Folds `other`'s attributes into this node, `other` winning on conflicts.
    pub(crate) fn merge(&mut self, other: &Node) {
        self.attributes.merge(&other.attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attrs, error::GraphError};

    #[test]
    fn test_explicit_attribute_overrides_default() {
        let defaults = Attributes::node().with("color", "red").with("shape", "box");

        let node = Node::with_defaults("a", &defaults).attr("color", "blue");

        assert_eq!(node.attributes().get("color"), Some(&AttrValue::from("blue")));
        assert_eq!(node.attributes().get("shape"), Some(&AttrValue::from("box")));
    }

    #[test]
    fn test_with_rejects_edge_attributes() {
        let edge_attrs = Attributes::edge().with("arrowhead", "none");

        let err = Node::new("a").with(&edge_attrs).unwrap_err();
        assert!(matches!(err, GraphError::InvalidAttributeScope { .. }));
    }

    #[test]
    fn test_with_accepts_any_attributes() {
        let node = Node::new("a").with(&attrs!["label" => "A"]).unwrap();

        assert_eq!(node.attributes().len(), 1);
        assert_eq!(node.attributes().scope(), AttrScope::Node);
    }

    #[test]
    fn test_port_endpoints() {
        let node = Node::new("rec");

        assert_eq!(node.port("f1").record(), Some("f1"));
        assert_eq!(node.compass(Compass::East).compass(), Some(Compass::East));
        assert_eq!(node.port("f1").node(), "rec");
    }
}
