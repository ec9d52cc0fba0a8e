//! Links (edges) between nodes and subgraphs.

use crate::{
    attribute::{AttrScope, AttrValue, Attributes},
    error::Result,
};

use super::endpoint::{Endpoint, LinkTarget};

/// A connection from a node endpoint to a node endpoint or subgraph.
///
/// Whether the link renders as `->` or `--` is decided by the graph it is
/// added to.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    from: Endpoint,
    to: LinkTarget,
    attributes: Attributes,
}

impl Link {
    /// Creates a link without ambient defaults.
    pub fn new(from: impl Into<Endpoint>, to: impl Into<LinkTarget>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            attributes: Attributes::edge(),
        }
    }

    pub(crate) fn with_defaults(
        from: impl Into<Endpoint>,
        to: impl Into<LinkTarget>,
        defaults: &Attributes,
    ) -> Self {
        let mut link = Self::new(from, to);
        link.attributes.merge(defaults);
        link
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.set(key, value);
        self
    }

    /// Applies an attribute group.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`](crate::GraphError::InvalidAttributeScope)
    /// unless `attrs` is tagged `Edge` or `Any`.
    pub fn with(mut self, attrs: &Attributes) -> Result<Self> {
        self.add(attrs)?;
        Ok(self)
    }

    /// In-place variant of [`Link::with`].
    ///
    /// # Errors
    ///
    /// Same as [`Link::with`].
    pub fn add(&mut self, attrs: &Attributes) -> Result<&mut Self> {
        attrs.ensure_scope(AttrScope::Edge)?;
        self.attributes.merge(attrs);
        Ok(self)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.set(key, value);
        self
    }

    pub(super) fn merge_attributes(&mut self, attrs: &Attributes) {
        self.attributes.merge(attrs);
    }

    pub fn source(&self) -> &Endpoint {
        &self.from
    }

    pub fn target(&self) -> &LinkTarget {
        &self.to
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}
