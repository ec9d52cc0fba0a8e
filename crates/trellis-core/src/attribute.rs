//! Ordered, scope-tagged attribute containers.
//!
//! # Overview
//!
//! - [`AttrScope`]: the capability class an attribute group applies to.
//! - [`AttrValue`]: a single attribute value as it will be serialized.
//! - [`Attributes`]: an ordered key/value container tagged with an [`AttrScope`].
//! - [`attrs!`](crate::attrs!): shorthand for building an `Any`-scoped container.
//!
//! Keys are case-sensitive. Setting a key that already exists replaces the
//! value in place, so the key keeps the position of its first insertion.
//! Which keys are meaningful to a layout engine is not checked here.
//!
//! # Example
//!
//! ```
//! use trellis_core::attribute::{AttrScope, Attributes};
//!
//! let mut attrs = Attributes::edge();
//! attrs.set("color", "blue").set("style", "solid");
//! attrs.set("color", "red");
//!
//! let keys: Vec<&str> = attrs.keys().collect();
//! assert_eq!(keys, ["color", "style"]);
//! assert_eq!(attrs.get("color").map(ToString::to_string).as_deref(), Some("red"));
//! assert!(attrs.ensure_scope(AttrScope::Edge).is_ok());
//! assert!(attrs.ensure_scope(AttrScope::Node).is_err());
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{GraphError, Result};

/// Capability class of an attribute group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrScope {
    Node,
    Edge,
    Graph,
    /// Accepted wherever a more specific scope is required.
    #[default]
    Any,
}

impl AttrScope {
    /// Returns `true` if a container tagged `found` may be used where `self`
    /// is required.
    pub fn accepts(self, found: AttrScope) -> bool {
        self == AttrScope::Any || found == AttrScope::Any || self == found
    }
}

impl fmt::Display for AttrScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Graph => "graph",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// A single attribute value.
///
/// `Html` values are written between angle brackets by the serializer, every
/// other variant goes through the regular identifier quoting rules.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Html(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttrValue {
    /// Creates an HTML-like label value.
    pub fn html(markup: impl Into<String>) -> Self {
        Self::Html(markup.into())
    }

    /// Returns `true` for HTML-like values.
    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::Html(text) => f.write_str(text),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Ordered attribute container tagged with the scope it applies to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    scope: AttrScope,
    entries: IndexMap<String, AttrValue>,
}

impl Attributes {
    /// Creates an empty container for the given scope.
    pub fn new(scope: AttrScope) -> Self {
        Self {
            scope,
            entries: IndexMap::new(),
        }
    }

    /// Creates an empty node-scoped container.
    pub fn node() -> Self {
        Self::new(AttrScope::Node)
    }

    /// Creates an empty edge-scoped container.
    pub fn edge() -> Self {
        Self::new(AttrScope::Edge)
    }

    /// Creates an empty graph-scoped container.
    pub fn graph() -> Self {
        Self::new(AttrScope::Graph)
    }

    /// Creates an empty container usable in any scope.
    pub fn any() -> Self {
        Self::new(AttrScope::Any)
    }

    /// Returns the scope tag.
    pub fn scope(&self) -> AttrScope {
        self.scope
    }

    /// Inserts or overwrites `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Consuming variant of [`Attributes::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Applies every entry of `other` onto `self` in iteration order.
    ///
    /// The scope tag of `self` is kept; checking `other`'s tag is the
    /// caller's job (see [`Attributes::ensure_scope`]).
    pub fn merge(&mut self, other: &Attributes) -> &mut Self {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self
    }

    /// Checks this container may be used where `required` is expected.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`] when the tags are
    /// incompatible.
    pub fn ensure_scope(&self, required: AttrScope) -> Result<()> {
        if required.accepts(self.scope) {
            Ok(())
        } else {
            Err(GraphError::InvalidAttributeScope {
                expected: required,
                found: self.scope,
            })
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttrValue);
    type IntoIter = indexmap::map::Iter<'a, String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds an [`Attributes`] container tagged [`AttrScope::Any`].
///
/// ```
/// use trellis_core::attrs;
///
/// let attrs = attrs!["color" => "red", "penwidth" => 2];
/// assert_eq!(attrs.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::attribute::Attributes::any()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::attribute::Attributes::any();
        $(attrs.set($key, $value);)+
        attrs
    }};
}
