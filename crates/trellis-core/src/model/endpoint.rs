//! Link endpoints: node names with optional record ports and compass points.

use std::{fmt, str::FromStr};

use crate::error::ParseCompassError;

use super::{SubgraphId, node::Node};

/// Compass point anchoring a link end on a node's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compass {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Center,
    /// Let the layout engine pick (`_`).
    Any,
}

impl Compass {
    /// Returns the DOT spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "n",
            Self::NorthEast => "ne",
            Self::East => "e",
            Self::SouthEast => "se",
            Self::South => "s",
            Self::SouthWest => "sw",
            Self::West => "w",
            Self::NorthWest => "nw",
            Self::Center => "c",
            Self::Any => "_",
        }
    }
}

impl FromStr for Compass {
    type Err = ParseCompassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" => Ok(Self::North),
            "ne" => Ok(Self::NorthEast),
            "e" => Ok(Self::East),
            "se" => Ok(Self::SouthEast),
            "s" => Ok(Self::South),
            "sw" => Ok(Self::SouthWest),
            "w" => Ok(Self::West),
            "nw" => Ok(Self::NorthWest),
            "c" => Ok(Self::Center),
            "_" => Ok(Self::Any),
            _ => Err(ParseCompassError(s.to_string())),
        }
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node reference used as a link end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    node: String,
    record: Option<String>,
    compass: Option<Compass>,
}

impl Endpoint {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            record: None,
            compass: None,
        }
    }

    /// Anchors the endpoint at a record field.
    pub fn with_record(mut self, record: impl Into<String>) -> Self {
        self.record = Some(record.into());
        self
    }

    /// Anchors the endpoint at a compass point.
    pub fn with_compass(mut self, compass: Compass) -> Self {
        self.compass = Some(compass);
        self
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn record(&self) -> Option<&str> {
        self.record.as_deref()
    }

    pub fn compass(&self) -> Option<Compass> {
        self.compass
    }

    /// Returns `true` when neither a record port nor a compass point is set.
    pub fn is_plain(&self) -> bool {
        self.record.is_none() && self.compass.is_none()
    }
}

impl PartialOrd for Compass {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Compass {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl From<&str> for Endpoint {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

impl From<String> for Endpoint {
    fn from(node: String) -> Self {
        Self::new(node)
    }
}

impl From<&Node> for Endpoint {
    fn from(node: &Node) -> Self {
        Self::new(node.name())
    }
}

/// What a link points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    Node(Endpoint),
    /// A subgraph of the graph that owns the link, rendered inline.
    Subgraph(SubgraphId),
}

impl LinkTarget {
    /// Returns the endpoint when the target is a node.
    pub fn as_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Node(endpoint) => Some(endpoint),
            Self::Subgraph(_) => None,
        }
    }
}

impl From<Endpoint> for LinkTarget {
    fn from(endpoint: Endpoint) -> Self {
        Self::Node(endpoint)
    }
}

impl From<&str> for LinkTarget {
    fn from(node: &str) -> Self {
        Self::Node(Endpoint::new(node))
    }
}

impl From<String> for LinkTarget {
    fn from(node: String) -> Self {
        Self::Node(Endpoint::new(node))
    }
}

impl From<&Node> for LinkTarget {
    fn from(node: &Node) -> Self {
        Self::Node(Endpoint::from(node))
    }
}

impl From<SubgraphId> for LinkTarget {
    fn from(id: SubgraphId) -> Self {
        Self::Subgraph(id)
    }
}
