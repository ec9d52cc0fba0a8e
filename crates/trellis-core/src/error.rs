//! Error types for graph construction.
//!
//! Construction errors are synchronous and local: they fail the call that
//! caused them and are never deferred to render time.

use thiserror::Error;

use crate::attribute::AttrScope;

/// Errors raised while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A scope was ended without a matching begin, or pending defaults were
    /// written while no scope was active. Indicates a bug in builder logic.
    #[error("Scope misuse: {0}")]
    ScopeMisuse(String),

    /// An attribute container was passed where a different capability is
    /// required (for example node attributes handed to an edge).
    #[error("Invalid attribute scope: expected {expected} attributes, found {found} attributes")]
    InvalidAttributeScope { expected: AttrScope, found: AttrScope },

    /// A link targets a subgraph id that was not issued by the graph the
    /// link is added to.
    #[error("Subgraph #{index} does not belong to graph `{graph}`")]
    ForeignSubgraph { graph: String, index: usize },
}

/// A compass point spelling DOT does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown compass point: {0}")]
pub struct ParseCompassError(pub String);

/// Result alias for construction operations.
pub type Result<T> = std::result::Result<T, GraphError>;
