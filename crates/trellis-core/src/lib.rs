//! Trellis Core Graph Model
//!
//! This crate provides the graph construction side of Trellis:
//!
//! - **Attributes**: ordered, scope-tagged attribute containers ([`attribute`] module)
//! - **Context**: stacked scopes of ambient defaults ([`context::ContextStack`])
//! - **Model**: nodes, links, graphs and subgraphs ([`model`] module)
//! - **Serialize**: deterministic DOT output ([`serialize`] module)
//!
//! # Example
//!
//! ```
//! use trellis_core::{
//!     context::{ContextStack, ElementKind},
//!     serialize::to_dot,
//! };
//!
//! let ctx = ContextStack::new();
//! let _scope = ctx.begin_scope();
//! ctx.add_pending(ElementKind::Edge, "style", "solid")?;
//!
//! let mut graph = ctx.graph("G").directed(true);
//! graph.link(&ctx, "a", "b").set("color", "red");
//!
//! assert_eq!(to_dot(&graph), "digraph G {\na -> b [style=solid,color=red]\n}\n");
//! # Ok::<(), trellis_core::GraphError>(())
//! ```

pub mod attribute;
pub mod context;
mod error;
pub mod model;
pub mod serialize;

pub use error::{GraphError, ParseCompassError, Result};
