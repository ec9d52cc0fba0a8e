//! Scoped construction context.
//!
//! A [`ContextStack`] holds frames of pending default attributes for nodes,
//! edges and graphs. While a frame is active, every element created through
//! the stack starts with the frame's defaults for its kind; attributes set
//! explicitly on the element afterwards win on key collision.
//!
//! Frames are strictly nested. [`ContextStack::begin_scope`] returns a
//! [`ScopeGuard`] that pops its frame when dropped, so an early return via
//! `?` or a panic never leaves a frame behind. A new frame starts as a copy
//! of its parent: nested scopes can add defaults but never change the
//! enclosing scope's.
//!
//! The stack is an explicit value, not a thread-local. Independent builds
//! use independent stacks.
//!
//! # Example
//!
//! ```
//! use trellis_core::context::{ContextStack, ElementKind};
//!
//! let ctx = ContextStack::new();
//! let graph = ctx.scope(|ctx| -> Result<_, trellis_core::GraphError> {
//!     ctx.add_pending(ElementKind::Edge, "style", "solid")?;
//!
//!     let mut graph = ctx.graph("G").directed(true);
//!     graph.link(ctx, "a", "b").set("color", "red");
//!     Ok(graph)
//! })?;
//!
//! let link = graph.links().next().unwrap();
//! assert!(link.attributes().contains("style"));
//! assert_eq!(ctx.depth(), 0);
//! # Ok::<(), trellis_core::GraphError>(())
//! ```

use std::cell::{Cell, RefCell};

use log::trace;

use crate::{
    attribute::{AttrScope, AttrValue, Attributes},
    error::{GraphError, Result},
    model::{Endpoint, Graph, Link, LinkTarget, Node},
};

/// The kind of element a pending default applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Edge,
    Graph,
}

impl ElementKind {
    /// The attribute scope matching this element kind.
    pub fn attr_scope(self) -> AttrScope {
        match self {
            Self::Node => AttrScope::Node,
            Self::Edge => AttrScope::Edge,
            Self::Graph => AttrScope::Graph,
        }
    }
}

/// Pending defaults of one scope.
#[derive(Debug, Clone)]
struct Frame {
    id: u64,
    nodes: Attributes,
    edges: Attributes,
    graphs: Attributes,
}

impl Frame {
    fn empty() -> Self {
        Self {
            id: 0,
            nodes: Attributes::node(),
            edges: Attributes::edge(),
            graphs: Attributes::graph(),
        }
    }

    fn pending(&self, kind: ElementKind) -> &Attributes {
        match kind {
            ElementKind::Node => &self.nodes,
            ElementKind::Edge => &self.edges,
            ElementKind::Graph => &self.graphs,
        }
    }

    fn pending_mut(&mut self, kind: ElementKind) -> &mut Attributes {
        match kind {
            ElementKind::Node => &mut self.nodes,
            ElementKind::Edge => &mut self.edges,
            ElementKind::Graph => &mut self.graphs,
        }
    }
}

/// Stack of construction scopes for one logical build flow.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: RefCell<Vec<Frame>>,
    next_id: Cell<u64>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active scopes.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Pushes a scope inheriting a copy of the current defaults.
    ///
    /// The scope ends when the returned guard is dropped or
    /// [`ScopeGuard::end`] is called.
    pub fn begin_scope(&self) -> ScopeGuard<'_> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let mut frames = self.frames.borrow_mut();
        let mut frame = frames.last().cloned().unwrap_or_else(Frame::empty);
        frame.id = id;
        frames.push(frame);
        let depth = frames.len();
        trace!(depth, id; "Scope begun");
        ScopeGuard {
            stack: self,
            id,
            depth,
            ended: false,
        }
    }

    /// Pops the innermost scope.
    ///
    /// Prefer the guard returned by [`ContextStack::begin_scope`] or
    /// [`ContextStack::scope`]; this is the unguarded counterpart.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ScopeMisuse`] when no scope is active.
    pub fn end_scope(&self) -> Result<()> {
        let mut frames = self.frames.borrow_mut();
        if frames.pop().is_none() {
            return Err(GraphError::ScopeMisuse(
                "end of scope without a matching begin".to_string(),
            ));
        }
        trace!(depth = frames.len(); "Scope ended");
        Ok(())
    }

    /// Runs `f` inside a fresh scope, ending it however `f` exits.
    pub fn scope<T>(&self, f: impl FnOnce(&ContextStack) -> T) -> T {
        let _guard = self.begin_scope();
        f(self)
    }

    /// Adds a pending default for elements of `kind` created in the current scope.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ScopeMisuse`] when no scope is active.
    pub fn add_pending(
        &self,
        kind: ElementKind,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let mut frames = self.frames.borrow_mut();
        let frame = frames.last_mut().ok_or_else(|| no_active_scope(kind))?;
        frame.pending_mut(kind).set(key, value);
        Ok(())
    }

    /// Adds a group of pending defaults for elements of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttributeScope`] when `attrs` does not fit
    /// `kind`, or [`GraphError::ScopeMisuse`] when no scope is active.
    pub fn add_pending_attrs(&self, kind: ElementKind, attrs: &Attributes) -> Result<()> {
        attrs.ensure_scope(kind.attr_scope())?;
        let mut frames = self.frames.borrow_mut();
        let frame = frames.last_mut().ok_or_else(|| no_active_scope(kind))?;
        frame.pending_mut(kind).merge(attrs);
        Ok(())
    }

    /// Returns a copy of the pending defaults for `kind`; empty outside any scope.
    pub fn pending(&self, kind: ElementKind) -> Attributes {
        self.frames
            .borrow()
            .last()
            .map(|frame| frame.pending(kind).clone())
            .unwrap_or_else(|| Attributes::new(kind.attr_scope()))
    }

    /// Creates a node carrying the current node defaults.
    pub fn node(&self, name: impl Into<String>) -> Node {
        Node::with_defaults(name, &self.pending(ElementKind::Node))
    }

    /// Creates a link carrying the current edge defaults.
    pub fn link(&self, from: impl Into<Endpoint>, to: impl Into<LinkTarget>) -> Link {
        Link::with_defaults(from, to, &self.pending(ElementKind::Edge))
    }

    /// Creates a graph carrying the current graph defaults.
    pub fn graph(&self, name: impl Into<String>) -> Graph {
        Graph::with_defaults(name, &self.pending(ElementKind::Graph))
    }
}

fn no_active_scope(kind: ElementKind) -> GraphError {
    GraphError::ScopeMisuse(format!("{kind:?} default added outside of any scope"))
}

/// Ends its scope when dropped.
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    stack: &'a ContextStack,
    id: u64,
    depth: usize,
    ended: bool,
}

impl ScopeGuard<'_> {
    /// Depth of the stack while this scope is the innermost one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Ends the scope explicitly.
    ///
    /// Frames left by inner scopes that were never ended are discarded along
    /// with this one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ScopeMisuse`] if this scope's frame was already
    /// popped, or if inner scopes were still open.
    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        let actual = self.stack.depth();
        match self.unwind() {
            None => Err(GraphError::ScopeMisuse(format!(
                "scope at depth {} was already ended (depth is {actual})",
                self.depth
            ))),
            Some(position) if position + 1 < actual => Err(GraphError::ScopeMisuse(format!(
                "scope at depth {} ended with {} inner scope(s) still open",
                self.depth,
                actual - position - 1
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Pops this guard's own frame and everything above it.
    ///
    /// A frame opened by a later scope at the same depth is left alone.
    /// Returns the position the frame occupied, if it was still on the stack.
    fn unwind(&self) -> Option<usize> {
        let mut frames = self.stack.frames.borrow_mut();
        let position = frames.iter().rposition(|frame| frame.id == self.id)?;
        frames.truncate(position);
        trace!(depth = frames.len(), id = self.id; "Scope ended");
        Some(position)
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if !self.ended {
            let _ = self.unwind();
        }
    }
}
