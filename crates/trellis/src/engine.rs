//! Layout engines, their runtimes and the dispatcher choosing between them.
//!
//! # Architecture
//!
//! - [`LayoutEngine`]: one live handle to a layout backend. Dropping the
//!   handle tears it down.
//! - [`EngineFactory`]: creates handles with a given memory budget.
//! - [`EngineRuntime`]: owns at most one handle on a dedicated worker thread
//!   and serializes requests to it, recreating the handle after failures.
//! - [`EngineRegistry`]: the ordered list of known backends.
//! - [`Dispatcher`]: tries the registered backends in order, with fallback,
//!   exhaustion recovery and a sticky choice of the last working backend.
//!
//! Built-in backends live in [`layout_rs`] (in-process) and, with the
//! `graphviz` feature, [`cmdline`] (host `dot` executable).

mod budget;
#[cfg(feature = "graphviz")]
pub mod cmdline;
mod dispatch;
pub mod layout_rs;
mod registry;
mod runtime;
#[cfg(test)]
pub(crate) mod testing;

pub use budget::ArenaBudget;
pub use dispatch::{Dispatcher, DispatcherBuilder, ProbePolicy};
pub use registry::{EngineDescriptor, EngineRegistry, default_registry};
pub use runtime::{DEFAULT_TOTAL_MEMORY, EngineRuntime, PendingRender};

use crate::{
    error::EngineError,
    options::{RenderOptions, RenderOutput},
};

/// A live handle to a layout backend.
///
/// A handle is used by one worker thread at a time. Resources it holds are
/// released when it is dropped.
pub trait LayoutEngine: Send {
    /// The memory budget this handle was created with, in bytes.
    fn budget(&self) -> usize;

    /// Lays out DOT `source` and renders it as requested by `options`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Unavailable`] when the format or layout is not supported
    /// - [`EngineError::MemoryExhausted`] when the handle ran out of budget
    /// - [`EngineError::RenderFailed`] when the input is rejected
    fn render(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError>;
}

/// Creates [`LayoutEngine`] handles.
pub trait EngineFactory: Send + Sync {
    /// Name of the backend, used in logs and error reports.
    fn name(&self) -> &str;

    /// Creates a fresh handle limited to `budget` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when the backend cannot run in
    /// this environment.
    fn create(&self, budget: usize) -> Result<Box<dyn LayoutEngine>, EngineError>;
}
