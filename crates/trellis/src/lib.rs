//! Trellis - build Graphviz graphs in code and render them.
//!
//! Graphs are built with the [`trellis_core`] model and its scoped
//! construction context, serialized to DOT and rendered by the first layout
//! engine of a registry that can handle the request.

pub mod config;
pub mod engine;

mod error;
mod options;

pub use trellis_core::{GraphError, attribute, attrs, context, model, serialize};

pub use error::{EngineError, ErrorKind, ParseOptionError, TrellisError};
pub use options::{Format, Layout, OutputSink, RenderOptions, RenderOutput};

use std::thread::JoinHandle;

use log::{debug, info, trace};

use config::AppConfig;
use engine::{Dispatcher, EngineRegistry, default_registry};
use model::Graph;

/// Renders graphs through the configured layout engines.
///
/// # Examples
///
/// ```rust,no_run
/// use trellis::{Renderer, config::AppConfig, context::ContextStack};
///
/// let ctx = ContextStack::new();
/// let mut graph = ctx.graph("G").directed(true);
/// graph.link(&ctx, "a", "b");
///
/// let renderer = Renderer::new(AppConfig::default())
///     .expect("Failed to create renderer");
/// let svg = renderer.render(&graph)
///     .expect("Failed to render");
///
/// println!("{}", svg.as_str().unwrap_or_default());
/// ```
#[derive(Debug)]
pub struct Renderer {
    config: AppConfig,
    dispatcher: Dispatcher,
}

impl Renderer {
    /// Creates a renderer over the built-in engines.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Config`] if the configured engine order names
    /// an unknown engine or the configured memory budget is zero.
    pub fn new(config: AppConfig) -> Result<Self, TrellisError> {
        Self::with_registry(config, default_registry())
    }

    /// Creates a renderer over the engines of `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::new`].
    pub fn with_registry(
        config: AppConfig,
        registry: &EngineRegistry,
    ) -> Result<Self, TrellisError> {
        let engines = config.engines();
        let registry = registry.ordered(engines.order()).map_err(config_error)?;

        let mut builder = Dispatcher::builder(registry)
            .with_policy(engines.probe())
            .with_total_memory(engines.total_memory());
        if let Some(timeout) = engines.timeout() {
            builder = builder.with_timeout(timeout);
        }
        let dispatcher = builder.build().map_err(config_error)?;
        debug!(
            engines = dispatcher.registry().len(),
            probe:? = dispatcher.policy();
            "Renderer created"
        );
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Render options carrying the configured defaults.
    pub fn options(&self) -> RenderOptions {
        self.config.render().options()
    }

    /// Renders `graph` with the configured default options.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Engine`] when no engine could render the graph.
    pub fn render(&self, graph: &Graph) -> Result<RenderOutput, TrellisError> {
        self.render_with_options(graph, &self.options())
    }

    /// Renders `graph` with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Engine`] when no engine could render the graph.
    pub fn render_with_options(
        &self,
        graph: &Graph,
        options: &RenderOptions,
    ) -> Result<RenderOutput, TrellisError> {
        info!(graph = graph.name(), format:% = options.format(); "Rendering graph");
        let source = serialize::to_dot(graph);
        trace!(source = source.as_str(); "Serialized graph");
        self.render_source(&source, options)
    }

    /// Renders DOT text directly.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Engine`] when no engine could render the source.
    pub fn render_source(
        &self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, TrellisError> {
        let output = self.dispatcher.render(source, options)?;
        info!(
            format:% = output.format(),
            bytes = output.bytes().len(),
            engine = self.dispatcher.sticky_engine().unwrap_or("none");
            "Render finished"
        );
        Ok(output)
    }

    /// Renders `graph` on a helper thread and passes the result to `complete`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Engine`] if the helper thread cannot be started.
    pub fn render_async(
        &self,
        graph: &Graph,
        options: RenderOptions,
        complete: impl FnOnce(Result<RenderOutput, EngineError>) + Send + 'static,
    ) -> Result<JoinHandle<()>, TrellisError> {
        let source = serialize::to_dot(graph);
        Ok(self.dispatcher.render_async(source, options, complete)?)
    }
}

fn config_error(err: EngineError) -> TrellisError {
    TrellisError::Config(err.to_string())
}
