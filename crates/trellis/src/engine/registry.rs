//! Ordered registry of layout backends.

use std::{fmt, sync::Arc, sync::OnceLock};

use log::debug;

use super::{EngineFactory, layout_rs::LayoutRsFactory};
use crate::error::EngineError;

/// A named backend entry.
#[derive(Clone)]
pub struct EngineDescriptor {
    name: String,
    factory: Arc<dyn EngineFactory>,
}

impl EngineDescriptor {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            name: factory.name().to_string(),
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &Arc<dyn EngineFactory> {
        &self.factory
    }
}

impl fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Backends in the order the dispatcher tries them.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<EngineDescriptor>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in backends: the host `dot`
    /// command (with the `graphviz` feature), then the in-process engine.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "graphviz")]
        registry.register(super::cmdline::DotCommandFactory::default());
        registry.register(LayoutRsFactory);
        registry
    }

    /// Appends a backend; it is tried after every backend registered before it.
    pub fn register(&mut self, factory: impl EngineFactory + 'static) -> &mut Self {
        self.register_shared(Arc::new(factory))
    }

    /// Appends an already shared backend.
    pub fn register_shared(&mut self, factory: Arc<dyn EngineFactory>) -> &mut Self {
        let descriptor = EngineDescriptor::new(factory);
        debug!(engine = descriptor.name(), position = self.engines.len(); "Engine registered");
        self.engines.push(descriptor);
        self
    }

    /// Returns a registry restricted to `names`, in that order.
    ///
    /// An empty list keeps the registry as is.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEngine`] for the first name that is not
    /// registered.
    pub fn ordered<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, EngineError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let engines = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| EngineError::UnknownEngine(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { engines })
    }

    pub fn get(&self, name: &str) -> Option<&EngineDescriptor> {
        self.engines.iter().find(|engine| engine.name() == name)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Iterates backends in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &EngineDescriptor> {
        self.engines.iter()
    }

    pub(crate) fn descriptor(&self, idx: usize) -> Option<&EngineDescriptor> {
        self.engines.get(idx)
    }
}

/// The process-wide registry of built-in backends.
pub fn default_registry() -> &'static EngineRegistry {
    static REGISTRY: OnceLock<EngineRegistry> = OnceLock::new();
    REGISTRY.get_or_init(EngineRegistry::builtin)
}
