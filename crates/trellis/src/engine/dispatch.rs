//! Engine selection with fallback.
//!
//! For every request the dispatcher walks the candidate backends:
//!
//! - a success records the backend as sticky and returns the output
//! - an unavailable backend is skipped silently
//! - memory exhaustion gets exactly one retry on a recreated handle; if that
//!   is exhausted too the backend counts as failed
//! - a rejected input is returned immediately, other backends are not tried
//! - a missed deadline counts as that backend's failure
//!
//! When every candidate failed the caller gets
//! [`EngineError::AllEnginesFailed`] with each backend's reason.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, trace};
use serde::Deserialize;

use super::{EngineRegistry, EngineRuntime, runtime::DEFAULT_TOTAL_MEMORY};
use crate::{
    error::{EngineError, ErrorKind},
    options::{Format, RenderOptions, RenderOutput},
};

/// When the dispatcher consults the sticky backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbePolicy {
    /// Start with the last backend that succeeded; fall back to registry
    /// order if it fails.
    #[default]
    Sticky,
    /// Always try backends in registry order.
    AlwaysProbe,
}

/// Builder for a [`Dispatcher`].
#[derive(Debug)]
pub struct DispatcherBuilder {
    registry: EngineRegistry,
    policy: ProbePolicy,
    total_memory: usize,
    timeout: Option<Duration>,
}

impl DispatcherBuilder {
    pub fn with_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Budget each runtime starts with, in bytes.
    pub fn with_total_memory(mut self, bytes: usize) -> Self {
        self.total_memory = bytes;
        self
    }

    /// Maximum time to wait for one backend before treating it as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// # Errors
    ///
    /// Returns [`EngineError::ZeroBudget`] when the total memory is zero.
    pub fn build(self) -> Result<Dispatcher, EngineError> {
        if self.total_memory == 0 {
            return Err(EngineError::ZeroBudget);
        }
        Ok(self.assemble())
    }

    fn assemble(self) -> Dispatcher {
        let runtimes = (0..self.registry.len()).map(|_| None).collect();
        Dispatcher {
            inner: Arc::new(Inner {
                registry: self.registry,
                policy: self.policy,
                total_memory: self.total_memory,
                timeout: self.timeout,
                runtimes: Mutex::new(runtimes),
                sticky: AtomicUsize::new(0),
            }),
        }
    }
}

/// Renders DOT text with the first backend of a registry that works.
///
/// Cloning is cheap; clones share runtimes and the sticky choice.
///
/// # Example
///
/// ```
/// use trellis::{Format, RenderOptions, engine::{Dispatcher, default_registry}};
///
/// let dispatcher = Dispatcher::new(default_registry().clone());
/// let output = dispatcher.render("digraph { a -> b }", &RenderOptions::new().with_format(Format::Dot))?;
/// assert_eq!(output.as_str(), Some("digraph { a -> b }"));
/// # Ok::<(), trellis::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: EngineRegistry,
    policy: ProbePolicy,
    total_memory: usize,
    timeout: Option<Duration>,
    runtimes: Mutex<Vec<Option<Arc<EngineRuntime>>>>,
    /// Index of the sticky backend plus one; zero when none succeeded yet.
    sticky: AtomicUsize,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry` with default settings.
    pub fn new(registry: EngineRegistry) -> Self {
        Self::builder(registry).assemble()
    }

    pub fn builder(registry: EngineRegistry) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            policy: ProbePolicy::default(),
            total_memory: DEFAULT_TOTAL_MEMORY,
            timeout: None,
        }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.inner.registry
    }

    pub fn policy(&self) -> ProbePolicy {
        self.inner.policy
    }

    /// Name of the backend that last succeeded.
    pub fn sticky_engine(&self) -> Option<&str> {
        let idx = self.inner.sticky.load(Ordering::Relaxed).checked_sub(1)?;
        self.inner.registry.descriptor(idx).map(|engine| engine.name())
    }

    /// Renders `source` and delivers the output to the requested sink.
    ///
    /// `Format::Dot` returns the source unchanged without involving a backend.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RenderFailed`] when a backend rejected the input
    /// - [`EngineError::AllEnginesFailed`] when no backend could render
    /// - [`EngineError::Io`] when the output could not be written to its sink
    pub fn render(
        &self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        let output = if options.format() == Format::Dot {
            trace!("Dot output requested, skipping layout engines");
            RenderOutput::new(Format::Dot, source)
        } else {
            self.inner.dispatch(source, options)?
        };
        output.deliver(options.sink())?;
        Ok(output)
    }

    /// Runs [`Dispatcher::render`] on a helper thread and hands the result to
    /// `complete`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the helper thread cannot be spawned.
    pub fn render_async(
        &self,
        source: impl Into<String>,
        options: RenderOptions,
        complete: impl FnOnce(Result<RenderOutput, EngineError>) + Send + 'static,
    ) -> Result<JoinHandle<()>, EngineError> {
        let dispatcher = self.clone();
        let source = source.into();
        let handle = thread::Builder::new()
            .name("trellis-dispatch".to_string())
            .spawn(move || complete(dispatcher.render(&source, &options)))?;
        Ok(handle)
    }
}

impl Inner {
    fn dispatch(&self, source: &str, options: &RenderOptions) -> Result<RenderOutput, EngineError> {
        let mut failures = Vec::new();

        for idx in self.candidates() {
            let Some(descriptor) = self.registry.descriptor(idx) else {
                continue;
            };
            let name = descriptor.name();
            trace!(engine = name; "Trying layout engine");

            let result = self
                .runtime(idx)
                .and_then(|runtime| self.attempt_with_recovery(&runtime, source, options));
            match result {
                Ok(output) => {
                    if self.sticky.swap(idx + 1, Ordering::Relaxed) != idx + 1 {
                        info!(engine = name; "Layout engine selected");
                    }
                    return Ok(output);
                }
                Err(err) if err.kind() == ErrorKind::InputError => return Err(err),
                Err(err) => {
                    debug!(engine = name, kind:% = err.kind(), err:%; "Layout engine failed, trying next");
                    failures.push((name.to_string(), err));
                }
            }
        }

        Err(EngineError::AllEnginesFailed(failures))
    }

    /// Backend indexes in the order they are tried for one request.
    fn candidates(&self) -> Vec<usize> {
        let count = self.registry.len();
        let sticky = match self.policy {
            ProbePolicy::Sticky => self
                .sticky
                .load(Ordering::Relaxed)
                .checked_sub(1)
                .filter(|idx| *idx < count),
            ProbePolicy::AlwaysProbe => None,
        };

        match sticky {
            Some(first) => std::iter::once(first)
                .chain((0..count).filter(|idx| *idx != first))
                .collect(),
            None => (0..count).collect(),
        }
    }

    fn attempt_with_recovery(
        &self,
        runtime: &EngineRuntime,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        match self.attempt(runtime, source, options) {
            Err(err) if err.kind() == ErrorKind::MemoryExhausted => {
                debug!(engine = runtime.name(), err:%; "Engine exhausted, retrying on a fresh handle");
                runtime.force_recreate();
                self.attempt(runtime, source, options)
            }
            result => result,
        }
    }

    fn attempt(
        &self,
        runtime: &EngineRuntime,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        let pending = runtime.render(source, options);
        match self.timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Returns the runtime of backend `idx`, starting it on first use.
    fn runtime(&self, idx: usize) -> Result<Arc<EngineRuntime>, EngineError> {
        let mut runtimes = self
            .runtimes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = runtimes.get(idx).and_then(Option::as_ref) {
            return Ok(Arc::clone(runtime));
        }

        let descriptor = self
            .registry
            .descriptor(idx)
            .ok_or(EngineError::Disconnected)?;
        let runtime = Arc::new(EngineRuntime::new(
            Arc::clone(descriptor.factory()),
            self.total_memory,
        )?);
        if let Some(slot) = runtimes.get_mut(idx) {
            *slot = Some(Arc::clone(&runtime));
        }
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::bounded;

    use super::*;
    use crate::engine::testing::{ScriptedFactory, Step};

    fn dispatcher(factories: &[&ScriptedFactory], policy: ProbePolicy) -> Dispatcher {
        let mut registry = EngineRegistry::new();
        for factory in factories {
            registry.register((*factory).clone());
        }
        Dispatcher::builder(registry)
            .with_policy(policy)
            .build()
            .unwrap()
    }

    fn render(dispatcher: &Dispatcher) -> Result<String, EngineError> {
        dispatcher
            .render("g", &RenderOptions::new())
            .map(|output| output.as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn test_first_working_engine_wins() {
        let first = ScriptedFactory::new("first");
        let second = ScriptedFactory::new("second");
        let dispatcher = dispatcher(&[&first, &second], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "first:g");
        assert_eq!(second.renders(), 0);
        assert_eq!(second.created(), 0);
        assert_eq!(dispatcher.sticky_engine(), Some("first"));
    }

    #[test]
    fn test_unavailable_engine_is_skipped() {
        let missing = ScriptedFactory::new("missing").unavailable();
        let fallback = ScriptedFactory::new("fallback");
        let dispatcher = dispatcher(&[&missing, &fallback], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "fallback:g");
        assert_eq!(dispatcher.sticky_engine(), Some("fallback"));
    }

    #[test]
    fn test_unsupported_request_falls_through() {
        let partial = ScriptedFactory::new("partial").with_steps([Step::Unsupported]);
        let full = ScriptedFactory::new("full");
        let dispatcher = dispatcher(&[&partial, &full], ProbePolicy::AlwaysProbe);

        assert_eq!(render(&dispatcher).unwrap(), "full:g");
        // The next request probes the first engine again.
        assert_eq!(render(&dispatcher).unwrap(), "partial:g");
    }

    #[test]
    fn test_exhaustion_is_retried_once_on_fresh_handle() {
        let engine = ScriptedFactory::new("engine").with_steps([Step::Exhaust]);
        let other = ScriptedFactory::new("other");
        let dispatcher = dispatcher(&[&engine, &other], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "engine:g");
        assert_eq!(engine.created(), 2);
        assert_eq!(engine.renders(), 2);
        assert_eq!(other.renders(), 0);
    }

    #[test]
    fn test_repeated_exhaustion_advances() {
        let engine = ScriptedFactory::new("engine").with_steps([Step::Exhaust, Step::Exhaust]);
        let other = ScriptedFactory::new("other");
        let dispatcher = dispatcher(&[&engine, &other], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "other:g");
        assert_eq!(engine.renders(), 2);
        assert_eq!(dispatcher.sticky_engine(), Some("other"));
    }

    #[test]
    fn test_input_error_is_surfaced_immediately() {
        let strict = ScriptedFactory::new("strict").with_steps([Step::Fail]);
        let other = ScriptedFactory::new("other");
        let dispatcher = dispatcher(&[&strict, &other], ProbePolicy::Sticky);

        let err = render(&dispatcher).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InputError);
        assert_eq!(other.renders(), 0);
        assert_eq!(dispatcher.sticky_engine(), None);
    }

    #[test]
    fn test_all_failed_lists_every_engine() {
        let first = ScriptedFactory::new("first").unavailable();
        let second = ScriptedFactory::new("second").with_steps([Step::Exhaust, Step::Exhaust]);
        let dispatcher = dispatcher(&[&first, &second], ProbePolicy::Sticky);

        let err = render(&dispatcher).unwrap_err();

        let EngineError::AllEnginesFailed(failures) = &err else {
            panic!("expected aggregate error, got {err:?}");
        };
        let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(failures[0].1.kind(), ErrorKind::EngineUnavailable);
        assert_eq!(failures[1].1.kind(), ErrorKind::MemoryExhausted);
    }

    #[test]
    fn test_empty_registry() {
        let dispatcher = Dispatcher::new(EngineRegistry::new());

        let err = render(&dispatcher).unwrap_err();
        assert!(matches!(err, EngineError::AllEnginesFailed(ref failures) if failures.is_empty()));
    }

    #[test]
    fn test_sticky_engine_is_tried_first() {
        let flaky = ScriptedFactory::new("flaky").with_steps([Step::Unsupported]);
        let steady = ScriptedFactory::new("steady");
        let dispatcher = dispatcher(&[&flaky, &steady], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "steady:g");
        assert_eq!(render(&dispatcher).unwrap(), "steady:g");
        assert_eq!(flaky.renders(), 1);
    }

    #[test]
    fn test_sticky_failure_reprobes_in_order() {
        let first = ScriptedFactory::new("first").with_steps([Step::Unsupported]);
        let second = ScriptedFactory::new("second").with_steps([Step::Succeed, Step::Unsupported]);
        let dispatcher = dispatcher(&[&first, &second], ProbePolicy::Sticky);

        assert_eq!(render(&dispatcher).unwrap(), "second:g");
        assert_eq!(render(&dispatcher).unwrap(), "first:g");
        assert_eq!(dispatcher.sticky_engine(), Some("first"));
    }

    #[test]
    fn test_timeout_advances_to_next_engine() {
        let slow =
            ScriptedFactory::new("slow").with_steps([Step::Sleep(Duration::from_millis(200))]);
        let fast = ScriptedFactory::new("fast");
        let mut registry = EngineRegistry::new();
        registry.register(slow.clone()).register(fast.clone());
        let dispatcher = Dispatcher::builder(registry)
            .with_timeout(Duration::from_millis(20))
            .build()
            .unwrap();

        assert_eq!(render(&dispatcher).unwrap(), "fast:g");
    }

    #[test]
    fn test_zero_total_memory_is_rejected_at_build() {
        let engine = ScriptedFactory::new("engine");
        let mut registry = EngineRegistry::new();
        registry.register(engine.clone());

        let err = Dispatcher::builder(registry)
            .with_total_memory(0)
            .build()
            .unwrap_err();

        assert!(matches!(err, EngineError::ZeroBudget));
        assert_eq!(engine.created(), 0);
    }

    #[test]
    fn test_dot_format_skips_engines() {
        let engine = ScriptedFactory::new("engine");
        let dispatcher = dispatcher(&[&engine], ProbePolicy::Sticky);

        let output = dispatcher
            .render("graph { a }", &RenderOptions::new().with_format(Format::Dot))
            .unwrap();

        assert_eq!(output.as_str(), Some("graph { a }"));
        assert_eq!(engine.created(), 0);
    }

    #[test]
    fn test_runtime_is_reused_across_requests() {
        let engine = ScriptedFactory::new("engine");
        let dispatcher = dispatcher(&[&engine], ProbePolicy::Sticky);

        render(&dispatcher).unwrap();
        render(&dispatcher).unwrap();

        assert_eq!(engine.created(), 1);
    }

    #[test]
    fn test_render_async_delivers_result() {
        let engine = ScriptedFactory::new("engine");
        let dispatcher = dispatcher(&[&engine], ProbePolicy::Sticky);
        let (sender, receiver) = bounded(1);

        let handle = dispatcher
            .render_async("g", RenderOptions::new(), move |result| {
                sender.send(result).unwrap();
            })
            .unwrap();
        handle.join().unwrap();

        let output = receiver.recv().unwrap().unwrap();
        assert_eq!(output.as_str(), Some("engine:g"));
    }
}
