//! Engine runtime: one handle, one worker thread, queued requests.
//!
//! The worker thread owns the factory and the live handle. Requests arrive
//! over a channel and are served strictly one at a time, in submission
//! order. Each request gets exactly one completion, delivered either through
//! a [`PendingRender`] or a callback.
//!
//! Handle lifecycle on the worker:
//!
//! - created lazily on the first request
//! - recreated when forced, when the runtime was marked suspect after a
//!   deadline expired, or when the configured budget differs from the
//!   handle's budget
//! - torn down after any failed render, so the next request starts fresh
//! - torn down when the runtime is dropped

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use log::{debug, trace};

use super::{EngineFactory, LayoutEngine};
use crate::{
    error::EngineError,
    options::{RenderOptions, RenderOutput},
};

/// Default engine memory budget in bytes (16 MiB).
pub const DEFAULT_TOTAL_MEMORY: usize = 16 * 1024 * 1024;

type Completion = Box<dyn FnOnce(Result<RenderOutput, EngineError>) + Send>;

struct Request {
    source: String,
    options: RenderOptions,
    complete: Completion,
}

/// State shared between the runtime, its worker and pending renders.
#[derive(Debug)]
struct Shared {
    budget: AtomicUsize,
    force_recreate: AtomicBool,
}

/// Owns one layout engine handle on a dedicated worker thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use trellis::{
///     RenderOptions,
///     engine::{DEFAULT_TOTAL_MEMORY, EngineRuntime, layout_rs::LayoutRsFactory},
/// };
///
/// let runtime = EngineRuntime::new(Arc::new(LayoutRsFactory), DEFAULT_TOTAL_MEMORY)?;
/// let output = runtime
///     .render("digraph { a -> b }", &RenderOptions::new())
///     .wait()?;
/// assert!(output.as_str().is_some_and(|svg| svg.contains("<svg")));
/// # Ok::<(), trellis::EngineError>(())
/// ```
pub struct EngineRuntime {
    name: String,
    shared: Arc<Shared>,
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl EngineRuntime {
    /// Starts a runtime for `factory` with a configured budget of `budget` bytes.
    ///
    /// The handle itself is created on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroBudget`] for a zero budget, or
    /// [`EngineError::Io`] if the worker thread cannot be spawned.
    pub fn new(factory: Arc<dyn EngineFactory>, budget: usize) -> Result<Self, EngineError> {
        if budget == 0 {
            return Err(EngineError::ZeroBudget);
        }
        let name = factory.name().to_string();
        let shared = Arc::new(Shared {
            budget: AtomicUsize::new(budget),
            force_recreate: AtomicBool::new(false),
        });
        let (requests, receiver) = unbounded();

        let worker = Worker {
            factory,
            handle: None,
            shared: Arc::clone(&shared),
        };
        let worker = thread::Builder::new()
            .name(format!("trellis-{name}"))
            .spawn(move || worker.run(receiver))?;

        debug!(engine = name.as_str(), budget; "Engine runtime started");
        Ok(Self {
            name,
            shared,
            requests: Some(requests),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The budget the next handle will be created with.
    pub fn budget(&self) -> usize {
        self.shared.budget.load(Ordering::SeqCst)
    }

    /// Changes the configured budget. A live handle with a different budget
    /// is recreated on the next request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroBudget`] for a zero budget.
    pub fn set_budget(&self, bytes: usize) -> Result<(), EngineError> {
        self.shared.set_budget(bytes)
    }

    /// Schedules a forced recreation of the handle for the next request.
    pub fn force_recreate(&self) {
        self.shared.force_recreate.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while a forced recreation is pending.
    pub fn is_suspect(&self) -> bool {
        self.shared.force_recreate.load(Ordering::SeqCst)
    }

    /// Queues a render request and returns its pending completion.
    pub fn render(&self, source: &str, options: &RenderOptions) -> PendingRender {
        let (sender, receiver) = bounded(1);
        self.render_with(source, options, move |result| {
            // The caller may have stopped waiting.
            let _ = sender.send(result);
        });
        PendingRender {
            receiver,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queues a render request; `complete` is called exactly once with the
    /// result, on the worker thread.
    pub fn render_with(
        &self,
        source: &str,
        options: &RenderOptions,
        complete: impl FnOnce(Result<RenderOutput, EngineError>) + Send + 'static,
    ) {
        let request = Request {
            source: source.to_string(),
            options: options.clone(),
            complete: Box::new(complete),
        };
        let Some(requests) = &self.requests else {
            (request.complete)(Err(EngineError::Disconnected));
            return;
        };
        if let Err(err) = requests.send(request) {
            (err.into_inner().complete)(Err(EngineError::Disconnected));
        }
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once queued requests are served.
        drop(self.requests.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        debug!(engine = self.name.as_str(); "Engine runtime stopped");
    }
}

impl std::fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("name", &self.name)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn set_budget(&self, bytes: usize) -> Result<(), EngineError> {
        if bytes == 0 {
            return Err(EngineError::ZeroBudget);
        }
        self.budget.store(bytes, Ordering::SeqCst);
        Ok(())
    }
}

/// Completion of a queued render request.
#[must_use = "dropping a pending render discards its result"]
#[derive(Debug)]
pub struct PendingRender {
    receiver: Receiver<Result<RenderOutput, EngineError>>,
    shared: Arc<Shared>,
}

impl PendingRender {
    /// Blocks until the request completes.
    ///
    /// # Errors
    ///
    /// Returns the render error, or [`EngineError::Disconnected`] if the
    /// worker went away without completing the request.
    pub fn wait(self) -> Result<RenderOutput, EngineError> {
        self.receiver
            .recv()
            .map_err(|_| EngineError::Disconnected)?
    }

    /// Blocks until the request completes or `timeout` elapses.
    ///
    /// On expiry the result is abandoned and the runtime is marked suspect:
    /// its next request recreates the handle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Timeout`] on expiry, otherwise as [`PendingRender::wait`].
    pub fn wait_timeout(self, timeout: Duration) -> Result<RenderOutput, EngineError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.shared.force_recreate.store(true, Ordering::SeqCst);
                debug!(timeout:?; "Render deadline expired, engine marked suspect");
                Err(EngineError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

struct Worker {
    factory: Arc<dyn EngineFactory>,
    handle: Option<Box<dyn LayoutEngine>>,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(mut self, requests: Receiver<Request>) {
        for request in requests {
            let result = self.serve(&request.source, &request.options);
            (request.complete)(result);
        }
        self.teardown();
    }

    fn serve(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        if let Some(bytes) = options.total_memory() {
            self.shared.set_budget(bytes)?;
        }
        let force = self.shared.force_recreate.swap(false, Ordering::SeqCst);

        let result = self.ensure_initialized(force).and_then(|handle| {
            catch_unwind(AssertUnwindSafe(|| handle.render(source, options))).unwrap_or_else(
                |_| Err(EngineError::RenderFailed("layout engine panicked".to_string())),
            )
        });

        match &result {
            Ok(output) => {
                trace!(engine = self.factory.name(), bytes = output.bytes().len(); "Render completed");
            }
            Err(err) => {
                debug!(engine = self.factory.name(), err:%; "Render failed");
                self.teardown();
            }
        }
        result
    }

    /// Returns the live handle, creating it first when there is none, when
    /// `force` is set, or when its budget no longer matches the configuration.
    fn ensure_initialized(
        &mut self,
        force: bool,
    ) -> Result<&mut Box<dyn LayoutEngine>, EngineError> {
        let budget = self.shared.budget.load(Ordering::SeqCst);
        let stale = self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.budget() != budget);
        if force || stale {
            self.teardown();
        }

        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                let handle = self.factory.create(budget)?;
                debug!(engine = self.factory.name(), budget; "Engine handle created");
                handle
            }
        };
        Ok(self.handle.insert(handle))
    }

    fn teardown(&mut self) {
        if self.handle.take().is_some() {
            debug!(engine = self.factory.name(); "Engine handle torn down");
        }
    }
}
