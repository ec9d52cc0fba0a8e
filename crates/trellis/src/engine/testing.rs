//! Scripted engine doubles for runtime and dispatcher tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use super::{EngineFactory, LayoutEngine};
use crate::{
    error::EngineError,
    options::{RenderOptions, RenderOutput},
};

/// Outcome of one scripted render. Renders past the end of the script succeed.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Succeed,
    Fail,
    Exhaust,
    Unsupported,
    Sleep(Duration),
    Panic,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    dropped: AtomicUsize,
    renders: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    last_budget: AtomicUsize,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedFactory {
    name: String,
    unavailable: bool,
    script: Arc<Mutex<VecDeque<Step>>>,
    counters: Arc<Counters>,
}

impl ScriptedFactory {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            unavailable: false,
            script: Arc::default(),
            counters: Arc::default(),
        }
    }

    pub(crate) fn with_steps(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script.lock().unwrap().extend(steps);
        self
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub(crate) fn dropped(&self) -> usize {
        self.counters.dropped.load(Ordering::SeqCst)
    }

    pub(crate) fn renders(&self) -> usize {
        self.counters.renders.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn last_budget(&self) -> usize {
        self.counters.last_budget.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, budget: usize) -> Result<Box<dyn LayoutEngine>, EngineError> {
        if self.unavailable {
            return Err(EngineError::unavailable(&self.name, "scripted as unavailable"));
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        self.counters.last_budget.store(budget, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine {
            name: self.name.clone(),
            budget,
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedEngine {
    name: String,
    budget: usize,
    script: Arc<Mutex<VecDeque<Step>>>,
    counters: Arc<Counters>,
}

impl LayoutEngine for ScriptedEngine {
    fn budget(&self) -> usize {
        self.budget
    }

    fn render(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        let counters = &self.counters;
        counters.renders.fetch_add(1, Ordering::SeqCst);
        let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_active.fetch_max(active, Ordering::SeqCst);

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Succeed);
        let result = match step {
            Step::Succeed => Ok(()),
            Step::Sleep(duration) => {
                thread::sleep(duration);
                Ok(())
            }
            Step::Fail => Err(EngineError::RenderFailed("syntax error".to_string())),
            Step::Exhaust => Err(EngineError::MemoryExhausted {
                budget: self.budget,
                required: self.budget + 1,
            }),
            Step::Unsupported => Err(EngineError::unavailable(&self.name, "unsupported format")),
            Step::Panic => {
                counters.active.fetch_sub(1, Ordering::SeqCst);
                panic!("scripted panic");
            }
        };

        counters.active.fetch_sub(1, Ordering::SeqCst);
        result.map(|()| RenderOutput::new(options.format(), format!("{}:{source}", self.name)))
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}
