//! Error types for Trellis rendering.
//!
//! - [`EngineError`]: failures of a layout engine or the dispatcher, with a
//!   coarse [`ErrorKind`] classification used to pick the recovery strategy.
//! - [`TrellisError`]: the facade error wrapping construction, engine and I/O
//!   failures.

use std::{fmt, io, time::Duration};

use thiserror::Error;

use trellis_core::GraphError;

/// Classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The engine ran out of its memory budget; a fresh handle may succeed.
    MemoryExhausted,
    /// The input or options were rejected; no other engine will do better.
    InputError,
    /// The engine cannot be used in this environment or for this request.
    EngineUnavailable,
    /// The caller stopped waiting for a result.
    Timeout,
    /// Every candidate engine failed.
    Aggregate,
    /// Reading or writing a file or pipe failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MemoryExhausted => "memory exhausted",
            Self::InputError => "input error",
            Self::EngineUnavailable => "engine unavailable",
            Self::Timeout => "timeout",
            Self::Aggregate => "all engines failed",
            Self::Io => "i/o error",
        };
        f.write_str(name)
    }
}

/// Errors reported by layout engines, runtimes and the dispatcher.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine `{engine}` is unavailable: {reason}")]
    Unavailable { engine: String, reason: String },

    #[error("Engine memory exhausted: {required} bytes required, budget is {budget} bytes")]
    MemoryExhausted { budget: usize, required: usize },

    #[error("Memory budget must be greater than zero")]
    ZeroBudget,

    #[error("Unknown layout engine: {0}")]
    UnknownEngine(String),

    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    #[error("All engines failed: {}", describe_failures(.0))]
    AllEnginesFailed(Vec<(String, EngineError)>),

    #[error("No result within {0:?}")]
    Timeout(Duration),

    #[error("Engine worker is gone")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn unavailable(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } | Self::UnknownEngine(_) | Self::Disconnected => {
                ErrorKind::EngineUnavailable
            }
            Self::MemoryExhausted { .. } => ErrorKind::MemoryExhausted,
            Self::RenderFailed(_) | Self::ZeroBudget => ErrorKind::InputError,
            Self::AllEnginesFailed(_) => ErrorKind::Aggregate,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

fn describe_failures(failures: &[(String, EngineError)]) -> String {
    if failures.is_empty() {
        return "no engine registered".to_string();
    }
    failures
        .iter()
        .map(|(engine, err)| format!("{engine}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A format or layout name that is not known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseOptionError {
    #[error("Unknown output format: {0}")]
    Format(String),

    #[error("Unknown layout: {0}")]
    Layout(String),
}

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            EngineError::unavailable("dot", "not found").kind(),
            ErrorKind::EngineUnavailable
        );
        assert_eq!(
            EngineError::MemoryExhausted {
                budget: 1,
                required: 2
            }
            .kind(),
            ErrorKind::MemoryExhausted
        );
        assert_eq!(
            EngineError::RenderFailed("syntax error".to_string()).kind(),
            ErrorKind::InputError
        );
        assert_eq!(
            EngineError::Timeout(Duration::from_millis(5)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(EngineError::Disconnected.kind(), ErrorKind::EngineUnavailable);
        assert_eq!(EngineError::ZeroBudget.kind(), ErrorKind::InputError);
        assert_eq!(
            EngineError::UnknownEngine("warp".to_string()).kind(),
            ErrorKind::EngineUnavailable
        );
    }

    #[test]
    fn test_aggregate_message_lists_every_engine() {
        let err = EngineError::AllEnginesFailed(vec![
            ("dot".to_string(), EngineError::unavailable("dot", "not on PATH")),
            (
                "layout-rs".to_string(),
                EngineError::MemoryExhausted {
                    budget: 10,
                    required: 20,
                },
            ),
        ]);

        let message = err.to_string();
        assert!(message.contains("dot: Engine `dot` is unavailable: not on PATH"));
        assert!(message.contains("layout-rs: Engine memory exhausted"));
        assert_eq!(err.kind(), ErrorKind::Aggregate);
    }

    #[test]
    fn test_facade_wraps_sources() {
        let err: TrellisError = GraphError::ScopeMisuse("unbalanced".to_string()).into();
        assert!(matches!(err, TrellisError::Graph(_)));

        let err: TrellisError = EngineError::Disconnected.into();
        assert_eq!(err.to_string(), "Engine worker is gone");
    }
}
