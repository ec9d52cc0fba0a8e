//! Error adapter for converting TrellisError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When every layout engine failed, each engine's failure is rendered as its
//! own report so the reason for every candidate is visible.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;

use trellis::{EngineError, ErrorKind, TrellisError};

/// Adapter for one engine's failure inside an aggregate error.
pub struct EngineFailureAdapter<'a> {
    engine: &'a str,
    err: &'a EngineError,
}

impl<'a> EngineFailureAdapter<'a> {
    pub fn new(engine: &'a str, err: &'a EngineError) -> Self {
        Self { engine, err }
    }
}

impl fmt::Debug for EngineFailureAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFailureAdapter")
            .field("engine", &self.engine)
            .field("err", &self.err)
            .finish()
    }
}

impl fmt::Display for EngineFailureAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.engine, self.err)
    }
}

impl std::error::Error for EngineFailureAdapter<'_> {}

impl MietteDiagnostic for EngineFailureAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(engine_code(self.err.kind())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        engine_help(self.err.kind()).map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }
}

/// Adapter for [`TrellisError`] values reported as a single diagnostic.
pub struct ErrorAdapter<'a>(pub &'a TrellisError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TrellisError::Graph(_) => "trellis::graph",
            TrellisError::Engine(err) => engine_code(err.kind()),
            TrellisError::Io(_) => "trellis::io",
            TrellisError::Config(_) => "trellis::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TrellisError::Engine(err) => engine_help(err.kind()),
            TrellisError::Config(_) => {
                Some("check the [engines] and [render] sections of the configuration file")
            }
            TrellisError::Graph(_) | TrellisError::Io(_) => None,
        };
        help.map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }
}

fn engine_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::MemoryExhausted => "trellis::engine::memory",
        ErrorKind::InputError => "trellis::engine::input",
        ErrorKind::EngineUnavailable => "trellis::engine::unavailable",
        ErrorKind::Timeout => "trellis::engine::timeout",
        ErrorKind::Aggregate => "trellis::engine::all_failed",
        ErrorKind::Io => "trellis::engine::io",
    }
}

fn engine_help(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::MemoryExhausted => Some("raise `total_memory` in the [engines] configuration"),
        ErrorKind::EngineUnavailable => {
            Some("install Graphviz or choose a format and layout the in-process engine supports (svg, dot)")
        }
        ErrorKind::Timeout => Some("raise `timeout_ms` in the [engines] configuration"),
        ErrorKind::InputError | ErrorKind::Aggregate | ErrorKind::Io => None,
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// One engine's failure out of an aggregate error.
    EngineFailure(EngineFailureAdapter<'a>),
    /// Any other error.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::EngineFailure(e) => fmt::Display::fmt(e, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::EngineFailure(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::EngineFailure(e) => e.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::EngineFailure(e) => e.help(),
            Reportable::Error(e) => e.help(),
        }
    }
}

/// Convert a [`TrellisError`] into a list of reportable errors.
///
/// An aggregate engine failure yields one [`Reportable`] per engine; every
/// other error yields a single one.
pub fn to_reportables(err: &TrellisError) -> Vec<Reportable<'_>> {
    match err {
        TrellisError::Engine(EngineError::AllEnginesFailed(failures)) if !failures.is_empty() => {
            failures
                .iter()
                .map(|(engine, err)| {
                    Reportable::EngineFailure(EngineFailureAdapter::new(engine, err))
                })
                .collect()
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_yields_one_report_per_engine() {
        let err = TrellisError::Engine(EngineError::AllEnginesFailed(vec![
            ("dot".to_string(), EngineError::unavailable("dot", "not found")),
            (
                "layout-rs".to_string(),
                EngineError::unavailable("layout-rs", "format `png` is not supported"),
            ),
        ]));

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 2);
        assert!(reportables[0].to_string().starts_with("dot: "));
        assert_eq!(
            reportables[1].code().map(|code| code.to_string()),
            Some("trellis::engine::unavailable".to_string())
        );
        assert!(reportables[1].help().is_some());
    }

    #[test]
    fn test_single_error() {
        let err = TrellisError::Config("bad".to_string());

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        assert_eq!(
            reportables[0].code().map(|code| code.to_string()),
            Some("trellis::config".to_string())
        );
    }

    #[test]
    fn test_report_renders() {
        let err = TrellisError::Engine(EngineError::RenderFailed("syntax error".to_string()));
        let reporter = miette::GraphicalReportHandler::new();
        let mut writer = String::new();

        for reportable in to_reportables(&err) {
            reporter.render_report(&mut writer, &reportable).unwrap();
        }

        assert!(writer.contains("syntax error"));
        assert!(writer.contains("trellis::engine::input"));
    }
}
