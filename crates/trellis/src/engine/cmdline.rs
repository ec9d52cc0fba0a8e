//! Backend driving a host Graphviz `dot` executable.
//!
//! The executable is located on `PATH` when a handle is created. Each render
//! spawns one process, pipes the DOT source to its stdin and collects stdout.
//! The memory budget is recorded but not enforced; the process is bounded by
//! the host instead.

use std::{
    env,
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use log::trace;

use super::{EngineFactory, LayoutEngine};
use crate::{
    error::EngineError,
    options::{RenderOptions, RenderOutput},
};

/// Name the backend is registered under.
pub const NAME: &str = "dot";

/// Output resolution of Graphviz at scale 1, in pixels per inch.
const VECTOR_DPI: f64 = 72.0;
const BITMAP_DPI: f64 = 96.0;

/// Stands in for the unconstrained side of `-Gsize`, in inches.
const UNBOUNDED_INCHES: f64 = 10_000.0;

/// Creates [`DotCommandEngine`] handles.
#[derive(Debug, Clone)]
pub struct DotCommandFactory {
    program: OsString,
    search_path: Option<OsString>,
}

impl Default for DotCommandFactory {
    fn default() -> Self {
        Self {
            program: OsString::from("dot"),
            search_path: None,
        }
    }
}

impl DotCommandFactory {
    /// Uses `program` instead of `dot`; a path with a directory is used as is.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Searches `path` instead of the `PATH` environment variable.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn locate(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }

        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"))?;
        env::split_paths(&search_path)
            .flat_map(|dir| executable_candidates(&dir, program))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(windows)]
fn executable_candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    vec![dir.join(program), dir.join(program).with_extension("exe")]
}

#[cfg(not(windows))]
fn executable_candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

impl EngineFactory for DotCommandFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn create(&self, budget: usize) -> Result<Box<dyn LayoutEngine>, EngineError> {
        let program = self.locate().ok_or_else(|| {
            EngineError::unavailable(
                NAME,
                format!("`{}` executable not found", self.program.to_string_lossy()),
            )
        })?;
        trace!(engine = NAME, program:? = program; "Graphviz executable located");
        Ok(Box::new(DotCommandEngine { program, budget }))
    }
}

/// A handle bound to one located `dot` executable.
#[derive(Debug)]
pub struct DotCommandEngine {
    program: PathBuf,
    budget: usize,
}

impl DotCommandEngine {
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn args(options: &RenderOptions) -> Vec<String> {
        let mut args = vec![
            format!("-T{}", options.format()),
            format!("-K{}", options.layout()),
        ];
        if options.y_invert() {
            args.push("-y".to_string());
        }

        let dpi = if options.format().is_text() {
            VECTOR_DPI
        } else {
            BITMAP_DPI
        };
        let inches = |px: u32| f64::from(px) / dpi;
        match (options.width(), options.height()) {
            (Some(width), Some(height)) => {
                args.push(format!("-Gsize={},{}!", inches(width), inches(height)));
                args.push("-Gratio=fill".to_string());
            }
            (Some(width), None) => {
                args.push(format!("-Gsize={},{UNBOUNDED_INCHES}!", inches(width)));
            }
            (None, Some(height)) => {
                args.push(format!("-Gsize={UNBOUNDED_INCHES},{}!", inches(height)));
            }
            (None, None) => {}
        }
        if let Some(factor) = options.scale() {
            args.push(format!("-Gdpi={}", dpi * factor));
        }
        args
    }
}

impl LayoutEngine for DotCommandEngine {
    fn budget(&self) -> usize {
        self.budget
    }

    fn render(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        let mut child = Command::new(&self.program)
            .args(Self::args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| EngineError::unavailable(NAME, format!("failed to start: {err}")))?;

        let mut stdin = child.stdin.take();
        let output = thread::scope(|scope| {
            // Feed stdin concurrently so a large output cannot block the writer.
            scope.spawn(move || {
                if let Some(stdin) = stdin.as_mut() {
                    // A write error means the process exited early; its status tells why.
                    let _ = stdin.write_all(source.as_bytes());
                }
            });
            child.wait_with_output()
        })?;

        if !output.status.success() {
            return Err(classify_failure(
                &String::from_utf8_lossy(&output.stderr),
                self.budget,
            ));
        }
        trace!(engine = NAME, bytes = output.stdout.len(); "Graphviz process finished");
        Ok(RenderOutput::new(options.format(), output.stdout))
    }
}

fn classify_failure(stderr: &str, budget: usize) -> EngineError {
    let message = stderr.trim();
    let lower = message.to_ascii_lowercase();
    if lower.contains("out of memory") || lower.contains("memory allocation") {
        return EngineError::MemoryExhausted {
            budget,
            required: budget,
        };
    }
    if lower.contains("format") && lower.contains("not recognized") {
        return EngineError::unavailable(NAME, message);
    }
    EngineError::RenderFailed(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_missing_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let factory = DotCommandFactory::default().with_search_path(dir.path());

        let err = factory.create(1024).err().unwrap();

        assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    }

    #[test]
    fn test_explicit_program_path() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("dot-custom");
        std::fs::write(&program, "").unwrap();

        let factory = DotCommandFactory::default().with_program(&program);
        let engine = factory.create(1024).unwrap();

        assert_eq!(engine.budget(), 1024);
    }

    #[test]
    fn test_args() {
        let options = RenderOptions::new()
            .with_format(crate::Format::Png)
            .with_layout(crate::Layout::Circo)
            .with_y_invert(true);

        assert_eq!(DotCommandEngine::args(&options), ["-Tpng", "-Kcirco", "-y"]);
        assert_eq!(DotCommandEngine::args(&RenderOptions::new()), ["-Tsvg", "-Kdot"]);
    }

    #[test]
    fn test_size_args() {
        let both = RenderOptions::new().with_width(720).with_height(360);
        assert_eq!(
            DotCommandEngine::args(&both),
            ["-Tsvg", "-Kdot", "-Gsize=10,5!", "-Gratio=fill"]
        );

        let width = RenderOptions::new().with_width(144);
        assert_eq!(
            DotCommandEngine::args(&width),
            ["-Tsvg", "-Kdot", "-Gsize=2,10000!"]
        );

        let png = RenderOptions::new()
            .with_format(crate::Format::Png)
            .with_height(192);
        assert_eq!(
            DotCommandEngine::args(&png),
            ["-Tpng", "-Kdot", "-Gsize=10000,2!"]
        );
    }

    #[test]
    fn test_scale_args() {
        let svg = RenderOptions::new().with_scale(2.0);
        assert_eq!(DotCommandEngine::args(&svg), ["-Tsvg", "-Kdot", "-Gdpi=144"]);

        let png = RenderOptions::new()
            .with_format(crate::Format::Png)
            .with_scale(0.5);
        assert_eq!(DotCommandEngine::args(&png), ["-Tpng", "-Kdot", "-Gdpi=48"]);
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("Error: <stdin>: syntax error in line 1 near '->'", 1).kind(),
            ErrorKind::InputError
        );
        assert_eq!(
            classify_failure("dot: out of memory", 1).kind(),
            ErrorKind::MemoryExhausted
        );
        assert_eq!(
            classify_failure("Format: \"bmp\" not recognized. Use one of: svg png", 1).kind(),
            ErrorKind::EngineUnavailable
        );
    }
}
