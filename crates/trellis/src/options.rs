//! Per-request render options and render results.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::debug;
use serde::Deserialize;

use crate::error::{EngineError, ParseOptionError};

/// Output format requested from a layout engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Svg,
    Png,
    /// The serialized input itself; no engine is involved.
    Dot,
    Xdot,
    Plain,
    Json,
    Ps,
}

impl Format {
    /// The name used on the `dot` command line (`-T<name>`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Dot => "dot",
            Self::Xdot => "xdot",
            Self::Plain => "plain",
            Self::Json => "json",
            Self::Ps => "ps",
        }
    }

    /// Returns `true` for formats whose output is UTF-8 text.
    pub fn is_text(self) -> bool {
        !matches!(self, Self::Png)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "dot" | "gv" => Ok(Self::Dot),
            "xdot" => Ok(Self::Xdot),
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            "ps" => Ok(Self::Ps),
            _ => Err(ParseOptionError::Format(s.to_string())),
        }
    }
}

/// Layout algorithm requested from a layout engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Dot,
    Neato,
    Circo,
    Fdp,
    Osage,
    Twopi,
}

impl Layout {
    /// The name used on the `dot` command line (`-K<name>`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Neato => "neato",
            Self::Circo => "circo",
            Self::Fdp => "fdp",
            Self::Osage => "osage",
            Self::Twopi => "twopi",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "neato" => Ok(Self::Neato),
            "circo" => Ok(Self::Circo),
            "fdp" => Ok(Self::Fdp),
            "osage" => Ok(Self::Osage),
            "twopi" => Ok(Self::Twopi),
            _ => Err(ParseOptionError::Layout(s.to_string())),
        }
    }
}

/// Where a successful render is delivered besides the returned [`RenderOutput`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputSink {
    #[default]
    Memory,
    /// Also write the rendered bytes to this file, creating parent directories.
    File(PathBuf),
}

/// Options of a single render request.
///
/// # Example
///
/// ```
/// use trellis::{Format, Layout, RenderOptions};
///
/// let options = RenderOptions::new()
///     .with_format(Format::Svg)
///     .with_layout(Layout::Neato)
///     .with_total_memory(32 * 1024 * 1024)
///     .with_width(800);
/// assert_eq!(options.total_memory(), Some(32 * 1024 * 1024));
/// assert_eq!(options.size_for(400.0, 100.0), Some((800.0, 200.0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    format: Format,
    layout: Layout,
    total_memory: Option<usize>,
    y_invert: bool,
    width: Option<u32>,
    height: Option<u32>,
    scale: Option<f64>,
    sink: OutputSink,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Overrides the engine memory budget, in bytes. The runtime keeps the
    /// new budget for later requests.
    pub fn with_total_memory(mut self, bytes: usize) -> Self {
        self.total_memory = Some(bytes);
        self
    }

    /// Inverts the y coordinates in the output.
    pub fn with_y_invert(mut self, y_invert: bool) -> Self {
        self.y_invert = y_invert;
        self
    }

    /// Requests an output `px` pixels wide; without a height the aspect
    /// ratio is kept. Replaces any scale factor. Zero clears the width.
    pub fn with_width(mut self, px: u32) -> Self {
        self.width = Some(px).filter(|px| *px > 0);
        self.scale = None;
        self
    }

    /// Requests an output `px` pixels high; without a width the aspect
    /// ratio is kept. Replaces any scale factor. Zero clears the height.
    pub fn with_height(mut self, px: u32) -> Self {
        self.height = Some(px).filter(|px| *px > 0);
        self.scale = None;
        self
    }

    /// Scales the natural output size by `factor`. Replaces any width and
    /// height; a factor that is not a positive finite number clears it.
    pub fn with_scale(mut self, factor: f64) -> Self {
        self.scale = Some(factor).filter(|factor| factor.is_finite() && *factor > 0.0);
        self.width = None;
        self.height = None;
        self
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Shorthand for `with_sink(OutputSink::File(path))`.
    pub fn to_file(self, path: impl Into<PathBuf>) -> Self {
        self.with_sink(OutputSink::File(path.into()))
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn total_memory(&self) -> Option<usize> {
        self.total_memory
    }

    pub fn y_invert(&self) -> bool {
        self.y_invert
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    /// Output size for a drawing whose natural size is `width` x `height`,
    /// or `None` when no sizing was requested.
    ///
    /// With both a width and a height the drawing is stretched to fill them.
    pub fn size_for(&self, width: f64, height: f64) -> Option<(f64, f64)> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let size = match (self.width, self.height) {
            (Some(w), Some(h)) => (f64::from(w), f64::from(h)),
            (Some(w), None) => (f64::from(w), (height * f64::from(w) / width).ceil()),
            (None, Some(h)) => ((width * f64::from(h) / height).ceil(), f64::from(h)),
            (None, None) => {
                let factor = self.scale?;
                ((width * factor).ceil(), (height * factor).ceil())
            }
        };
        Some(size)
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }
}

/// The result of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    format: Format,
    bytes: Vec<u8>,
}

impl RenderOutput {
    pub fn new(format: Format, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The output as text, or `None` for binary formats and invalid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        if !self.format.is_text() {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Delivers the output to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] when the file cannot be written.
    pub fn deliver(&self, sink: &OutputSink) -> Result<(), EngineError> {
        match sink {
            OutputSink::Memory => Ok(()),
            OutputSink::File(path) => self.write_file(path),
        }
    }

    fn write_file(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.bytes)?;
        debug!(path:? = path, bytes = self.bytes.len(); "Render output written");
        Ok(())
    }
}
