//! In-process backend built on the `layout-rs` crate.
//!
//! Supports SVG output with the `dot` (hierarchical) layout only. Each handle
//! accounts its memory in an [`ArenaBudget`] that is charged per render and
//! only released when the handle is dropped.
//!
//! Requested output sizes are applied to the root `width` and `height` of the
//! SVG; the `viewBox` keeps the natural size so the drawing stretches to fit.

use std::ops::Range;

use layout::{
    backends::svg::SVGWriter,
    gv::{DotParser, GraphBuilder},
};
use log::trace;

use super::{ArenaBudget, EngineFactory, LayoutEngine};
use crate::{
    error::EngineError,
    options::{Format, Layout, RenderOptions, RenderOutput},
};

/// Name the backend is registered under.
pub const NAME: &str = "layout-rs";

/// Estimated arena bytes needed per byte of DOT source.
const BYTES_PER_SOURCE_BYTE: usize = 256;

/// Creates [`LayoutRsEngine`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRsFactory;

impl EngineFactory for LayoutRsFactory {
    fn name(&self) -> &str {
        NAME
    }

    fn create(&self, budget: usize) -> Result<Box<dyn LayoutEngine>, EngineError> {
        Ok(Box::new(LayoutRsEngine::new(budget)))
    }
}

/// A `layout-rs` handle with its arena.
#[derive(Debug)]
pub struct LayoutRsEngine {
    arena: ArenaBudget,
}

impl LayoutRsEngine {
    pub fn new(budget: usize) -> Self {
        Self {
            arena: ArenaBudget::new(budget),
        }
    }

    /// Arena accounting of this handle.
    pub fn arena(&self) -> &ArenaBudget {
        &self.arena
    }

    fn check_supported(options: &RenderOptions) -> Result<(), EngineError> {
        if options.format() != Format::Svg {
            return Err(EngineError::unavailable(
                NAME,
                format!("output format `{}` is not supported", options.format()),
            ));
        }
        if options.layout() != Layout::Dot {
            return Err(EngineError::unavailable(
                NAME,
                format!("layout `{}` is not supported", options.layout()),
            ));
        }
        Ok(())
    }
}

impl LayoutEngine for LayoutRsEngine {
    fn budget(&self) -> usize {
        self.arena.limit()
    }

    fn render(
        &mut self,
        source: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, EngineError> {
        Self::check_supported(options)?;
        self.arena
            .reserve(source.len().saturating_mul(BYTES_PER_SOURCE_BYTE))?;

        let mut parser = DotParser::new(source);
        let graph = parser.process().map_err(EngineError::RenderFailed)?;

        let mut builder = GraphBuilder::new();
        builder.visit_graph(&graph);
        let mut visual = builder.get();

        let mut svg = SVGWriter::new();
        visual.do_it(false, false, false, &mut svg);
        let content = resize(svg.finalize(), options)?;

        trace!(
            engine = NAME,
            arena_used = self.arena.used(),
            arena_limit = self.arena.limit();
            "Graph rendered"
        );
        Ok(RenderOutput::new(Format::Svg, content))
    }
}

/// Byte ranges of the root element's `width` and `height` values.
fn root_size(svg: &str) -> Option<(Range<usize>, Range<usize>)> {
    let start = svg.find("<svg ")?;
    let end = start + svg[start..].find('>')?;
    let value = |name: &str| {
        let needle = format!(" {name}=\"");
        let from = start + svg[start..end].find(&needle)? + needle.len();
        let to = from + svg[from..end].find('"')?;
        Some(from..to)
    };
    Some((value("width")?, value("height")?))
}

fn resize(mut svg: String, options: &RenderOptions) -> Result<String, EngineError> {
    if options.width().is_none() && options.height().is_none() && options.scale().is_none() {
        return Ok(svg);
    }
    let malformed = || EngineError::RenderFailed("SVG output has no root size".to_string());

    let (width, height) = root_size(&svg).ok_or_else(malformed)?;
    let natural_width: f64 = svg[width.clone()].parse().map_err(|_| malformed())?;
    let natural_height: f64 = svg[height.clone()].parse().map_err(|_| malformed())?;
    let Some((target_width, target_height)) = options.size_for(natural_width, natural_height)
    else {
        return Ok(svg);
    };

    // Replace the later range first so the earlier one stays valid.
    let mut edits = [(width, target_width), (height, target_height)];
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    for (range, value) in edits {
        svg.replace_range(range, &value.to_string());
    }
    trace!(
        engine = NAME,
        natural_width,
        natural_height,
        target_width,
        target_height;
        "SVG resized"
    );
    Ok(svg)
}
