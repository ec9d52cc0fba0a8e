//! CLI logic for the Trellis graph renderer.
//!
//! Reads a DOT file (or builds the demo graph), renders it through the
//! configured layout engines and writes the result to disk.

pub mod error_adapter;

mod args;
mod config;
mod demo;

pub use args::Args;

use std::fs;

use log::info;

use trellis::{Renderer, TrellisError, serialize};

/// Run the Trellis CLI application
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Graph construction errors in the demo graph
/// - Engine failures, including the aggregate of every candidate engine
pub fn run(args: &Args) -> Result<(), TrellisError> {
    let app_config = config::load_config(args.config.as_ref())?;

    let source = match &args.input {
        Some(input) if !args.demo => {
            info!(input_path = input; "Reading graph");
            fs::read_to_string(input)?
        }
        _ => {
            info!("Building demo graph");
            serialize::to_dot(&demo::demo_graph()?)
        }
    };

    let renderer = Renderer::new(app_config)?;

    let mut options = renderer.options();
    if let Some(format) = args.format {
        options = options.with_format(format);
    }
    if let Some(layout) = args.layout {
        options = options.with_layout(layout);
    }
    if let Some(total_memory) = args.total_memory {
        options = options.with_total_memory(total_memory.get());
    }
    if let Some(width) = args.width {
        options = options.with_width(width);
    }
    if let Some(height) = args.height {
        options = options.with_height(height);
    }
    if let Some(scale) = args.scale {
        options = options.with_scale(scale);
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| format!("out.{}", options.format()));
    let options = options.to_file(&output_path);

    info!(
        output_path = output_path.as_str(),
        format:% = options.format(),
        layout:% = options.layout();
        "Rendering graph"
    );

    renderer.render_source(&source, &options)?;

    info!(output_file = output_path.as_str(); "Output written successfully");

    Ok(())
}
