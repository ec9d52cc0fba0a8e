//! Command-line argument definitions for the Trellis CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the input graph, the output file and
//! format, the output size, the configuration file, and logging verbosity.

use std::num::NonZeroUsize;

use clap::Parser;

use trellis::{Format, Layout};

/// Command-line arguments for the Trellis graph renderer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input DOT file
    #[arg(help = "Path to the input DOT file", required_unless_present = "demo")]
    pub input: Option<String>,

    /// Render a built-in demo graph instead of an input file
    #[arg(long, conflicts_with = "input")]
    pub demo: bool,

    /// Path to the output file (defaults to `out.<format>`)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (svg, png, dot, xdot, plain, json, ps)
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Layout algorithm (dot, neato, circo, fdp, osage, twopi)
    #[arg(short = 'K', long)]
    pub layout: Option<Layout>,

    /// Engine memory budget in bytes
    #[arg(long)]
    pub total_memory: Option<NonZeroUsize>,

    /// Output width in pixels; keeps the aspect ratio unless --height is set
    #[arg(long, conflicts_with = "scale")]
    pub width: Option<u32>,

    /// Output height in pixels; keeps the aspect ratio unless --width is set
    #[arg(long, conflicts_with = "scale")]
    pub height: Option<u32>,

    /// Factor applied to the natural output size
    #[arg(long)]
    pub scale: Option<f64>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
