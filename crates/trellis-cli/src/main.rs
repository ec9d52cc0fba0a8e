//! Entry point of the `trellis` binary.

use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};
use miette::GraphicalReportHandler;

use trellis::TrellisError;
use trellis_cli::{Args, error_adapter::to_reportables};

fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    init_logging(&args.log_level);
    info!(version = env!("CARGO_PKG_VERSION"); "Trellis starting");
    debug!(args:?; "Parsed arguments");

    match trellis_cli::run(&args) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Installs the logger; an unknown level falls back to `warn`.
fn init_logging(level: &str) {
    let parsed = level.parse::<LevelFilter>().ok();
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(parsed.unwrap_or(LevelFilter::Warn))
        .init();

    if parsed.is_none() {
        warn!(level; "Unknown log level, using warn");
    }
}

/// Logs every diagnostic of `err` as one block.
fn report(err: &TrellisError) {
    let handler = GraphicalReportHandler::new();
    let reportables = to_reportables(err);

    let mut rendered = String::new();
    for reportable in &reportables {
        if handler.render_report(&mut rendered, reportable).is_err() {
            rendered.push_str(&reportable.to_string());
            rendered.push('\n');
        }
    }
    error!(diagnostics = reportables.len(); "{rendered}");
}
