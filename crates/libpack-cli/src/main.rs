#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use libpack_core::version::version_string;
use libpack_core::Config;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Environment variable selecting the verbosity (0 = INFO, 1 = DEBUG, 2+ = TRACE).
const VERBOSE_ENV: &str = "LIBPACK_VERBOSE";

/// Environment variable selecting the log format (`json` or plain).
const LOG_FORMAT_ENV: &str = "LIBPACK_LOG_FORMAT";

#[derive(Parser, Debug)]
#[command(name = "libpack")]
#[command(author, version, about = "Build every variant of every package in a multi-package library", long_about = None)]
struct Cli {
    /// Build the default package once in watch mode instead of the full matrix
    #[arg(long)]
    watch: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let verbosity = std::env::var(VERBOSE_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(0);
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let config = Config::new(cwd)
        .with_verbosity(verbosity)
        .with_json_logs(json);

    logging::init(config.verbosity, config.json_logs);
    debug!(version = %version_string(), cwd = %config.cwd.display(), watch = cli.watch, "starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    if cli.watch {
        commands::watch::run(&runtime, &config)
    } else {
        commands::build::run(&runtime, &config)
    }
}
