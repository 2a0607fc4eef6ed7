//! Watch mode: a single long-lived build of the default package.

use super::Project;
use libpack_core::{Config, WatchModeController};
use miette::{IntoDiagnostic, Result};
use std::process::ExitCode;
use tokio::runtime::Runtime;

pub fn run(runtime: &Runtime, config: &Config) -> Result<ExitCode> {
    let project = Project::load(config)?;
    let controller = WatchModeController::new(
        project.synthesizer,
        project.engine,
        project.config.default_package.as_str(),
    );

    println!("Watching {} ...", controller.intent().label());

    let result = runtime.block_on(controller.run()).into_diagnostic()?;

    if result.ok {
        println!("Watch build for {} exited", result.package);
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(error) = &result.error {
            eprintln!("error: {}: {}", error.code, error.message);
            if let Some(detail) = &error.detail {
                for line in detail.lines().take(10) {
                    eprintln!("  | {line}");
                }
            }
        }
        Ok(ExitCode::FAILURE)
    }
}
