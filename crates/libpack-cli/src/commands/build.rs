//! One-shot build of every package and variant.

use super::Project;
use libpack_core::{BuildOrchestrator, BuildRunResult, Config};
use miette::{IntoDiagnostic, Result};
use std::process::ExitCode;
use tokio::runtime::Runtime;

pub fn run(runtime: &Runtime, config: &Config) -> Result<ExitCode> {
    let project = Project::load(config)?;
    let orchestrator = BuildOrchestrator::new(project.synthesizer, project.engine);

    // Unknown packages and other configuration errors surface here, before
    // anything is submitted.
    let plans = orchestrator.plan().into_diagnostic()?;
    let result = runtime.block_on(orchestrator.execute(plans));

    if config.json_logs {
        println!("{}", serde_json::to_string(&result).into_diagnostic()?);
    } else {
        print_human_output(&result);
    }

    Ok(ExitCode::from(result.exit_code()))
}

fn print_human_output(result: &BuildRunResult) {
    for variant in &result.results {
        if variant.ok {
            println!(
                "\u{2713} {} ({} files, {}ms)",
                variant.label(),
                variant.files.len(),
                variant.duration_ms
            );
        } else {
            println!("\u{2717} {} (failed)", variant.label());
            if let Some(error) = &variant.error {
                eprintln!("  error: {}: {}", error.code, error.message);
                if let Some(detail) = &error.detail {
                    for line in detail.lines().take(10) {
                        eprintln!("  | {line}");
                    }
                }
            }
        }
    }

    let summary = &result.summary;
    println!();
    if result.ok {
        println!(
            "Built {}/{} variants across {} packages ({}ms)",
            summary.succeeded, summary.variants_total, summary.packages, summary.duration_ms
        );
    } else {
        println!(
            "Build failed: {} of {} variants failed across {} packages ({}ms)",
            summary.failed, summary.variants_total, summary.packages, summary.duration_ms
        );
    }
}
