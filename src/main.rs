use std::panic;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::StressConfig;
use crate::constants::{EXIT_ALL_PASSED, EXIT_FATAL, EXIT_VERDICTS_FAILED};
use crate::core::domain::StressReport;
use crate::core::error::StressError;

mod checker;
mod cli;
mod config;
mod constants;
mod core;
mod files;
mod native;
mod report;
mod session;

#[cfg(test)]
mod test_utils;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(report) => {
            println!("{}", report::render(&report));
            if report.all_passed() {
                ExitCode::from(EXIT_ALL_PASSED)
            } else {
                ExitCode::from(EXIT_VERDICTS_FAILED)
            }
        }
        Err(error) => {
            tracing::error!("Stress run failed: {}", error);
            eprintln!("{}", error);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

#[tracing::instrument(skip_all)]
async fn run(cli: &Cli) -> Result<StressReport, StressError> {
    let config = StressConfig::load(&cli.config_path())?
        .with_overrides(cli.test_count, cli.cpu_workers)?;

    let report = session::run_stress(&config, &cli.problem_dir, cli.work_dir.as_deref()).await?;

    if let Some(path) = &cli.report_json {
        report::write_json(&report, path)
            .await
            .map_err(StressError::Persistence)?;
    }

    Ok(report)
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
