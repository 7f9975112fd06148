use std::path::PathBuf;

use clap::Parser;

use crate::constants::DEFAULT_CONFIG_FILE;

/// Stress-tests alternate solutions of a competitive programming problem
/// against its reference solution.
#[derive(Debug, Parser)]
#[command(name = "cp-stress", version)]
pub struct Cli {
    /// Configuration file [default: <problem-dir>/stress.json]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing the solutions, the generator and the checker
    #[arg(long, default_value = ".")]
    pub problem_dir: PathBuf,

    /// Where compiled binaries and checker files go [default: fresh temp dir]
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Overrides `test_count` from the configuration
    #[arg(long)]
    pub test_count: Option<u32>,

    /// Overrides `cpu_workers` from the configuration
    #[arg(long)]
    pub cpu_workers: Option<usize>,

    /// Also write the final report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.problem_dir.join(DEFAULT_CONFIG_FILE))
    }
}
