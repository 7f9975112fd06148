use std::path::PathBuf;

use crate::{
    checker::CheckerError,
    config::ConfigError,
    core::{pipeline::preparing::PrepareError, traits::generator::GenerateError},
};

/// Errors that stop a stress run. Per-round verdicts are never reported here.
#[derive(Debug, thiserror::Error)]
pub enum StressError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration error: {0}")]
    Preparation(#[from] PrepareError),

    #[error("Configuration error: {0}")]
    CheckerSetup(#[source] CheckerError),

    #[error("Test generation failed in round {round}: {source}")]
    Generation {
        round: u32,
        #[source]
        source: GenerateError,
    },

    #[error("Round {round} is inconclusive, main solution failed: {reason}{}", input_hint(.input))]
    InconclusiveRound {
        round: u32,
        reason: String,
        input: Option<PathBuf>,
    },

    /// For a malfunction the message is the checker's own stderr.
    #[error("{source}")]
    Checker {
        round: u32,
        #[source]
        source: CheckerError,
    },

    #[error("Failed to run {solution} in round {round}: {msg}")]
    Execution {
        round: u32,
        solution: String,
        msg: String,
    },

    #[error("Failed to write run results: {0}")]
    Persistence(#[source] std::io::Error),

    #[error("Worker stopped unexpectedly: {0}")]
    Worker(String),
}

fn input_hint(input: &Option<PathBuf>) -> String {
    match input {
        Some(path) => format!(" (input saved to {})", path.display()),
        None => String::new(),
    }
}
