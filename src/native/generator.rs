use std::sync::Arc;

use crate::core::{
    domain::{Artifact, ExecutionLimits},
    traits::{
        executor::{Executor, RunError},
        generator::{GenerateError, TestGenerator},
    },
};

/// Runs a generator program once per round and takes its stdout as the input.
#[derive(Debug)]
pub struct ExecutorGenerator {
    executor: Arc<dyn Executor>,
    artifact: Artifact,
    args: Vec<String>,
    seed_salt: Option<String>,
    limits: ExecutionLimits,
}

impl ExecutorGenerator {
    pub fn new(
        executor: Arc<dyn Executor>,
        artifact: Artifact,
        args: Vec<String>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            executor,
            artifact,
            args,
            seed_salt: None,
            limits,
        }
    }

    /// Appends a positional `<salt><round>` argument so that generators which
    /// seed from their command line produce a different test every round.
    pub fn with_seed_salt(mut self, salt: impl Into<String>) -> Self {
        self.seed_salt = Some(salt.into());
        self
    }

    fn args_for(&self, round: u32) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(salt) = &self.seed_salt {
            args.push(format!("{}{}", salt, round));
        }
        args
    }
}

#[async_trait::async_trait]
impl TestGenerator for ExecutorGenerator {
    async fn generate(&self, round: u32) -> Result<Vec<u8>, GenerateError> {
        let args = self.args_for(round);
        tracing::debug!("Generating round {} with {:?}", round, args);

        match self
            .executor
            .run(&self.artifact, &args, b"", &self.limits)
            .await
        {
            Ok(result) => Ok(result.stdout),
            Err(RunError::TimeLimitExceeded { execution_time_ms }) => {
                Err(GenerateError::TimedOut { execution_time_ms })
            }
            Err(RunError::Crash { result }) => Err(GenerateError::Crashed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            }),
            Err(RunError::Internal { msg }) => Err(GenerateError::Internal { msg }),
        }
    }
}
