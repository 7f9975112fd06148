use std::path::Path;

use crate::core::domain::{Artifact, CompilationLimitType, CompilationLimits, ExecutionLimits};

#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn compile(
        &self,
        source: &Path,
        limits: &CompilationLimits,
    ) -> Result<Artifact, CompileError>;

    async fn run(
        &self,
        artifact: &Artifact,
        args: &[String],
        stdin: &[u8],
        limits: &ExecutionLimits,
    ) -> Result<RunResult, RunError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("compilation failed:\n{msg}")]
    CompilationFailed { msg: String },
    #[error("compilation limits exceeded: {0:?}")]
    CompilationLimitsExceeded(CompilationLimitType),
    #[error("internal error: {msg}")]
    Internal { msg: String },
}

#[derive(Clone, Debug)]
pub struct RunResult {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("time limit exceeded after {execution_time_ms} ms")]
    TimeLimitExceeded { execution_time_ms: u64 },
    #[error("process exited with status {}", .result.status)]
    Crash { result: RunResult },
    #[error("internal error: {msg}")]
    Internal { msg: String },
}
