#[mockall::automock]
#[async_trait::async_trait]
pub trait TestGenerator: std::fmt::Debug + Send + Sync {
    /// Produces the input of one round.
    async fn generate(&self, round: u32) -> Result<Vec<u8>, GenerateError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerateError {
    #[error("generator timed out after {execution_time_ms} ms")]
    TimedOut { execution_time_ms: u64 },
    #[error("generator exited with status {status}: {stderr}")]
    Crashed { status: i32, stderr: String },
    #[error("failed to launch generator: {msg}")]
    Internal { msg: String },
}
