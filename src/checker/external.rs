use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{process::Command, time::timeout};

use crate::{
    checker::{CheckerError, temp_files::TempArtifacts},
    constants::TEMP_DIR_NAME,
    core::domain::{CheckerResult, ContestantExecutionStatus},
    files::is_executable,
    native::process::spawn,
};

/// Checker backed by a testlib-compatible executable.
///
/// The executable is called as `checker <input> <output> <answer>`, reports its
/// verdict through the exit code and explains it on stderr. Stdout is ignored.
#[derive(Debug, Clone)]
pub struct ExternalChecker {
    path: PathBuf,
    timeout: Duration,
    work_dir: PathBuf,
}

impl ExternalChecker {
    /// Fails if `path` is not an executable file, so a misconfigured checker
    /// is reported before any test runs.
    pub fn new<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self, CheckerError> {
        let path = path.as_ref().to_path_buf();
        if !is_executable(&path) {
            return Err(CheckerError::NotExecutable { path });
        }

        Ok(Self {
            path,
            timeout,
            work_dir: std::env::temp_dir().join(TEMP_DIR_NAME).join("checker"),
        })
    }

    /// Directory for the per-call input/output/answer files.
    pub fn with_work_dir<P: AsRef<Path>>(mut self, work_dir: P) -> Self {
        self.work_dir = work_dir.as_ref().into();
        self
    }

    #[tracing::instrument(skip_all, fields(checker = %self.path.display()))]
    pub async fn check(
        &self,
        input: &[u8],
        answer: &[u8],
        output: &[u8],
    ) -> Result<CheckerResult, CheckerError> {
        let artifacts = TempArtifacts::create(&self.work_dir, input, output, answer).await?;
        let (code, stderr) = self.invoke(&artifacts).await?;
        drop(artifacts);

        let status = code
            .map(ContestantExecutionStatus::from_exit_code)
            .unwrap_or(ContestantExecutionStatus::Fail);
        tracing::debug!("Checker exited with {:?}: {}", code, status);

        if status == ContestantExecutionStatus::Fail {
            let message = if stderr.is_empty() {
                format!(
                    "external checker {} failed with exit code {:?} and no message",
                    self.path.display(),
                    code
                )
            } else {
                stderr
            };
            return Err(CheckerError::Malfunction { message });
        }

        Ok(CheckerResult::new(status, stderr))
    }

    async fn invoke(
        &self,
        artifacts: &TempArtifacts,
    ) -> Result<(Option<i32>, String), CheckerError> {
        let child = spawn(
            Command::new(&self.path)
                .arg(&artifacts.input)
                .arg(&artifacts.output)
                .arg(&artifacts.answer)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true),
        )
        .await?;

        // Dropping the pending future on timeout kills the child.
        let out = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CheckerError::TimedOut {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        Ok((
            out.status.code(),
            String::from_utf8_lossy(&out.stderr).into_owned(),
        ))
    }
}
