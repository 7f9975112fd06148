use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::{
    fs,
    io::AsyncWriteExt,
    process::Command,
    time::{Instant, timeout},
};

use uuid::Uuid;

use crate::{
    core::{
        domain::{Artifact, CompilationLimitType, CompilationLimits, ExecutionLimits},
        traits::executor::{CompileError, Executor, RunError, RunResult},
    },
    native::process::spawn,
};

#[derive(Clone, Debug)]
pub struct NativeExecutor {
    dir: PathBuf,
    compiler: PathBuf,
    compiler_args: Vec<String>,
}

impl NativeExecutor {
    /// `dir` receives compiled executables. Sources are compiled as
    /// `<compiler> <compiler_args...> <source> -o <dir>/<uuid>.out`.
    pub fn new<T, U>(dir: T, compiler: U, compiler_args: Vec<String>) -> Self
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        NativeExecutor {
            dir: dir.as_ref().into(),
            compiler: compiler.as_ref().into(),
            compiler_args,
        }
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self))]
    async fn compile(
        &self,
        source: &Path,
        limits: &CompilationLimits,
    ) -> Result<Artifact, CompileError> {
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| CompileError::Internal {
                msg: format!("{} has no file name", source.display()),
            })?;
        let artifact_path = self.dir.join(format!("{}.out", Uuid::new_v4()));

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CompileError::Internal { msg: e.to_string() })?;

        let child = spawn(
            Command::new(&self.compiler)
                .args(&self.compiler_args)
                .arg(source)
                .arg("-o")
                .arg(&artifact_path)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true),
        )
        .await
        .map_err(|e| CompileError::Internal {
                msg: format!("failed to run {}: {}", self.compiler.display(), e),
            })?;

        let out = timeout(limits.time, child.wait_with_output())
            .await
            .map_err(|_| CompileError::CompilationLimitsExceeded(CompilationLimitType::Time))?
            .map_err(|e| CompileError::Internal { msg: e.to_string() })?;

        if !out.status.success() {
            return Err(CompileError::CompilationFailed {
                msg: String::from_utf8_lossy(&out.stderr).to_string(),
            });
        }

        if !fs::try_exists(&artifact_path).await.unwrap_or(false) {
            return Err(CompileError::Internal {
                msg: format!(
                    "executable file was not created at: {}",
                    artifact_path.display()
                ),
            });
        }

        tracing::debug!("Compiled {} into {}", name, artifact_path.display());
        Ok(Artifact {
            name,
            path: artifact_path,
        })
    }

    #[tracing::instrument(skip(self, stdin), fields(stdin_len = stdin.len()))]
    async fn run(
        &self,
        artifact: &Artifact,
        args: &[String],
        stdin: &[u8],
        limits: &ExecutionLimits,
    ) -> Result<RunResult, RunError> {
        let start_time = Instant::now();

        let mut child = spawn(
            Command::new(&artifact.path)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true),
        )
        .await
        .map_err(|e| RunError::Internal {
            msg: format!("failed to spawn {}: {}", artifact.path.display(), e),
        })?;

        let stdin_handle = child.stdin.take();
        let feed = async move {
            if let Some(mut handle) = stdin_handle {
                // The program may exit without reading everything; a broken pipe is fine.
                let _ = handle.write_all(stdin).await;
            }
        };

        // Feeding and collecting run together so a full stdout pipe can't stall the writer.
        let waited = timeout(limits.time, async move {
            let ((), out) = tokio::join!(feed, child.wait_with_output());
            out
        })
        .await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        let out = match waited {
            Ok(out) => out.map_err(|e| RunError::Internal {
                msg: format!("failed to wait for {}: {}", artifact.name, e),
            })?,
            Err(_) => return Err(RunError::TimeLimitExceeded { execution_time_ms }),
        };

        let result = RunResult {
            status: out.status.code().unwrap_or(-1),
            stdout: out.stdout,
            stderr: out.stderr,
            execution_time_ms,
        };

        if !out.status.success() {
            return Err(RunError::Crash { result });
        }

        Ok(result)
    }
}
